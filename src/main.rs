//! Motion Activity Agent CLI
//!
//! Windowed motion-sensor feature pipeline for activity classification.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use motion_activity_agent::{
    classifier::{ActivityLabel, CentroidClassifier},
    collector::{
        ReplayCollector, ReplayConfig, SampleSource, SyntheticCollector, SyntheticConfig,
    },
    config::Config,
    core::{
        featurize, featurize_fitted, write_libsvm, ClassificationOrchestrator, FittedRows,
        Recording, ScalingStrategy, TickOutcome, WindowBuffer,
    },
    stats::create_shared_log_with_persistence,
    VERSION,
};
use serde::Serialize;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "motion-activity")]
#[command(version = VERSION)]
#[command(about = "Windowed motion-sensor activity classification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live pipeline against a sample source
    Start {
        /// Sample source: "synthetic" or a JSON-lines recording
        #[arg(long, default_value = "synthetic")]
        source: String,

        /// Centroid model file (overrides config)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Scaling strategy: static or dynamic (overrides config)
        #[arg(long)]
        scaling: Option<ScalingStrategy>,

        /// Samples per window (overrides config)
        #[arg(long)]
        window: Option<usize>,

        /// Window advance in samples (overrides config)
        #[arg(long)]
        stride: Option<usize>,

        /// Tick interval in milliseconds (overrides config)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Replay recordings as fast as possible instead of in recorded time
        #[arg(long)]
        fast: bool,
    },

    /// Convert a recording into LibSVM training rows
    Featurize {
        /// JSON-lines recording
        recording: PathBuf,

        /// Numeric activity code written as the row label
        #[arg(long)]
        label: u8,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Samples per window (overrides config)
        #[arg(long)]
        window: Option<usize>,

        /// Window advance in samples (overrides config)
        #[arg(long)]
        stride: Option<usize>,

        /// Scaling strategy (overrides config)
        #[arg(long, conflicts_with = "fit")]
        scaling: Option<ScalingStrategy>,

        /// Fit per-feature bounds to this recording instead of using the
        /// configured scaling
        #[arg(long)]
        fit: bool,

        /// Write the fitted bounds as a calibration table
        #[arg(long, requires = "fit")]
        range_output: Option<PathBuf>,
    },

    /// Show cumulative session statistics
    Status,

    /// Show configuration
    Config,
}

/// One published classification in an exported history.
#[derive(Debug, Clone, Serialize)]
struct ClassificationRecord {
    timestamp: DateTime<Utc>,
    label: ActivityLabel,
}

/// Exported session history.
#[derive(Debug, Serialize)]
struct SessionExport<'a> {
    session_id: Uuid,
    source: &'a str,
    scaling: ScalingStrategy,
    window_size: usize,
    stride: usize,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    classifications: &'a [ClassificationRecord],
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            source,
            model,
            scaling,
            window,
            stride,
            tick_ms,
            duration,
            fast,
        } => {
            let mut config = load_config();
            config.model_path = model.or(config.model_path);
            config.scaling = scaling.unwrap_or(config.scaling);
            config.window_size = window.unwrap_or(config.window_size);
            config.stride = stride.unwrap_or(config.stride);
            if let Some(ms) = tick_ms {
                config.tick_interval = Duration::from_millis(ms);
            }
            cmd_start(config, &source, duration.map(Duration::from_secs), fast)
        }
        Commands::Featurize {
            recording,
            label,
            output,
            window,
            stride,
            scaling,
            fit,
            range_output,
        } => {
            let mut config = load_config();
            config.window_size = window.unwrap_or(config.window_size);
            config.stride = stride.unwrap_or(config.stride);
            config.scaling = scaling.unwrap_or(config.scaling);
            let scaling = if fit {
                RowScaling::Fitted(range_output)
            } else {
                RowScaling::Configured
            };
            cmd_featurize(config, &recording, label, output, scaling)
        }
        Commands::Status => {
            cmd_status();
            Ok(())
        }
        Commands::Config => cmd_config(),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    })
}

fn cmd_start(config: Config, source: &str, duration: Option<Duration>, fast: bool) -> Result<()> {
    config.validate().context("invalid configuration")?;

    println!("Motion Activity Agent v{VERSION}");
    println!();

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let model_path = match &config.model_path {
        Some(path) => path.clone(),
        None => bail!("no classifier model configured; pass --model <centroids.json>"),
    };
    let classifier = CentroidClassifier::load(&model_path)
        .with_context(|| format!("failed to load model {}", model_path.display()))?;
    let scaler = config.build_scaler()?;

    println!("Starting classification...");
    println!("  Source: {source}");
    println!("  Model: {:?} ({} features)", model_path, classifier.dimensions());
    println!("  Scaling: {}", config.scaling);
    println!("  Window: {} samples, stride {}", config.window_size, config.stride);
    println!("  Tick interval: {}ms", config.tick_interval.as_millis());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let session_log = create_shared_log_with_persistence(config.stats_path());
    let buffer = Arc::new(WindowBuffer::new(config.window_size, config.stride)?);

    let history = Arc::new(Mutex::new(Vec::<ClassificationRecord>::new()));
    let sink_history = Arc::clone(&history);
    let sink = move |label: ActivityLabel| {
        let timestamp = Utc::now();
        println!("[{}] Activity: {label}", timestamp.format("%H:%M:%S"));
        if let Ok(mut history) = sink_history.lock() {
            history.push(ClassificationRecord { timestamp, label });
        }
    };

    let mut orchestrator = ClassificationOrchestrator::new(
        Arc::clone(&buffer),
        scaler,
        Arc::new(classifier),
        Arc::new(sink),
    )
    .with_tick_interval(config.tick_interval);
    orchestrator.set_log(Arc::clone(&session_log))?;

    let mut collector: Box<dyn SampleSource> = if source == "synthetic" {
        Box::new(SyntheticCollector::new(SyntheticConfig {
            sample_rate_hz: config.synthetic_rate_hz,
            motion: config.synthetic_motion,
            ..SyntheticConfig::default()
        }))
    } else {
        Box::new(ReplayCollector::new(ReplayConfig {
            path: PathBuf::from(source),
            realtime: !fast,
        }))
    };

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("error setting Ctrl+C handler")?;

    let started_at = Utc::now();
    let deadline = duration.map(|d| Instant::now() + d);

    collector.start().context("error starting collector")?;
    orchestrator.start()?;

    let receiver = collector.receiver().clone();
    let mut source_exhausted = false;

    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                buffer.push(event.channel, event.sample);
                session_log.record_sample(event.channel);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                source_exhausted = true;
                break;
            }
        }
    }

    println!();
    println!("Stopping classification...");
    collector.stop();
    orchestrator.stop();

    // A replay that ended between ticks still gets its last window classified.
    if source_exhausted {
        if let TickOutcome::Failed(e) = orchestrator.tick_once() {
            eprintln!("Warning: Final classification failed: {e}");
        }
    }

    if let Err(e) = session_log.save() {
        eprintln!("Warning: Could not save session stats: {e}");
    }

    let history = history
        .lock()
        .map(|h| h.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
    if !history.is_empty() {
        let export = SessionExport {
            session_id: Uuid::new_v4(),
            source,
            scaling: config.scaling,
            window_size: config.window_size,
            stride: config.stride,
            started_at,
            ended_at: Utc::now(),
            classifications: &history,
        };
        let export_path = config.export_path.join(format!(
            "session_{}.json",
            started_at.format("%Y%m%d_%H%M%S")
        ));

        match serde_json::to_string_pretty(&export) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&export_path, json) {
                    eprintln!("Error writing classification history: {e}");
                } else {
                    println!(
                        "Exported {} classifications to {:?}",
                        history.len(),
                        export_path
                    );
                }
            }
            Err(e) => eprintln!("Error serializing classification history: {e}"),
        }
    }

    // Final stats
    println!();
    println!("{}", session_log.summary());
    Ok(())
}

/// How `featurize` scales its rows.
enum RowScaling {
    /// The configured static table or dynamic scaling
    Configured,
    /// Bounds fitted to the recording, optionally saved to a file
    Fitted(Option<PathBuf>),
}

fn cmd_featurize(
    config: Config,
    recording_path: &Path,
    label: u8,
    output: Option<PathBuf>,
    scaling: RowScaling,
) -> Result<()> {
    config.validate().context("invalid configuration")?;

    if ActivityLabel::from_code(f64::from(label)) == ActivityLabel::Unknown {
        eprintln!("Warning: label {label} is not a known activity code");
    }

    let recording = Recording::load(recording_path)
        .with_context(|| format!("failed to read recording {}", recording_path.display()))?;
    let rows = match scaling {
        RowScaling::Configured => {
            let scaler = config.build_scaler()?;
            featurize(
                &recording,
                label,
                config.window_size,
                config.stride,
                scaler.as_ref(),
            )?
        }
        RowScaling::Fitted(range_output) => {
            let FittedRows { rows, range } =
                featurize_fitted(&recording, label, config.window_size, config.stride)
                    .context("failed to fit scaling bounds")?;
            if let Some(path) = range_output {
                std::fs::write(&path, range.to_json())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("Wrote {} fitted bounds to {:?}", range.len(), path);
            }
            rows
        }
    };

    match output {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_libsvm(&rows, BufWriter::new(file))?;
            eprintln!("Wrote {} rows to {:?}", rows.len(), path);
        }
        None => write_libsvm(&rows, std::io::stdout().lock())?,
    }
    Ok(())
}

fn cmd_status() {
    let config = load_config();

    println!("Motion Activity Agent Status");
    println!("============================");
    println!();

    println!("Configuration:");
    println!("  Window: {} samples, stride {}", config.window_size, config.stride);
    println!("  Tick interval: {}ms", config.tick_interval.as_millis());
    println!("  Scaling: {}", config.scaling);
    match &config.model_path {
        Some(path) => println!("  Model: {path:?}"),
        None => println!("  Model: not configured"),
    }
    println!();

    // Load and show persisted stats if available
    let stats_path = config.stats_path();
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                let fields = [
                    ("acceleration_samples", "Acceleration samples"),
                    ("gravity_samples", "Gravity samples"),
                    ("angular_velocity_samples", "Angular velocity samples"),
                    ("ticks_skipped", "Ticks skipped"),
                    ("ticks_failed", "Ticks failed"),
                    ("classifications_published", "Classifications published"),
                    ("last_updated", "Last updated"),
                ];
                for (key, title) in fields {
                    if let Some(value) = stats.get(key) {
                        println!("  {title}: {value}");
                    }
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config() -> Result<()> {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
