//! Periodic classification scheduler.
//!
//! The orchestrator owns a background thread that, once per tick, checks
//! whether every channel holds a full window and if so runs
//! snapshot → extract → scale → predict → publish. Each tick is an isolation
//! boundary: a failure (or a panicking oracle or sink) is logged and counted,
//! and the loop simply tries again on the next tick.
//!
//! Cancellation is observed at tick boundaries. A tick already in flight when
//! `stop` is called runs to completion, but its label is discarded instead of
//! published.

use crate::classifier::{ActivityLabel, ClassifierOracle};
use crate::core::buffer::WindowBuffer;
use crate::core::features;
use crate::core::scaling::FeatureScaler;
use crate::error::{InferenceError, PipelineError, PipelineResult};
use crate::stats::{create_shared_log, SharedSessionLog};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Default scheduling period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Receives each published classification.
pub trait ActivitySink: Send + Sync {
    fn on_activity_classified(&self, label: ActivityLabel);
}

impl<F> ActivitySink for F
where
    F: Fn(ActivityLabel) + Send + Sync,
{
    fn on_activity_classified(&self, label: ActivityLabel) {
        self(label)
    }
}

/// Errors from controlling the orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("orchestrator is already running")]
    AlreadyRunning,

    #[error("tick state is still shared with an earlier run")]
    ContextShared,

    #[error("failed to spawn tick thread: {0}")]
    Spawn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Buffer still warming up
    Skipped,
    /// Label delivered to the sink
    Published(ActivityLabel),
    /// Label computed after a stop request and withheld
    Discarded(ActivityLabel),
    Failed(PipelineError),
}

/// Everything one tick touches. Shared with the worker thread.
struct TickContext {
    buffer: Arc<WindowBuffer>,
    scaler: Box<dyn FeatureScaler>,
    oracle: Arc<dyn ClassifierOracle>,
    sink: Arc<dyn ActivitySink>,
    log: SharedSessionLog,
    cancelled: AtomicBool,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl TickContext {
    fn tick(&self) -> TickOutcome {
        if !self.buffer.is_ready() {
            self.log.record_tick_skipped();
            tracing::debug!("buffer not ready, skipping tick");
            return TickOutcome::Skipped;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.classify()))
            .unwrap_or_else(|payload| {
                Err(InferenceError::model(format!(
                    "classifier panicked: {}",
                    panic_message(payload.as_ref())
                ))
                .into())
            });

        let outcome = match result {
            Ok(label) if self.cancelled.load(Ordering::SeqCst) => {
                tracing::debug!(%label, "stop requested mid-tick, discarding label");
                return TickOutcome::Discarded(label);
            }
            Ok(label) => self.publish(label).map(|()| label),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(label) => {
                self.log.record_classification();
                tracing::trace!(%label, "published classification");
                TickOutcome::Published(label)
            }
            Err(e) => {
                self.log.record_tick_failed();
                tracing::warn!(error = %e, "classification tick failed");
                TickOutcome::Failed(e)
            }
        }
    }

    fn publish(&self, label: ActivityLabel) -> PipelineResult<()> {
        panic::catch_unwind(AssertUnwindSafe(|| self.sink.on_activity_classified(label)))
            .map_err(|payload| PipelineError::Publish(panic_message(payload.as_ref())))
    }

    fn classify(&self) -> PipelineResult<ActivityLabel> {
        let snapshot = self.buffer.snapshot()?;
        let features = features::extract(&snapshot);
        let scaled = self.scaler.scale(&features);
        Ok(self.oracle.predict(&scaled)?)
    }
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives the windowed feature pipeline at a fixed cadence.
pub struct ClassificationOrchestrator {
    context: Arc<TickContext>,
    tick_interval: Duration,
    worker: Option<Worker>,
}

impl ClassificationOrchestrator {
    pub fn new(
        buffer: Arc<WindowBuffer>,
        scaler: Box<dyn FeatureScaler>,
        oracle: Arc<dyn ClassifierOracle>,
        sink: Arc<dyn ActivitySink>,
    ) -> Self {
        Self {
            context: Arc::new(TickContext {
                buffer,
                scaler,
                oracle,
                sink,
                log: create_shared_log(),
                cancelled: AtomicBool::new(false),
            }),
            tick_interval: DEFAULT_TICK_INTERVAL,
            worker: None,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Count tick outcomes into a shared session log.
    ///
    /// Fails while the tick loop is running, or while a detached tick from an
    /// abandoned `run_until` still holds the tick state.
    pub fn set_log(&mut self, log: SharedSessionLog) -> Result<(), OrchestratorError> {
        if self.is_running() {
            return Err(OrchestratorError::AlreadyRunning);
        }
        let context = Arc::get_mut(&mut self.context).ok_or(OrchestratorError::ContextShared)?;
        context.log = log;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn log(&self) -> &SharedSessionLog {
        &self.context.log
    }

    pub fn state(&self) -> OrchestratorState {
        if self.worker.is_some() {
            OrchestratorState::Running
        } else {
            OrchestratorState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == OrchestratorState::Running
    }

    /// Run one tick on the calling thread.
    pub fn tick_once(&self) -> TickOutcome {
        self.context.tick()
    }

    /// Idle → Running: spawn the tick loop.
    pub fn start(&mut self) -> Result<(), OrchestratorError> {
        if self.worker.is_some() {
            return Err(OrchestratorError::AlreadyRunning);
        }

        self.context.cancelled.store(false, Ordering::SeqCst);
        let (stop_tx, stop_rx) = bounded(1);
        let context = Arc::clone(&self.context);
        let interval = self.tick_interval;

        let handle = thread::Builder::new()
            .name("classification-tick".into())
            .spawn(move || run_loop(context, interval, stop_rx))
            .map_err(|e| OrchestratorError::Spawn(e.to_string()))?;

        self.worker = Some(Worker { stop_tx, handle });
        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            scaler = self.context.scaler.name(),
            "classification started"
        );
        Ok(())
    }

    /// Running → Idle. Waits for an in-flight tick to finish.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.context.cancelled.store(true, Ordering::SeqCst);
        let _ = worker.stop_tx.try_send(());
        if worker.handle.join().is_err() {
            tracing::error!("classification tick thread panicked");
        }
        // Nothing is in flight any more; manual ticks publish again.
        self.context.cancelled.store(false, Ordering::SeqCst);
        tracing::info!("classification stopped");
    }

    /// Drive ticks on a tokio runtime until `shutdown` flips to `true`.
    ///
    /// Ticks run on the blocking pool so a slow oracle never stalls the
    /// runtime. Not available while the threaded loop is running.
    #[cfg(feature = "tokio")]
    pub async fn run_until(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Result<(), OrchestratorError> {
        if self.is_running() {
            return Err(OrchestratorError::AlreadyRunning);
        }

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    let context = Arc::clone(&self.context);
                    if let Err(e) = tokio::task::spawn_blocking(move || context.tick()).await {
                        tracing::warn!("tick task aborted: {e}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Drop for ClassificationOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(context: Arc<TickContext>, interval: Duration, stop_rx: Receiver<()>) {
    loop {
        if context.cancelled.load(Ordering::SeqCst) {
            break;
        }

        context.tick();

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
