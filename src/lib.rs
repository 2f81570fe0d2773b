//! Motion Activity Agent - windowed motion-sensor feature pipeline.
//!
//! This library turns continuous 3-axis motion samples (acceleration,
//! gravity and angular velocity) into periodic physical-activity
//! classifications. Samples are kept in per-channel sliding windows; on every
//! tick the latest window is reduced to per-axis means and variances, scaled
//! into the classifier's input range, and handed to a pluggable classifier.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Motion Activity Agent                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐             │
//! │  │  Collector  │──▶│   Window    │──▶│  Features   │             │
//! │  │(replay/synth)│  │   Buffer    │   │ (mean/var)  │             │
//! │  └─────────────┘   └─────────────┘   └─────────────┘             │
//! │         │                 ▲                 │                    │
//! │         ▼                 │ tick            ▼                    │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐             │
//! │  │   Session   │◀──│Orchestrator │◀──│   Scaler    │──▶ Oracle   │
//! │  │     Log     │   │ (1 s ticks) │   │(static/dyn) │             │
//! │  └─────────────┘   └─────────────┘   └─────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use motion_activity_agent::classifier::ActivityLabel;
//! use motion_activity_agent::core::{ClassificationOrchestrator, StaticScaler, WindowBuffer};
//! use motion_activity_agent::{Channel, FeatureVector, InferenceError};
//! use std::sync::Arc;
//!
//! let buffer = Arc::new(WindowBuffer::new(200, 100).expect("valid geometry"));
//! let oracle = |_: &FeatureVector| -> Result<ActivityLabel, InferenceError> {
//!     Ok(ActivityLabel::Walking)
//! };
//! let sink = |label: ActivityLabel| println!("activity: {label}");
//!
//! let mut orchestrator = ClassificationOrchestrator::new(
//!     Arc::clone(&buffer),
//!     Box::new(StaticScaler::default()),
//!     Arc::new(oracle),
//!     Arc::new(sink),
//! );
//! orchestrator.start().expect("failed to start");
//!
//! // Any thread may feed samples
//! buffer.add_sample(Channel::Acceleration, &[0.1, -0.2, 0.05]).expect("3 components");
//! ```

pub mod classifier;
pub mod collector;
pub mod config;
pub mod core;
pub mod error;
pub mod stats;

// Re-export key types at crate root for convenience
pub use classifier::{ActivityLabel, CentroidClassifier, ClassifierOracle};
pub use collector::{Channel, CollectorError, Sample, SampleSource, SensorEvent};
pub use config::{Config, ConfigError};
pub use core::{
    ActivitySink, ClassificationOrchestrator, FeatureScaler, FeatureVector, ScalingStrategy,
    TickOutcome, WindowBuffer, WindowSnapshot,
};
pub use error::{InferenceError, PipelineError, PipelineResult};
pub use stats::{SessionLog, SessionStats, SharedSessionLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
