//! Core pipeline for the motion activity agent.
//!
//! This module contains:
//! - Per-channel sliding-window buffers
//! - Feature extraction from window snapshots
//! - Feature scaling (static calibration table or dynamic min/max)
//! - The periodic classification orchestrator
//! - Offline featurization of recordings into training rows

pub mod buffer;
pub mod dataset;
pub mod features;
pub mod orchestrator;
pub mod scaling;

// Re-export commonly used types
pub use buffer::{WindowBuffer, WindowSnapshot};
pub use dataset::{
    featurize, featurize_fitted, sliding_windows, write_libsvm, FeatureRow, FittedRows, Recording,
};
pub use features::{extract, extract_channel, FeatureVector, FEATURE_VECTOR_LEN};
pub use orchestrator::{
    ActivitySink, ClassificationOrchestrator, OrchestratorError, OrchestratorState, TickOutcome,
    DEFAULT_TICK_INTERVAL,
};
pub use scaling::{
    DynamicScaler, FeatureBounds, FeatureScaler, ScalingRange, ScalingRangeError,
    ScalingStrategy, StaticScaler,
};
