//! Error types for the windowed feature pipeline.

use crate::collector::types::Channel;
use crate::core::scaling::ScalingRangeError;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by the buffer, extraction and inference stages.
///
/// None of these are fatal to the orchestrator: a tick that hits one is
/// reported and the loop carries on with the next tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A raw sample did not carry exactly three components.
    #[error("invalid sample shape: expected 3 components, got {actual}")]
    InvalidSampleShape { actual: usize },

    /// A snapshot was requested before every channel held a full window.
    #[error("buffer not ready: {channel} has {available} of {required} samples")]
    BufferNotReady {
        channel: Channel,
        available: usize,
        required: usize,
    },

    /// Window geometry that cannot form a sliding window.
    #[error("invalid window geometry: window_size={window_size}, stride={stride}")]
    InvalidWindow { window_size: usize, stride: usize },

    /// The classification oracle rejected the feature vector.
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    /// Scaling bounds could not be fitted or loaded.
    #[error("calibration failed: {0}")]
    Calibration(#[from] ScalingRangeError),

    /// The result sink panicked while receiving a label.
    #[error("publishing failed: {0}")]
    Publish(String),
}

/// Failures reported by a [`ClassifierOracle`](crate::classifier::ClassifierOracle).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// The feature vector length does not match what the model was built for.
    #[error("feature vector has {actual} values, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Opaque model failure.
    #[error("model error: {0}")]
    Model(String),
}

impl InferenceError {
    /// Create an opaque model error.
    pub fn model<S: Into<String>>(msg: S) -> Self {
        InferenceError::Model(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PipelineError::InvalidSampleShape { actual: 2 };
        assert_eq!(
            err.to_string(),
            "invalid sample shape: expected 3 components, got 2"
        );

        let err = PipelineError::BufferNotReady {
            channel: Channel::Gravity,
            available: 3,
            required: 200,
        };
        assert_eq!(err.to_string(), "buffer not ready: gravity has 3 of 200 samples");
    }

    #[test]
    fn test_inference_error_converts() {
        let err: PipelineError = InferenceError::model("svm exploded").into();
        assert!(matches!(err, PipelineError::Inference(_)));
        assert!(err.to_string().contains("svm exploded"));
    }
}
