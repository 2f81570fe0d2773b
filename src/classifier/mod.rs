//! Classification seam.
//!
//! The trained model is opaque to the pipeline: anything that maps a scaled
//! feature vector to an [`ActivityLabel`] can be plugged in as a
//! [`ClassifierOracle`]. A nearest-centroid model is provided so the agent can
//! run end to end without the production model.

pub mod centroid;
pub mod label;

use crate::core::features::FeatureVector;
use crate::error::InferenceError;

pub use centroid::{Centroid, CentroidClassifier, CentroidModel, ModelLoadError};
pub use label::ActivityLabel;

/// A trained classifier. Calls may block; the orchestrator only invokes it
/// from its own thread.
pub trait ClassifierOracle: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<ActivityLabel, InferenceError>;
}

impl<F> ClassifierOracle for F
where
    F: Fn(&FeatureVector) -> Result<ActivityLabel, InferenceError> + Send + Sync,
{
    fn predict(&self, features: &FeatureVector) -> Result<ActivityLabel, InferenceError> {
        self(features)
    }
}
