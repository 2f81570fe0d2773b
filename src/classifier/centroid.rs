//! Nearest-centroid classifier.
//!
//! Each class is represented by the mean scaled feature vector of its
//! training windows; a window is assigned the class of the closest centroid
//! (squared Euclidean distance). The model file is JSON:
//!
//! ```json
//! { "centroids": [ { "class": 1, "features": [0.1, -0.9, ...] } ] }
//! ```

use crate::classifier::{ActivityLabel, ClassifierOracle};
use crate::core::features::FeatureVector;
use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors loading a centroid model.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model has no centroids")]
    Empty,

    #[error("centroid {index} has {actual} features, expected {expected}")]
    InconsistentDimensions {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// One class centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    /// Numeric class code as emitted by the training pipeline
    pub class: f64,
    pub features: Vec<f64>,
}

/// Serialized model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidModel {
    pub centroids: Vec<Centroid>,
}

/// Classifier assigning the class of the nearest centroid.
#[derive(Debug, Clone)]
pub struct CentroidClassifier {
    model: CentroidModel,
    dimensions: usize,
}

impl CentroidClassifier {
    pub fn new(model: CentroidModel) -> Result<Self, ModelLoadError> {
        let dimensions = model
            .centroids
            .first()
            .map(|c| c.features.len())
            .ok_or(ModelLoadError::Empty)?;

        for (index, centroid) in model.centroids.iter().enumerate() {
            if centroid.features.len() != dimensions {
                return Err(ModelLoadError::InconsistentDimensions {
                    index,
                    expected: dimensions,
                    actual: centroid.features.len(),
                });
            }
        }

        Ok(Self { model, dimensions })
    }

    pub fn from_json(json: &str) -> Result<Self, ModelLoadError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Feature vector length the model expects.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Class code of the nearest centroid.
    pub fn predict_code(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        if features.len() != self.dimensions {
            return Err(InferenceError::DimensionMismatch {
                expected: self.dimensions,
                actual: features.len(),
            });
        }

        self.model
            .centroids
            .iter()
            .map(|c| (c.class, squared_distance(&c.features, features.values())))
            .filter(|(_, d)| !d.is_nan())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(class, _)| class)
            .ok_or_else(|| InferenceError::model("feature vector contains NaN"))
    }
}

impl ClassifierOracle for CentroidClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<ActivityLabel, InferenceError> {
        self.predict_code(features).map(ActivityLabel::from_code)
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> CentroidClassifier {
        CentroidClassifier::from_json(
            r#"{"centroids": [
                {"class": 3, "features": [-1.0, -1.0]},
                {"class": 1, "features": [0.0, 0.0]},
                {"class": 2, "features": [1.0, 1.0]},
                {"class": 9, "features": [5.0, 5.0]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_centroid() {
        let classifier = model();
        assert_eq!(classifier.dimensions(), 2);
        assert_eq!(
            classifier.predict(&vec![0.9, 0.7].into()),
            Ok(ActivityLabel::Running)
        );
        assert_eq!(
            classifier.predict(&vec![-0.8, -1.2].into()),
            Ok(ActivityLabel::Standing)
        );
        assert_eq!(
            classifier.predict(&vec![0.1, -0.2].into()),
            Ok(ActivityLabel::Walking)
        );
    }

    #[test]
    fn test_unrecognized_class_maps_to_unknown() {
        assert_eq!(
            model().predict(&vec![4.5, 5.5].into()),
            Ok(ActivityLabel::Unknown)
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        assert_eq!(
            model().predict(&vec![0.0; 18].into()),
            Err(InferenceError::DimensionMismatch {
                expected: 2,
                actual: 18
            })
        );
    }

    #[test]
    fn test_nan_features_fail() {
        assert!(model().predict(&vec![f64::NAN, 0.0].into()).is_err());
    }

    #[test]
    fn test_invalid_models_rejected() {
        assert!(matches!(
            CentroidClassifier::from_json(r#"{"centroids": []}"#),
            Err(ModelLoadError::Empty)
        ));
        assert!(matches!(
            CentroidClassifier::from_json(
                r#"{"centroids": [{"class": 1, "features": [0.0]}, {"class": 2, "features": [0.0, 1.0]}]}"#
            ),
            Err(ModelLoadError::InconsistentDimensions { index: 1, .. })
        ));
    }
}
