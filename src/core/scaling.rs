//! Feature scaling into the `[-1, 1]` range the classifier was trained on.
//!
//! Two strategies share the [`FeatureScaler`] trait and are mutually
//! exclusive: a static calibration table of per-feature bounds, or dynamic
//! min/max over the vector being scaled.

use crate::core::features::FeatureVector;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const LOWER: f64 = -1.0;
const UPPER: f64 = 1.0;

/// Per-feature bounds derived from the training data, keyed by 1-based
/// feature index (acceleration, gravity, angular velocity; mean/var per axis).
const CALIBRATION_BOUNDS: [(f64, f64); 18] = [
    (-6.9469874256799979, 1.0444658363165003),
    (9.825174800575169e-05, 115.30016398551612),
    (-5.7359475886799984, 3.059779641644349),
    (8.1018296696998434e-05, 135.15430181123241),
    (-6.4505823278824996, 0.79364102275639981),
    (8.4828034519179976e-05, 151.62829775990298),
    (-9.470988697990002, 8.048963317880002),
    (3.1791779520062846e-07, 42.812955460133168),
    (-9.7623577165749964, 8.4149724245050006),
    (7.1640755550106405e-07, 11.352167317776766),
    (-4.5776806712200013, 9.4278232145149978),
    (8.5195131660498191e-07, 18.466017917173559),
    (-0.56770945230945002, 0.70243211312293508),
    (5.3845529637667709e-07, 14.486241177061888),
    (-0.62620162442690719, 0.82894594433394009),
    (1.7858889730798361e-06, 25.811976868207161),
    (-0.49441600293095, 0.84737761478579532),
    (1.0901294404476607e-06, 15.316157433549423),
];

/// Problems with a calibration table. Detected when the table is built, so
/// they surface at startup rather than as NaN features later.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScalingRangeError {
    #[error("calibration table is empty")]
    Empty,

    #[error("feature indices are 1-based; got index 0")]
    ZeroIndex,

    #[error("feature {index}: bounds must be finite with min < max (got {min}, {max})")]
    DegenerateBounds { index: usize, min: f64, max: f64 },

    #[error("feature index {0} is not a positive integer")]
    InvalidIndex(String),

    #[error("failed to read calibration table: {0}")]
    Io(String),

    #[error("failed to parse calibration table: {0}")]
    Parse(String),
}

/// Calibration bounds for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBounds {
    pub min: f64,
    pub max: f64,
}

/// Immutable map from 1-based feature index to its calibration bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingRange {
    bounds: BTreeMap<usize, FeatureBounds>,
}

impl ScalingRange {
    /// Build a table, rejecting entries that would divide by zero.
    pub fn new<I>(entries: I) -> Result<Self, ScalingRangeError>
    where
        I: IntoIterator<Item = (usize, FeatureBounds)>,
    {
        let mut bounds = BTreeMap::new();
        for (index, b) in entries {
            if index == 0 {
                return Err(ScalingRangeError::ZeroIndex);
            }
            if !(b.min.is_finite() && b.max.is_finite() && b.min < b.max) {
                return Err(ScalingRangeError::DegenerateBounds {
                    index,
                    min: b.min,
                    max: b.max,
                });
            }
            bounds.insert(index, b);
        }
        if bounds.is_empty() {
            return Err(ScalingRangeError::Empty);
        }
        Ok(Self { bounds })
    }

    /// The calibration table shipped with the trained activity model.
    pub fn builtin() -> Self {
        let bounds = CALIBRATION_BOUNDS
            .iter()
            .enumerate()
            .map(|(i, &(min, max))| (i + 1, FeatureBounds { min, max }))
            .collect();
        Self { bounds }
    }

    /// Parse a JSON object of `"index": [min, max]` pairs.
    pub fn from_json(json: &str) -> Result<Self, ScalingRangeError> {
        let raw: BTreeMap<String, (f64, f64)> =
            serde_json::from_str(json).map_err(|e| ScalingRangeError::Parse(e.to_string()))?;

        let mut entries = Vec::with_capacity(raw.len());
        for (key, (min, max)) in raw {
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| ScalingRangeError::InvalidIndex(key.clone()))?;
            entries.push((index, FeatureBounds { min, max }));
        }
        Self::new(entries)
    }

    /// Load a JSON calibration table from disk.
    pub fn load(path: &Path) -> Result<Self, ScalingRangeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ScalingRangeError::Io(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Fit per-feature bounds to a set of vectors, column by column.
    ///
    /// A column whose values are all equal gets a unit span starting at that
    /// value, so it scales to the lower bound instead of dividing by zero.
    pub fn fit(vectors: &[FeatureVector]) -> Result<Self, ScalingRangeError> {
        let columns = vectors.iter().map(FeatureVector::len).max().unwrap_or(0);
        let mut entries = Vec::with_capacity(columns);
        for column in 0..columns {
            let values: Vec<f64> = vectors
                .iter()
                .filter_map(|v| v.values().get(column).copied())
                .collect();
            let min = Statistics::min(&values);
            let max = Statistics::max(&values);
            let max = if max == min { min + 1.0 } else { max };
            entries.push((column + 1, FeatureBounds { min, max }));
        }
        Self::new(entries)
    }

    /// Serialize in the same shape `from_json` accepts.
    pub fn to_json(&self) -> String {
        let raw: BTreeMap<String, (f64, f64)> = self
            .bounds
            .iter()
            .map(|(i, b)| (i.to_string(), (b.min, b.max)))
            .collect();
        serde_json::to_string_pretty(&raw).unwrap_or_default()
    }

    /// Bounds for a 1-based feature index.
    pub fn get(&self, index: usize) -> Option<FeatureBounds> {
        self.bounds.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

impl Default for ScalingRange {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Maps a feature vector into the classifier's input range.
pub trait FeatureScaler: Send + Sync {
    fn scale(&self, features: &FeatureVector) -> FeatureVector;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Static calibration-table scaling.
///
/// Features whose index has no table entry are dropped from the output.
#[derive(Debug, Clone, Default)]
pub struct StaticScaler {
    range: ScalingRange,
}

impl StaticScaler {
    pub fn new(range: ScalingRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> &ScalingRange {
        &self.range
    }
}

impl FeatureScaler for StaticScaler {
    fn scale(&self, features: &FeatureVector) -> FeatureVector {
        features
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| {
                self.range
                    .get(i + 1)
                    .map(|b| ((v - b.min) / (b.max - b.min)) * (UPPER - LOWER) + LOWER)
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Per-vector min/max scaling.
///
/// A vector whose values are all equal scales to all zeros.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicScaler;

impl FeatureScaler for DynamicScaler {
    fn scale(&self, features: &FeatureVector) -> FeatureVector {
        if features.is_empty() {
            return FeatureVector::default();
        }

        let min = Statistics::min(features.values());
        let max = Statistics::max(features.values());
        let span = max - min;

        if span == 0.0 {
            return vec![0.0; features.len()].into();
        }

        features
            .iter()
            .map(|&v| (UPPER - LOWER) * (v - min) / span + LOWER)
            .collect::<Vec<_>>()
            .into()
    }

    fn name(&self) -> &'static str {
        "dynamic"
    }
}

/// Which scaling strategy the pipeline runs with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStrategy {
    #[default]
    Static,
    Dynamic,
}

impl fmt::Display for ScalingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingStrategy::Static => f.write_str("static"),
            ScalingStrategy::Dynamic => f.write_str("dynamic"),
        }
    }
}

impl FromStr for ScalingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(ScalingStrategy::Static),
            "dynamic" => Ok(ScalingStrategy::Dynamic),
            other => Err(format!("unknown scaling strategy: {other}")),
        }
    }
}
