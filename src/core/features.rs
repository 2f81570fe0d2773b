//! Feature computation from sample windows.
//!
//! Each channel window is reduced to the mean and population variance of its
//! three axes. Variance is computed as `Σv²/n − mean²`; when the true variance
//! is close to zero the subtraction can cancel to a small negative number,
//! and that value is passed through unchanged.

use crate::collector::types::{Channel, Sample};
use crate::core::buffer::WindowSnapshot;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Features produced per channel.
pub const FEATURES_PER_CHANNEL: usize = 6;

/// Length of a full feature vector.
pub const FEATURE_VECTOR_LEN: usize = FEATURES_PER_CHANNEL * Channel::COUNT;

/// `[meanX, varX, meanY, varY, meanZ, varZ]` for one channel window.
pub type ChannelFeatures = [f64; FEATURES_PER_CHANNEL];

/// Ordered feature values. Position `i` is feature index `i + 1` in the
/// calibration table and in LibSVM output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    /// Render as LibSVM nodes: `1:v1 2:v2 ...`.
    pub fn to_libsvm_nodes(&self) -> String {
        self.0
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{}:{}", i + 1, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// Reduce one channel window to its six moments.
///
/// An empty window yields all zeros rather than an error.
pub fn extract_channel(samples: &[Sample]) -> ChannelFeatures {
    if samples.is_empty() {
        return [0.0; FEATURES_PER_CHANNEL];
    }

    let n = samples.len() as f64;
    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];

    for sample in samples {
        for (axis, value) in sample.components().iter().enumerate() {
            let v = *value as f64;
            sum[axis] += v;
            sum_sq[axis] += v * v;
        }
    }

    let mut features = [0.0; FEATURES_PER_CHANNEL];
    for axis in 0..3 {
        let mean = sum[axis] / n;
        features[axis * 2] = mean;
        features[axis * 2 + 1] = sum_sq[axis] / n - mean * mean;
    }
    features
}

/// Extract and concatenate features for every channel in canonical order
/// (acceleration, gravity, angular velocity).
pub fn extract(snapshot: &WindowSnapshot) -> FeatureVector {
    let mut values = Vec::with_capacity(FEATURE_VECTOR_LEN);
    for channel in Channel::ALL {
        values.extend_from_slice(&extract_channel(snapshot.channel(channel)));
    }
    FeatureVector(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::statistics::Statistics;

    const TOLERANCE: f64 = 1e-9;

    fn samples(points: &[(f32, f32, f32)]) -> Vec<Sample> {
        points.iter().map(|&(x, y, z)| Sample::new(x, y, z)).collect()
    }

    #[test]
    fn test_empty_window_is_zero() {
        assert_eq!(extract_channel(&[]), [0.0; 6]);
    }

    #[test]
    fn test_hand_computed_moments() {
        let window = samples(&[(1.0, 2.0, -1.0), (3.0, 2.0, 0.0), (5.0, 2.0, 4.0)]);
        let f = extract_channel(&window);

        // x: mean 3, E[x²] = 35/3 → var 8/3
        assert!((f[0] - 3.0).abs() < TOLERANCE);
        assert!((f[1] - 8.0 / 3.0).abs() < TOLERANCE);
        // y constant
        assert!((f[2] - 2.0).abs() < TOLERANCE);
        assert!(f[3].abs() < TOLERANCE);
        // z: mean 1, E[z²] = 17/3 → var 14/3
        assert!((f[4] - 1.0).abs() < TOLERANCE);
        assert!((f[5] - 14.0 / 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_matches_population_statistics() {
        let window = samples(&[
            (0.12, -9.7, 0.4),
            (0.35, -9.81, 0.1),
            (-0.2, -9.78, -0.3),
            (0.08, -9.9, 0.25),
            (0.5, -9.6, 0.0),
        ]);
        let f = extract_channel(&window);

        for axis in 0..3 {
            let values: Vec<f64> = window
                .iter()
                .map(|s| s.components()[axis] as f64)
                .collect();
            let mean = values.iter().mean();
            let variance = values.iter().population_variance();
            assert!((f[axis * 2] - mean).abs() < TOLERANCE);
            assert!((f[axis * 2 + 1] - variance).abs() < 1e-6);
        }
    }

    #[test]
    fn test_near_constant_window_keeps_raw_variance() {
        let value = 1234.567f32;
        let window = vec![Sample::new(value, value, value); 100];
        let f = extract_channel(&window);

        let v = value as f64;
        let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
        for _ in 0..window.len() {
            sum += v;
            sum_sq += v * v;
        }
        let mean = sum / 100.0;
        let raw = sum_sq / 100.0 - mean * mean;

        // Cancellation leaves a tiny negative value that must not be clamped.
        assert!(raw < 0.0);
        for axis in 0..3 {
            assert_eq!(f[axis * 2 + 1], raw);
            assert!(f[axis * 2 + 1] < 0.0);
        }
    }

    #[test]
    fn test_extract_channel_order() {
        let snapshot = WindowSnapshot::from_channels([
            samples(&[(1.0, 1.0, 1.0)]),
            samples(&[(2.0, 2.0, 2.0)]),
            samples(&[(3.0, 3.0, 3.0)]),
        ]);
        let features = extract(&snapshot);

        assert_eq!(features.len(), FEATURE_VECTOR_LEN);
        assert_eq!(features[0], 1.0); // acceleration meanX
        assert_eq!(features[6], 2.0); // gravity meanX
        assert_eq!(features[12], 3.0); // angular velocity meanX
    }

    #[test]
    fn test_libsvm_nodes() {
        let features = FeatureVector::new(vec![0.5, -1.0, 0.25]);
        assert_eq!(features.to_libsvm_nodes(), "1:0.5 2:-1 3:0.25");
    }
}
