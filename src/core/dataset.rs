//! Offline featurization of complete recordings.
//!
//! Produces the training rows the classifier is built from: the recording is
//! cut into windows stepping by `stride` samples, each window is reduced with
//! the same extraction and scaling as the live pipeline, and rows render as
//! LibSVM text (`label 1:v1 2:v2 ...`).
//!
//! [`featurize_fitted`] instead fits per-column bounds to the recording's own
//! features, the way training sets are built, and returns the fitted table so
//! it can be shipped as the live calibration.

use crate::collector::replay::load_recording;
use crate::collector::types::{Channel, Sample, SensorEvent};
use crate::collector::CollectorError;
use crate::core::buffer::WindowSnapshot;
use crate::core::features::{self, FeatureVector};
use crate::core::scaling::{FeatureScaler, ScalingRange, StaticScaler};
use crate::error::{PipelineError, PipelineResult};
use std::fmt;
use std::io::{self, Write};
use std::path::Path;

/// Every sample of a session, split by channel in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    channels: [Vec<Sample>; Channel::COUNT],
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = SensorEvent>,
    {
        let mut recording = Self::new();
        for event in events {
            recording.push(event.channel, event.sample);
        }
        recording
    }

    /// Load a JSON-lines recording.
    pub fn load(path: &Path) -> Result<Self, CollectorError> {
        Ok(Self::from_events(load_recording(path)?))
    }

    pub fn push(&mut self, channel: Channel, sample: Sample) {
        self.channels[channel.index()].push(sample);
    }

    pub fn channel(&self, channel: Channel) -> &[Sample] {
        &self.channels[channel.index()]
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.channels[channel.index()].len()
    }

    /// Samples usable for windowing: the length of the shortest channel.
    pub fn aligned_len(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(Vec::is_empty)
    }
}

/// Cut a recording into windows of `window_size` samples starting every
/// `stride` samples.
///
/// Window starts run over `0..aligned_len - window_size`, exclusive, so a
/// window ending exactly at the last sample is not emitted. This matches how
/// the training set was produced.
pub fn sliding_windows(
    recording: &Recording,
    window_size: usize,
    stride: usize,
) -> PipelineResult<Vec<WindowSnapshot>> {
    if window_size == 0 || stride == 0 {
        return Err(PipelineError::InvalidWindow {
            window_size,
            stride,
        });
    }

    let end = recording.aligned_len().saturating_sub(window_size);
    let windows = (0..end)
        .step_by(stride)
        .map(|start| {
            WindowSnapshot::from_channels(Channel::ALL.map(|channel| {
                recording.channel(channel)[start..start + window_size].to_vec()
            }))
        })
        .collect();

    Ok(windows)
}

/// One labelled training row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub label: u8,
    pub features: FeatureVector,
}

impl fmt::Display for FeatureRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.features.is_empty() {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{} {}", self.label, self.features.to_libsvm_nodes())
        }
    }
}

/// Window, extract and scale a whole recording under one label.
pub fn featurize(
    recording: &Recording,
    label: u8,
    window_size: usize,
    stride: usize,
    scaler: &dyn FeatureScaler,
) -> PipelineResult<Vec<FeatureRow>> {
    let rows = sliding_windows(recording, window_size, stride)?
        .iter()
        .map(|window| FeatureRow {
            label,
            features: scaler.scale(&features::extract(window)),
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        rows = rows.len(),
        window_size,
        stride,
        scaler = scaler.name(),
        "featurized recording"
    );
    Ok(rows)
}

/// Rows scaled against bounds fitted to their own recording.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedRows {
    pub rows: Vec<FeatureRow>,
    pub range: ScalingRange,
}

/// Window and extract a whole recording, then scale every column to `[-1, 1]`
/// using that column's own min and max over all windows.
///
/// A recording too short for a single window has nothing to fit and fails
/// with [`PipelineError::Calibration`].
pub fn featurize_fitted(
    recording: &Recording,
    label: u8,
    window_size: usize,
    stride: usize,
) -> PipelineResult<FittedRows> {
    let raw: Vec<FeatureVector> = sliding_windows(recording, window_size, stride)?
        .iter()
        .map(features::extract)
        .collect();

    let range = ScalingRange::fit(&raw)?;
    let scaler = StaticScaler::new(range);
    let rows = raw
        .iter()
        .map(|features| FeatureRow {
            label,
            features: scaler.scale(features),
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        rows = rows.len(),
        window_size,
        stride,
        "featurized recording with fitted bounds"
    );
    Ok(FittedRows {
        rows,
        range: scaler.range().clone(),
    })
}

/// Write rows as LibSVM text, one per line.
pub fn write_libsvm<W: Write>(rows: &[FeatureRow], mut writer: W) -> io::Result<()> {
    for row in rows {
        writeln!(writer, "{row}")?;
    }
    writer.flush()
}
