//! Motion sample types shared by the collectors and the pipeline.
//!
//! A sample is three components captured at one instant for one channel.
//! Nothing else about the sensor reading (accuracy, sensor id) is kept.

use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three motion-sensor data streams.
///
/// The declaration order is the canonical feature order: acceleration,
/// gravity, angular velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Linear acceleration (gravity removed), m/s²
    Acceleration,
    /// Gravity vector, m/s²
    Gravity,
    /// Gyroscope angular velocity, rad/s
    AngularVelocity,
}

impl Channel {
    /// Number of channels in the pipeline.
    pub const COUNT: usize = 3;

    /// All channels in canonical order.
    pub const ALL: [Channel; Channel::COUNT] =
        [Channel::Acceleration, Channel::Gravity, Channel::AngularVelocity];

    /// Position of this channel in the canonical order.
    pub fn index(self) -> usize {
        match self {
            Channel::Acceleration => 0,
            Channel::Gravity => 1,
            Channel::AngularVelocity => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Acceleration => "acceleration",
            Channel::Gravity => "gravity",
            Channel::AngularVelocity => "angular_velocity",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "acceleration" | "accel" | "linear" => Ok(Channel::Acceleration),
            "gravity" => Ok(Channel::Gravity),
            "angular_velocity" | "gyro" | "gyroscope" => Ok(Channel::AngularVelocity),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// A single 3-axis reading. Immutable once created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    x: f32,
    y: f32,
    z: f32,
}

impl Sample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Build a sample from raw sensor values.
    ///
    /// Fails with `InvalidSampleShape` unless exactly three values are given.
    pub fn from_slice(values: &[f32]) -> PipelineResult<Self> {
        match *values {
            [x, y, z] => Ok(Self { x, y, z }),
            _ => Err(PipelineError::InvalidSampleShape {
                actual: values.len(),
            }),
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn z(&self) -> f32 {
        self.z
    }

    /// Components as `[x, y, z]`.
    pub fn components(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// A sample tagged with its channel and capture time.
///
/// This is the unit collectors emit and recordings store, one JSON object
/// per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    pub channel: Channel,
    pub timestamp: DateTime<Utc>,
    pub sample: Sample,
}

impl SensorEvent {
    /// Create an event stamped with the current time.
    pub fn new(channel: Channel, sample: Sample) -> Self {
        Self {
            channel,
            timestamp: Utc::now(),
            sample,
        }
    }

    pub fn at(channel: Channel, timestamp: DateTime<Utc>, sample: Sample) -> Self {
        Self {
            channel,
            timestamp,
            sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_from_slice() {
        let sample = Sample::from_slice(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(sample.components(), [1.0, 2.0, 3.0]);

        assert_eq!(
            Sample::from_slice(&[1.0, 2.0]),
            Err(PipelineError::InvalidSampleShape { actual: 2 })
        );
        assert_eq!(
            Sample::from_slice(&[1.0, 2.0, 3.0, 4.0]),
            Err(PipelineError::InvalidSampleShape { actual: 4 })
        );
    }

    #[test]
    fn test_channel_order_and_parsing() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), *channel);
        }
        assert_eq!("gyro".parse::<Channel>().unwrap(), Channel::AngularVelocity);
        assert!("magnetometer".parse::<Channel>().is_err());
    }

    #[test]
    fn test_event_json_line() {
        let event = SensorEvent::new(Channel::AngularVelocity, Sample::new(0.5, -0.25, 1.0));
        let line = serde_json::to_string(&event).unwrap();
        assert!(line.contains("\"channel\":\"angular_velocity\""));

        let parsed: SensorEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, event);
    }
}
