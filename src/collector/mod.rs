//! Sample sources for the pipeline.
//!
//! Collectors run on their own thread and emit [`SensorEvent`]s over a
//! bounded channel. Two sources exist: a replayer for JSON-lines recordings
//! and a synthetic motion generator for running without hardware.

pub mod replay;
pub mod synthetic;
pub mod types;

use crossbeam_channel::Receiver;
use thiserror::Error;

// Re-export commonly used types
pub use replay::{load_recording, read_recording, ReplayCollector, ReplayConfig};
pub use synthetic::{SyntheticCollector, SyntheticConfig, SyntheticMotion};
pub use types::{Channel, Sample, SensorEvent};

/// Capacity of the event queue between a collector thread and its consumer.
pub const EVENT_QUEUE_CAPACITY: usize = 10_000;

/// Errors that can occur during sample collection.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("collector is already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("recording line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("failed to spawn collector thread: {0}")]
    Spawn(String),
}

/// A producer of motion samples.
pub trait SampleSource: Send {
    /// Start emitting events.
    fn start(&mut self) -> Result<(), CollectorError>;

    /// Stop emitting events and wait for the producer thread to exit.
    fn stop(&mut self);

    /// Check if the source is currently emitting.
    fn is_running(&self) -> bool;

    /// Receiver for emitted events. Disconnects once the producer exits.
    fn receiver(&self) -> &Receiver<SensorEvent>;
}
