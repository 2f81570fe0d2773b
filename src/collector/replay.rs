//! Replay of recorded sensor sessions.
//!
//! A recording is a JSON-lines file with one [`SensorEvent`] per line. The
//! replayer emits events in file order, either as fast as the consumer
//! drains them or paced by the recorded timestamps.

use crate::collector::types::SensorEvent;
use crate::collector::{CollectorError, SampleSource, EVENT_QUEUE_CAPACITY};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Longest pause honoured between two recorded events when pacing.
const MAX_REPLAY_GAP: Duration = Duration::from_secs(1);

/// How long a blocked send waits before re-checking the stop flag.
const SEND_POLL: Duration = Duration::from_millis(100);

/// Configuration for the replay collector.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Path to the JSON-lines recording
    pub path: PathBuf,
    /// Reproduce recorded inter-event timing
    pub realtime: bool,
}

impl ReplayConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            realtime: true,
        }
    }
}

/// Parse a JSON-lines recording. Blank lines are skipped.
pub fn read_recording<R: BufRead>(reader: R) -> Result<Vec<SensorEvent>, CollectorError> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: SensorEvent =
            serde_json::from_str(trimmed).map_err(|e| CollectorError::Parse {
                line: idx + 1,
                message: e.to_string(),
            })?;
        events.push(event);
    }
    Ok(events)
}

/// Load a recording from disk.
pub fn load_recording(path: &Path) -> Result<Vec<SensorEvent>, CollectorError> {
    let file = std::fs::File::open(path)?;
    read_recording(std::io::BufReader::new(file))
}

/// A collector that replays a recording on a background thread.
///
/// The receiver disconnects once the whole recording has been emitted.
pub struct ReplayCollector {
    config: ReplayConfig,
    receiver: Receiver<SensorEvent>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReplayCollector {
    pub fn new(config: ReplayConfig) -> Self {
        let (_, receiver) = bounded(EVENT_QUEUE_CAPACITY);
        Self {
            config,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl SampleSource for ReplayCollector {
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        // Parse up front so a bad recording fails the start call.
        let events = load_recording(&self.config.path)?;
        tracing::info!(
            path = %self.config.path.display(),
            events = events.len(),
            "replaying recording"
        );

        let (sender, receiver) = bounded(EVENT_QUEUE_CAPACITY);
        self.receiver = receiver;
        self.running.store(true, Ordering::SeqCst);

        let realtime = self.config.realtime;
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name("replay-collector".into())
            .spawn(move || replay(events, sender, running, realtime))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CollectorError::Spawn(e.to_string())
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> &Receiver<SensorEvent> {
        &self.receiver
    }
}

impl Drop for ReplayCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn replay(
    events: Vec<SensorEvent>,
    sender: Sender<SensorEvent>,
    running: Arc<AtomicBool>,
    realtime: bool,
) {
    let mut previous: Option<DateTime<Utc>> = None;

    'events: for event in events {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        if realtime {
            if let Some(prev) = previous {
                let gap = (event.timestamp - prev)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(MAX_REPLAY_GAP);
                if !gap.is_zero() {
                    thread::sleep(gap);
                }
            }
            previous = Some(event.timestamp);
        }

        let mut pending = event;
        loop {
            match sender.send_timeout(pending, SEND_POLL) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(event)) => {
                    if !running.load(Ordering::SeqCst) {
                        break 'events;
                    }
                    pending = event;
                }
                Err(SendTimeoutError::Disconnected(_)) => break 'events,
            }
        }
    }

    running.store(false, Ordering::SeqCst);
}
