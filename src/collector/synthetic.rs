//! Synthetic motion generator.
//!
//! Produces periodic acceleration, gravity and angular-velocity readings
//! at a fixed rate so the pipeline can run without sensor hardware.

use crate::collector::types::{Channel, Sample, SensorEvent};
use crate::collector::{CollectorError, SampleSource, EVENT_QUEUE_CAPACITY};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const STANDARD_GRAVITY: f64 = 9.81;

/// Motion pattern to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticMotion {
    /// Device at rest
    Still,
    /// ~2 Hz gait
    Walking,
    /// ~3 Hz gait, larger amplitude
    Running,
}

impl SyntheticMotion {
    /// Gait frequency (Hz) and acceleration amplitude (m/s²).
    fn profile(self) -> (f64, f64) {
        match self {
            SyntheticMotion::Still => (0.0, 0.0),
            SyntheticMotion::Walking => (2.0, 2.5),
            SyntheticMotion::Running => (3.0, 8.0),
        }
    }
}

/// Configuration for the synthetic generator.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Samples per second, per channel
    pub sample_rate_hz: f64,
    pub motion: SyntheticMotion,
    /// Half-width of the uniform noise added to every component
    pub noise: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100.0,
            motion: SyntheticMotion::Walking,
            noise: 0.05,
        }
    }
}

/// A collector that emits generated motion on a background thread.
pub struct SyntheticCollector {
    config: SyntheticConfig,
    receiver: Receiver<SensorEvent>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticCollector {
    /// Create a new synthetic collector.
    pub fn new(config: SyntheticConfig) -> Self {
        let (_, receiver) = bounded(EVENT_QUEUE_CAPACITY);
        Self {
            config,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    /// Events discarded because the consumer fell behind.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl SampleSource for SyntheticCollector {
    fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        // Reap a generator that exited on its own.
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        let (sender, receiver) = bounded(EVENT_QUEUE_CAPACITY);
        self.receiver = receiver;
        self.running.store(true, Ordering::SeqCst);

        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let dropped = Arc::clone(&self.dropped);
        let handle = thread::Builder::new()
            .name("synthetic-collector".into())
            .spawn(move || generate(config, sender, running, dropped))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CollectorError::Spawn(e.to_string())
            })?;
        self.handle = Some(handle);

        tracing::info!(
            rate_hz = self.config.sample_rate_hz,
            motion = ?self.config.motion,
            "synthetic collector started"
        );
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

impl Drop for SyntheticCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn generate(
    config: SyntheticConfig,
    sender: Sender<SensorEvent>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) {
    let period = Duration::from_secs_f64(1.0 / config.sample_rate_hz.max(1.0));
    let (freq, amp) = config.motion.profile();
    let mut rng = rand::thread_rng();
    let mut step: u64 = 0;

    'outer: while running.load(Ordering::SeqCst) {
        let t = step as f64 / config.sample_rate_hz.max(1.0);
        let phase = 2.0 * PI * freq * t;

        let mut noise = || {
            if config.noise > 0.0 {
                rng.gen_range(-config.noise..config.noise)
            } else {
                0.0
            }
        };

        let readings = [
            (
                Channel::Acceleration,
                [
                    amp * phase.sin() + noise(),
                    0.5 * amp * (phase + PI / 2.0).sin() + noise(),
                    0.8 * amp * (2.0 * phase).sin() + noise(),
                ],
            ),
            (
                Channel::Gravity,
                [
                    0.04 * amp * phase.sin() + 0.1 * noise(),
                    STANDARD_GRAVITY - 0.02 * amp * phase.cos().abs() + 0.1 * noise(),
                    0.8 + 0.1 * noise(),
                ],
            ),
            (
                Channel::AngularVelocity,
                [
                    0.15 * amp * phase.cos() + noise(),
                    0.05 * amp * phase.sin() + noise(),
                    0.1 * amp * (2.0 * phase).cos() + noise(),
                ],
            ),
        ];

        for (channel, [x, y, z]) in readings {
            let event = SensorEvent::new(channel, Sample::new(x as f32, y as f32, z as f32));
            match sender.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => break 'outer,
            }
        }

        step += 1;
        thread::sleep(period);
    }

    running.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_emits_all_channels() {
        let mut collector = SyntheticCollector::new(SyntheticConfig {
            sample_rate_hz: 1000.0,
            motion: SyntheticMotion::Walking,
            noise: 0.0,
        });
        collector.start().unwrap();
        assert!(collector.is_running());

        let receiver = collector.receiver().clone();
        let mut seen = [false; Channel::COUNT];
        for _ in 0..30 {
            let event = receiver
                .recv_timeout(Duration::from_secs(1))
                .expect("generator should emit");
            seen[event.channel.index()] = true;
        }
        collector.stop();

        assert!(seen.iter().all(|s| *s));
        assert!(!collector.is_running());
    }

    #[test]
    fn test_start_twice_fails() {
        let mut collector = SyntheticCollector::new(SyntheticConfig::default());
        collector.start().unwrap();
        assert!(matches!(collector.start(), Err(CollectorError::AlreadyRunning)));
        collector.stop();
    }

    #[test]
    fn test_still_gravity_is_upright() {
        let mut collector = SyntheticCollector::new(SyntheticConfig {
            sample_rate_hz: 1000.0,
            motion: SyntheticMotion::Still,
            noise: 0.0,
        });
        collector.start().unwrap();
        let receiver = collector.receiver().clone();
        let gravity = loop {
            let event = receiver.recv_timeout(Duration::from_secs(1)).unwrap();
            if event.channel == Channel::Gravity {
                break event.sample;
            }
        };
        collector.stop();

        assert!((gravity.y() as f64 - STANDARD_GRAVITY).abs() < 1e-4);
        assert_eq!(gravity.x(), 0.0);
    }
}
