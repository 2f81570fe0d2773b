//! Session counters for the pipeline.
//!
//! Tracks how many samples each channel ingested and what every orchestrator
//! tick did, without storing any sample data.

use crate::collector::types::Channel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lock-free counters shared between ingestion and the orchestrator.
#[derive(Debug)]
pub struct SessionLog {
    /// Samples ingested, indexed by canonical channel position
    samples: [AtomicU64; Channel::COUNT],
    /// Ticks skipped because the buffer was still warming up
    ticks_skipped: AtomicU64,
    /// Ticks that failed in extraction, scaling or inference
    ticks_failed: AtomicU64,
    /// Labels delivered to the result sink
    classifications_published: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            samples: Default::default(),
            ticks_skipped: AtomicU64::new(0),
            ticks_failed: AtomicU64::new(0),
            classifications_published: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that resumes from, and saves to, `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("could not load previous session stats: {e}");
        }

        log
    }

    pub fn record_sample(&self, channel: Channel) {
        self.samples[channel.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick_skipped(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick_failed(&self) {
        self.ticks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_classification(&self) {
        self.classifications_published
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionStats {
        let load = |c: Channel| self.samples[c.index()].load(Ordering::Relaxed);
        SessionStats {
            acceleration_samples: load(Channel::Acceleration),
            gravity_samples: load(Channel::Gravity),
            angular_velocity_samples: load(Channel::AngularVelocity),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            ticks_failed: self.ticks_failed.load(Ordering::Relaxed),
            classifications_published: self.classifications_published.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Acceleration samples: {}\n\
             - Gravity samples: {}\n\
             - Angular velocity samples: {}\n\
             - Ticks skipped (warming up): {}\n\
             - Ticks failed: {}\n\
             - Classifications published: {}\n\
             - Session duration: {} seconds",
            stats.acceleration_samples,
            stats.gravity_samples,
            stats.angular_velocity_samples,
            stats.ticks_skipped,
            stats.ticks_failed,
            stats.classifications_published,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                acceleration_samples: stats.acceleration_samples,
                gravity_samples: stats.gravity_samples,
                angular_velocity_samples: stats.angular_velocity_samples,
                ticks_skipped: stats.ticks_skipped,
                ticks_failed: stats.ticks_failed,
                classifications_published: stats.classifications_published,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                let counts = [
                    (Channel::Acceleration, persisted.acceleration_samples),
                    (Channel::Gravity, persisted.gravity_samples),
                    (Channel::AngularVelocity, persisted.angular_velocity_samples),
                ];
                for (channel, count) in counts {
                    self.samples[channel.index()].store(count, Ordering::Relaxed);
                }
                self.ticks_skipped
                    .store(persisted.ticks_skipped, Ordering::Relaxed);
                self.ticks_failed
                    .store(persisted.ticks_failed, Ordering::Relaxed);
                self.classifications_published
                    .store(persisted.classifications_published, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in &self.samples {
            counter.store(0, Ordering::Relaxed);
        }
        self.ticks_skipped.store(0, Ordering::Relaxed);
        self.ticks_failed.store(0, Ordering::Relaxed);
        self.classifications_published.store(0, Ordering::Relaxed);
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub acceleration_samples: u64,
    pub gravity_samples: u64,
    pub angular_velocity_samples: u64,
    pub ticks_skipped: u64,
    pub ticks_failed: u64,
    pub classifications_published: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    acceleration_samples: u64,
    gravity_samples: u64,
    angular_velocity_samples: u64,
    ticks_skipped: u64,
    ticks_failed: u64,
    classifications_published: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared session log.
pub type SharedSessionLog = Arc<SessionLog>;

pub fn create_shared_log() -> SharedSessionLog {
    Arc::new(SessionLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedSessionLog {
    Arc::new(SessionLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let log = SessionLog::new();

        log.record_sample(Channel::Acceleration);
        log.record_sample(Channel::Acceleration);
        log.record_sample(Channel::AngularVelocity);
        log.record_tick_skipped();
        log.record_classification();

        let stats = log.stats();
        assert_eq!(stats.acceleration_samples, 2);
        assert_eq!(stats.gravity_samples, 0);
        assert_eq!(stats.angular_velocity_samples, 1);
        assert_eq!(stats.ticks_skipped, 1);
        assert_eq!(stats.classifications_published, 1);
    }

    #[test]
    fn test_reset() {
        let log = SessionLog::new();
        log.record_sample(Channel::Gravity);
        log.record_tick_failed();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.gravity_samples, 0);
        assert_eq!(stats.ticks_failed, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("motion-stats-{}", uuid::Uuid::new_v4()))
            .join("session_stats.json");

        let log = SessionLog::with_persistence(path.clone());
        log.record_sample(Channel::Gravity);
        log.record_classification();
        log.save().unwrap();

        let resumed = SessionLog::with_persistence(path.clone());
        let stats = resumed.stats();
        assert_eq!(stats.gravity_samples, 1);
        assert_eq!(stats.classifications_published, 1);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_summary_format() {
        let summary = SessionLog::new().summary();
        assert!(summary.contains("Acceleration samples"));
        assert!(summary.contains("Ticks failed"));
        assert!(summary.contains("Classifications published"));
    }
}
