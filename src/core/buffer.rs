//! Per-channel sliding-window sample buffers.
//!
//! Each channel keeps up to `window_size + stride` samples in a fixed ring.
//! When an append would overflow that capacity the `stride` oldest samples
//! are dropped in one batch, so the window advances by `stride` samples at a
//! time instead of one. Readers only ever see owned copies.

use crate::collector::types::{Channel, Sample};
use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

/// Fixed-capacity ring of samples for one channel.
#[derive(Debug)]
struct SampleRing {
    slots: Vec<Sample>,
    head: usize,
    len: usize,
    stride: usize,
}

impl SampleRing {
    fn new(capacity: usize, stride: usize) -> Self {
        Self {
            slots: vec![Sample::default(); capacity],
            head: 0,
            len: 0,
            stride,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Append one sample.
    ///
    /// Evicting `stride` samples when the ring is full before writing leaves
    /// the same state as appending past capacity and then evicting.
    fn push(&mut self, sample: Sample) {
        let capacity = self.capacity();
        if self.len == capacity {
            self.head = (self.head + self.stride) % capacity;
            self.len -= self.stride;
        }
        let tail = (self.head + self.len) % capacity;
        self.slots[tail] = sample;
        self.len += 1;
    }

    /// The `count` most recent samples, oldest first.
    fn latest(&self, count: usize) -> Vec<Sample> {
        let capacity = self.capacity();
        let start = self.len - count;
        (start..self.len)
            .map(|i| self.slots[(self.head + i) % capacity])
            .collect()
    }

    fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

/// Thread-safe window buffer covering all three channels.
///
/// Each channel has its own lock, held for the whole of an append and for the
/// whole copy of that channel during a snapshot.
#[derive(Debug)]
pub struct WindowBuffer {
    window_size: usize,
    stride: usize,
    channels: [Mutex<SampleRing>; Channel::COUNT],
}

/// Largest per-channel ring a buffer will preallocate.
pub const MAX_CAPACITY: usize = 1 << 20;

/// Ring capacity for a window geometry, or `InvalidWindow` when either side is
/// zero or the sum does not fit under [`MAX_CAPACITY`].
pub fn checked_capacity(window_size: usize, stride: usize) -> PipelineResult<usize> {
    match window_size.checked_add(stride) {
        Some(capacity) if window_size > 0 && stride > 0 && capacity <= MAX_CAPACITY => {
            Ok(capacity)
        }
        _ => Err(PipelineError::InvalidWindow { window_size, stride }),
    }
}

impl WindowBuffer {
    /// Create a buffer holding windows of `window_size` samples that advance by
    /// `stride` samples.
    pub fn new(window_size: usize, stride: usize) -> PipelineResult<Self> {
        let capacity = checked_capacity(window_size, stride)?;
        Ok(Self {
            window_size,
            stride,
            channels: std::array::from_fn(|_| Mutex::new(SampleRing::new(capacity, stride))),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Maximum number of samples held per channel.
    pub fn capacity(&self) -> usize {
        self.window_size + self.stride
    }

    /// Append raw sensor values to a channel.
    ///
    /// A value slice that is not exactly three long is rejected and the buffer
    /// is left untouched.
    pub fn add_sample(&self, channel: Channel, values: &[f32]) -> PipelineResult<()> {
        let sample = Sample::from_slice(values).map_err(|e| {
            tracing::warn!(%channel, error = %e, "rejected sample");
            e
        })?;
        self.push(channel, sample);
        Ok(())
    }

    /// Append a typed sample to a channel.
    pub fn push(&self, channel: Channel, sample: Sample) {
        self.ring(channel).push(sample);
    }

    /// Number of samples currently held for a channel.
    pub fn len(&self, channel: Channel) -> usize {
        self.ring(channel).len
    }

    /// True when no channel holds any sample.
    pub fn is_empty(&self) -> bool {
        Channel::ALL.iter().all(|&c| self.len(c) == 0)
    }

    /// True iff every channel holds at least `window_size` samples.
    pub fn is_ready(&self) -> bool {
        Channel::ALL.iter().all(|&c| self.len(c) >= self.window_size)
    }

    /// Copy the most recent window of every channel.
    ///
    /// Once a channel holds a full window it never drops below one again
    /// (eviction leaves `window_size + 1` samples), so checking each channel
    /// under its own lock is enough.
    pub fn snapshot(&self) -> PipelineResult<WindowSnapshot> {
        let mut channels: [Vec<Sample>; Channel::COUNT] = Default::default();
        for channel in Channel::ALL {
            let ring = self.ring(channel);
            if ring.len < self.window_size {
                return Err(PipelineError::BufferNotReady {
                    channel,
                    available: ring.len,
                    required: self.window_size,
                });
            }
            channels[channel.index()] = ring.latest(self.window_size);
        }

        Ok(WindowSnapshot {
            captured_at: Utc::now(),
            channels,
        })
    }

    /// Drop every buffered sample on all channels.
    pub fn reset(&self) {
        for channel in Channel::ALL {
            self.ring(channel).clear();
        }
    }

    fn ring(&self, channel: Channel) -> MutexGuard<'_, SampleRing> {
        // Ring operations cannot panic half-way, so a poisoned lock still
        // guards a consistent ring.
        self.channels[channel.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Owned point-in-time copy of one window per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    captured_at: DateTime<Utc>,
    channels: [Vec<Sample>; Channel::COUNT],
}

impl WindowSnapshot {
    /// Build a snapshot from per-channel windows given in canonical order.
    pub fn from_channels(channels: [Vec<Sample>; Channel::COUNT]) -> Self {
        Self {
            captured_at: Utc::now(),
            channels,
        }
    }

    /// Samples of one channel, oldest first.
    pub fn channel(&self, channel: Channel) -> &[Sample] {
        &self.channels[channel.index()]
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Window length of the acceleration channel (all channels match when
    /// taken from a [`WindowBuffer`]).
    pub fn window_size(&self) -> usize {
        self.channels[0].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(v: f32) -> Sample {
        Sample::new(v, v, v)
    }

    fn fill_all(buffer: &WindowBuffer, values: impl IntoIterator<Item = f32> + Clone) {
        for channel in Channel::ALL {
            for v in values.clone() {
                buffer.push(channel, seq(v));
            }
        }
    }

    #[test]
    fn test_rejects_degenerate_geometry() {
        assert!(WindowBuffer::new(0, 1).is_err());
        assert!(WindowBuffer::new(4, 0).is_err());
        assert_eq!(WindowBuffer::new(4, 2).unwrap().capacity(), 6);
    }

    #[test]
    fn test_rejects_oversized_geometry() {
        assert_eq!(
            WindowBuffer::new(usize::MAX, 2).unwrap_err(),
            PipelineError::InvalidWindow {
                window_size: usize::MAX,
                stride: 2
            }
        );
        assert!(WindowBuffer::new(MAX_CAPACITY, 1).is_err());
        assert_eq!(checked_capacity(MAX_CAPACITY - 1, 1), Ok(MAX_CAPACITY));
    }

    #[test]
    fn test_stride_eviction() {
        let buffer = WindowBuffer::new(4, 2).unwrap();
        for i in 0..6 {
            buffer.push(Channel::Acceleration, seq(i as f32));
        }
        // Exactly at capacity: nothing evicted yet.
        assert_eq!(buffer.len(Channel::Acceleration), 6);

        // One past capacity drops `stride` oldest in a single batch.
        buffer.push(Channel::Acceleration, seq(6.0));
        assert_eq!(buffer.len(Channel::Acceleration), 5);

        buffer.push(Channel::Acceleration, seq(7.0));
        assert_eq!(buffer.len(Channel::Acceleration), 6);
        buffer.push(Channel::Acceleration, seq(8.0));
        assert_eq!(buffer.len(Channel::Acceleration), 5);

        let ring = buffer.ring(Channel::Acceleration);
        let held: Vec<f32> = ring.latest(ring.len).iter().map(|s| s.x()).collect();
        assert_eq!(held, vec![4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_readiness_requires_every_channel() {
        let buffer = WindowBuffer::new(3, 1).unwrap();
        for v in 0..3 {
            buffer.push(Channel::Acceleration, seq(v as f32));
            buffer.push(Channel::Gravity, seq(v as f32));
        }
        assert!(!buffer.is_ready());
        assert!(matches!(
            buffer.snapshot(),
            Err(PipelineError::BufferNotReady {
                channel: Channel::AngularVelocity,
                available: 0,
                required: 3
            })
        ));

        for v in 0..3 {
            buffer.push(Channel::AngularVelocity, seq(v as f32));
        }
        assert!(buffer.is_ready());
    }

    #[test]
    fn test_snapshot_is_latest_window_oldest_first() {
        let buffer = WindowBuffer::new(3, 2).unwrap();
        fill_all(&buffer, (0..9).map(|v| v as f32));

        let snapshot = buffer.snapshot().unwrap();
        for channel in Channel::ALL {
            let xs: Vec<f32> = snapshot.channel(channel).iter().map(|s| s.x()).collect();
            assert_eq!(xs, vec![6.0, 7.0, 8.0]);
        }
        assert_eq!(snapshot.window_size(), 3);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let buffer = WindowBuffer::new(2, 1).unwrap();
        fill_all(&buffer, [1.0, 2.0]);
        let snapshot = buffer.snapshot().unwrap();

        fill_all(&buffer, [3.0, 4.0, 5.0]);
        let xs: Vec<f32> = snapshot
            .channel(Channel::Gravity)
            .iter()
            .map(|s| s.x())
            .collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn test_invalid_shape_leaves_buffer_untouched() {
        let buffer = WindowBuffer::new(2, 1).unwrap();
        buffer.add_sample(Channel::Gravity, &[1.0, 2.0, 3.0]).unwrap();

        let err = buffer.add_sample(Channel::Gravity, &[1.0]).unwrap_err();
        assert_eq!(err, PipelineError::InvalidSampleShape { actual: 1 });
        assert_eq!(buffer.len(Channel::Gravity), 1);
    }

    #[test]
    fn test_reset_clears_all_channels() {
        let buffer = WindowBuffer::new(2, 1).unwrap();
        fill_all(&buffer, [1.0, 2.0, 3.0]);
        assert!(buffer.is_ready());

        buffer.reset();
        assert!(buffer.is_empty());
        assert!(!buffer.is_ready());
    }
}
