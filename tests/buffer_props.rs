//! Property tests for window buffer capacity, readiness and contents.

use motion_activity_agent::collector::{Channel, Sample};
use motion_activity_agent::core::WindowBuffer;
use proptest::prelude::*;
use std::collections::VecDeque;

/// Reference model: append, then drop `stride` oldest once over capacity.
struct ModelChannel {
    samples: VecDeque<f32>,
}

impl ModelChannel {
    fn push(&mut self, value: f32, capacity: usize, stride: usize) {
        self.samples.push_back(value);
        if self.samples.len() > capacity {
            self.samples.drain(..stride);
        }
    }
}

proptest! {
    #[test]
    fn prop_length_bounded_and_matches_model(
        window in 1usize..24,
        stride in 1usize..12,
        appends in prop::collection::vec(0usize..3, 0..400)
    ) {
        let buffer = WindowBuffer::new(window, stride).unwrap();
        let capacity = window + stride;
        let mut model: Vec<ModelChannel> = (0..3)
            .map(|_| ModelChannel { samples: VecDeque::new() })
            .collect();

        for (i, &idx) in appends.iter().enumerate() {
            let channel = Channel::ALL[idx];
            let value = i as f32;
            buffer.push(channel, Sample::new(value, value, value));
            model[idx].push(value, capacity, stride);

            for c in Channel::ALL {
                let len = buffer.len(c);
                prop_assert!(len <= capacity);
                prop_assert_eq!(len, model[c.index()].samples.len());
            }

            let expected_ready = Channel::ALL.iter().all(|&c| buffer.len(c) >= window);
            prop_assert_eq!(buffer.is_ready(), expected_ready);
        }

        if buffer.is_ready() {
            let snapshot = buffer.snapshot().unwrap();
            for c in Channel::ALL {
                let got: Vec<f32> = snapshot.channel(c).iter().map(|s| s.x()).collect();
                let all = &model[c.index()].samples;
                let expected: Vec<f32> = all.iter().skip(all.len() - window).copied().collect();
                prop_assert_eq!(got, expected);
            }
        } else {
            prop_assert!(buffer.snapshot().is_err());
        }
    }

    #[test]
    fn prop_full_ring_stays_within_stride_of_capacity(
        window in 1usize..32,
        stride in 1usize..16,
        count in 1usize..300
    ) {
        let buffer = WindowBuffer::new(window, stride).unwrap();
        let capacity = window + stride;

        let mut filled = false;
        for i in 0..count {
            buffer.push(Channel::Gravity, Sample::new(i as f32, 0.0, 0.0));
            let len = buffer.len(Channel::Gravity);
            if filled {
                prop_assert!(len > capacity - stride && len <= capacity);
            } else {
                prop_assert_eq!(len, i + 1);
            }
            filled |= len == capacity;
        }
    }

    #[test]
    fn prop_malformed_samples_never_change_state(
        extra in prop::collection::vec(-100.0f32..100.0, 0..8)
    ) {
        prop_assume!(extra.len() != 3);

        let buffer = WindowBuffer::new(4, 2).unwrap();
        buffer.add_sample(Channel::Acceleration, &[1.0, 2.0, 3.0]).unwrap();

        prop_assert!(buffer.add_sample(Channel::Acceleration, &extra).is_err());
        prop_assert_eq!(buffer.len(Channel::Acceleration), 1);
    }
}
