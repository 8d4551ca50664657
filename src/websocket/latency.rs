//! Rolling window of message-processing latencies

use std::collections::VecDeque;
use std::time::Duration;

/// Default number of samples kept
pub const DEFAULT_LATENCY_WINDOW: usize = 1000;

/// Fixed-capacity ring of latency samples; the oldest sample is evicted first
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    samples: VecDeque<Duration>,
    capacity: usize,
    total: Duration,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LATENCY_WINDOW)
    }
}

impl LatencyTracker {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            total: Duration::ZERO,
        }
    }

    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                self.total -= evicted;
            }
        }
        self.samples.push_back(sample);
        self.total += sample;
    }

    /// Arithmetic mean of the samples in the window
    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.total / self.samples.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
