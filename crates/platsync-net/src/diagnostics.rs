//! Link diagnostics: a rolling window of ping samples and lifetime packet
//! counters.

use std::collections::VecDeque;

/// Default number of ping samples kept in the rolling window.
pub const DEFAULT_PING_HISTORY: usize = 20;

/// Below this many samples the link is assumed stable.
pub const MIN_SAMPLES_FOR_STABILITY: usize = 5;

/// A link is stable while jitter stays under this fraction of the average.
pub const STABILITY_JITTER_RATIO: f64 = 0.3;

/// Bounded FIFO of raw ping samples in milliseconds.
#[derive(Debug, Clone)]
pub struct PingHistory {
    samples: VecDeque<u32>,
    capacity: usize,
}

impl Default for PingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_PING_HISTORY)
    }
}

impl PingHistory {
    /// Create an empty window holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest at capacity.
    pub fn push(&mut self, ping_ms: u32) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(ping_ms);
    }

    /// Arithmetic mean of the window, 0 when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.samples.iter().map(|&s| u64::from(s)).sum();
        sum as f64 / self.samples.len() as f64
    }

    /// Population standard deviation of the window, 0 when empty.
    pub fn jitter(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let avg = self.average();
        let variance = self
            .samples
            .iter()
            .map(|&s| {
                let diff = f64::from(s) - avg;
                diff * diff
            })
            .sum::<f64>()
            / self.samples.len() as f64;
        variance.sqrt()
    }

    /// Whether jitter is small relative to the average latency.
    ///
    /// With fewer than [`MIN_SAMPLES_FOR_STABILITY`] samples there is not
    /// enough data to say otherwise, so the link counts as stable.
    pub fn is_stable(&self) -> bool {
        if self.samples.len() < MIN_SAMPLES_FOR_STABILITY {
            return true;
        }
        self.jitter() < self.average() * STABILITY_JITTER_RATIO
    }

    /// Number of samples in the window.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples oldest first.
    pub fn samples(&self) -> impl Iterator<Item = u32> + '_ {
        self.samples.iter().copied()
    }

    /// Drop every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Lifetime sent/received packet counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketCounters {
    pub sent: u64,
    pub received: u64,
}

impl PacketCounters {
    /// Fraction of sent packets that never came back (0.0 - 1.0).
    ///
    /// Received counts above the sent count (e.g. unsolicited server pushes)
    /// are capped so the rate never goes negative.
    pub fn loss_rate(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        1.0 - self.received.min(self.sent) as f64 / self.sent as f64
    }
}
