//! Rolling latency/jitter estimate kept by the sync engine.

use platsync_net::NetworkQuality;
use serde::{Deserialize, Serialize};

/// Weight given to each new sample in the moving averages.
pub const STATS_SMOOTHING: f64 = 0.2;

/// Exponential moving averages of latency and jitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Latency EMA in milliseconds.
    pub latency: f64,
    /// EMA of |sample − latency| in milliseconds.
    pub jitter: f64,
    /// Reserved; the sync engine does not measure loss.
    pub packet_loss: f64,
    /// Clock time of the last update in milliseconds.
    pub last_update_time: u64,
}

impl NetworkStats {
    /// Fold in one latency sample taken at `now_ms`.
    ///
    /// Jitter is measured against the average *after* it absorbs the sample.
    pub fn record(&mut self, latency_ms: f64, now_ms: u64) {
        self.latency = self.latency * (1.0 - STATS_SMOOTHING) + latency_ms * STATS_SMOOTHING;
        let deviation = (latency_ms - self.latency).abs();
        self.jitter = self.jitter * (1.0 - STATS_SMOOTHING) + deviation * STATS_SMOOTHING;
        self.last_update_time = now_ms;
    }
}

impl NetworkQuality for NetworkStats {
    fn latency_ms(&self) -> f64 {
        self.latency
    }

    fn packet_loss(&self) -> f64 {
        self.packet_loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platsync_net::QualityRating;

    #[test]
    fn test_first_sample_moves_a_fifth_of_the_way() {
        let mut stats = NetworkStats::default();
        stats.record(100.0, 5);
        assert!((stats.latency - 20.0).abs() < 1e-9);
        // |100 - 20| * 0.2
        assert!((stats.jitter - 16.0).abs() < 1e-9);
        assert_eq!(stats.last_update_time, 5);
    }

    #[test]
    fn test_converges_on_steady_latency() {
        let mut stats = NetworkStats::default();
        for t in 0..100 {
            stats.record(80.0, t);
        }
        assert!((stats.latency - 80.0).abs() < 0.01);
        assert!(stats.jitter < 0.1);
        assert_eq!(stats.quality(), QualityRating::Good);
    }
}
