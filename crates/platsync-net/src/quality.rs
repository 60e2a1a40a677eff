//! Network quality classification shared by the connection monitor and the
//! sync engine.
//!
//! Both consumers rate a link from a latency figure and a packet-loss
//! fraction against the same [`QUALITY_TIERS`] table, so a given measurement
//! always gets the same rating regardless of who measured it.

use serde::{Deserialize, Serialize};

/// Coarse rating of a network link, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityRating {
    /// Lowercase label for UI display.
    pub fn as_str(self) -> &'static str {
        match self {
            QualityRating::Excellent => "excellent",
            QualityRating::Good => "good",
            QualityRating::Fair => "fair",
            QualityRating::Poor => "poor",
        }
    }
}

impl std::fmt::Display for QualityRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds (inclusive) a link must meet to earn `rating`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityTier {
    pub rating: QualityRating,
    /// Maximum latency in milliseconds.
    pub max_latency_ms: f64,
    /// Maximum packet loss as a fraction (0.0 - 1.0).
    pub max_packet_loss: f64,
}

/// Tiers checked in order; a link failing all of them is [`QualityRating::Poor`].
pub const QUALITY_TIERS: [QualityTier; 3] = [
    QualityTier {
        rating: QualityRating::Excellent,
        max_latency_ms: 50.0,
        max_packet_loss: 0.01,
    },
    QualityTier {
        rating: QualityRating::Good,
        max_latency_ms: 100.0,
        max_packet_loss: 0.05,
    },
    QualityTier {
        rating: QualityRating::Fair,
        max_latency_ms: 200.0,
        max_packet_loss: 0.15,
    },
];

/// Rate a link. Both the latency and the loss bound of a tier must hold.
pub fn classify(latency_ms: f64, packet_loss: f64) -> QualityRating {
    QUALITY_TIERS
        .iter()
        .find(|tier| latency_ms <= tier.max_latency_ms && packet_loss <= tier.max_packet_loss)
        .map_or(QualityRating::Poor, |tier| tier.rating)
}

/// Anything that can report a latency and a loss figure for classification.
pub trait NetworkQuality {
    /// Latency estimate in milliseconds.
    fn latency_ms(&self) -> f64;

    /// Packet loss as a fraction (0.0 - 1.0).
    fn packet_loss(&self) -> f64;

    /// Rating from the shared tier table.
    fn quality(&self) -> QualityRating {
        classify(self.latency_ms(), self.packet_loss())
    }
}
