//! Connection-quality management: shared quality tiers, ping and packet
//! diagnostics, reconnect backoff, and the [`ConnectionMonitor`] state
//! machine with its async driver.

pub mod diagnostics;
pub mod driver;
pub mod monitor;
pub mod quality;
pub mod reconnection;

pub use diagnostics::{PacketCounters, PingHistory};
pub use driver::{SharedMonitor, TokioClock, drive};
pub use monitor::{
    ConnectionMonitor, ConnectionQuality, ConnectionState, MonitorConfig, MonitorStats,
};
pub use quality::{NetworkQuality, QUALITY_TIERS, QualityRating, QualityTier, classify};
pub use reconnection::{BackoffConfig, ReconnectBackoff};
