//! Client-side multiplayer state synchronization: per-player snapshot
//! history, render-time interpolation, local prediction, server
//! reconciliation, and latency statistics.

pub mod entity;
pub mod interpolation;
pub mod prediction;
pub mod reconciliation;
pub mod snapshot;
pub mod stats;
pub mod sync;
pub mod wire;

pub use entity::{Avatar, KinematicBody, PhysicsBody, SyncEntity};
pub use interpolation::{interpolate, lerp};
pub use prediction::{InputBuffer, InputSample, PendingInput, PredictionConfig, predict_state};
pub use reconciliation::{RECONCILIATION_SMOOTHING, reconcile_state};
pub use snapshot::{PlayerId, PlayerStateSnapshot, StateHistory};
pub use stats::NetworkStats;
pub use sync::{MultiplayerSync, POSITION_INTERPOLATION_SMOOTHING, SyncConfig};
pub use wire::{StateMessage, WireError, decode_message, encode_message};
