//! Server reconciliation: pull a client prediction toward the server's
//! authoritative state when the two drift apart.
//!
//! Drift below the threshold is left alone so imperceptible differences
//! never cause a visible snap. Larger drift moves the position a fixed
//! fraction of the way to the server; velocity, scale and timestamp always
//! come from the server.

use crate::interpolation::lerp;
use crate::snapshot::PlayerStateSnapshot;

/// Distance (px) below which the client prediction is kept as-is.
pub const DEFAULT_RECONCILIATION_THRESHOLD: f64 = 10.0;

/// Fraction of the client→server gap closed per correction.
pub const RECONCILIATION_SMOOTHING: f64 = 0.3;

/// Reconcile a predicted `client` state with the authoritative `server` state.
pub fn reconcile_state(
    client: &PlayerStateSnapshot,
    server: &PlayerStateSnapshot,
    threshold: f64,
) -> PlayerStateSnapshot {
    let distance = client.distance_to(server);
    if distance < threshold {
        return *client;
    }

    tracing::trace!(distance, threshold, "correcting prediction toward server");
    PlayerStateSnapshot {
        x: lerp(client.x, server.x, RECONCILIATION_SMOOTHING),
        y: lerp(client.y, server.y, RECONCILIATION_SMOOTHING),
        ..*server
    }
}
