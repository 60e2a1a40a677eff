//! Render-time interpolation between buffered snapshots.
//!
//! Remote players are drawn slightly in the past (the interpolation delay)
//! so there are usually two snapshots bracketing the render time. Position
//! and velocity blend linearly between them; scale is discrete and comes
//! from the older snapshot. Nothing is ever extrapolated.

use std::collections::VecDeque;

use crate::snapshot::PlayerStateSnapshot;

/// Default render delay behind the newest data, in milliseconds.
pub const DEFAULT_INTERPOLATION_DELAY_MS: u64 = 100;

/// Linear interpolation with `factor` clamped to `[0, 1]`.
pub fn lerp(a: f64, b: f64, factor: f64) -> f64 {
    let t = factor.clamp(0.0, 1.0);
    a * (1.0 - t) + b * t
}

/// Blend two snapshots at `factor`, stamping the result with `timestamp`.
pub fn blend(
    older: &PlayerStateSnapshot,
    newer: &PlayerStateSnapshot,
    factor: f64,
    timestamp: u64,
) -> PlayerStateSnapshot {
    PlayerStateSnapshot {
        x: lerp(older.x, newer.x, factor),
        y: lerp(older.y, newer.y, factor),
        velocity_x: lerp(older.velocity_x, newer.velocity_x, factor),
        velocity_y: lerp(older.velocity_y, newer.velocity_y, factor),
        scale_x: older.scale_x,
        scale_y: older.scale_y,
        timestamp,
    }
}

/// State to render at `render_time`.
///
/// Returns `None` with fewer than two snapshots. If no consecutive pair
/// brackets `render_time`, the most recent snapshot is returned unchanged.
pub fn interpolate(
    buffer: &VecDeque<PlayerStateSnapshot>,
    render_time: u64,
) -> Option<PlayerStateSnapshot> {
    if buffer.len() < 2 {
        return None;
    }

    let bracket = buffer
        .iter()
        .zip(buffer.iter().skip(1))
        .find(|(older, newer)| older.timestamp <= render_time && render_time <= newer.timestamp);

    match bracket {
        Some((older, newer)) => {
            let span = newer.timestamp - older.timestamp;
            let factor = if span == 0 {
                0.0
            } else {
                (render_time - older.timestamp) as f64 / span as f64
            };
            Some(blend(older, newer, factor, render_time))
        }
        None => buffer.back().copied(),
    }
}
