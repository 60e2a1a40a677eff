//! The multiplayer sync engine: history, interpolation, prediction,
//! reconciliation, and latency statistics for every player in a session.
//!
//! The host feeds received snapshots in with
//! [`MultiplayerSync::add_state_snapshot`], asks for a render state each
//! frame with [`MultiplayerSync::get_interpolated_state`], predicts the local
//! player with [`MultiplayerSync::predict_and_record`], and periodically
//! sends [`MultiplayerSync::serialize_state`] to its peers.

use platsync_core::Clock;
use platsync_net::{NetworkQuality, QualityRating};
use serde::{Deserialize, Serialize};

use crate::entity::SyncEntity;
use crate::interpolation::{DEFAULT_INTERPOLATION_DELAY_MS, interpolate, lerp};
use crate::prediction::{
    DEFAULT_PENDING_INPUT_CAPACITY, InputBuffer, InputSample, PredictionConfig, predict_state,
};
use crate::reconciliation::{DEFAULT_RECONCILIATION_THRESHOLD, reconcile_state};
use crate::snapshot::{DEFAULT_MAX_HISTORY_SIZE, PlayerId, PlayerStateSnapshot, StateHistory};
use crate::stats::NetworkStats;

/// Fraction of the remaining distance covered per interpolated
/// [`MultiplayerSync::apply_state`] call.
pub const POSITION_INTERPOLATION_SMOOTHING: f64 = 0.3;

/// Sync engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Snapshots kept per player.
    pub max_history_size: usize,
    /// How far behind the clock remote players are rendered (ms).
    pub interpolation_delay_ms: u64,
    /// Drift (px) tolerated before correcting a prediction.
    pub reconciliation_threshold: f64,
    /// Unacknowledged local inputs kept.
    pub pending_input_capacity: usize,
    /// Movement constants for local prediction.
    pub prediction: PredictionConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            interpolation_delay_ms: DEFAULT_INTERPOLATION_DELAY_MS,
            reconciliation_threshold: DEFAULT_RECONCILIATION_THRESHOLD,
            pending_input_capacity: DEFAULT_PENDING_INPUT_CAPACITY,
            prediction: PredictionConfig::default(),
        }
    }
}

/// Client-side state synchronization for one session.
pub struct MultiplayerSync<C: Clock> {
    config: SyncConfig,
    clock: C,
    history: StateHistory,
    pending_inputs: InputBuffer,
    stats: NetworkStats,
}

impl<C: Clock> MultiplayerSync<C> {
    pub fn new(config: SyncConfig, clock: C) -> Self {
        Self {
            history: StateHistory::new(config.max_history_size),
            pending_inputs: InputBuffer::new(config.pending_input_capacity),
            stats: NetworkStats::default(),
            config,
            clock,
        }
    }

    // --- History / interpolation ---

    /// Buffer a snapshot for `player`, stamping it with the current time if
    /// it has none.
    pub fn add_state_snapshot(&mut self, player: &PlayerId, mut state: PlayerStateSnapshot) {
        if state.timestamp == 0 {
            state.timestamp = self.clock.now_ms();
        }
        self.history.push(player, state);
    }

    /// State to draw `player` at, `interpolation_delay_ms` in the past.
    ///
    /// `None` means there is not enough data yet and the entity should not
    /// be moved this frame.
    pub fn get_interpolated_state(&self, player: &PlayerId) -> Option<PlayerStateSnapshot> {
        let render_time = self
            .clock
            .now_ms()
            .saturating_sub(self.config.interpolation_delay_ms);
        interpolate(self.history.buffer(player)?, render_time)
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn clear_history(&mut self, player: &PlayerId) {
        self.history.clear_player(player);
    }

    // --- Prediction / reconciliation ---

    /// One physics step of local prediction. Pure; nothing is recorded.
    pub fn predict_state(
        &self,
        current: &PlayerStateSnapshot,
        input: &InputSample,
    ) -> PlayerStateSnapshot {
        predict_state(current, input, &self.config.prediction)
    }

    /// Predict and keep the input until the server acknowledges it.
    /// Returns the input's sequence number and the predicted state.
    pub fn predict_and_record(
        &mut self,
        current: &PlayerStateSnapshot,
        input: InputSample,
    ) -> (u32, PlayerStateSnapshot) {
        let predicted = predict_state(current, &input, &self.config.prediction);
        let sequence = self.pending_inputs.push(input, predicted);
        (sequence, predicted)
    }

    /// Drop pending inputs up to and including `sequence`.
    pub fn acknowledge_inputs(&mut self, sequence: u32) {
        self.pending_inputs.discard_up_to(sequence);
    }

    pub fn pending_inputs(&self) -> &InputBuffer {
        &self.pending_inputs
    }

    /// Reconcile with an explicit drift threshold.
    pub fn reconcile_state(
        &self,
        client: &PlayerStateSnapshot,
        server: &PlayerStateSnapshot,
        threshold: f64,
    ) -> PlayerStateSnapshot {
        reconcile_state(client, server, threshold)
    }

    /// Reconcile with the configured drift threshold.
    pub fn reconcile(
        &self,
        client: &PlayerStateSnapshot,
        server: &PlayerStateSnapshot,
    ) -> PlayerStateSnapshot {
        reconcile_state(client, server, self.config.reconciliation_threshold)
    }

    // --- Network stats ---

    pub fn update_network_stats(&mut self, latency_ms: f64) {
        let now = self.clock.now_ms();
        self.stats.record(latency_ms, now);
    }

    pub fn network_stats(&self) -> &NetworkStats {
        &self.stats
    }

    /// Rating of the latency estimate on the shared tier table.
    pub fn get_connection_quality(&self) -> QualityRating {
        self.stats.quality()
    }

    // --- Entity bridge ---

    /// Capture an entity for transmission. Position and velocity are
    /// rounded to two decimals; an entity without a body reports zero
    /// velocity.
    pub fn serialize_state<E: SyncEntity + ?Sized>(&self, entity: &E) -> PlayerStateSnapshot {
        let (x, y) = entity.position();
        let (velocity_x, velocity_y) = entity.body().map_or((0.0, 0.0), |b| b.velocity());
        let (scale_x, scale_y) = entity.scale();
        PlayerStateSnapshot {
            x: round2(x),
            y: round2(y),
            velocity_x: round2(velocity_x),
            velocity_y: round2(velocity_y),
            scale_x,
            scale_y,
            timestamp: self.clock.now_ms(),
        }
    }

    /// Push a received or interpolated state onto an entity.
    ///
    /// With `use_interpolation` the position only moves part of the way,
    /// so calling this every frame converges smoothly; otherwise it snaps.
    pub fn apply_state<E: SyncEntity + ?Sized>(
        &self,
        entity: &mut E,
        state: &PlayerStateSnapshot,
        use_interpolation: bool,
    ) {
        if use_interpolation {
            let (x, y) = entity.position();
            entity.set_position(
                lerp(x, state.x, POSITION_INTERPOLATION_SMOOTHING),
                lerp(y, state.y, POSITION_INTERPOLATION_SMOOTHING),
            );
        } else {
            entity.set_position(state.x, state.y);
        }

        entity.set_scale(state.scale_x, state.scale_y);

        if let Some(body) = entity.body_mut() {
            body.set_velocity(state.velocity_x, state.velocity_y);
        }
    }

    /// Forget every player's history, all pending inputs, and the stats.
    pub fn reset(&mut self) {
        self.history.clear();
        self.pending_inputs.clear();
        self.stats = NetworkStats::default();
        tracing::debug!("sync state reset");
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
