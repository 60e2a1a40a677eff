//! Player state snapshots and the bounded per-player history they live in.

use std::collections::VecDeque;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Default number of snapshots kept per player.
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// Opaque player identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The first local player.
    pub fn player1() -> Self {
        Self::new("player1")
    }

    /// The second player (local co-op or remote peer).
    pub fn player2() -> Self {
        Self::new("player2")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// PlayerStateSnapshot
// ---------------------------------------------------------------------------

fn unit_scale() -> f64 {
    1.0
}

/// One instant of a player's kinematic state.
///
/// A `timestamp` of 0 means "not stamped yet"; the sync engine fills in the
/// capture time when the snapshot enters history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStateSnapshot {
    pub x: f64,
    pub y: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    #[serde(default = "unit_scale")]
    pub scale_x: f64,
    #[serde(default = "unit_scale")]
    pub scale_y: f64,
    /// Capture time in milliseconds.
    #[serde(default)]
    pub timestamp: u64,
}

impl Default for PlayerStateSnapshot {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            timestamp: 0,
        }
    }
}

impl PlayerStateSnapshot {
    /// Snapshot at rest at `(x, y)` with unit scale.
    pub fn at(x: f64, y: f64, timestamp: u64) -> Self {
        Self {
            x,
            y,
            timestamp,
            ..Default::default()
        }
    }

    /// Builder-style velocity setter.
    pub fn with_velocity(mut self, velocity_x: f64, velocity_y: f64) -> Self {
        self.velocity_x = velocity_x;
        self.velocity_y = velocity_y;
        self
    }

    /// Straight-line distance between the positions of two snapshots.
    pub fn distance_to(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

// ---------------------------------------------------------------------------
// StateHistory
// ---------------------------------------------------------------------------

/// Insertion-ordered, bounded snapshot buffers keyed by player.
///
/// Each buffer holds at most `max_size` entries; pushing past that evicts
/// the oldest. Ordering is by insertion only, so callers feed snapshots in
/// non-decreasing timestamp order.
#[derive(Debug, Clone)]
pub struct StateHistory {
    buffers: FxHashMap<PlayerId, VecDeque<PlayerStateSnapshot>>,
    max_size: usize,
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_SIZE)
    }
}

impl StateHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            buffers: FxHashMap::default(),
            max_size: max_size.max(1),
        }
    }

    /// Append a snapshot for `player`, evicting its oldest entry at capacity.
    pub fn push(&mut self, player: &PlayerId, snapshot: PlayerStateSnapshot) {
        let max_size = self.max_size;
        let buffer = self
            .buffers
            .entry(player.clone())
            .or_insert_with(|| VecDeque::with_capacity(max_size));

        if let Some(last) = buffer.back()
            && snapshot.timestamp < last.timestamp
        {
            tracing::debug!(
                %player,
                timestamp = snapshot.timestamp,
                latest = last.timestamp,
                "snapshot older than history tail"
            );
        }

        while buffer.len() >= max_size {
            buffer.pop_front();
        }
        buffer.push_back(snapshot);
    }

    /// Snapshots for `player`, oldest first. Empty if none.
    pub fn get<'a>(
        &'a self,
        player: &PlayerId,
    ) -> impl Iterator<Item = &'a PlayerStateSnapshot> + use<'a> {
        self.buffers.get(player).into_iter().flatten()
    }

    /// Contiguous view of a player's buffer.
    pub fn buffer(&self, player: &PlayerId) -> Option<&VecDeque<PlayerStateSnapshot>> {
        self.buffers.get(player)
    }

    /// Number of snapshots held for `player`.
    pub fn len(&self, player: &PlayerId) -> usize {
        self.buffers.get(player).map_or(0, VecDeque::len)
    }

    /// Most recent snapshot for `player`.
    pub fn latest(&self, player: &PlayerId) -> Option<&PlayerStateSnapshot> {
        self.buffers.get(player).and_then(VecDeque::back)
    }

    pub fn clear_player(&mut self, player: &PlayerId) {
        self.buffers.remove(player);
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Players with at least one snapshot.
    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.buffers.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded_fifo() {
        let mut history = StateHistory::new(10);
        let player = PlayerId::player2();
        for i in 0..15u64 {
            history.push(&player, PlayerStateSnapshot::at(i as f64, 0.0, 1_000 + i));
        }
        assert_eq!(history.len(&player), 10);
        let xs: Vec<f64> = history.get(&player).map(|s| s.x).collect();
        assert_eq!(xs, (5..15).map(|i| i as f64).collect::<Vec<_>>());
        assert_eq!(history.latest(&player).unwrap().x, 14.0);
    }

    #[test]
    fn test_players_are_independent() {
        let mut history = StateHistory::default();
        history.push(&PlayerId::player1(), PlayerStateSnapshot::at(1.0, 1.0, 1));
        history.push(&"ghost".into(), PlayerStateSnapshot::at(2.0, 2.0, 1));
        assert_eq!(history.len(&PlayerId::player1()), 1);
        assert_eq!(history.len(&PlayerId::new("ghost")), 1);
        assert_eq!(history.len(&PlayerId::player2()), 0);

        history.clear_player(&PlayerId::player1());
        assert_eq!(history.len(&PlayerId::player1()), 0);
        assert_eq!(history.players().count(), 1);
    }

    #[test]
    fn test_out_of_order_snapshot_is_kept_in_insertion_order() {
        let mut history = StateHistory::default();
        let player = PlayerId::player1();
        history.push(&player, PlayerStateSnapshot::at(0.0, 0.0, 200));
        history.push(&player, PlayerStateSnapshot::at(1.0, 0.0, 100));
        let stamps: Vec<u64> = history.get(&player).map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![200, 100]);
    }

    #[test]
    fn test_snapshot_serde_defaults() {
        let snapshot: PlayerStateSnapshot =
            serde_json::from_str(r#"{"x":1.0,"y":2.0,"velocity_x":0.0,"velocity_y":0.0}"#)
                .unwrap();
        assert_eq!(snapshot.scale_x, 1.0);
        assert_eq!(snapshot.scale_y, 1.0);
        assert_eq!(snapshot.timestamp, 0);
    }

    #[test]
    fn test_distance() {
        let a = PlayerStateSnapshot::at(0.0, 0.0, 0);
        let b = PlayerStateSnapshot::at(3.0, 4.0, 0);
        assert_eq!(a.distance_to(&b), 5.0);
    }
}
