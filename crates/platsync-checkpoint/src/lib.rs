//! Per-level checkpoints: the progress snapshot a player respawns from.
//!
//! One checkpoint per level, last write wins. The game loop decides when a
//! checkpoint trigger is crossed and hands over the full state; the store
//! only keeps it. Persisting the map (local storage, a save file) is up to
//! the caller, which is why every type here is serde-ready.

use std::collections::BTreeMap;
use std::fmt;

use platsync_core::Clock;
use serde::{Deserialize, Serialize};

/// Level identifier used as the checkpoint key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(pub u32);

impl From<u32> for LevelId {
    fn from(level: u32) -> Self {
        Self(level)
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.0)
    }
}

/// What the game loop hands over when a checkpoint is reached.
///
/// Single-player callers leave the player-two flags as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub x: f64,
    pub y: f64,
    pub score: u64,
    pub is_powered_up: bool,
    pub has_fire_power: bool,
    #[serde(default)]
    pub is_powered_up2: Option<bool>,
    #[serde(default)]
    pub has_fire_power2: Option<bool>,
    pub coins_collected: u32,
    pub enemies_defeated: u32,
}

/// A stored checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub level: LevelId,
    pub x: f64,
    pub y: f64,
    pub score: u64,
    pub is_powered_up: bool,
    pub has_fire_power: bool,
    pub is_powered_up2: bool,
    pub has_fire_power2: bool,
    pub coins_collected: u32,
    pub enemies_defeated: u32,
    /// Save time in milliseconds.
    pub timestamp: u64,
}

/// Checkpoints keyed by level.
pub struct CheckpointStore<C: Clock> {
    clock: C,
    checkpoints: BTreeMap<LevelId, Checkpoint>,
}

impl<C: Clock> CheckpointStore<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            checkpoints: BTreeMap::new(),
        }
    }

    /// Store `state` as the checkpoint for `level`, replacing any previous one.
    pub fn save_checkpoint(
        &mut self,
        level: impl Into<LevelId>,
        state: &CheckpointState,
    ) -> &Checkpoint {
        let level = level.into();
        let checkpoint = Checkpoint {
            level,
            x: state.x,
            y: state.y,
            score: state.score,
            is_powered_up: state.is_powered_up,
            has_fire_power: state.has_fire_power,
            is_powered_up2: state.is_powered_up2.unwrap_or(false),
            has_fire_power2: state.has_fire_power2.unwrap_or(false),
            coins_collected: state.coins_collected,
            enemies_defeated: state.enemies_defeated,
            timestamp: self.clock.now_ms(),
        };
        tracing::debug!(%level, x = checkpoint.x, y = checkpoint.y, "checkpoint saved");

        self.checkpoints.insert(level, checkpoint);
        &self.checkpoints[&level]
    }

    pub fn get_checkpoint(&self, level: impl Into<LevelId>) -> Option<&Checkpoint> {
        self.checkpoints.get(&level.into())
    }

    pub fn has_checkpoint(&self, level: impl Into<LevelId>) -> bool {
        self.checkpoints.contains_key(&level.into())
    }

    /// Remove the checkpoint for `level`, if there is one.
    pub fn clear_checkpoint(&mut self, level: impl Into<LevelId>) {
        let level = level.into();
        if self.checkpoints.remove(&level).is_some() {
            tracing::debug!(%level, "checkpoint cleared");
        }
    }

    pub fn clear_all_checkpoints(&mut self) {
        self.checkpoints.clear();
        tracing::debug!("all checkpoints cleared");
    }

    /// Owned copy of every checkpoint. Changes to it never reach the store.
    pub fn get_all_checkpoints(&self) -> BTreeMap<LevelId, Checkpoint> {
        self.checkpoints.clone()
    }

    /// Replace the contents with previously persisted checkpoints.
    pub fn restore(&mut self, checkpoints: BTreeMap<LevelId, Checkpoint>) {
        self.checkpoints = checkpoints;
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}
