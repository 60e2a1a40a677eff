//! Client-side prediction: apply local input immediately instead of waiting
//! for the server to confirm it.
//!
//! [`predict_state`] is one deterministic physics step. The [`InputBuffer`]
//! keeps each predicted input until the server acknowledges it, so the host
//! can see how far ahead of confirmation the local player is running.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::snapshot::PlayerStateSnapshot;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Frame time assumed when an input carries none (~60 Hz).
pub const DEFAULT_DELTA_MS: f64 = 16.0;

/// Default pending-input capacity (~1 s at 60 Hz).
pub const DEFAULT_PENDING_INPUT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// InputSample / PredictionConfig
// ---------------------------------------------------------------------------

/// One frame of local input plus the grounded flag from the physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSample {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub is_on_ground: bool,
    /// Frame time in milliseconds.
    pub delta_time_ms: f64,
}

impl Default for InputSample {
    fn default() -> Self {
        Self {
            left: false,
            right: false,
            jump: false,
            is_on_ground: false,
            delta_time_ms: DEFAULT_DELTA_MS,
        }
    }
}

/// Movement constants. Pixels and seconds; negative y is up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PredictionConfig {
    /// Horizontal speed while left/right is held (px/s).
    pub move_speed: f64,
    /// Horizontal deceleration with no input (px/s²).
    pub friction: f64,
    /// Vertical velocity set by a grounded jump (px/s).
    pub jump_velocity: f64,
    /// Downward acceleration (px/s²).
    pub gravity: f64,
    /// Frame time used when an input's own is missing or invalid (ms).
    pub default_delta_ms: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            move_speed: 200.0,
            friction: 800.0,
            jump_velocity: -400.0,
            gravity: 600.0,
            default_delta_ms: DEFAULT_DELTA_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// predict_state
// ---------------------------------------------------------------------------

/// Advance `current` by one frame of `input`.
///
/// Left/right set horizontal velocity outright (left wins if both are
/// held); with neither, friction slows the player toward zero without
/// crossing it. A grounded jump sets the vertical velocity, then gravity
/// is added unconditionally. Positions integrate with the updated
/// velocities. Scale carries over and the timestamp moves forward by the
/// frame time.
pub fn predict_state(
    current: &PlayerStateSnapshot,
    input: &InputSample,
    config: &PredictionConfig,
) -> PlayerStateSnapshot {
    let delta_ms = if input.delta_time_ms.is_finite() && input.delta_time_ms > 0.0 {
        input.delta_time_ms
    } else {
        config.default_delta_ms
    };
    let dt = delta_ms / 1000.0;

    let velocity_x = if input.left {
        -config.move_speed
    } else if input.right {
        config.move_speed
    } else {
        let decel = config.friction * dt;
        if current.velocity_x > 0.0 {
            (current.velocity_x - decel).max(0.0)
        } else if current.velocity_x < 0.0 {
            (current.velocity_x + decel).min(0.0)
        } else {
            0.0
        }
    };

    let mut velocity_y = current.velocity_y;
    if input.jump && input.is_on_ground {
        velocity_y = config.jump_velocity;
    }
    velocity_y += config.gravity * dt;

    PlayerStateSnapshot {
        x: current.x + velocity_x * dt,
        y: current.y + velocity_y * dt,
        velocity_x,
        velocity_y,
        scale_x: current.scale_x,
        scale_y: current.scale_y,
        timestamp: current.timestamp + delta_ms.round() as u64,
    }
}

// ---------------------------------------------------------------------------
// InputBuffer
// ---------------------------------------------------------------------------

/// An input that has been predicted locally but not yet acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInput {
    /// Local sequence number, increasing per recorded input.
    pub sequence: u32,
    pub input: InputSample,
    /// State after applying `input`.
    pub predicted: PlayerStateSnapshot,
}

/// Bounded FIFO of [`PendingInput`]s, oldest evicted first.
#[derive(Debug, Clone)]
pub struct InputBuffer {
    entries: VecDeque<PendingInput>,
    max_size: usize,
    next_sequence: u32,
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_INPUT_CAPACITY)
    }
}

impl InputBuffer {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: VecDeque::with_capacity(max_size),
            max_size,
            next_sequence: 0,
        }
    }

    /// Store a predicted input and return its sequence number.
    pub fn push(&mut self, input: InputSample, predicted: PlayerStateSnapshot) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        if self.entries.len() >= self.max_size {
            self.entries.pop_front();
        }
        self.entries.push_back(PendingInput {
            sequence,
            input,
            predicted,
        });
        sequence
    }

    /// Drop every entry with sequence ≤ `sequence` (the server has seen them).
    pub fn discard_up_to(&mut self, sequence: u32) {
        while self.entries.front().is_some_and(|e| e.sequence <= sequence) {
            self.entries.pop_front();
        }
    }

    /// Unacknowledged entries, oldest first.
    pub fn entries(&self) -> &VecDeque<PendingInput> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything and restart sequence numbering.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_sequence = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn resting() -> PlayerStateSnapshot {
        PlayerStateSnapshot::at(100.0, 300.0, 1_000)
    }

    fn step(current: &PlayerStateSnapshot, input: InputSample) -> PlayerStateSnapshot {
        predict_state(current, &input, &PredictionConfig::default())
    }

    #[test]
    fn test_left_moves_left_at_full_speed() {
        let current = resting();
        let predicted = step(
            &current,
            InputSample {
                left: true,
                ..Default::default()
            },
        );
        assert_eq!(predicted.velocity_x, -200.0);
        assert!(predicted.x < current.x);
    }

    #[test]
    fn test_right_moves_right_and_left_wins_ties() {
        let current = resting();
        let right = step(
            &current,
            InputSample {
                right: true,
                ..Default::default()
            },
        );
        assert_eq!(right.velocity_x, 200.0);
        assert!(right.x > current.x);

        let both = step(
            &current,
            InputSample {
                left: true,
                right: true,
                ..Default::default()
            },
        );
        assert_eq!(both.velocity_x, -200.0);
    }

    #[test]
    fn test_gravity_applies_without_input() {
        let current = resting();
        let predicted = step(&current, InputSample::default());
        assert!(predicted.velocity_y > current.velocity_y);
        assert!(predicted.y > current.y);
    }

    #[test]
    fn test_friction_never_overshoots_zero() {
        let moving = resting().with_velocity(10.0, 0.0);
        let predicted = step(&moving, InputSample::default());
        // 800 px/s² * 0.016 s = 12.8 > 10
        assert_eq!(predicted.velocity_x, 0.0);

        let fast = resting().with_velocity(-200.0, 0.0);
        let predicted = step(&fast, InputSample::default());
        assert!((predicted.velocity_x - -187.2).abs() < 1e-9);
    }

    #[test]
    fn test_jump_only_from_ground() {
        let current = resting();
        let grounded = step(
            &current,
            InputSample {
                jump: true,
                is_on_ground: true,
                ..Default::default()
            },
        );
        assert!((grounded.velocity_y - (-400.0 + 9.6)).abs() < 1e-9);
        assert!(grounded.y < current.y);

        let airborne = step(
            &current,
            InputSample {
                jump: true,
                ..Default::default()
            },
        );
        assert!(airborne.velocity_y > 0.0);
    }

    #[test]
    fn test_invalid_delta_falls_back_to_default() {
        let current = resting();
        let predicted = step(
            &current,
            InputSample {
                right: true,
                delta_time_ms: 0.0,
                ..Default::default()
            },
        );
        assert!((predicted.x - (100.0 + 200.0 * 0.016)).abs() < 1e-9);
        assert_eq!(predicted.timestamp, 1_016);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let input = InputSample {
            right: true,
            jump: true,
            is_on_ground: true,
            delta_time_ms: 33.0,
            ..Default::default()
        };
        let a = step(&resting(), input);
        let b = step(&resting(), input);
        assert_eq!(a, b);
    }

    #[test]
    fn test_buffer_is_bounded_and_acknowledged() {
        let mut buffer = InputBuffer::new(4);
        for _ in 0..6 {
            buffer.push(InputSample::default(), resting());
        }
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.entries().front().unwrap().sequence, 2);

        buffer.discard_up_to(3);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.entries().front().unwrap().sequence, 4);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.push(InputSample::default(), resting()), 0);
    }
}
