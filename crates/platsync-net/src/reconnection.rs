//! Exponential reconnect backoff.
//!
//! [`ReconnectBackoff`] counts attempts and computes the delay before each
//! one: `min(base * 2^(attempt - 1), max)`, optionally spread by a jitter
//! fraction. It never sleeps; the connection monitor turns the delay into a
//! timer deadline.

use rand::Rng;

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first attempt in milliseconds. Default: 2000.
    pub base_delay_ms: u64,
    /// Upper bound on any delay in milliseconds. Default: 30000.
    pub max_delay_ms: u64,
    /// Attempts allowed before giving up. Default: 5.
    pub max_attempts: u32,
    /// Jitter fraction (0.0 - 1.0) applied as ±jitter to each delay.
    /// Default: 0.0.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 2_000,
            max_delay_ms: 30_000,
            max_attempts: 5,
            jitter: 0.0,
        }
    }
}

/// Attempt counter plus the delay of the most recent attempt.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    config: BackoffConfig,
    attempts: u32,
    current_delay_ms: u64,
}

impl ReconnectBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        let current_delay_ms = config.base_delay_ms;
        Self {
            config,
            attempts: 0,
            current_delay_ms,
        }
    }

    /// Advance the attempt counter and return the delay before that attempt.
    /// Returns `None` once `max_attempts` have been used.
    pub fn next_delay(&mut self) -> Option<u64> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;

        let base = Self::delay_for_attempt(&self.config, self.attempts);
        let delay = if self.config.jitter > 0.0 {
            let jitter = self.config.jitter.min(1.0);
            let factor = rand::rng().random_range((1.0 - jitter)..=(1.0 + jitter));
            ((base as f64 * factor) as u64).min(self.config.max_delay_ms)
        } else {
            base
        };

        self.current_delay_ms = delay;
        Some(delay)
    }

    /// Un-jittered delay for the 1-based `attempt`.
    pub fn delay_for_attempt(config: &BackoffConfig, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(63);
        config
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(config.max_delay_ms)
    }

    /// Whether every allowed attempt has been used.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.config.max_attempts
    }

    /// Back to zero attempts and the base delay.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current_delay_ms = self.config.base_delay_ms;
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay of the most recent attempt, or the base delay after a reset.
    pub fn current_delay_ms(&self) -> u64 {
        self.current_delay_ms
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }
}
