//! Single-slot deadline timers.
//!
//! A [`TimerSlot`] stands in for one scheduled callback role (heartbeat,
//! reconnect, ...). The owner checks it against its clock and runs the work
//! itself, so there is never more than one outstanding deadline per role.

/// At most one pending deadline for a single timer role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerSlot {
    deadline: Option<u64>,
}

impl TimerSlot {
    /// Create an unarmed slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the slot to fire at `now_ms + delay_ms`, replacing any
    /// pending deadline.
    pub fn arm(&mut self, now_ms: u64, delay_ms: u64) {
        self.cancel();
        self.deadline = Some(now_ms.saturating_add(delay_ms));
    }

    /// Drop the pending deadline, if any.
    pub fn cancel(&mut self) {
        if let Some(deadline) = self.deadline.take() {
            tracing::trace!(deadline, "timer cancelled");
        }
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline in clock milliseconds.
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Whether the pending deadline has been reached.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.deadline.is_some_and(|d| now_ms >= d)
    }

    /// Disarm and return `true` if the deadline has been reached.
    ///
    /// A due slot fires exactly once; it has to be re-armed to fire again.
    pub fn take_if_due(&mut self, now_ms: u64) -> bool {
        if self.is_due(now_ms) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}
