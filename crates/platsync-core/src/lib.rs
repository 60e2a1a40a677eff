//! Shared time primitives for the sync core: an injectable millisecond clock
//! and single-slot cancellable timers.
//!
//! Nothing in the workspace reads ambient time directly. Components take a
//! [`Clock`] so tests and simulations can drive them with a [`ManualClock`].

mod clock;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use timer::TimerSlot;
