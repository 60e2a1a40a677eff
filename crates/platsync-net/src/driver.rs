//! Async driver that runs a shared [`ConnectionMonitor`] on a tokio runtime.
//!
//! The monitor itself only knows deadlines. [`drive`] sleeps until the next
//! one, polls, and repeats until the shutdown watch flips to `true`. Other
//! tasks (the transport reader, the ping loop) lock the same monitor to
//! record packets and pings.

use std::sync::Arc;
use std::time::Duration;

use platsync_core::Clock;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;

use crate::monitor::ConnectionMonitor;

/// Monitor shared between the driver and transport tasks.
pub type SharedMonitor<C> = Arc<Mutex<ConnectionMonitor<C>>>;

/// Milliseconds since creation on tokio's clock.
///
/// Follows paused/advanced time in tests, which keeps the driver
/// deterministic under `#[tokio::test(start_paused = true)]`.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Run the monitor's timers until `shutdown` becomes `true` or its sender
/// is dropped.
///
/// The monitor's clock must advance with tokio time ([`TokioClock`] or a
/// wall clock); a frozen clock would never reach a deadline.
pub async fn drive<C: Clock>(monitor: SharedMonitor<C>, mut shutdown: watch::Receiver<bool>) {
    monitor.lock().await.start();
    tracing::debug!("connection monitor driver started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let wait_ms = {
            let monitor = monitor.lock().await;
            let now = monitor.clock().now_ms();
            monitor
                .next_deadline()
                .map_or(monitor.config().heartbeat_interval_ms, |deadline| {
                    deadline.saturating_sub(now)
                })
        };

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(wait_ms)) => {
                monitor.lock().await.poll();
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    monitor.lock().await.stop();
    tracing::debug!("connection monitor driver stopped");
}
