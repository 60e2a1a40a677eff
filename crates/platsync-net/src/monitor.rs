//! Connection monitor: heartbeat timeout detection, ping/packet-loss
//! tracking, and a reconnect state machine with exponential backoff.
//!
//! The monitor never blocks and never spawns. Its two timers (heartbeat and
//! reconnect) are [`TimerSlot`] deadlines on the injected [`Clock`]; the host
//! calls [`ConnectionMonitor::poll`] from its event loop (or runs
//! [`crate::driver::drive`]) and due work happens inline.

use platsync_core::{Clock, TimerSlot};
use serde::{Deserialize, Serialize};

use crate::diagnostics::{DEFAULT_PING_HISTORY, PacketCounters, PingHistory};
use crate::quality::{NetworkQuality, QualityRating};
use crate::reconnection::{BackoffConfig, ReconnectBackoff};

/// Connection monitor settings. All durations are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// How often the heartbeat check runs.
    pub heartbeat_interval_ms: u64,
    /// Silence longer than this while connected counts as a disconnect.
    pub heartbeat_timeout_ms: u64,
    /// Reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect attempt.
    pub base_reconnect_delay_ms: u64,
    /// Cap on the reconnect delay.
    pub max_reconnect_delay_ms: u64,
    /// Ping samples kept for latency and jitter.
    pub max_ping_history: usize,
    /// ±fraction applied to each reconnect delay (0 disables).
    pub reconnect_jitter: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 5_000,
            heartbeat_timeout_ms: 15_000,
            max_reconnect_attempts: 5,
            base_reconnect_delay_ms: 2_000,
            max_reconnect_delay_ms: 30_000,
            max_ping_history: DEFAULT_PING_HISTORY,
            reconnect_jitter: 0.0,
        }
    }
}

impl MonitorConfig {
    fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            base_delay_ms: self.base_reconnect_delay_ms,
            max_delay_ms: self.max_reconnect_delay_ms,
            max_attempts: self.max_reconnect_attempts,
            jitter: self.reconnect_jitter,
        }
    }
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Quality summary for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionQuality {
    pub rating: QualityRating,
    /// Latency in whole milliseconds.
    pub latency: u32,
    /// Packet loss in whole percent.
    pub packet_loss: u32,
    pub is_stable: bool,
}

/// Point-in-time statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorStats {
    pub state: ConnectionState,
    pub current_latency: u32,
    pub average_latency: u32,
    pub jitter: u32,
    /// Fraction rounded to two decimal places.
    pub packet_loss_rate: f64,
    pub sent_packets: u64,
    pub received_packets: u64,
    pub reconnect_attempts: u32,
    pub quality: ConnectionQuality,
}

type ChangeListener = Box<dyn FnMut(ConnectionState, ConnectionState) + Send>;
type AttemptListener = Box<dyn FnMut(u32) + Send>;

/// Tracks link health and drives reconnection.
pub struct ConnectionMonitor<C: Clock> {
    config: MonitorConfig,
    clock: C,
    state: ConnectionState,
    is_connected: bool,
    pings: PingHistory,
    current_latency: u32,
    average_latency: f64,
    packets: PacketCounters,
    packet_loss_rate: f64,
    backoff: ReconnectBackoff,
    last_heartbeat: u64,
    heartbeat_timer: TimerSlot,
    reconnect_timer: TimerSlot,
    /// Attempt number the armed reconnect timer belongs to.
    pending_attempt: Option<u32>,
    on_connection_change: Option<ChangeListener>,
    on_reconnect_attempt: Option<AttemptListener>,
    on_reconnect_failed: Option<AttemptListener>,
}

impl<C: Clock> ConnectionMonitor<C> {
    pub fn new(config: MonitorConfig, clock: C) -> Self {
        let last_heartbeat = clock.now_ms();
        Self {
            pings: PingHistory::new(config.max_ping_history),
            backoff: ReconnectBackoff::new(config.backoff()),
            config,
            clock,
            state: ConnectionState::Disconnected,
            is_connected: false,
            current_latency: 0,
            average_latency: 0.0,
            packets: PacketCounters::default(),
            packet_loss_rate: 0.0,
            last_heartbeat,
            heartbeat_timer: TimerSlot::new(),
            reconnect_timer: TimerSlot::new(),
            pending_attempt: None,
            on_connection_change: None,
            on_reconnect_attempt: None,
            on_reconnect_failed: None,
        }
    }

    // --- Listeners ---

    /// Called with `(new, old)` whenever the state actually changes.
    pub fn on_connection_change(
        &mut self,
        listener: impl FnMut(ConnectionState, ConnectionState) + Send + 'static,
    ) {
        self.on_connection_change = Some(Box::new(listener));
    }

    /// Called with the attempt number when a reconnect timer fires. The
    /// transport should try to reconnect and report back through
    /// [`Self::handle_connected`] or [`Self::handle_reconnect_failed`].
    pub fn on_reconnect_attempt(&mut self, listener: impl FnMut(u32) + Send + 'static) {
        self.on_reconnect_attempt = Some(Box::new(listener));
    }

    /// Called with the attempt count once every reconnect attempt is used up.
    pub fn on_reconnect_failed(&mut self, listener: impl FnMut(u32) + Send + 'static) {
        self.on_reconnect_failed = Some(Box::new(listener));
    }

    // --- State machine ---

    fn set_state(&mut self, new_state: ConnectionState) {
        let old_state = self.state;
        if new_state == old_state {
            return;
        }
        self.state = new_state;
        tracing::info!(?old_state, ?new_state, "connection state changed");
        if let Some(listener) = self.on_connection_change.as_mut() {
            listener(new_state, old_state);
        }
    }

    /// A handshake has started.
    pub fn begin_connect(&mut self) {
        self.set_state(ConnectionState::Connecting);
    }

    /// The transport is (re)connected.
    pub fn handle_connected(&mut self) {
        self.is_connected = true;
        self.backoff.reset();
        self.clear_reconnect_timer();
        self.last_heartbeat = self.clock.now_ms();
        self.set_state(ConnectionState::Connected);
    }

    /// The transport dropped. Starts reconnecting immediately.
    pub fn handle_disconnected(&mut self) {
        self.is_connected = false;
        self.set_state(ConnectionState::Disconnected);
        self.attempt_reconnect();
    }

    /// The attempt announced through `on_reconnect_attempt` did not connect.
    /// Schedules the next one, or gives up if none are left.
    pub fn handle_reconnect_failed(&mut self) {
        if self.state != ConnectionState::Reconnecting || self.reconnect_timer.is_armed() {
            return;
        }
        tracing::debug!(attempt = self.backoff.attempts(), "reconnect attempt failed");
        self.attempt_reconnect();
    }

    /// Schedule the next reconnect attempt, or give up if none are left.
    pub fn attempt_reconnect(&mut self) {
        self.clear_reconnect_timer();

        let Some(delay) = self.backoff.next_delay() else {
            let attempts = self.backoff.attempts();
            tracing::warn!(attempts, "reconnect attempts exhausted");
            self.set_state(ConnectionState::Disconnected);
            if let Some(listener) = self.on_reconnect_failed.as_mut() {
                listener(attempts);
            }
            return;
        };

        self.set_state(ConnectionState::Reconnecting);
        let now = self.clock.now_ms();
        let attempt = self.backoff.attempts();
        self.reconnect_timer.arm(now, delay);
        self.pending_attempt = Some(attempt);
        tracing::debug!(attempt, delay_ms = delay, "reconnect scheduled");
    }

    /// Cancel the pending reconnect attempt, if any.
    pub fn clear_reconnect_timer(&mut self) {
        self.reconnect_timer.cancel();
        self.pending_attempt = None;
    }

    // --- Heartbeat / timers ---

    /// Start (or restart) the periodic heartbeat check.
    pub fn start(&mut self) {
        self.heartbeat_timer.cancel();
        let now = self.clock.now_ms();
        self.last_heartbeat = now;
        self.heartbeat_timer.arm(now, self.config.heartbeat_interval_ms);
    }

    /// Stop the heartbeat check and any pending reconnect attempt.
    pub fn stop(&mut self) {
        self.heartbeat_timer.cancel();
        self.clear_reconnect_timer();
    }

    /// Whether the heartbeat check is running.
    pub fn is_running(&self) -> bool {
        self.heartbeat_timer.is_armed()
    }

    /// Treat a long silence while connected as a disconnect.
    pub fn check_heartbeat(&mut self) {
        let silence = self.clock.now_ms().saturating_sub(self.last_heartbeat);
        if self.is_connected && silence > self.config.heartbeat_timeout_ms {
            tracing::warn!(silence_ms = silence, "heartbeat timeout");
            self.handle_disconnected();
        }
    }

    /// Run whatever timers are due on the clock.
    ///
    /// A due reconnect timer only announces its attempt; the next one is
    /// scheduled once the transport reports the outcome.
    pub fn poll(&mut self) {
        let now = self.clock.now_ms();

        if self.heartbeat_timer.take_if_due(now) {
            self.check_heartbeat();
            self.heartbeat_timer.arm(now, self.config.heartbeat_interval_ms);
        }

        if self.reconnect_timer.take_if_due(now)
            && let Some(attempt) = self.pending_attempt.take()
        {
            tracing::debug!(attempt, "reconnect attempt");
            if let Some(listener) = self.on_reconnect_attempt.as_mut() {
                listener(attempt);
            }
        }
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.heartbeat_timer.deadline(), self.reconnect_timer.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // --- Measurements ---

    /// Record a round-trip ping sample.
    pub fn record_ping(&mut self, ping_ms: u32) {
        self.current_latency = ping_ms;
        self.pings.push(ping_ms);
        self.average_latency = self.pings.average();
    }

    pub fn record_packet_sent(&mut self) {
        self.packets.sent += 1;
        self.packet_loss_rate = self.packets.loss_rate();
    }

    /// Any inbound packet doubles as a heartbeat.
    pub fn record_packet_received(&mut self) {
        self.packets.received += 1;
        self.packet_loss_rate = self.packets.loss_rate();
        self.last_heartbeat = self.clock.now_ms();
    }

    pub fn is_connection_stable(&self) -> bool {
        self.pings.is_stable()
    }

    /// Population standard deviation of the ping window.
    pub fn jitter(&self) -> f64 {
        self.pings.jitter()
    }

    pub fn get_connection_quality(&self) -> ConnectionQuality {
        ConnectionQuality {
            rating: self.quality(),
            latency: self.latency_ms().round() as u32,
            packet_loss: (self.packet_loss_rate * 100.0).round() as u32,
            is_stable: self.is_connection_stable(),
        }
    }

    pub fn get_stats(&self) -> MonitorStats {
        MonitorStats {
            state: self.state,
            current_latency: self.current_latency,
            average_latency: self.average_latency.round() as u32,
            jitter: self.jitter().round() as u32,
            packet_loss_rate: (self.packet_loss_rate * 100.0).round() / 100.0,
            sent_packets: self.packets.sent,
            received_packets: self.packets.received,
            reconnect_attempts: self.backoff.attempts(),
            quality: self.get_connection_quality(),
        }
    }

    /// Zero the measurements and the reconnect counter. State and timers
    /// are left alone.
    pub fn reset(&mut self) {
        self.pings.clear();
        self.current_latency = 0;
        self.average_latency = 0.0;
        self.packets = PacketCounters::default();
        self.packet_loss_rate = 0.0;
        self.backoff.reset();
    }

    // --- Accessors ---

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn current_latency(&self) -> u32 {
        self.current_latency
    }

    pub fn average_latency(&self) -> f64 {
        self.average_latency
    }

    pub fn packet_loss_rate(&self) -> f64 {
        self.packet_loss_rate
    }

    pub fn packets(&self) -> PacketCounters {
        self.packets
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    /// Delay of the most recently scheduled reconnect attempt.
    pub fn reconnect_delay_ms(&self) -> u64 {
        self.backoff.current_delay_ms()
    }

    /// Deadline of the pending reconnect attempt.
    pub fn reconnect_deadline(&self) -> Option<u64> {
        self.reconnect_timer.deadline()
    }

    pub fn last_heartbeat(&self) -> u64 {
        self.last_heartbeat
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> NetworkQuality for ConnectionMonitor<C> {
    /// Average latency, or the latest sample before an average exists.
    fn latency_ms(&self) -> f64 {
        if self.average_latency > 0.0 {
            self.average_latency
        } else {
            f64::from(self.current_latency)
        }
    }

    fn packet_loss(&self) -> f64 {
        self.packet_loss_rate
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
