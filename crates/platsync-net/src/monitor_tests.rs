//! Unit tests for the connection monitor.

use std::sync::{Arc, Mutex};

use platsync_core::ManualClock;

use super::*;

fn monitor_with(config: MonitorConfig) -> (ConnectionMonitor<ManualClock>, ManualClock) {
    let clock = ManualClock::new(10_000);
    (ConnectionMonitor::new(config, clock.clone()), clock)
}

fn fast_backoff() -> MonitorConfig {
    MonitorConfig {
        base_reconnect_delay_ms: 1_000,
        max_reconnect_attempts: 3,
        ..Default::default()
    }
}

/// Record every state change as `(new, old)`.
fn watch_changes(
    monitor: &mut ConnectionMonitor<ManualClock>,
) -> Arc<Mutex<Vec<(ConnectionState, ConnectionState)>>> {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    monitor.on_connection_change(move |new, old| sink.lock().unwrap().push((new, old)));
    changes
}

#[test]
fn test_starts_disconnected() {
    let (monitor, _) = monitor_with(MonitorConfig::default());
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
    assert!(!monitor.is_connected());
    assert_eq!(monitor.next_deadline(), None);
}

#[test]
fn test_change_listener_fires_only_on_change() {
    let (mut monitor, _) = monitor_with(MonitorConfig::default());
    let changes = watch_changes(&mut monitor);

    monitor.begin_connect();
    monitor.begin_connect();
    monitor.handle_connected();
    monitor.handle_connected();

    assert_eq!(
        *changes.lock().unwrap(),
        vec![
            (ConnectionState::Connecting, ConnectionState::Disconnected),
            (ConnectionState::Connected, ConnectionState::Connecting),
        ]
    );
}

#[test]
fn test_disconnect_starts_reconnecting() {
    let (mut monitor, _) = monitor_with(MonitorConfig::default());
    let changes = watch_changes(&mut monitor);
    monitor.handle_connected();
    monitor.handle_disconnected();

    assert_eq!(monitor.state(), ConnectionState::Reconnecting);
    assert!(!monitor.is_connected());
    assert_eq!(monitor.reconnect_attempts(), 1);
    assert_eq!(monitor.reconnect_delay_ms(), 2_000);
    assert_eq!(monitor.reconnect_deadline(), Some(12_000));
    assert_eq!(
        changes.lock().unwrap().last(),
        Some(&(ConnectionState::Reconnecting, ConnectionState::Disconnected))
    );
}

#[test]
fn test_second_attempt_doubles_delay() {
    let (mut monitor, clock) = monitor_with(fast_backoff());
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&attempts);
    monitor.on_reconnect_attempt(move |n| sink.lock().unwrap().push(n));

    monitor.handle_connected();
    monitor.handle_disconnected();
    assert_eq!(monitor.reconnect_delay_ms(), 1_000);

    clock.advance(1_000);
    monitor.poll();

    // The attempt is in flight; nothing else is scheduled yet.
    assert_eq!(*attempts.lock().unwrap(), vec![1]);
    assert_eq!(monitor.reconnect_attempts(), 1);
    assert_eq!(monitor.reconnect_deadline(), None);
    assert_eq!(monitor.state(), ConnectionState::Reconnecting);

    monitor.handle_reconnect_failed();
    assert_eq!(monitor.reconnect_attempts(), 2);
    assert_eq!(monitor.reconnect_delay_ms(), 2_000);
    assert_eq!(monitor.reconnect_deadline(), Some(13_000));

    clock.advance(2_000);
    monitor.poll();
    assert_eq!(*attempts.lock().unwrap(), vec![1, 2]);
}

#[test]
fn test_exhaustion_reports_failure_instead_of_scheduling() {
    let (mut monitor, clock) = monitor_with(fast_backoff());
    let failed = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&failed);
    monitor.on_reconnect_failed(move |n| *sink.lock().unwrap() = Some(n));

    monitor.handle_connected();
    monitor.handle_disconnected();
    for delay in [1_000, 2_000, 4_000] {
        clock.advance(delay);
        monitor.poll();
        // The last attempt is still pending until the transport answers.
        assert!(failed.lock().unwrap().is_none());
        assert_eq!(monitor.state(), ConnectionState::Reconnecting);
        monitor.handle_reconnect_failed();
    }

    assert_eq!(*failed.lock().unwrap(), Some(3));
    assert_eq!(monitor.reconnect_attempts(), 3);
    assert_eq!(monitor.reconnect_deadline(), None);
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
}

#[test]
fn test_reconnect_success_stops_chain() {
    let (mut monitor, clock) = monitor_with(fast_backoff());
    monitor.handle_connected();
    monitor.handle_disconnected();
    clock.advance(1_000);
    monitor.poll();
    monitor.handle_reconnect_failed();
    assert_eq!(monitor.reconnect_attempts(), 2);

    monitor.handle_connected();
    assert_eq!(monitor.state(), ConnectionState::Connected);
    assert_eq!(monitor.reconnect_attempts(), 0);
    assert_eq!(monitor.reconnect_delay_ms(), 1_000);
    assert_eq!(monitor.reconnect_deadline(), None);
}

#[test]
fn test_final_attempt_can_still_succeed() {
    let (mut monitor, clock) = monitor_with(MonitorConfig {
        max_reconnect_attempts: 2,
        ..fast_backoff()
    });
    let log = Arc::new(Mutex::new(Vec::new()));
    let attempt_sink = Arc::clone(&log);
    monitor.on_reconnect_attempt(move |n| {
        attempt_sink.lock().unwrap().push(format!("attempt {n}"));
    });
    let failed_sink = Arc::clone(&log);
    monitor.on_reconnect_failed(move |n| {
        failed_sink.lock().unwrap().push(format!("failed {n}"));
    });

    monitor.handle_connected();
    monitor.handle_disconnected();
    clock.advance(1_000);
    monitor.poll();
    assert_eq!(monitor.reconnect_attempts(), 1);
    monitor.handle_reconnect_failed();

    clock.advance(2_000);
    monitor.poll();
    assert_eq!(monitor.state(), ConnectionState::Reconnecting);
    assert_eq!(monitor.get_stats().reconnect_attempts, 2);

    monitor.handle_connected();
    assert_eq!(monitor.state(), ConnectionState::Connected);
    assert_eq!(*log.lock().unwrap(), vec!["attempt 1", "attempt 2"]);
}

#[test]
fn test_failure_report_ignored_while_timer_pending() {
    let (mut monitor, _) = monitor_with(fast_backoff());
    monitor.handle_connected();
    monitor.handle_disconnected();

    monitor.handle_reconnect_failed();
    assert_eq!(monitor.reconnect_attempts(), 1);
    assert_eq!(monitor.reconnect_deadline(), Some(11_000));
}

#[test]
fn test_reset_keeps_pending_attempt_number() {
    let (mut monitor, clock) = monitor_with(MonitorConfig::default());
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&attempts);
    monitor.on_reconnect_attempt(move |n| sink.lock().unwrap().push(n));

    monitor.handle_connected();
    monitor.handle_disconnected();
    monitor.reset();
    clock.advance(2_000);
    monitor.poll();

    assert_eq!(*attempts.lock().unwrap(), vec![1]);
}

#[test]
fn test_at_most_one_pending_reconnect() {
    let (mut monitor, clock) = monitor_with(MonitorConfig::default());
    monitor.attempt_reconnect();
    clock.advance(500);
    monitor.attempt_reconnect();

    // Second call replaced the first deadline rather than adding another.
    assert_eq!(monitor.reconnect_deadline(), Some(10_500 + 4_000));
    clock.set(12_000);
    monitor.poll();
    assert_eq!(monitor.reconnect_attempts(), 2);
}

#[test]
fn test_heartbeat_timeout_disconnects() {
    let (mut monitor, clock) = monitor_with(MonitorConfig::default());
    monitor.start();
    monitor.handle_connected();

    for _ in 0..3 {
        clock.advance(5_000);
        monitor.poll();
    }
    // Exactly at the timeout: not yet.
    assert_eq!(monitor.state(), ConnectionState::Connected);

    clock.advance(5_000);
    monitor.poll();
    assert_eq!(monitor.state(), ConnectionState::Reconnecting);
    assert!(monitor.is_running());
}

#[test]
fn test_received_packets_keep_link_alive() {
    let (mut monitor, clock) = monitor_with(MonitorConfig::default());
    monitor.start();
    monitor.handle_connected();

    for _ in 0..10 {
        clock.advance(5_000);
        monitor.record_packet_received();
        monitor.poll();
    }
    assert_eq!(monitor.state(), ConnectionState::Connected);
    assert_eq!(monitor.last_heartbeat(), clock.now_ms());
}

#[test]
fn test_heartbeat_ignored_while_not_connected() {
    let (mut monitor, clock) = monitor_with(MonitorConfig::default());
    monitor.start();
    clock.advance(60_000);
    monitor.poll();
    assert_eq!(monitor.state(), ConnectionState::Disconnected);
    assert_eq!(monitor.reconnect_attempts(), 0);
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let (mut monitor, clock) = monitor_with(MonitorConfig::default());
    monitor.stop();
    monitor.start();
    clock.advance(1_000);
    monitor.start();
    assert_eq!(monitor.next_deadline(), Some(16_000));

    monitor.attempt_reconnect();
    monitor.stop();
    monitor.stop();
    assert!(!monitor.is_running());
    assert_eq!(monitor.next_deadline(), None);
    monitor.clear_reconnect_timer();
}

#[test]
fn test_average_latency_of_pings() {
    let (mut monitor, _) = monitor_with(MonitorConfig::default());
    for ping in [50, 60, 70] {
        monitor.record_ping(ping);
    }
    assert_eq!(monitor.average_latency(), 60.0);
    assert_eq!(monitor.current_latency(), 70);
}

#[test]
fn test_quality_thresholds() {
    for (ping, rating) in [
        (30, QualityRating::Excellent),
        (80, QualityRating::Good),
        (150, QualityRating::Fair),
        (250, QualityRating::Poor),
    ] {
        let (mut monitor, _) = monitor_with(MonitorConfig::default());
        monitor.record_ping(ping);
        let quality = monitor.get_connection_quality();
        assert_eq!(quality.rating, rating, "ping {ping}");
        assert_eq!(quality.latency, ping);
        assert!(quality.is_stable);
    }
}

#[test]
fn test_packet_loss_feeds_quality() {
    let (mut monitor, _) = monitor_with(MonitorConfig::default());
    monitor.record_ping(20);
    for _ in 0..4 {
        monitor.record_packet_sent();
    }
    monitor.record_packet_received();
    monitor.record_packet_received();

    assert_eq!(monitor.packet_loss_rate(), 0.5);
    let quality = monitor.get_connection_quality();
    assert_eq!(quality.packet_loss, 50);
    assert_eq!(quality.rating, QualityRating::Poor);
}

#[test]
fn test_no_packets_sent_means_no_loss() {
    let (mut monitor, _) = monitor_with(MonitorConfig::default());
    monitor.record_packet_received();
    assert_eq!(monitor.packet_loss_rate(), 0.0);
}

#[test]
fn test_stats_are_rounded() {
    let (mut monitor, _) = monitor_with(MonitorConfig::default());
    for ping in [40, 41, 41] {
        monitor.record_ping(ping);
    }
    for _ in 0..3 {
        monitor.record_packet_sent();
    }
    monitor.record_packet_received();

    let stats = monitor.get_stats();
    assert_eq!(stats.average_latency, 41);
    assert_eq!(stats.current_latency, 41);
    assert_eq!(stats.packet_loss_rate, 0.67);
    assert_eq!(stats.sent_packets, 3);
    assert_eq!(stats.received_packets, 1);
    assert_eq!(stats.quality.packet_loss, 67);
    assert_eq!(stats.state, ConnectionState::Disconnected);
}

#[test]
fn test_reset_keeps_state_and_timers() {
    let (mut monitor, _) = monitor_with(MonitorConfig::default());
    monitor.start();
    monitor.handle_connected();
    monitor.handle_disconnected();
    monitor.record_ping(120);
    monitor.record_packet_sent();

    let deadline = monitor.next_deadline();
    monitor.reset();

    assert_eq!(monitor.state(), ConnectionState::Reconnecting);
    assert_eq!(monitor.next_deadline(), deadline);
    assert!(monitor.reconnect_deadline().is_some());
    assert_eq!(monitor.reconnect_attempts(), 0);
    assert_eq!(monitor.average_latency(), 0.0);
    assert_eq!(monitor.current_latency(), 0);
    assert_eq!(monitor.packets(), PacketCounters::default());
    assert_eq!(monitor.packet_loss_rate(), 0.0);
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: MonitorConfig = serde_json::from_str(r#"{"heartbeat_timeout_ms": 9000}"#).unwrap();
    assert_eq!(config.heartbeat_timeout_ms, 9_000);
    assert_eq!(config.max_reconnect_attempts, 5);
}
