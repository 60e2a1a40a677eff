//! Scripted two-player session: a local player predicted against an
//! authoritative copy of itself, a remote peer seen through interpolation,
//! and a link that drops out partway through.

use std::sync::mpsc;

use platsync_checkpoint::{CheckpointState, CheckpointStore};
use platsync_config::Config;
use platsync_core::{Clock, ManualClock};
use platsync_multiplayer::{
    Avatar, InputSample, MultiplayerSync, PlayerId, PlayerStateSnapshot, StateMessage, SyncEntity,
    decode_message, encode_message,
};
use platsync_net::{ConnectionMonitor, ConnectionState};
use tracing::{debug, info, warn};

const FRAME_MS: u64 = 16;
const GROUND_Y: f64 = 400.0;
const REMOTE_SEND_EVERY: u32 = 3;
const ACK_EVERY: u32 = 6;
const PING_EVERY: u32 = 30;
const CHECKPOINT_FRAME: u32 = 90;
/// The authoritative copy of the local player is nudged this often.
const DRIFT_EVERY: u32 = 48;
const DRIFT_PX: f64 = 14.0;
const MAX_OUTAGE_STEPS: usize = 64;

/// Knobs from the command line.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub frames: u32,
    pub latency_ms: u64,
    pub outage_frame: u32,
    /// Attempt number on which the link returns; 0 keeps it down.
    pub reconnect_after: u32,
}

enum Payload {
    /// A remote peer snapshot.
    Remote(Vec<u8>),
    /// The authoritative state of the local player after `sequence`.
    Ack { sequence: u32, bytes: Vec<u8> },
}

struct InFlight {
    deliver_at: u64,
    payload: Payload,
}

pub struct Simulation {
    scenario: Scenario,
    clock: ManualClock,
    sync: MultiplayerSync<ManualClock>,
    monitor: ConnectionMonitor<ManualClock>,
    checkpoints: CheckpointStore<ManualClock>,
    attempts: mpsc::Receiver<u32>,

    local_id: PlayerId,
    remote_id: PlayerId,
    local_state: PlayerStateSnapshot,
    local_avatar: Avatar,
    /// Server-side copy of the local player.
    authoritative: PlayerStateSnapshot,
    /// The peer's own avatar, on its side of the link.
    peer_avatar: Avatar,
    peer_state: PlayerStateSnapshot,
    /// How the peer looks on this side.
    remote_avatar: Avatar,

    in_flight: Vec<InFlight>,
    link_up: bool,
    corrections: u32,
    dropped: u32,
}

impl Simulation {
    pub fn new(config: &Config, scenario: Scenario) -> Self {
        let clock = ManualClock::new(1_000);
        let now = clock.now_ms();

        let (attempt_tx, attempts) = mpsc::channel();
        let mut monitor = ConnectionMonitor::new(config.monitor.clone(), clock.clone());
        monitor.on_connection_change(|new, old| debug!(?old, ?new, "link listener"));
        monitor.on_reconnect_attempt(move |attempt| {
            let _ = attempt_tx.send(attempt);
        });
        monitor.on_reconnect_failed(|attempts| warn!(attempts, "giving up on the link"));
        monitor.begin_connect();
        monitor.handle_connected();
        monitor.start();

        let local_state = PlayerStateSnapshot::at(100.0, GROUND_Y, now);
        let peer_state = PlayerStateSnapshot::at(600.0, GROUND_Y, now);

        Self {
            scenario,
            sync: MultiplayerSync::new(config.sync.clone(), clock.clone()),
            checkpoints: CheckpointStore::new(clock.clone()),
            monitor,
            attempts,
            local_id: PlayerId::player1(),
            remote_id: PlayerId::player2(),
            local_state,
            local_avatar: Avatar::new(local_state.x, local_state.y),
            authoritative: local_state,
            peer_avatar: Avatar::new(peer_state.x, peer_state.y),
            peer_state,
            remote_avatar: Avatar::without_body(peer_state.x, peer_state.y),
            in_flight: Vec::new(),
            link_up: true,
            corrections: 0,
            dropped: 0,
            clock,
        }
    }

    pub fn run(&mut self) {
        for frame in 0..self.scenario.frames {
            if frame == self.scenario.outage_frame {
                self.outage();
            }
            self.step(frame);
        }
    }

    fn step(&mut self, frame: u32) {
        self.clock.advance(FRAME_MS);
        let now = self.clock.now_ms();

        let input = scripted_input(frame, &self.local_state, false);
        let (sequence, mut predicted) = self.sync.predict_and_record(&self.local_state, input);
        land(&mut predicted);
        self.local_state = predicted;
        self.sync.apply_state(&mut self.local_avatar, &self.local_state, false);

        if self.link_up {
            self.monitor.record_packet_sent();
            self.simulate_server(frame, sequence, &input, now);
        }

        self.move_peer(frame, now);

        if frame % PING_EVERY == 0 && self.link_up {
            let rtt = 2 * self.scenario.latency_ms + u64::from(frame / PING_EVERY % 4) * 5;
            self.monitor.record_ping(rtt as u32);
            self.sync.update_network_stats(rtt as f64);
        }

        self.deliver(now);

        if let Some(state) = self.sync.get_interpolated_state(&self.remote_id) {
            self.sync.apply_state(&mut self.remote_avatar, &state, true);
        }

        if frame == CHECKPOINT_FRAME {
            self.save_checkpoint(frame);
        }

        self.monitor.poll();
    }

    /// Advance the authoritative copy and occasionally send it back.
    fn simulate_server(&mut self, frame: u32, sequence: u32, input: &InputSample, now: u64) {
        let mut next = self.sync.predict_state(&self.authoritative, input);
        land(&mut next);
        if frame % DRIFT_EVERY == DRIFT_EVERY - 1 {
            next.x += DRIFT_PX;
        }
        self.authoritative = next;

        if frame % ACK_EVERY == 0 {
            let message = StateMessage {
                player: self.local_id.clone(),
                state: self.authoritative,
            };
            match encode_message(&message) {
                Ok(bytes) => self.in_flight.push(InFlight {
                    deliver_at: now + 2 * self.scenario.latency_ms,
                    payload: Payload::Ack { sequence, bytes },
                }),
                Err(e) => warn!(error = %e, "failed to encode authoritative state"),
            }
        }
    }

    /// The peer runs its own physics and broadcasts every few frames.
    fn move_peer(&mut self, frame: u32, now: u64) {
        let input = scripted_input(frame, &self.peer_state, true);
        let mut next = self.sync.predict_state(&self.peer_state, &input);
        land(&mut next);
        self.peer_state = next;
        self.sync.apply_state(&mut self.peer_avatar, &next, false);

        if frame % REMOTE_SEND_EVERY != 0 || !self.link_up {
            return;
        }

        let message = StateMessage {
            player: self.remote_id.clone(),
            state: self.sync.serialize_state(&self.peer_avatar),
        };
        match encode_message(&message) {
            Ok(bytes) => self.in_flight.push(InFlight {
                deliver_at: now + self.scenario.latency_ms,
                payload: Payload::Remote(bytes),
            }),
            Err(e) => warn!(error = %e, "failed to encode peer snapshot"),
        }
    }

    fn deliver(&mut self, now: u64) {
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|packet| packet.deliver_at <= now);
        self.in_flight = pending;

        for packet in due {
            if !self.link_up {
                self.dropped += 1;
                continue;
            }
            self.monitor.record_packet_received();

            let (sequence, bytes) = match packet.payload {
                Payload::Remote(bytes) => (None, bytes),
                Payload::Ack { sequence, bytes } => (Some(sequence), bytes),
            };
            let message = match decode_message(&bytes) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "dropping undecodable packet");
                    continue;
                }
            };

            match sequence {
                Some(sequence) => self.apply_ack(sequence, &message.state),
                None => self.sync.add_state_snapshot(&message.player, message.state),
            }
        }
    }

    /// Compare the prediction made for `sequence` with the server's answer
    /// and shift the live state by whatever correction reconciliation asks for.
    fn apply_ack(&mut self, sequence: u32, server: &PlayerStateSnapshot) {
        let predicted = self
            .sync
            .pending_inputs()
            .entries()
            .iter()
            .find(|entry| entry.sequence == sequence)
            .map(|entry| entry.predicted);
        self.sync.acknowledge_inputs(sequence);

        let Some(predicted) = predicted else {
            debug!(sequence, "ack for an input no longer pending");
            return;
        };

        let corrected = self.sync.reconcile(&predicted, server);
        if corrected == predicted {
            return;
        }

        let dx = corrected.x - predicted.x;
        let dy = corrected.y - predicted.y;
        self.local_state.x += dx;
        self.local_state.y += dy;
        self.corrections += 1;
        debug!(sequence, dx, dy, "local prediction corrected");
        self.sync.apply_state(&mut self.local_avatar, &self.local_state, false);
    }

    fn save_checkpoint(&mut self, frame: u32) {
        let state = CheckpointState {
            x: self.local_state.x,
            y: self.local_state.y,
            score: u64::from(frame) * 10,
            is_powered_up: true,
            has_fire_power: false,
            is_powered_up2: Some(false),
            has_fire_power2: None,
            coins_collected: 3,
            enemies_defeated: 1,
        };
        let saved = self.checkpoints.save_checkpoint(1u32, &state);
        info!(level = %saved.level, x = saved.x, y = saved.y, "checkpoint reached");
    }

    /// Cut the link and run the monitor's timers until it reconnects or
    /// gives up.
    fn outage(&mut self) {
        warn!(at_ms = self.clock.now_ms(), "link down");
        self.link_up = false;
        self.dropped += self.in_flight.len() as u32;
        self.in_flight.clear();

        for _ in 0..MAX_OUTAGE_STEPS {
            let Some(deadline) = self.monitor.next_deadline() else {
                break;
            };
            self.clock.set(deadline);
            self.monitor.poll();

            let attempts: Vec<u32> = self.attempts.try_iter().collect();
            for attempt in attempts {
                info!(attempt, at_ms = self.clock.now_ms(), "trying to reconnect");
                if self.scenario.reconnect_after != 0 && attempt >= self.scenario.reconnect_after {
                    self.link_up = true;
                    self.monitor.handle_connected();
                    self.sync.clear_history(&self.remote_id);
                } else {
                    self.monitor.handle_reconnect_failed();
                }
            }

            match self.monitor.state() {
                ConnectionState::Connected if self.link_up => {
                    info!(at_ms = self.clock.now_ms(), "link restored");
                    return;
                }
                ConnectionState::Disconnected if self.monitor.reconnect_deadline().is_none() => {
                    return;
                }
                _ => {}
            }
        }
    }

    pub fn report(&self) {
        let stats = self.monitor.get_stats();
        info!(
            state = ?stats.state,
            latency = stats.current_latency,
            average = stats.average_latency,
            jitter = stats.jitter,
            loss = stats.packet_loss_rate,
            sent = stats.sent_packets,
            received = stats.received_packets,
            quality = %stats.quality.rating,
            stable = stats.quality.is_stable,
            "connection summary"
        );

        let net = self.sync.network_stats();
        info!(
            latency = net.latency,
            jitter = net.jitter,
            quality = %self.sync.get_connection_quality(),
            pending_inputs = self.sync.pending_inputs().len(),
            corrections = self.corrections,
            dropped = self.dropped,
            "sync summary"
        );

        let (lx, ly) = self.local_avatar.position();
        let (rx, ry) = self.remote_avatar.position();
        info!(lx, ly, rx, ry, "final positions");

        for (level, checkpoint) in self.checkpoints.get_all_checkpoints() {
            info!(
                %level,
                x = checkpoint.x,
                y = checkpoint.y,
                score = checkpoint.score,
                "stored checkpoint"
            );
        }
    }
}

/// Left/right patterns with a periodic jump. The peer runs a mirrored script.
fn scripted_input(frame: u32, current: &PlayerStateSnapshot, mirrored: bool) -> InputSample {
    let phase = frame % 120;
    let (forward, back) = (phase < 70, (80..110).contains(&phase));
    let (left, right) = if mirrored {
        (forward, back)
    } else {
        (back, forward)
    };
    InputSample {
        left,
        right,
        jump: frame % 60 == 20,
        is_on_ground: current.y >= GROUND_Y,
        delta_time_ms: FRAME_MS as f64,
    }
}

fn land(state: &mut PlayerStateSnapshot) {
    if state.y >= GROUND_Y {
        state.y = GROUND_Y;
        state.velocity_y = state.velocity_y.min(0.0);
    }
}
