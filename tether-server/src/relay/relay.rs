use std::collections::HashMap;
use std::time::Duration;
use tether_core::utils::{HEARTBEAT_TOPIC, RELAY_SOURCE, epoch_ms};
use tether_core::{ConnectionId, DataFrame, Frame};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::bus::{Connection, apply_control, route};
use crate::call::{CallTracker, SignalingRelay, Verdict};
use crate::relay::{RelayCommand, RelayHandle, RelaySnapshot};

/// `tokio::time::interval` panics on a zero period.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub zombie_timeout: Duration,
    pub sweep_interval: Duration,
    pub room_prefix: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            zombie_timeout: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(30),
            room_prefix: tether_core::utils::DEFAULT_ROOM_PREFIX.to_owned(),
        }
    }
}

/// Single-owner event loop holding every connection, subscription set and call
/// record. Commands are applied one at a time and never await mid-mutation.
pub struct Relay {
    connections: HashMap<ConnectionId, Connection>,
    calls: CallTracker,
    signaling: SignalingRelay,
    command_rx: mpsc::Receiver<RelayCommand>,
    sweep_interval: Duration,
}

impl Relay {
    pub fn new(settings: RelaySettings, command_rx: mpsc::Receiver<RelayCommand>) -> Self {
        Self {
            connections: HashMap::new(),
            calls: CallTracker::new(settings.zombie_timeout),
            signaling: SignalingRelay::new(settings.room_prefix),
            command_rx,
            sweep_interval: settings.sweep_interval,
        }
    }

    /// Start the loop on the current runtime.
    pub fn spawn(settings: RelaySettings) -> RelayHandle {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(Relay::new(settings, rx).run());
        RelayHandle::new(tx)
    }

    pub async fn run(mut self) {
        info!("Relay event loop started");

        let mut sweep = tokio::time::interval(self.sweep_interval.max(MIN_SWEEP_INTERVAL));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = sweep.tick() => self.sweep(),

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c),
                        None => {
                            info!("Command channel closed. Shutting down relay.");
                            break;
                        }
                    }
                }
            }
        }

        info!("Relay event loop finished");
    }

    fn handle_command(&mut self, cmd: RelayCommand) {
        match cmd {
            RelayCommand::Connect { conn_id, outbound } => {
                info!("Client connected: {}", conn_id);
                self.connections
                    .insert(conn_id, Connection::new(conn_id, outbound));
            }

            RelayCommand::Frame { conn_id, text } => self.handle_frame(conn_id, text),

            RelayCommand::Disconnect { conn_id } => {
                if self.connections.remove(&conn_id).is_some() {
                    info!("Client disconnected: {}", conn_id);
                }
            }

            RelayCommand::HasActiveCall { room_id, reply } => {
                let active = self.calls.has_active_call(&room_id, Instant::now());
                let _ = reply.send(active);
            }

            RelayCommand::Subscriptions { conn_id, reply } => {
                let current = self
                    .connections
                    .get(&conn_id)
                    .map(|conn| conn.subscriptions().current());
                let _ = reply.send(current);
            }

            RelayCommand::Snapshot { reply } => {
                self.sweep();
                let _ = reply.send(RelaySnapshot {
                    connections: self.connections.len(),
                    active_calls: self.calls.len(),
                });
            }
        }
    }

    fn handle_frame(&mut self, conn_id: ConnectionId, text: String) {
        let frame = match Frame::parse(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Malformed frame from {}: {}", conn_id, e);
                return;
            }
        };

        match frame {
            Frame::Control(msg) => {
                let Some(conn) = self.connections.get_mut(&conn_id) else {
                    warn!("Control frame from unknown connection {}", conn_id);
                    return;
                };
                let Some(ack) = apply_control(msg, conn.subscriptions_mut()) else {
                    return;
                };
                match ack.to_text() {
                    Ok(json) => {
                        conn.send(json);
                    }
                    Err(e) => error!("Failed to serialize ack: {}", e),
                }
            }

            Frame::Data(data) => {
                if data.topic() == HEARTBEAT_TOPIC && data.kind() == Some("ping") {
                    self.send_pong(conn_id);
                }

                match self.signaling.inspect(&data, &mut self.calls, Instant::now()) {
                    Verdict::NotSignal => self.fan_out(data.topic(), &text, None),
                    Verdict::Forward => self.fan_out(data.topic(), &text, Some(conn_id)),
                    Verdict::Reject(reply) => {
                        match reply.to_data_frame(data.topic(), RELAY_SOURCE) {
                            Ok(frame) => self.send_frame(conn_id, &frame),
                            Err(e) => error!("Failed to build rejection: {}", e),
                        }
                    }
                    Verdict::Drop => {}
                }
            }
        }
    }

    /// Deliver `text` verbatim to every subscriber of `topic`.
    fn fan_out(&self, topic: &str, text: &str, exclude: Option<ConnectionId>) {
        let targets = route(topic, self.connections.values());
        debug!("Routing {} to {} connection(s)", topic, targets.len());

        for id in targets {
            if Some(id) == exclude {
                continue;
            }
            if let Some(conn) = self.connections.get(&id) {
                conn.send(text.to_owned());
            }
        }
    }

    fn send_pong(&self, conn_id: ConnectionId) {
        let pong = DataFrame::new(HEARTBEAT_TOPIC, RELAY_SOURCE)
            .with_field("type", "pong")
            .with_field("timestamp", epoch_ms());
        self.send_frame(conn_id, &pong);
    }

    fn send_frame(&self, conn_id: ConnectionId, frame: &DataFrame) {
        let Some(conn) = self.connections.get(&conn_id) else {
            return;
        };
        match frame.to_text() {
            Ok(json) => {
                conn.send(json);
            }
            Err(e) => error!("Failed to serialize frame for {}: {}", conn_id, e),
        }
    }

    fn sweep(&mut self) {
        for record in self.calls.sweep(Instant::now()) {
            info!(
                "Cleared zombie call in {} started by {}",
                record.room_id, record.initiator
            );
        }
    }
}
