use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tether_core::utils::{HEARTBEAT_TOPIC, epoch_ms};
use tether_core::{ControlMessage, DataFrame, Frame};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::bus::{BusCommand, BusStats, ConnectionStatus};
use crate::config::BusConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Outcome of one connect attempt.
enum Attempt {
    Open(WsStream),
    Failed(tungstenite::Error),
    Shutdown(Option<oneshot::Sender<()>>),
}

/// How a connected session ended.
enum SessionEnd {
    /// Transport dropped. `healthy` sessions received a frame or outlived one
    /// heartbeat period, and reset the failure count.
    Dropped { healthy: bool },
    /// A reconnect was requested; skips the backoff wait.
    Reconnect,
    Shutdown(Option<oneshot::Sender<()>>),
}

/// What interrupted a backoff wait.
enum Wake {
    Retry,
    Shutdown(Option<oneshot::Sender<()>>),
}

pub(crate) struct BusWorker {
    config: BusConfig,
    commands: mpsc::UnboundedReceiver<BusCommand>,
    status: watch::Sender<ConnectionStatus>,
    frames: broadcast::Sender<DataFrame>,
    acks: broadcast::Sender<ControlMessage>,
    stats: Arc<BusStats>,
    desired: BTreeSet<String>,
    queue: VecDeque<String>,
}

impl BusWorker {
    pub(crate) fn new(
        config: BusConfig,
        commands: mpsc::UnboundedReceiver<BusCommand>,
        status: watch::Sender<ConnectionStatus>,
        frames: broadcast::Sender<DataFrame>,
        acks: broadcast::Sender<ControlMessage>,
        stats: Arc<BusStats>,
    ) -> Self {
        Self {
            config,
            commands,
            status,
            frames,
            acks,
            stats,
            desired: BTreeSet::new(),
            queue: VecDeque::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        let mut failures: u32 = 0;
        let mut connected_once = false;

        let done = loop {
            self.set_status(ConnectionStatus::Connecting);

            match self.connect().await {
                Attempt::Open(ws) => {
                    if connected_once {
                        self.stats.record_reconnect();
                    }
                    connected_once = true;
                    info!("Bus connected to {}", self.config.url);
                    self.set_status(ConnectionStatus::Connected);

                    let end = self.session(ws).await;
                    self.set_status(ConnectionStatus::Disconnected);
                    match end {
                        SessionEnd::Dropped { healthy } => {
                            info!("Bus connection lost, reconnecting");
                            if healthy {
                                failures = 0;
                            }
                        }
                        SessionEnd::Reconnect => {
                            failures = 0;
                            continue;
                        }
                        SessionEnd::Shutdown(done) => break done,
                    }
                }
                Attempt::Failed(e) => {
                    warn!("Bus connect to {} failed: {}", self.config.url, e);
                    self.set_status(ConnectionStatus::Disconnected);
                }
                Attempt::Shutdown(done) => break done,
            }

            if self.config.backoff.is_exhausted(failures) {
                error!(
                    "Relay unreachable after {} retries; {} frame(s) queued",
                    failures,
                    self.queue.len()
                );
                self.set_status(ConnectionStatus::Unreachable);
                match self.park().await {
                    Wake::Retry => {
                        failures = 0;
                        continue;
                    }
                    Wake::Shutdown(done) => break done,
                }
            }

            let delay = self.config.backoff.delay_for(failures);
            failures += 1;
            debug!("Reconnecting in {:?} (attempt {})", delay, failures);

            match self.backoff(delay).await {
                Wake::Retry => {}
                Wake::Shutdown(done) => break done,
            }
        };

        if !self.queue.is_empty() {
            warn!(
                "Bus stopped with {} undelivered frame(s)",
                self.queue.len()
            );
        }
        self.set_status(ConnectionStatus::Disconnected);
        info!("Bus worker finished");
        if let Some(done) = done {
            let _ = done.send(());
        }
    }

    /// Open the socket while still taking commands, so a shutdown does not
    /// wait for the handshake.
    async fn connect(&mut self) -> Attempt {
        let connect = connect_async(self.config.url.clone());
        tokio::pin!(connect);

        loop {
            tokio::select! {
                result = &mut connect => {
                    return match result {
                        Ok((ws, _)) => Attempt::Open(ws),
                        Err(e) => Attempt::Failed(e),
                    };
                }
                cmd = self.commands.recv() => match self.handle_offline(cmd) {
                    Some(Wake::Shutdown(done)) => return Attempt::Shutdown(done),
                    Some(Wake::Retry) => debug!("Reconnect requested while connecting"),
                    None => {}
                },
            }
        }
    }

    async fn session(&mut self, ws: WsStream) -> SessionEnd {
        let (mut write, mut read) = ws.split();
        let opened = Instant::now();
        let mut received = false;

        if !self.desired.is_empty() {
            let resubscribe = ControlMessage::subscribe(self.desired.iter().cloned());
            if !self.send_control(&mut write, &resubscribe).await {
                return self.dropped(opened, received);
            }
        }

        while let Some(text) = self.queue.front().cloned() {
            if write.send(Message::Text(text.into())).await.is_err() {
                return self.dropped(opened, received);
            }
            self.queue.pop_front();
            self.stats.record_sent();
            self.stats.set_queued(self.queue.len());
        }

        let period = self.config.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else {
                        let _ = write.close().await;
                        return SessionEnd::Shutdown(None);
                    };
                    match cmd {
                        BusCommand::Shutdown(done) => {
                            let _ = write.close().await;
                            return SessionEnd::Shutdown(Some(done));
                        }
                        BusCommand::Reconnect => {
                            info!("Reconnect requested");
                            let _ = write.close().await;
                            return SessionEnd::Reconnect;
                        }
                        BusCommand::Subscribe(topics) => {
                            self.desired.extend(topics.iter().cloned());
                            if !self.send_control(&mut write, &ControlMessage::subscribe(topics)).await {
                                return self.dropped(opened, received);
                            }
                        }
                        BusCommand::Unsubscribe(topics) => {
                            for topic in &topics {
                                self.desired.remove(topic);
                            }
                            if !self.send_control(&mut write, &ControlMessage::unsubscribe(topics)).await {
                                return self.dropped(opened, received);
                            }
                        }
                        BusCommand::Publish(text) => {
                            if write.send(Message::Text(text.clone().into())).await.is_err() {
                                self.enqueue(text);
                                return self.dropped(opened, received);
                            }
                            self.stats.record_sent();
                        }
                    }
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            received = true;
                            self.dispatch(text.as_str());
                        }
                        Some(Ok(Message::Close(_))) | None => return self.dropped(opened, received),
                        Some(Err(e)) => {
                            warn!("Bus transport error: {}", e);
                            return self.dropped(opened, received);
                        }
                        _ => {}
                    }
                }

                _ = heartbeat.tick() => {
                    let ping = DataFrame::new(HEARTBEAT_TOPIC, self.config.source.as_str())
                        .with_field("type", "ping")
                        .with_field("timestamp", epoch_ms());
                    let Ok(text) = ping.to_text() else { continue };
                    if write.send(Message::Text(text.into())).await.is_err() {
                        return self.dropped(opened, received);
                    }
                    self.stats.record_ping();
                }
            }
        }
    }

    fn dropped(&self, opened: Instant, received: bool) -> SessionEnd {
        SessionEnd::Dropped {
            healthy: received || opened.elapsed() >= self.config.heartbeat_interval,
        }
    }

    /// Sleep for `delay`, still accepting commands.
    async fn backoff(&mut self, delay: std::time::Duration) -> Wake {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Wake::Retry,
                cmd = self.commands.recv() => {
                    if let Some(wake) = self.handle_offline(cmd) {
                        return wake;
                    }
                }
            }
        }
    }

    /// Wait in `Unreachable` until told to retry or stop.
    async fn park(&mut self) -> Wake {
        loop {
            let cmd = self.commands.recv().await;
            if let Some(wake) = self.handle_offline(cmd) {
                return wake;
            }
        }
    }

    fn handle_offline(&mut self, cmd: Option<BusCommand>) -> Option<Wake> {
        match cmd {
            None => Some(Wake::Shutdown(None)),
            Some(BusCommand::Shutdown(done)) => Some(Wake::Shutdown(Some(done))),
            Some(BusCommand::Reconnect) => Some(Wake::Retry),
            Some(BusCommand::Subscribe(topics)) => {
                self.desired.extend(topics);
                None
            }
            Some(BusCommand::Unsubscribe(topics)) => {
                for topic in &topics {
                    self.desired.remove(topic);
                }
                None
            }
            Some(BusCommand::Publish(text)) => {
                self.enqueue(text);
                None
            }
        }
    }

    fn enqueue(&mut self, text: String) {
        self.queue.push_back(text);
        self.stats.set_queued(self.queue.len());
        info!("Bus offline, {} frame(s) queued", self.queue.len());
    }

    async fn send_control(&self, write: &mut WsSink, msg: &ControlMessage) -> bool {
        let text = match msg.to_text() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode control frame: {}", e);
                return true;
            }
        };
        write.send(Message::Text(text.into())).await.is_ok()
    }

    fn dispatch(&self, text: &str) {
        match Frame::parse(text) {
            Ok(Frame::Control(ack @ ControlMessage::Ack { .. })) => {
                debug!("Ack received: {:?}", ack);
                let _ = self.acks.send(ack);
            }
            Ok(Frame::Control(other)) => debug!("Ignoring control frame {:?}", other),
            Ok(Frame::Data(frame)) => {
                if frame.topic() == HEARTBEAT_TOPIC && frame.kind() == Some("pong") {
                    self.stats.record_pong();
                }
                let _ = self.frames.send(frame);
            }
            Err(e) => warn!("Malformed frame from relay: {}", e),
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}
