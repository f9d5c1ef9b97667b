use std::sync::Arc;
use tether_core::{ControlMessage, DataFrame};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::bus::bus_worker::BusWorker;
use crate::bus::{BusStats, BusStatsSnapshot};
use crate::config::BusConfig;
use crate::error::BusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Retries exhausted; only [`BusClient::reconnect`] starts a new cycle.
    Unreachable,
}

#[derive(Debug)]
pub(crate) enum BusCommand {
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
    Publish(String),
    Reconnect,
    Shutdown(oneshot::Sender<()>),
}

/// Handle to one shared relay connection.
///
/// Cheap to clone; all clones drive the same background worker. Publishing
/// never fails because of the network: frames sent while disconnected are
/// queued and replayed after the next successful connect.
#[derive(Clone)]
pub struct BusClient {
    commands: mpsc::UnboundedSender<BusCommand>,
    status: watch::Receiver<ConnectionStatus>,
    frames: broadcast::Sender<DataFrame>,
    acks: broadcast::Sender<ControlMessage>,
    stats: Arc<BusStats>,
    source: String,
}

impl BusClient {
    /// Spawn the worker and start connecting.
    pub fn connect(config: BusConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ConnectionStatus::Disconnected);
        let (frames, _) = broadcast::channel(1024);
        let (acks, _) = broadcast::channel(64);
        let stats = Arc::new(BusStats::default());
        let source = config.source.clone();

        let worker = BusWorker::new(
            config,
            command_rx,
            status_tx,
            frames.clone(),
            acks.clone(),
            stats.clone(),
        );
        tokio::spawn(worker.run());

        Self {
            commands,
            status,
            frames,
            acks,
            stats,
            source,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// A data frame on `topic` stamped with this client's source.
    pub fn message(&self, topic: &str) -> DataFrame {
        DataFrame::new(topic, self.source.as_str())
    }

    pub fn subscribe<I, S>(&self, topics: I) -> Result<(), BusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(BusCommand::Subscribe(
            topics.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn unsubscribe<I, S>(&self, topics: I) -> Result<(), BusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(BusCommand::Unsubscribe(
            topics.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn publish(&self, frame: &DataFrame) -> Result<(), BusError> {
        let text = frame.to_text()?;
        self.publish_text(text)
    }

    /// Send a pre-encoded frame verbatim.
    pub fn publish_text(&self, text: impl Into<String>) -> Result<(), BusError> {
        self.send(BusCommand::Publish(text.into()))
    }

    /// Start a fresh attempt cycle, or drop and re-establish a live connection.
    pub fn reconnect(&self) -> Result<(), BusError> {
        self.send(BusCommand::Reconnect)
    }

    /// Stop the worker after flushing what the open connection accepts.
    pub async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.send(BusCommand::Shutdown(done)).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn frames(&self) -> broadcast::Receiver<DataFrame> {
        self.frames.subscribe()
    }

    pub fn acks(&self) -> broadcast::Receiver<ControlMessage> {
        self.acks.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    pub fn current_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Resolve once the status equals `wanted`.
    pub async fn wait_for(&self, wanted: ConnectionStatus) -> Result<(), BusError> {
        let mut status = self.status.clone();
        status
            .wait_for(|s| *s == wanted)
            .await
            .map(|_| ())
            .map_err(|_| BusError::Closed)
    }

    pub fn stats(&self) -> BusStatsSnapshot {
        self.stats.snapshot()
    }

    fn send(&self, cmd: BusCommand) -> Result<(), BusError> {
        self.commands.send(cmd).map_err(|_| BusError::Closed)
    }
}
