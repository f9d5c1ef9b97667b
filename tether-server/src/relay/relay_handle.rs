use tether_core::{ConnectionId, RoomId};
use tokio::sync::{mpsc, oneshot};

use crate::error::RelayError;
use crate::relay::{RelayCommand, RelaySnapshot};

/// Cloneable sender side of the relay loop.
#[derive(Clone, Debug)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    pub fn new(tx: mpsc::Sender<RelayCommand>) -> Self {
        Self { tx }
    }

    pub async fn connect(
        &self,
        conn_id: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
    ) -> Result<(), RelayError> {
        self.send(RelayCommand::Connect { conn_id, outbound }).await
    }

    pub async fn frame(&self, conn_id: ConnectionId, text: String) -> Result<(), RelayError> {
        self.send(RelayCommand::Frame { conn_id, text }).await
    }

    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), RelayError> {
        self.send(RelayCommand::Disconnect { conn_id }).await
    }

    pub async fn has_active_call(&self, room_id: &RoomId) -> Result<bool, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::HasActiveCall {
            room_id: room_id.clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RelayError::Closed)
    }

    pub async fn subscriptions(
        &self,
        conn_id: ConnectionId,
    ) -> Result<Option<Vec<String>>, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Subscriptions { conn_id, reply }).await?;
        rx.await.map_err(|_| RelayError::Closed)
    }

    /// Also a barrier: every command sent before it has been applied.
    pub async fn snapshot(&self) -> Result<RelaySnapshot, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| RelayError::Closed)
    }

    async fn send(&self, cmd: RelayCommand) -> Result<(), RelayError> {
        self.tx.send(cmd).await.map_err(|_| RelayError::Closed)
    }
}
