use tether_core::{ConnectionId, RoomId};
use tokio::sync::{mpsc, oneshot};

/// Commands delivered to the relay loop by socket tasks and HTTP handlers.
#[derive(Debug)]
pub enum RelayCommand {
    /// A socket was accepted; `outbound` feeds its writer task.
    Connect {
        conn_id: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
    },

    /// One inbound text frame, exactly as received.
    Frame { conn_id: ConnectionId, text: String },

    Disconnect { conn_id: ConnectionId },

    HasActiveCall {
        room_id: RoomId,
        reply: oneshot::Sender<bool>,
    },

    /// Current subscriptions of a connection, `None` if unknown.
    Subscriptions {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Option<Vec<String>>>,
    },

    Snapshot { reply: oneshot::Sender<RelaySnapshot> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySnapshot {
    pub connections: usize,
    pub active_calls: usize,
}
