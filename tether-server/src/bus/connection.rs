use tether_core::ConnectionId;
use tokio::sync::mpsc;
use tracing::warn;

use crate::bus::Subscriptions;

/// Relay-side state of one client connection.
///
/// Owns its [`Subscriptions`]; both are dropped together on disconnect.
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
    subscriptions: Subscriptions,
}

impl Connection {
    pub fn new(id: ConnectionId, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            outbound,
            subscriptions: Subscriptions::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The socket writer is still draining this connection's channel.
    pub fn is_alive(&self) -> bool {
        !self.outbound.is_closed()
    }

    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    pub fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    /// Hand a text frame to the socket writer. Never blocks.
    pub fn send(&self, text: String) -> bool {
        if self.outbound.send(text).is_err() {
            warn!("Dropping frame for closed connection {}", self.id);
            return false;
        }
        true
    }
}
