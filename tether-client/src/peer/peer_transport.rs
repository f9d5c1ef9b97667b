use async_trait::async_trait;
use tether_core::IceCandidate;
use tokio::sync::mpsc;

/// Connection state of the underlying media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// Locally gathered candidate to hand to the remote side.
    LocalCandidate(IceCandidate),
    StateChanged(PeerState),
}

/// One peer-to-peer media session.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self) -> anyhow::Result<String>;

    async fn accept_offer(&self, sdp: &str) -> anyhow::Result<()>;

    async fn create_answer(&self) -> anyhow::Result<String>;

    async fn accept_answer(&self, sdp: &str) -> anyhow::Result<()>;

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> anyhow::Result<()>;

    async fn close(&self) -> anyhow::Result<()>;
}

/// Builds a fresh [`PeerTransport`] for every call attempt.
#[async_trait]
pub trait PeerFactory: Send + Sync {
    async fn create(
        &self,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> anyhow::Result<Box<dyn PeerTransport>>;
}
