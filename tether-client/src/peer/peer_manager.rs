use std::collections::VecDeque;
use std::sync::Arc;
use tether_core::IceCandidate;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::NegotiationError;
use crate::peer::{NegotiationOp, NegotiationState, PeerEvent, PeerFactory, PeerState, PeerTransport};

/// Owns the media session of one call and orders remote candidates behind
/// the remote description.
pub struct PeerConnectionManager {
    factory: Arc<dyn PeerFactory>,
    events: mpsc::UnboundedSender<PeerEvent>,
    transport: Option<Box<dyn PeerTransport>>,
    negotiation: NegotiationState,
    pending: VecDeque<IceCandidate>,
    state: watch::Sender<PeerState>,
}

impl PeerConnectionManager {
    /// Transport events are forwarded to `events`.
    pub fn new(factory: Arc<dyn PeerFactory>, events: mpsc::UnboundedSender<PeerEvent>) -> Self {
        let (state, _) = watch::channel(PeerState::New);
        Self {
            factory,
            events,
            transport: None,
            negotiation: NegotiationState::Idle,
            pending: VecDeque::new(),
            state,
        }
    }

    pub fn negotiation(&self) -> NegotiationState {
        self.negotiation
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending.len()
    }

    pub fn state(&self) -> watch::Receiver<PeerState> {
        self.state.subscribe()
    }

    /// Record a transport state change reported through the event channel.
    pub fn observe_state(&self, state: PeerState) {
        self.state.send_replace(state);
    }

    pub async fn create_offer(&mut self) -> Result<String, NegotiationError> {
        let next = self.check(NegotiationOp::CreateOffer)?;
        let sdp = self.transport().await?.create_offer().await?;
        self.negotiation = next;
        Ok(sdp)
    }

    /// Accept a remote offer and produce the answer.
    pub async fn handle_offer(&mut self, sdp: &str) -> Result<String, NegotiationError> {
        let next = self.check(NegotiationOp::RemoteOffer)?;
        self.transport().await?.accept_offer(sdp).await?;
        self.negotiation = next;
        self.flush_pending().await;

        let answer = self.transport().await?.create_answer().await?;
        Ok(answer)
    }

    pub async fn handle_answer(&mut self, sdp: &str) -> Result<(), NegotiationError> {
        let next = self.check(NegotiationOp::RemoteAnswer)?;
        self.transport().await?.accept_answer(sdp).await?;
        self.negotiation = next;
        self.flush_pending().await;
        Ok(())
    }

    /// Applied immediately once a remote description is in place, queued
    /// before that.
    pub async fn add_ice_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), NegotiationError> {
        let ready = self.negotiation.has_remote() && self.transport.is_some();
        let Some(transport) = self.transport.as_ref().filter(|_| ready) else {
            self.pending.push_back(candidate);
            debug!("Queued remote candidate ({} pending)", self.pending.len());
            return Ok(());
        };
        transport.add_ice_candidate(&candidate).await?;
        Ok(())
    }

    /// Drop the session and any queued candidates. Safe to call repeatedly.
    pub async fn reset(&mut self) {
        self.pending.clear();
        if let Some(transport) = self.transport.take() {
            info!("Closing peer connection");
            if let Err(e) = transport.close().await {
                warn!("Failed to close peer connection: {:#}", e);
            }
        }
        self.negotiation = NegotiationState::Closed;
        self.state.send_replace(PeerState::Closed);
    }

    fn check(&self, op: NegotiationOp) -> Result<NegotiationState, NegotiationError> {
        self.negotiation
            .apply(op)
            .ok_or(NegotiationError::InvalidTransition {
                state: self.negotiation,
                op,
            })
    }

    async fn transport(&mut self) -> Result<&dyn PeerTransport, NegotiationError> {
        if self.transport.is_none() {
            let transport = self.factory.create(self.events.clone()).await?;
            self.state.send_replace(PeerState::New);
            self.transport = Some(transport);
        }
        match self.transport.as_deref() {
            Some(transport) => Ok(transport),
            None => Err(NegotiationError::Transport(anyhow::anyhow!(
                "peer transport missing"
            ))),
        }
    }

    /// Apply every queued candidate in arrival order, exactly once.
    async fn flush_pending(&mut self) {
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        if !self.pending.is_empty() {
            debug!("Flushing {} queued candidate(s)", self.pending.len());
        }
        while let Some(candidate) = self.pending.pop_front() {
            if let Err(e) = transport.add_ice_candidate(&candidate).await {
                warn!("Dropping queued candidate: {:#}", e);
            }
        }
    }
}
