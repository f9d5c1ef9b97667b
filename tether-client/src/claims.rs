use tether_core::{Claim, ClaimBroadcaster};
use tokio::sync::broadcast;
use tracing::debug;

/// In-process stand-in for a same-origin broadcast channel: every surface
/// sharing a hub sees every claim.
#[derive(Clone, Debug)]
pub struct LocalClaimHub {
    tx: broadcast::Sender<Claim>,
}

impl LocalClaimHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Claim> {
        self.tx.subscribe()
    }
}

impl Default for LocalClaimHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimBroadcaster for LocalClaimHub {
    fn is_available(&self) -> bool {
        true
    }

    fn post(&self, claim: &Claim) {
        debug!("Claim {} for tab {}", claim.room_id, claim.tab_id);
        let _ = self.tx.send(claim.clone());
    }
}
