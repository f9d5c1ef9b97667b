/// Offer/answer progress of a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    HaveLocalOffer,
    Stable,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOp {
    CreateOffer,
    RemoteOffer,
    RemoteAnswer,
    Close,
}

impl NegotiationState {
    /// Next state, or `None` when `op` is not allowed here.
    pub fn apply(self, op: NegotiationOp) -> Option<NegotiationState> {
        use NegotiationOp::*;
        use NegotiationState::*;

        match (self, op) {
            (Idle | Closed | Stable | HaveLocalOffer, CreateOffer) => Some(HaveLocalOffer),
            (Idle | Closed | Stable, RemoteOffer) => Some(Stable),
            (HaveLocalOffer, RemoteAnswer) => Some(Stable),
            (_, Close) => Some(Closed),
            _ => None,
        }
    }

    /// Whether a remote description has been accepted.
    pub fn has_remote(self) -> bool {
        self == NegotiationState::Stable
    }
}
