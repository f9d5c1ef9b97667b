use tether_core::PeerRole;

/// Progress of one surface through a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Idle,
    /// Initiator sent `ready`, waiting for the responder's `waiting`.
    AwaitingPeer,
    /// Initiator sent its offer.
    Offering,
    /// Responder is idle and announcing `waiting`.
    Announcing,
    InCall,
    /// Initiator gave up waiting; may retry or cancel.
    TimedOut,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallInput {
    Start,
    PeerWaiting,
    OfferReceived,
    AnswerReceived,
    Occupied,
    Timeout,
    Retry,
    RemoteHangup,
    LocalHangup,
}

impl CallPhase {
    /// Next phase for `role`, or `None` when `input` does not apply.
    pub fn next(self, role: PeerRole, input: CallInput) -> Option<CallPhase> {
        use CallInput::*;
        use CallPhase::*;

        match (self, role, input) {
            (Ended, _, _) => None,
            (_, _, LocalHangup) => Some(Ended),

            (Idle, PeerRole::Initiator, Start) => Some(AwaitingPeer),
            (Idle, PeerRole::Responder, Start) => Some(Announcing),

            (AwaitingPeer, PeerRole::Initiator, PeerWaiting) => Some(Offering),
            (Offering, PeerRole::Initiator, AnswerReceived) => Some(InCall),
            (AwaitingPeer | Offering, PeerRole::Initiator, Timeout) => Some(TimedOut),
            (AwaitingPeer | Offering, PeerRole::Initiator, Occupied) => Some(Ended),
            (TimedOut, PeerRole::Initiator, Retry) => Some(AwaitingPeer),

            (Announcing | InCall, PeerRole::Responder, OfferReceived) => Some(InCall),

            (Offering | InCall, PeerRole::Initiator, RemoteHangup) => Some(Ended),
            (InCall, PeerRole::Responder, RemoteHangup) => Some(Announcing),

            _ => None,
        }
    }

    /// Phases in which the negotiation deadline runs.
    pub fn is_negotiating(self) -> bool {
        matches!(self, CallPhase::AwaitingPeer | CallPhase::Offering)
    }
}
