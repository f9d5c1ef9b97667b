/// Relay-side view of a room's call lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Idle,
    Negotiating,
    Active,
}

/// Signal observed on a room topic, reduced to what drives the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// `by_initiator` is true when the offer comes from the peer that started
    /// the current call.
    Offer { by_initiator: bool },
    Answer,
    /// `by_participant` is true when the sender started or answered the
    /// current call.
    Hangup { by_participant: bool },
    /// Ready, waiting, candidate, mute-state and anything else on the topic.
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Record a new call, phase becomes `Negotiating`.
    Start,
    Stay,
    Advance(RoomPhase),
    End,
    /// Drop the frame without touching the record.
    Ignore,
    /// Answer the sender with `occupied` and drop its frame.
    Reject,
}

impl RoomPhase {
    pub fn transition(self, event: RoomEvent) -> Transition {
        use RoomEvent::*;
        use RoomPhase::*;

        match (self, event) {
            (Idle, Offer { .. }) => Transition::Start,
            (Negotiating | Active, Offer { by_initiator: true }) => Transition::Stay,
            (Negotiating | Active, Offer { by_initiator: false }) => Transition::Reject,
            (Negotiating, Answer) => Transition::Advance(Active),
            (Idle | Active, Answer) => Transition::Stay,
            (Idle, Hangup { .. }) => Transition::End,
            (Negotiating | Active, Hangup { by_participant: true }) => Transition::End,
            (Negotiating | Active, Hangup { by_participant: false }) => Transition::Ignore,
            (_, Passthrough) => Transition::Stay,
        }
    }
}
