use serde_json::Value;
use tether_core::utils::RELAY_SOURCE;
use tether_core::{DataFrame, PeerIdentity, RoomId, SignalFrame, SignalKind};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::call::{CallTracker, RoomEvent, RoomPhase, TrackerError, Transition};

/// What the relay should do with a data frame after call bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Not a room topic; route like any data frame.
    NotSignal,
    /// Room frame; route to the other room subscribers.
    Forward,
    /// Send this frame back to the sender only and drop the original.
    Reject(SignalFrame),
    Drop,
}

/// Watches signal frames on `<prefix>:<roomId>` topics and keeps the
/// [`CallTracker`] in step with them.
pub struct SignalingRelay {
    room_prefix: String,
}

impl SignalingRelay {
    pub fn new(room_prefix: impl Into<String>) -> Self {
        Self {
            room_prefix: room_prefix.into(),
        }
    }

    pub fn room_of(&self, topic: &str) -> Option<RoomId> {
        RoomId::from_topic(topic, &self.room_prefix)
    }

    pub fn room_prefix(&self) -> &str {
        &self.room_prefix
    }

    pub fn inspect(&self, frame: &DataFrame, calls: &mut CallTracker, now: Instant) -> Verdict {
        let Some(room_id) = self.room_of(frame.topic()) else {
            return Verdict::NotSignal;
        };
        let Some(kind) = frame.kind().and_then(SignalKind::parse) else {
            debug!("Forwarding untyped frame on {}", frame.topic());
            return Verdict::Forward;
        };

        let from = frame.get("from").and_then(Value::as_str).map(PeerIdentity::from);
        let sender = from.as_ref();
        let (phase, by_initiator, by_participant, by_rejected) = match calls.live(&room_id, now) {
            Some(record) => (
                record.phase,
                sender.is_some_and(|peer| &record.initiator == peer),
                sender.is_some_and(|peer| record.is_participant(peer)),
                sender.is_some_and(|peer| record.is_rejected(peer)),
            ),
            None => (RoomPhase::Idle, false, false, false),
        };

        if by_rejected {
            debug!("Dropping {:?} from rejected peer in {}", kind, room_id);
            return Verdict::Drop;
        }

        let event = match kind {
            SignalKind::Offer => {
                if from.is_none() {
                    warn!("Dropping offer without sender identity in {}", room_id);
                    return Verdict::Drop;
                }
                RoomEvent::Offer { by_initiator }
            }
            SignalKind::Answer => RoomEvent::Answer,
            SignalKind::Hangup => RoomEvent::Hangup { by_participant },
            _ => RoomEvent::Passthrough,
        };

        match phase.transition(event) {
            Transition::Start => {
                let initiator = from.unwrap_or_else(|| PeerIdentity::from(""));
                match calls.start_call(room_id.clone(), initiator, now) {
                    Ok(record) => {
                        info!("Call started in {} by {}", room_id, record.initiator);
                        Verdict::Forward
                    }
                    Err(TrackerError::RoomOccupied { initiator, .. }) => {
                        info!("Room {} occupied by {}", room_id, initiator);
                        Self::occupied()
                    }
                }
            }
            Transition::Stay => Verdict::Forward,
            Transition::Advance(next) => {
                calls.set_phase(&room_id, next);
                if let Some(answerer) = from {
                    calls.set_answerer(&room_id, answerer);
                }
                info!("Call in {} is now {:?}", room_id, next);
                Verdict::Forward
            }
            Transition::End => {
                if calls.end_call(&room_id).is_some() {
                    info!("Call ended in {}", room_id);
                }
                Verdict::Forward
            }
            Transition::Ignore => {
                info!(
                    "Ignoring hangup in {} from non-participant {}",
                    room_id,
                    sender.map_or("?", PeerIdentity::as_str)
                );
                Verdict::Drop
            }
            Transition::Reject => {
                info!(
                    "Rejecting offer in {} from {}",
                    room_id,
                    sender.map_or("?", PeerIdentity::as_str)
                );
                if let Some(peer) = from.clone() {
                    calls.reject(&room_id, peer);
                }
                Self::occupied()
            }
        }
    }

    fn occupied() -> Verdict {
        Verdict::Reject(SignalFrame::Occupied {
            from: PeerIdentity::from(RELAY_SOURCE),
        })
    }
}
