use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tether_core::{PeerIdentity, RoomId};
use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

use crate::call::RoomPhase;

#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub room_id: RoomId,
    pub initiator: PeerIdentity,
    /// Peer whose answer moved the call to `Active`.
    pub answerer: Option<PeerIdentity>,
    /// Peers that were answered with `occupied` while this call held the room.
    pub rejected: HashSet<PeerIdentity>,
    pub started_at: Instant,
    pub phase: RoomPhase,
}

impl CallRecord {
    pub fn is_participant(&self, peer: &PeerIdentity) -> bool {
        &self.initiator == peer || self.answerer.as_ref() == Some(peer)
    }

    pub fn is_rejected(&self, peer: &PeerIdentity) -> bool {
        self.rejected.contains(peer)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TrackerError {
    #[error("room {room_id} already hosts a call started by {initiator}")]
    RoomOccupied {
        room_id: RoomId,
        initiator: PeerIdentity,
    },
}

/// At most one call per room, with time-based expiry of calls whose hangup
/// never arrived.
pub struct CallTracker {
    calls: HashMap<RoomId, CallRecord>,
    zombie_timeout: Duration,
}

impl CallTracker {
    pub fn new(zombie_timeout: Duration) -> Self {
        Self {
            calls: HashMap::new(),
            zombie_timeout,
        }
    }

    pub fn start_call(
        &mut self,
        room_id: RoomId,
        initiator: PeerIdentity,
        now: Instant,
    ) -> Result<CallRecord, TrackerError> {
        if let Some(existing) = self.live(&room_id, now) {
            return Err(TrackerError::RoomOccupied {
                room_id,
                initiator: existing.initiator.clone(),
            });
        }

        let record = CallRecord {
            room_id: room_id.clone(),
            initiator,
            answerer: None,
            rejected: HashSet::new(),
            started_at: now,
            phase: RoomPhase::Negotiating,
        };
        self.calls.insert(room_id, record.clone());
        Ok(record)
    }

    /// Idempotent; returns the removed record if there was one.
    pub fn end_call(&mut self, room_id: &RoomId) -> Option<CallRecord> {
        self.calls.remove(room_id)
    }

    /// Expired records are purged before answering.
    pub fn has_active_call(&mut self, room_id: &RoomId, now: Instant) -> bool {
        self.live(room_id, now).is_some()
    }

    /// Current record for `room_id`, after purging it if expired.
    pub fn live(&mut self, room_id: &RoomId, now: Instant) -> Option<&CallRecord> {
        let expired = self
            .calls
            .get(room_id)
            .is_some_and(|record| self.is_expired(record, now));
        if expired {
            if let Some(record) = self.calls.remove(room_id) {
                info!(
                    "Dropped expired call in {} started by {}",
                    record.room_id, record.initiator
                );
            }
            return None;
        }
        self.calls.get(room_id)
    }

    pub fn set_phase(&mut self, room_id: &RoomId, phase: RoomPhase) {
        if let Some(record) = self.calls.get_mut(room_id) {
            record.phase = phase;
        }
    }

    /// The first answer wins; later ones keep the recorded answerer.
    pub fn set_answerer(&mut self, room_id: &RoomId, answerer: PeerIdentity) {
        if let Some(record) = self.calls.get_mut(room_id) {
            record.answerer.get_or_insert(answerer);
        }
    }

    pub fn reject(&mut self, room_id: &RoomId, peer: PeerIdentity) {
        if let Some(record) = self.calls.get_mut(room_id) {
            record.rejected.insert(peer);
        }
    }

    /// Remove every call older than the zombie timeout.
    pub fn sweep(&mut self, now: Instant) -> Vec<CallRecord> {
        let expired: Vec<RoomId> = self
            .calls
            .values()
            .filter(|record| self.is_expired(record, now))
            .map(|record| record.room_id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|room_id| self.calls.remove(room_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    fn is_expired(&self, record: &CallRecord, now: Instant) -> bool {
        now.saturating_duration_since(record.started_at) >= self.zombie_timeout
    }
}
