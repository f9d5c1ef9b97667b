//! Cross-tab ownership of a room's terminating side effect.
//!
//! Several surfaces (browser tabs) may have the same room open. Each one keeps
//! an [`OwnershipArbiter`]; claiming a room broadcasts a [`Claim`] and every
//! other arbiter that observes it gives up ownership. Only the owner powers the
//! device down on hangup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub room_id: String,
    pub tab_id: String,
}

/// Same-origin broadcast primitive shared between surfaces.
///
/// Implementations deliver posted claims to every *other* surface; delivery of
/// incoming claims is wired by the implementation into
/// [`OwnershipArbiter::observe`].
pub trait ClaimBroadcaster {
    /// `false` when the runtime has no cross-surface channel at all.
    fn is_available(&self) -> bool;

    fn post(&self, claim: &Claim);
}

impl<T: ClaimBroadcaster + ?Sized> ClaimBroadcaster for Box<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn post(&self, claim: &Claim) {
        (**self).post(claim)
    }
}

/// Broadcaster for runtimes without any cross-surface primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBroadcast;

impl ClaimBroadcaster for NoBroadcast {
    fn is_available(&self) -> bool {
        false
    }

    fn post(&self, _claim: &Claim) {}
}

pub struct OwnershipArbiter<B> {
    tab_id: String,
    broadcaster: B,
    owned: HashSet<String>,
}

impl<B: ClaimBroadcaster> OwnershipArbiter<B> {
    pub fn new(tab_id: impl Into<String>, broadcaster: B) -> Self {
        Self {
            tab_id: tab_id.into(),
            broadcaster,
            owned: HashSet::new(),
        }
    }

    /// Arbiter with a random tab identity.
    pub fn with_broadcaster(broadcaster: B) -> Self {
        Self::new(Uuid::new_v4().to_string(), broadcaster)
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }

    /// Become owner of `room_id` and tell the other surfaces. Last claim wins.
    pub fn claim(&mut self, room_id: &str) -> Claim {
        self.owned.insert(room_id.to_owned());
        let claim = Claim {
            room_id: room_id.to_owned(),
            tab_id: self.tab_id.clone(),
        };
        if self.broadcaster.is_available() {
            self.broadcaster.post(&claim);
        }
        claim
    }

    /// Apply a claim received from another surface.
    pub fn observe(&mut self, claim: &Claim) {
        if claim.tab_id != self.tab_id {
            self.owned.remove(&claim.room_id);
        }
    }

    /// Whether this surface may issue the terminating side effect.
    ///
    /// Without a broadcast primitive every surface is owner.
    pub fn is_owner(&self, room_id: &str) -> bool {
        if !self.broadcaster.is_available() {
            return true;
        }
        self.owned.contains(room_id)
    }

    pub fn release(&mut self, room_id: &str) {
        self.owned.remove(room_id);
    }
}
