use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::utils::epoch_ms;

/// Which side of a call a participant plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerRole {
    /// The surface that places the call and sends the offer.
    Initiator,
    /// The surface bound to the target device; announces `waiting` and answers.
    Responder,
}

impl PeerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiator => "initiator",
            Self::Responder => "responder",
        }
    }
}

/// Ephemeral per-attempt identity carried in the `from` field of signal frames.
///
/// Format: `<role>-<epoch-millis>-<random8>`. A fresh identity is minted for
/// every call attempt so stale frames from a previous attempt never match.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIdentity(pub String);

impl PeerIdentity {
    pub fn generate(role: PeerRole) -> Self {
        Self::with_timestamp(role, epoch_ms())
    }

    pub fn with_timestamp(role: PeerRole, millis: u64) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}-{}", role.as_str(), millis, &suffix[..8]))
    }

    /// Role encoded in the identity prefix, if it carries one.
    pub fn role(&self) -> Option<PeerRole> {
        match self.0.split('-').next() {
            Some("initiator") => Some(PeerRole::Initiator),
            Some("responder") => Some(PeerRole::Responder),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PeerIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
