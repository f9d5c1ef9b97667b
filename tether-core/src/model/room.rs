use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical call channel, one per addressable remote device.
///
/// The room id doubles as the device id for the device endpoints.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Bus topic carrying this room's signal frames: `<prefix>:<roomId>`.
    pub fn topic(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self.0)
    }

    /// Inverse of [`RoomId::topic`]. Returns `None` for non-room topics.
    pub fn from_topic(topic: &str, prefix: &str) -> Option<Self> {
        let id = topic.strip_prefix(prefix)?.strip_prefix(':')?;
        if id.is_empty() {
            return None;
        }
        Some(Self(id.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
