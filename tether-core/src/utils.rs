/// Topic assigned to data frames that arrive without one.
pub const LEGACY_TOPIC: &str = "legacy";

/// Topic used for bus keepalive ping/pong frames.
pub const HEARTBEAT_TOPIC: &str = "heartbeat";

/// Reserved topic name that toggles the wildcard subscription.
pub const WILDCARD_TOPIC: &str = "*";

/// Default prefix for call room topics (`call:<roomId>`).
pub const DEFAULT_ROOM_PREFIX: &str = "call";

/// `source` / `from` value stamped on frames the relay originates itself.
pub const RELAY_SOURCE: &str = "relay";

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
