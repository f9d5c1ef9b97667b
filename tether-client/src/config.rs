use std::time::Duration;
use tether_core::utils::DEFAULT_ROOM_PREFIX;

use crate::backoff::BackoffPolicy;

#[derive(Debug, Clone)]
pub struct BusConfig {
    /// WebSocket endpoint of the relay, e.g. `ws://127.0.0.1:3000/ws`.
    pub url: String,
    /// Stamped as `source` on frames built through the client.
    pub source: String,
    pub backoff: BackoffPolicy,
    pub heartbeat_interval: Duration,
}

impl BusConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000/ws".to_owned(),
            source: "tether".to_owned(),
            backoff: BackoffPolicy::default(),
            heartbeat_interval: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallConfig {
    pub room_prefix: String,
    /// Period of the responder's `waiting` announcement.
    pub waiting_interval: Duration,
    /// How long an initiator waits for `waiting` + `answer`.
    pub negotiation_timeout: Duration,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            room_prefix: DEFAULT_ROOM_PREFIX.to_owned(),
            waiting_interval: Duration::from_secs(2),
            negotiation_timeout: Duration::from_secs(20),
        }
    }
}
