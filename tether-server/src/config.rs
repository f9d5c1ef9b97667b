use std::time::Duration;
use tether_core::utils::DEFAULT_ROOM_PREFIX;

use crate::relay::RelaySettings;

/// Configuration for the relay server.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "tether-relay", version, about = "Topic pub/sub relay with call signaling")]
pub struct RelayConfig {
    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "TETHER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3000, env = "TETHER_PORT")]
    pub port: u16,

    /// Age in seconds after which a call without hangup is discarded.
    #[arg(
        long,
        default_value_t = 300,
        env = "TETHER_ZOMBIE_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub zombie_timeout_secs: u64,

    /// Zombie sweep interval in milliseconds.
    #[arg(
        long,
        default_value_t = 30000,
        env = "TETHER_SWEEP_INTERVAL_MS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_ms: u64,

    /// Topic prefix for call rooms (`<prefix>:<roomId>`).
    #[arg(long, default_value = DEFAULT_ROOM_PREFIX, env = "TETHER_ROOM_PREFIX")]
    pub room_prefix: String,

    /// Base URL of the device power service. Without it the device endpoint
    /// answers 503.
    #[arg(long, env = "TETHER_DEVICE_UPSTREAM")]
    pub device_upstream: Option<String>,
}

impl RelayConfig {
    pub fn zombie_timeout(&self) -> Duration {
        Duration::from_secs(self.zombie_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            zombie_timeout: self.zombie_timeout(),
            sweep_interval: self.sweep_interval(),
            room_prefix: self.room_prefix.clone(),
        }
    }
}
