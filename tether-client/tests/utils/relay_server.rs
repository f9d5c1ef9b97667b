use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use tether_client::{BackoffPolicy, BusConfig, CallConfig};
use tether_server::{AppState, Relay, RelayHandle, RelaySettings, build_router};

/// Serve a relay on `listener` in the background.
pub fn serve_on(listener: TcpListener) -> RelayHandle {
    let relay = Relay::spawn(RelaySettings::default());
    let app = build_router(AppState {
        relay: relay.clone(),
        devices: None,
    });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    relay
}

pub async fn spawn_relay() -> (SocketAddr, RelayHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, serve_on(listener))
}

/// A port nothing listens on yet.
pub async fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn bus_config(addr: SocketAddr) -> BusConfig {
    BusConfig::new(format!("ws://{}/ws", addr)).with_backoff(BackoffPolicy {
        base: Duration::from_millis(20),
        cap: Duration::from_millis(200),
        max_retries: 50,
    })
}

pub fn fast_call_config() -> CallConfig {
    CallConfig {
        waiting_interval: Duration::from_millis(100),
        negotiation_timeout: Duration::from_secs(5),
        ..CallConfig::default()
    }
}
