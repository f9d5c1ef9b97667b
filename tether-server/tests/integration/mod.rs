pub mod transport_tests;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::Level;

use tether_server::device::DevicePower;
use tether_server::{AppState, Relay, RelayHandle, RelaySettings, build_router};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn test_settings() -> RelaySettings {
    RelaySettings {
        zombie_timeout: Duration::from_secs(300),
        sweep_interval: Duration::from_secs(30),
        room_prefix: "call".to_owned(),
    }
}

pub fn create_test_relay() -> RelayHandle {
    Relay::spawn(test_settings())
}

/// Serve the full router on an ephemeral port.
pub async fn spawn_test_server(
    devices: Option<Arc<dyn DevicePower>>,
) -> (SocketAddr, RelayHandle) {
    let relay = create_test_relay();
    let app = build_router(AppState {
        relay: relay.clone(),
        devices,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, relay)
}
