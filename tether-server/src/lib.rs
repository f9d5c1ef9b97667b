//! Topic pub/sub relay with call signaling and termination veto.

pub mod bus;
pub mod call;
pub mod config;
pub mod device;
pub mod error;
pub mod relay;
pub mod transport;

pub use bus::*;
pub use call::*;
pub use relay::*;
pub use transport::*;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::RelayConfig;
use crate::device::{DevicePower, ProxyDevicePower};

/// Run the relay server until Ctrl-C.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let relay = Relay::spawn(config.relay_settings());

    let devices = config
        .device_upstream
        .as_deref()
        .map(|url| Arc::new(ProxyDevicePower::new(url)) as Arc<dyn DevicePower>);

    let app = build_router(AppState { relay, devices });

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Relay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    Ok(())
}
