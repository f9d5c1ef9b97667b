use std::time::Duration;
use tether_client::{BackoffPolicy, BusClient, BusConfig, ConnectionStatus};
use tokio::net::TcpListener;
use tokio::time::timeout;

use crate::integration::{init_tracing, wait_until};
use crate::utils::{bus_config, free_addr, spawn_silent_server};

#[tokio::test]
async fn test_shutdown_interrupts_pending_connect() {
    init_tracing();
    let (addr, accepted) = spawn_silent_server().await;

    let bus = BusClient::connect(bus_config(addr));
    wait_until(|| accepted.lock().unwrap().len() == 1).await;
    assert_eq!(bus.current_status(), ConnectionStatus::Connecting);

    timeout(Duration::from_secs(1), bus.shutdown())
        .await
        .expect("shutdown waited for the handshake");
    assert_eq!(bus.current_status(), ConnectionStatus::Disconnected);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(accepted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_no_connection_after_shutdown_during_backoff() {
    init_tracing();
    let addr = free_addr().await;

    let config = BusConfig::new(format!("ws://{}/ws", addr)).with_backoff(BackoffPolicy {
        base: Duration::from_millis(300),
        cap: Duration::from_millis(300),
        max_retries: 50,
    });
    let bus = BusClient::connect(config);
    // The refused attempt fails at once; the worker is now in its 300 ms wait.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(bus.current_status(), ConnectionStatus::Disconnected);

    timeout(Duration::from_secs(1), bus.shutdown())
        .await
        .expect("shutdown waited out the backoff");

    let listener = TcpListener::bind(addr).await.unwrap();
    let accepted = timeout(Duration::from_millis(500), listener.accept()).await;
    assert!(accepted.is_err(), "bus connected after shutdown");
}
