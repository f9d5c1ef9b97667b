use serde_json::json;
use std::time::Duration;
use tether_client::{BackoffPolicy, BusClient, BusConfig, ConnectionStatus};
use tether_core::ControlMessage;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::integration::{WAIT, init_tracing, recv_topic, wait_until};
use crate::utils::{
    FlakyProxy, bus_config, free_addr, serve_on, spawn_dropping_server, spawn_relay,
};

async fn next_ack(acks: &mut broadcast::Receiver<ControlMessage>) -> Vec<String> {
    match timeout(WAIT, acks.recv()).await.unwrap().unwrap() {
        ControlMessage::Ack {
            current_subscriptions,
            ..
        } => current_subscriptions,
        other => panic!("expected ack, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resubscribe_after_reconnect() {
    init_tracing();
    let (addr, _relay) = spawn_relay().await;

    let bus = BusClient::connect(bus_config(addr));
    let mut acks = bus.acks();
    timeout(WAIT, bus.wait_for(ConnectionStatus::Connected))
        .await
        .unwrap()
        .unwrap();

    bus.subscribe(["news", "alerts"]).unwrap();
    assert_eq!(next_ack(&mut acks).await, vec!["alerts", "news"]);

    bus.reconnect().unwrap();
    assert_eq!(next_ack(&mut acks).await, vec!["alerts", "news"]);
    assert_eq!(bus.stats().reconnects, 1);

    let publisher = BusClient::connect(bus_config(addr).with_source("publisher"));
    let mut frames = bus.frames();
    publisher
        .publish(&publisher.message("news").with_field("headline", "hi"))
        .unwrap();

    let frame = recv_topic(&mut frames, "news").await;
    assert_eq!(frame.get("headline"), Some(&json!("hi")));
    assert_eq!(frame.source(), Some("publisher"));
}

#[tokio::test]
async fn test_unreachable_after_retries() {
    init_tracing();
    let addr = free_addr().await;

    let config = BusConfig::new(format!("ws://{}/ws", addr)).with_backoff(BackoffPolicy {
        base: Duration::from_millis(10),
        cap: Duration::from_millis(20),
        max_retries: 2,
    });
    let bus = BusClient::connect(config);
    timeout(WAIT, bus.wait_for(ConnectionStatus::Unreachable))
        .await
        .unwrap()
        .unwrap();

    // Stays parked until asked.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(bus.current_status(), ConnectionStatus::Unreachable);

    serve_on(TcpListener::bind(addr).await.unwrap());
    bus.reconnect().unwrap();
    timeout(WAIT, bus.wait_for(ConnectionStatus::Connected))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_dropped_sessions_back_off() {
    init_tracing();
    let (addr, accepted) = spawn_dropping_server().await;
    let base = Duration::from_millis(200);

    let config = BusConfig::new(format!("ws://{}/ws", addr)).with_backoff(BackoffPolicy {
        base,
        cap: Duration::from_secs(2),
        max_retries: 10,
    });
    let bus = BusClient::connect(config);
    tokio::time::sleep(Duration::from_millis(700)).await;
    bus.shutdown().await;

    // Attempts land at roughly 0, 200 and 600 ms.
    let attempts = accepted.lock().unwrap().clone();
    assert!(
        (2..=3).contains(&attempts.len()),
        "expected 2-3 attempts, got {}",
        attempts.len()
    );
    for pair in attempts.windows(2) {
        assert!(pair[1] - pair[0] >= base - Duration::from_millis(20));
    }
}

#[tokio::test]
async fn test_relay_restart_flushes_queue_in_order() {
    init_tracing();
    let (relay_addr, _relay) = spawn_relay().await;
    let mut proxy = FlakyProxy::start(relay_addr).await;

    let observer = BusClient::connect(bus_config(relay_addr).with_source("observer"));
    let mut observed = observer.frames();
    let mut observer_acks = observer.acks();
    observer.subscribe(["news"]).unwrap();
    next_ack(&mut observer_acks).await;

    let config = BusConfig::new(format!("ws://{}/ws", proxy.addr)).with_backoff(BackoffPolicy {
        base: Duration::from_millis(50),
        cap: Duration::from_millis(200),
        max_retries: 50,
    });
    let bus = BusClient::connect(config.with_source("flaky"));
    let mut acks = bus.acks();
    bus.subscribe(["alerts"]).unwrap();
    assert_eq!(next_ack(&mut acks).await, vec!["alerts"]);

    proxy.cut();
    let mut status = bus.status();
    timeout(WAIT, status.wait_for(|s| *s != ConnectionStatus::Connected))
        .await
        .unwrap()
        .unwrap();

    for seq in 0..3 {
        bus.publish(&bus.message("news").with_field("seq", seq)).unwrap();
    }
    wait_until(|| bus.stats().queued == 3).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(proxy.accepted().len(), 1, "no connection while the relay is gone");

    proxy.restore().await;
    assert_eq!(next_ack(&mut acks).await, vec!["alerts"]);
    for seq in 0..3 {
        let frame = recv_topic(&mut observed, "news").await;
        assert_eq!(frame.get("seq"), Some(&json!(seq)));
        assert_eq!(frame.source(), Some("flaky"));
    }
    assert_eq!(bus.stats().queued, 0);
    assert_eq!(bus.stats().reconnects, 1);
    assert_eq!(proxy.accepted().len(), 2);

    let mut frames = bus.frames();
    observer
        .publish(&observer.message("alerts").with_field("level", "high"))
        .unwrap();
    let alert = recv_topic(&mut frames, "alerts").await;
    assert_eq!(alert.get("level"), Some(&json!("high")));
}
