use std::time::Duration;
use tether_core::{RoomId, SignalFrame};
use tether_server::{Relay, RelaySettings};

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::FakeConnection;

fn offer(from: &str) -> SignalFrame {
    SignalFrame::Offer {
        from: from.into(),
        sdp: "v=0".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_sweep_clears_calls_without_hangup() {
    init_tracing();
    let relay = create_test_relay();
    let caller = FakeConnection::connect(&relay).await;

    caller.signal("call:tv", offer("initiator-1")).await;
    assert_eq!(relay.snapshot().await.unwrap().active_calls, 1);

    tokio::time::advance(Duration::from_secs(200)).await;
    assert_eq!(relay.snapshot().await.unwrap().active_calls, 1);

    tokio::time::advance(Duration::from_secs(131)).await;
    assert_eq!(relay.snapshot().await.unwrap().active_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn test_expired_call_reads_inactive_before_sweep() {
    init_tracing();
    let relay = Relay::spawn(RelaySettings {
        zombie_timeout: Duration::from_secs(300),
        sweep_interval: Duration::from_secs(3600),
        room_prefix: "call".to_owned(),
    });
    let room = RoomId::new("tv");

    let caller = FakeConnection::connect(&relay).await;
    let mut late = FakeConnection::connect(&relay).await;
    late.subscribe(&["call:tv"]).await;

    caller.signal("call:tv", offer("initiator-1")).await;
    late.recv().await;
    assert!(relay.has_active_call(&room).await.unwrap());

    tokio::time::advance(Duration::from_secs(301)).await;
    assert!(!relay.has_active_call(&room).await.unwrap());

    caller.signal("call:tv", offer("initiator-2")).await;
    assert_eq!(late.recv().await["from"], serde_json::json!("initiator-2"));
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_does_not_count_expired_calls() {
    init_tracing();
    let relay = Relay::spawn(RelaySettings {
        zombie_timeout: Duration::from_secs(300),
        sweep_interval: Duration::from_secs(3600),
        room_prefix: "call".to_owned(),
    });
    let caller = FakeConnection::connect(&relay).await;

    caller.signal("call:tv", offer("initiator-1")).await;
    caller.signal("call:kitchen", offer("initiator-2")).await;
    assert_eq!(relay.snapshot().await.unwrap().active_calls, 2);

    tokio::time::advance(Duration::from_secs(301)).await;
    assert_eq!(relay.snapshot().await.unwrap().active_calls, 0);
}

#[tokio::test]
async fn test_zero_sweep_interval_keeps_relay_alive() {
    init_tracing();
    let relay = Relay::spawn(RelaySettings {
        zombie_timeout: Duration::from_secs(300),
        sweep_interval: Duration::ZERO,
        room_prefix: "call".to_owned(),
    });
    let caller = FakeConnection::connect(&relay).await;

    caller.signal("call:tv", offer("initiator-1")).await;
    assert_eq!(relay.snapshot().await.unwrap().active_calls, 1);
}
