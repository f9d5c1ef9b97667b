use std::sync::Arc;
use tether_client::{CallEvent, CallOptions, CallPhase, LocalClaimHub, Ownership};
use tether_core::{OwnershipArbiter, PeerRole};
use tokio::time::timeout;

use super::{fast_options, room, spawn_session};
use crate::integration::{WAIT, drain_events, init_tracing, wait_event};
use crate::utils::{MockPeerFactory, RecordingTerminator, fast_call_config, spawn_relay};

#[tokio::test]
async fn test_owner_powers_device_off() {
    init_tracing();
    let (addr, _relay) = spawn_relay().await;
    let hub = LocalClaimHub::new();
    let terminator = RecordingTerminator::default();

    let (tv, _tv_events) = spawn_session(
        addr,
        PeerRole::Responder,
        &MockPeerFactory::default(),
        fast_options(),
    );
    let (phone, mut phone_events) = spawn_session(
        addr,
        PeerRole::Initiator,
        &MockPeerFactory::default(),
        CallOptions {
            config: fast_call_config(),
            ownership: Ownership::local(&hub),
            terminator: Some(Arc::new(terminator.clone())),
        },
    );
    timeout(WAIT, phone.wait_for_phase(CallPhase::InCall))
        .await
        .unwrap()
        .unwrap();

    phone.hangup().unwrap();
    let seen = drain_events(&mut phone_events).await;
    assert!(seen.contains(&CallEvent::DevicePoweredOff));
    // Forced: the relay may not have seen our hangup yet.
    assert_eq!(terminator.calls(), vec![(room(), true)]);

    timeout(WAIT, tv.wait_for_phase(CallPhase::Announcing))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_other_tab_takes_ownership() {
    init_tracing();
    let (addr, _relay) = spawn_relay().await;
    let hub = LocalClaimHub::new();
    let terminator = RecordingTerminator::default();

    let (_tv, _tv_events) = spawn_session(
        addr,
        PeerRole::Responder,
        &MockPeerFactory::default(),
        fast_options(),
    );
    let (phone, mut phone_events) = spawn_session(
        addr,
        PeerRole::Initiator,
        &MockPeerFactory::default(),
        CallOptions {
            config: fast_call_config(),
            ownership: Ownership::local(&hub),
            terminator: Some(Arc::new(terminator.clone())),
        },
    );
    timeout(WAIT, phone.wait_for_phase(CallPhase::InCall))
        .await
        .unwrap()
        .unwrap();

    let mut other_tab = OwnershipArbiter::with_broadcaster(hub.clone());
    other_tab.claim(room().as_str());
    wait_event(&mut phone_events, |e| *e == CallEvent::OwnershipLost).await;

    phone.hangup().unwrap();
    let seen = drain_events(&mut phone_events).await;
    assert!(seen.contains(&CallEvent::Phase(CallPhase::Ended)));
    assert!(!seen.contains(&CallEvent::DevicePoweredOff));
    assert!(terminator.calls().is_empty());
    assert!(other_tab.is_owner(room().as_str()));
}

#[tokio::test]
async fn test_remote_hangup_asks_politely() {
    init_tracing();
    let (addr, relay) = spawn_relay().await;
    let terminator = RecordingTerminator::default();

    let (tv, _tv_events) = spawn_session(
        addr,
        PeerRole::Responder,
        &MockPeerFactory::default(),
        fast_options(),
    );
    let (phone, mut phone_events) = spawn_session(
        addr,
        PeerRole::Initiator,
        &MockPeerFactory::default(),
        CallOptions {
            terminator: Some(Arc::new(terminator.clone())),
            ..fast_options()
        },
    );
    timeout(WAIT, phone.wait_for_phase(CallPhase::InCall))
        .await
        .unwrap()
        .unwrap();
    timeout(WAIT, tv.wait_for_phase(CallPhase::InCall))
        .await
        .unwrap()
        .unwrap();

    tv.hangup().unwrap();
    drain_events(&mut phone_events).await;
    assert_eq!(phone.phase(), CallPhase::Ended);
    assert_eq!(terminator.calls(), vec![(room(), false)]);
    assert!(!relay.has_active_call(&room()).await.unwrap());
}
