use tether_client::{CallEvent, CallPhase};
use tether_core::PeerRole;
use tokio::time::timeout;

use super::{fast_options, room, spawn_session};
use crate::integration::{WAIT, drain_events, init_tracing, wait_event, wait_until};
use crate::utils::{MockPeerFactory, spawn_relay};

#[tokio::test]
async fn test_call_establishes_and_hangs_up() {
    init_tracing();
    let (addr, relay) = spawn_relay().await;

    let tv_peer = MockPeerFactory::with_candidate("cand-tv");
    let phone_peer = MockPeerFactory::with_candidate("cand-phone");

    let (tv, mut tv_events) = spawn_session(addr, PeerRole::Responder, &tv_peer, fast_options());
    timeout(WAIT, tv.wait_for_phase(CallPhase::Announcing))
        .await
        .unwrap()
        .unwrap();

    let (phone, mut phone_events) =
        spawn_session(addr, PeerRole::Initiator, &phone_peer, fast_options());
    timeout(WAIT, phone.wait_for_phase(CallPhase::InCall))
        .await
        .unwrap()
        .unwrap();
    timeout(WAIT, tv.wait_for_phase(CallPhase::InCall))
        .await
        .unwrap()
        .unwrap();
    assert!(relay.has_active_call(&room()).await.unwrap());

    wait_until(|| phone_peer.ops().contains(&"candidate:cand-tv".to_owned())).await;
    wait_until(|| tv_peer.ops().contains(&"candidate:cand-phone".to_owned())).await;
    assert!(tv_peer.ops().contains(&"accept_offer:mock-offer".to_owned()));
    assert!(phone_peer.ops().contains(&"accept_answer:mock-answer".to_owned()));

    phone.set_mute(true, false).unwrap();
    let mute = wait_event(&mut tv_events, |e| matches!(e, CallEvent::RemoteMute { .. })).await;
    assert_eq!(
        mute,
        CallEvent::RemoteMute {
            audio_muted: true,
            video_muted: false
        }
    );

    phone.hangup().unwrap();
    let phone_rest = drain_events(&mut phone_events).await;
    assert!(phone_rest.contains(&CallEvent::Phase(CallPhase::Ended)));
    assert!(phone_peer.ops().contains(&"close".to_owned()));

    // The responder goes back to announcing for the next caller.
    timeout(WAIT, tv.wait_for_phase(CallPhase::Announcing))
        .await
        .unwrap()
        .unwrap();
    assert!(!relay.has_active_call(&room()).await.unwrap());

    tv.hangup().unwrap();
    drain_events(&mut tv_events).await;
    assert_eq!(tv.phase(), CallPhase::Ended);
}
