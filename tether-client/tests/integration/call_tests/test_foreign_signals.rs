use serde_json::Value;
use tether_client::{BusClient, CallEvent, CallPhase};
use tether_core::{DataFrame, IceCandidate, PeerRole, SignalFrame};
use tokio::sync::broadcast;
use tokio::time::timeout;

use super::{fast_options, room, spawn_session};
use crate::integration::{WAIT, init_tracing, recv_topic, wait_event, wait_until};
use crate::utils::{MockPeerFactory, bus_config, spawn_relay};

fn publish(bus: &BusClient, topic: &str, signal: SignalFrame) {
    bus.publish(&signal.to_data_frame(topic, bus.source()).unwrap())
        .unwrap();
}

/// Next room frame of `kind` sent by `from`, or by anyone when `from` is None.
async fn next_signal(
    frames: &mut broadcast::Receiver<DataFrame>,
    topic: &str,
    kind: &str,
    from: Option<&str>,
) -> DataFrame {
    loop {
        let frame = recv_topic(frames, topic).await;
        let sender = frame.get("from").and_then(Value::as_str);
        if frame.kind() == Some(kind) && from.is_none_or(|from| sender == Some(from)) {
            return frame;
        }
    }
}

#[tokio::test]
async fn test_responder_ignores_signals_from_other_peers() {
    init_tracing();
    let (addr, _relay) = spawn_relay().await;
    let topic = room().topic("call");

    let observer = BusClient::connect(bus_config(addr).with_source("observer"));
    let mut frames = observer.frames();
    observer.subscribe([topic.clone()]).unwrap();
    let stranger = BusClient::connect(bus_config(addr).with_source("stranger"));

    let tv_peer = MockPeerFactory::with_candidate("cand-tv");
    let (tv, mut tv_events) = spawn_session(addr, PeerRole::Responder, &tv_peer, fast_options());
    // The repeated `waiting` shows the observer is subscribed.
    next_signal(&mut frames, &topic, "waiting", None).await;

    let phone_peer = MockPeerFactory::with_candidate("cand-phone");
    let (phone, _phone_events) =
        spawn_session(addr, PeerRole::Initiator, &phone_peer, fast_options());
    let offer = next_signal(&mut frames, &topic, "offer", None).await;
    let caller = offer
        .get("from")
        .and_then(Value::as_str)
        .unwrap()
        .to_owned();
    timeout(WAIT, tv.wait_for_phase(CallPhase::InCall))
        .await
        .unwrap()
        .unwrap();

    publish(
        &stranger,
        &topic,
        SignalFrame::Candidate {
            from: "initiator-stranger".into(),
            candidate: IceCandidate::new("cand-stranger"),
        },
    );
    publish(
        &stranger,
        &topic,
        SignalFrame::MuteState {
            from: "initiator-stranger".into(),
            audio_muted: true,
            video_muted: true,
        },
    );
    next_signal(&mut frames, &topic, "mute-state", Some("initiator-stranger")).await;

    phone.set_mute(false, true).unwrap();
    let mute = wait_event(&mut tv_events, |e| matches!(e, CallEvent::RemoteMute { .. })).await;
    assert_eq!(
        mute,
        CallEvent::RemoteMute {
            audio_muted: false,
            video_muted: true
        }
    );
    assert_eq!(tv.phase(), CallPhase::InCall);
    assert!(!tv_peer.ops().contains(&"candidate:cand-stranger".to_owned()));

    // A late candidate from the finished call must not reach the next one.
    phone.hangup().unwrap();
    timeout(WAIT, tv.wait_for_phase(CallPhase::Announcing))
        .await
        .unwrap()
        .unwrap();
    publish(
        &stranger,
        &topic,
        SignalFrame::Candidate {
            from: caller.as_str().into(),
            candidate: IceCandidate::new("cand-stale"),
        },
    );
    next_signal(&mut frames, &topic, "candidate", Some(&caller)).await;

    let next_peer = MockPeerFactory::with_candidate("cand-next");
    let (_next, _next_events) =
        spawn_session(addr, PeerRole::Initiator, &next_peer, fast_options());
    timeout(WAIT, tv.wait_for_phase(CallPhase::InCall))
        .await
        .unwrap()
        .unwrap();
    wait_until(|| tv_peer.ops().contains(&"candidate:cand-next".to_owned())).await;
    assert!(!tv_peer.ops().contains(&"candidate:cand-stale".to_owned()));
}
