use serde_json::json;
use tether_core::DataFrame;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::FakeConnection;

#[tokio::test]
async fn test_wildcard_receives_everything() {
    init_tracing();
    let relay = create_test_relay();

    let mut all = FakeConnection::connect(&relay).await;
    let source = FakeConnection::connect(&relay).await;

    let ack = all.subscribe(&["*"]).await;
    assert_eq!(ack["currentSubscriptions"], json!(["*"]));

    source.publish(&DataFrame::new("midi", "k")).await;
    source.publish(&DataFrame::new("call:tv", "k")).await;
    source.send_text(r#"{"value":1}"#).await;
    relay.snapshot().await.unwrap();

    assert_eq!(all.drain().len(), 3);
}

#[tokio::test]
async fn test_topicless_frames_route_as_legacy() {
    init_tracing();
    let relay = create_test_relay();

    let mut legacy = FakeConnection::connect(&relay).await;
    let mut midi = FakeConnection::connect(&relay).await;
    let source = FakeConnection::connect(&relay).await;

    legacy.subscribe(&["legacy"]).await;
    midi.subscribe(&["midi"]).await;

    source.send_text(r#"{"type":"note_on","note":64}"#).await;
    relay.snapshot().await.unwrap();

    let got = legacy.drain();
    assert_eq!(got, vec![json!({"type":"note_on","note":64})]);
    assert!(midi.drain().is_empty());
}
