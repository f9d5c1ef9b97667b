use serde_json::json;

use crate::integration::{init_tracing, spawn_test_server};
use crate::utils::WsTestClient;

#[tokio::test]
async fn test_publish_over_websocket() {
    init_tracing();
    let (addr, relay) = spawn_test_server(None).await;

    let mut sink = WsTestClient::connect(addr).await;
    let mut source = WsTestClient::connect(addr).await;

    sink.send_json(&json!({"type":"control","action":"subscribe","topics":["midi"]}))
        .await;
    assert_eq!(
        sink.recv_text().await,
        r#"{"type":"ack","action":"subscribe","currentSubscriptions":["midi"]}"#
    );

    let raw = r#"{"topic":"midi","source":"keys","type":"note_on","note":60,"velocity":100}"#;
    source.send_text(raw).await;
    assert_eq!(sink.recv_text().await, raw);
    source.expect_silence(200).await;

    assert_eq!(relay.snapshot().await.unwrap().connections, 2);
    sink.close().await;
    source.close().await;
}

#[tokio::test]
async fn test_closing_socket_drops_subscriptions() {
    init_tracing();
    let (addr, relay) = spawn_test_server(None).await;

    let mut client = WsTestClient::connect(addr).await;
    client
        .send_json(&json!({"type":"control","action":"subscribe","topics":["*"]}))
        .await;
    client.recv_json().await;
    assert_eq!(relay.snapshot().await.unwrap().connections, 1);

    client.close().await;
    for _ in 0..50 {
        if relay.snapshot().await.unwrap().connections == 0 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("connection was not removed after close");
}
