//! End-to-end room tests: the real router on a local port, real WebSocket
//! clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use audio_hub::{AppState, HubMetrics, create_routes, spawn_hub};

/// Timeout for each async operation in tests.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> SocketAddr {
    let hub = spawn_hub(256, Arc::new(HubMetrics::new()));
    let app = create_routes(AppState {
        hub,
        outbound_capacity: 256,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{addr}/api/v1/audio/room");
    let (ws, _) = timeout(TEST_TIMEOUT, connect_async(url))
        .await
        .expect("connect timed out")
        .expect("failed to connect");
    ws
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Read JSON messages until one satisfies `pred`.
async fn recv_until(ws: &mut Client, pred: impl Fn(&Value) -> bool) -> Value {
    timeout(TEST_TIMEOUT, async {
        loop {
            let msg = ws
                .next()
                .await
                .expect("stream ended")
                .expect("read failed");
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(text.as_str()).unwrap();
                if pred(&value) {
                    return value;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for message")
}

fn is_presence(value: &Value, count: u64, users: &[&str]) -> bool {
    value["type"] == "users"
        && value["count"] == count
        && value["users"] == serde_json::json!(users)
}

#[tokio::test]
async fn three_party_room() {
    let addr = start_server().await;
    let mut c1 = connect(addr).await;
    let mut c2 = connect(addr).await;
    let mut c3 = connect(addr).await;

    send_json(&mut c1, serde_json::json!({ "type": "join", "sender": "alice" })).await;
    send_json(&mut c2, serde_json::json!({ "type": "join", "sender": "bob" })).await;
    recv_until(&mut c3, |v| is_presence(v, 3, &["alice", "bob"])).await;

    // Raw binary from a named client becomes base64 audio.
    c1.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    for client in [&mut c2, &mut c3] {
        let audio = recv_until(client, |v| v["type"] == "audio").await;
        assert_eq!(audio["sender"], "alice");
        assert_eq!(audio["payload"], "AQID");
    }

    // The first audio c1 hears is bob's, so its own was never echoed.
    send_json(
        &mut c2,
        serde_json::json!({ "type": "audio", "sender": "alice", "payload": "Qm9i" }),
    )
    .await;
    let audio = recv_until(&mut c1, |v| v["type"] == "audio").await;
    assert_eq!(audio["sender"], "bob");
    assert_eq!(audio["payload"], "Qm9i");

    c3.close(None).await.unwrap();
    recv_until(&mut c1, |v| is_presence(v, 2, &["alice", "bob"])).await;
}

#[tokio::test]
async fn anonymous_audio_is_not_relayed() {
    let addr = start_server().await;
    let mut anon = connect(addr).await;
    let mut bob = connect(addr).await;
    send_json(&mut bob, serde_json::json!({ "type": "join", "sender": "bob" })).await;
    recv_until(&mut anon, |v| is_presence(v, 2, &["bob"])).await;

    anon.send(Message::binary(vec![9u8, 9, 9])).await.unwrap();
    send_json(&mut anon, serde_json::json!({ "type": "audio", "payload": "AAAA" })).await;

    // Frames from one client are handled in order, so if either audio frame
    // had been relayed bob would see it before carol's presence.
    send_json(&mut anon, serde_json::json!({ "type": "join", "sender": "carol" })).await;
    let next = recv_until(&mut bob, |v| {
        v["type"] == "audio" || is_presence(v, 2, &["bob", "carol"])
    })
    .await;
    assert_eq!(next["type"], "users", "unexpected {next}");
}

#[tokio::test]
async fn disconnect_before_join_updates_count() {
    let addr = start_server().await;
    let mut stay = connect(addr).await;
    let leave = connect(addr).await;
    recv_until(&mut stay, |v| is_presence(v, 2, &[])).await;

    drop(leave);
    recv_until(&mut stay, |v| is_presence(v, 1, &[])).await;
}

#[tokio::test]
async fn health_endpoints() {
    let addr = start_server().await;
    let mut alice = connect(addr).await;
    send_json(&mut alice, serde_json::json!({ "type": "join", "sender": "alice" })).await;
    recv_until(&mut alice, |v| is_presence(v, 1, &["alice"])).await;

    let client = reqwest::Client::new();

    let live = client
        .get(format!("http://{addr}/api/v1/health/live"))
        .send()
        .await
        .unwrap();
    assert!(live.status().is_success());

    let ready = client
        .get(format!("http://{addr}/api/v1/health/ready"))
        .send()
        .await
        .unwrap();
    assert!(ready.status().is_success());
    let body: Value = serde_json::from_str(&ready.text().await.unwrap()).unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["connections"], 1);
    assert_eq!(body["named"], serde_json::json!(["alice"]));

    let metrics = client
        .get(format!("http://{addr}/api/v1/metrics"))
        .send()
        .await
        .unwrap();
    let body: Value = serde_json::from_str(&metrics.text().await.unwrap()).unwrap();
    assert_eq!(body["connections"]["active"], 1);
}
