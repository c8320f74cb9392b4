//! Integration tests for the WebSocket chat channel
//!
//! These tests spin up a real HTTP+WebSocket server and drive it with
//! tokio-tungstenite clients: connect → chat → broadcast → disconnect.

use events_hub::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type WsWrite = futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsRead = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Helper: start a test server and return (address, registry)
async fn start_test_server() -> (SocketAddr, Arc<ConnectionRegistry>) {
    let auth = StaticTokenAuthProvider::new()
        .with_token(
            "alice-token",
            User {
                id: 1,
                username: "alice".to_string(),
            },
        )
        .with_token(
            "bob-token",
            User {
                id: 2,
                username: "bob".to_string(),
            },
        );

    let (state, app) = ServerBuilder::new()
        .with_repository(InMemoryEventRepository::new())
        .with_auth_provider(auth)
        .build_with_state()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state.registry)
}

/// Helper: connect with a token and return the welcome message + stream halves
async fn ws_connect(addr: SocketAddr, token: &'static str) -> (Value, WsWrite, WsRead) {
    let mut request = format!("ws://{}/events", addr)
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert(AUTHORIZATION, HeaderValue::from_static(token));

    let (ws_stream, _) = connect_async(request).await.expect("Failed to connect");
    let (write, mut read) = ws_stream.split();

    let welcome = ws_recv(&mut read).await;
    assert_eq!(welcome["type"], "welcome");
    assert!(welcome["connection_id"].is_string());

    (welcome, write, read)
}

/// Helper: send a JSON message over WS
async fn ws_send(write: &mut WsWrite, msg: &Value) {
    let text = serde_json::to_string(msg).unwrap();
    write.send(Message::Text(text.into())).await.unwrap();
}

/// Helper: receive next JSON message from WS (with timeout)
async fn ws_recv(read: &mut WsRead) -> Value {
    let msg = timeout(Duration::from_secs(2), read.next())
        .await
        .expect("Timeout waiting for WS message")
        .expect("Stream ended")
        .expect("WS error");

    match msg {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("Expected text message, got {:?}", other),
    }
}

/// Helper: wait until the registry holds `expected` connections
async fn wait_for_count(registry: &ConnectionRegistry, expected: usize) {
    timeout(Duration::from_secs(2), async {
        while registry.connection_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("registry never reached the expected size");
}

// === Tests ===

#[tokio::test]
async fn test_ws_connect_and_welcome() {
    let (addr, registry) = start_test_server().await;
    let (welcome, _write, _read) = ws_connect(addr, "Token alice-token").await;

    let conn_id = welcome["connection_id"].as_str().unwrap();
    assert!(conn_id.starts_with("conn_"));
    assert_eq!(registry.connection_count().await, 1);
}

#[tokio::test]
async fn test_ws_upgrade_requires_token() {
    let (addr, registry) = start_test_server().await;

    let request = format!("ws://{}/events", addr)
        .into_client_request()
        .unwrap();

    match connect_async(request).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        Err(other) => panic!("Expected an HTTP rejection, got {:?}", other),
        Ok(_) => panic!("Upgrade without a token must be refused"),
    }
    assert_eq!(registry.connection_count().await, 0);
}

#[tokio::test]
async fn test_ws_ping_pong() {
    let (addr, _registry) = start_test_server().await;
    let (_welcome, mut write, mut read) = ws_connect(addr, "Token alice-token").await;

    ws_send(&mut write, &json!({"type": "ping"})).await;

    let pong = ws_recv(&mut read).await;
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn test_ws_malformed_message_reports_error_and_keeps_session() {
    let (addr, _registry) = start_test_server().await;
    let (_welcome, mut write, mut read) = ws_connect(addr, "Token alice-token").await;

    write
        .send(Message::Text("definitely not json".into()))
        .await
        .unwrap();

    let error = ws_recv(&mut read).await;
    assert_eq!(error["type"], "error");
    assert!(error["message"].as_str().unwrap().starts_with("Invalid message"));

    ws_send(&mut write, &json!({"type": "ping"})).await;
    assert_eq!(ws_recv(&mut read).await["type"], "pong");
}

#[tokio::test]
async fn test_ws_chat_echo_broadcast_and_departure() {
    let (addr, registry) = start_test_server().await;
    let (_wa, mut write_a, mut read_a) = ws_connect(addr, "Token alice-token").await;
    let (_wb, mut write_b, mut read_b) = ws_connect(addr, "Bearer bob-token").await;
    assert_eq!(registry.connection_count().await, 2);

    ws_send(&mut write_a, &json!({"type": "chat", "text": "hi"})).await;

    // The author gets the echo first, then the broadcast like everyone else
    assert_eq!(
        ws_recv(&mut read_a).await,
        json!({"type": "personal", "text": "You wrote: hi"})
    );
    assert_eq!(
        ws_recv(&mut read_a).await,
        json!({"type": "broadcast", "text": "Client #1 says: hi"})
    );
    assert_eq!(
        ws_recv(&mut read_b).await,
        json!({"type": "broadcast", "text": "Client #1 says: hi"})
    );

    write_b.send(Message::Close(None)).await.unwrap();
    drop(write_b);
    drop(read_b);

    wait_for_count(&registry, 1).await;
    assert_eq!(
        ws_recv(&mut read_a).await,
        json!({"type": "broadcast", "text": "Client #2 left the chat"})
    );
}

#[tokio::test]
async fn test_ws_and_rest_share_the_events_path() {
    let (addr, _registry) = start_test_server().await;

    let response = reqwest::get(format!("http://{}/events", addr))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"payload": {"events": []}}));

    let health: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["service"], "events-hub");
}
