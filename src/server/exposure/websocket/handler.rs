//! WebSocket session loop
//!
//! Each accepted upgrade gets:
//!
//! 1. A [`Connection`] registered with the [`ConnectionRegistry`]
//! 2. A welcome message with its connection ID
//! 3. A write loop that forwards queued [`ServerMessage`]s to the socket
//! 4. A read loop that turns every frame into an [`Inbound`] and acts on it
//!
//! The session ends when the client goes away or when the registry evicts
//! the connection for falling behind. Either way it deregisters, lets the
//! writer flush what is queued, closes the socket and broadcasts a departure
//! notice.

use super::protocol::{ClientMessage, ServerMessage};
use super::registry::{Connection, ConnectionRegistry};
use crate::core::auth::User;
use crate::server::state::AppState;
use axum::extract::WebSocketUpgrade;
use axum::extract::ws::{CloseFrame, Message, close_code};
use axum::response::Response;
use futures::stream::{Stream, StreamExt};
use futures::{Sink, SinkExt};
use std::sync::Arc;
use std::time::Duration;

/// How long the writer may take to flush its queue once the session ends
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// What the read loop got from the socket
#[derive(Debug)]
pub(crate) enum Inbound {
    /// A well-formed client message
    Message(ClientMessage),
    /// A text frame that is not a valid [`ClientMessage`]
    Malformed(String),
    /// Control or binary frame with nothing to do
    Skip,
    /// Close frame or end of stream
    Closed,
    /// Transport failure
    Failed(axum::Error),
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Closed,
    Failed,
    Evicted,
}

/// Read the next frame and classify it
pub(crate) async fn next_inbound<S>(stream: &mut S) -> Inbound
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    match stream.next().await {
        None => Inbound::Closed,
        Some(Err(e)) => Inbound::Failed(e),
        Some(Ok(Message::Close(_))) => Inbound::Closed,
        Some(Ok(Message::Text(text))) => match serde_json::from_str(text.as_str()) {
            Ok(msg) => Inbound::Message(msg),
            Err(e) => Inbound::Malformed(e.to_string()),
        },
        // axum answers pings itself; binary frames are not part of the protocol
        Some(Ok(_)) => Inbound::Skip,
    }
}

/// Accept an upgrade for an already authenticated caller
pub(crate) fn accept(ws: WebSocketUpgrade, state: AppState, user: User) -> Response {
    ws.on_upgrade(move |socket| {
        let (ws_write, ws_read) = socket.split();
        run_session(
            ws_read,
            ws_write,
            state.registry,
            state.ws.channel_capacity,
            user,
        )
    })
}

async fn run_session<R, W>(
    mut ws_read: R,
    mut ws_write: W,
    registry: Arc<ConnectionRegistry>,
    channel_capacity: usize,
    user: User,
) where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
    W: Sink<Message> + Unpin + Send + 'static,
{
    let (connection, mut outbound) = Connection::new(channel_capacity);
    let connection_id = connection.id().clone();
    registry.register(&connection).await;

    tracing::info!(
        user_id = user.id,
        connection_id = %connection_id,
        "New user connection"
    );

    // Welcome goes straight to the socket so it precedes anything queued
    let welcome = ServerMessage::Welcome {
        connection_id: connection_id.clone(),
    };
    if let Ok(json) = serde_json::to_string(&welcome)
        && ws_write.send(Message::Text(json.into())).await.is_err()
    {
        registry.deregister(&connection_id).await;
        return;
    }

    // The writer hands the sink back once every sender is gone and the
    // queue is flushed, or gives up on the first failed write.
    let writer_id = connection_id.clone();
    let mut write_handle = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_write.send(Message::Text(json.into())).await.is_err() {
                        tracing::debug!(
                            connection_id = %writer_id,
                            "WebSocket write failed, closing"
                        );
                        return None;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %writer_id,
                        error = %e,
                        "Failed to serialize ServerMessage"
                    );
                }
            }
        }
        Some(ws_write)
    });

    let end = loop {
        let inbound = tokio::select! {
            inbound = next_inbound(&mut ws_read) => inbound,
            _ = connection.evicted() => break SessionEnd::Evicted,
        };

        match inbound {
            Inbound::Message(msg) => {
                handle_client_message(&registry, &connection, &user, msg).await;
            }
            Inbound::Malformed(reason) => {
                let error = ServerMessage::Error {
                    message: format!("Invalid message: {}", reason),
                };
                if let Err(e) = registry.send_to(&connection, error).await {
                    tracing::debug!(error = %e, "Could not report invalid message");
                }
            }
            Inbound::Skip => {}
            Inbound::Closed => {
                tracing::debug!(connection_id = %connection_id, "Client closed the session");
                break SessionEnd::Closed;
            }
            Inbound::Failed(e) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %e,
                    "WebSocket read error"
                );
                break SessionEnd::Failed;
            }
        }
    };

    // Cleanup: once the registry and this session let go of their senders
    // the writer drains the queue and returns the sink
    registry.deregister(&connection_id).await;
    drop(connection);

    match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut write_handle).await {
        Ok(Ok(Some(mut sink))) => {
            if end == SessionEnd::Evicted {
                let frame = CloseFrame {
                    code: close_code::AGAIN,
                    reason: "too slow to keep up with the chat".into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
            }
            let _ = sink.close().await;
        }
        Ok(_) => {}
        Err(_) => {
            tracing::warn!(connection_id = %connection_id, "Writer did not drain in time");
            write_handle.abort();
        }
    }

    tracing::info!(
        user_id = user.id,
        connection_id = %connection_id,
        reason = ?end,
        "User disconnected"
    );
    registry.broadcast(ServerMessage::left(user.id)).await;
}

/// Process a single client message
async fn handle_client_message(
    registry: &Arc<ConnectionRegistry>,
    connection: &Connection,
    user: &User,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::Chat { text } => {
            if let Err(e) = registry.send_to(connection, ServerMessage::echo(&text)).await {
                tracing::debug!(error = %e, "Echo not delivered");
            }
            registry.broadcast(ServerMessage::said(user.id, &text)).await;
        }
        ClientMessage::Ping => {
            if let Err(e) = registry.send_to(connection, ServerMessage::Pong).await {
                tracing::debug!(error = %e, "Pong not delivered");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use futures::channel::mpsc;
    use futures::stream;
    use tokio::time::timeout;

    fn user(id: i64) -> User {
        User {
            id,
            username: format!("user{}", id),
        }
    }

    fn text_json(message: &Message) -> serde_json::Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("Expected text message, got {:?}", other),
        }
    }

    fn frames(
        items: Vec<Result<Message, axum::Error>>,
    ) -> impl Stream<Item = Result<Message, axum::Error>> + Unpin {
        stream::iter(items)
    }

    #[tokio::test]
    async fn test_text_frames_are_parsed() {
        let mut s = frames(vec![
            Ok(Message::Text(r#"{"type":"chat","text":"hi"}"#.into())),
            Ok(Message::Text(r#"{"type":"ping"}"#.into())),
        ]);

        assert!(matches!(
            next_inbound(&mut s).await,
            Inbound::Message(ClientMessage::Chat { text }) if text == "hi"
        ));
        assert!(matches!(
            next_inbound(&mut s).await,
            Inbound::Message(ClientMessage::Ping)
        ));
        assert!(matches!(next_inbound(&mut s).await, Inbound::Closed));
    }

    #[tokio::test]
    async fn test_bad_payload_is_malformed_not_fatal() {
        let mut s = frames(vec![
            Ok(Message::Text("not json".into())),
            Ok(Message::Text(r#"{"type":"chat","text":"after"}"#.into())),
        ]);

        assert!(matches!(next_inbound(&mut s).await, Inbound::Malformed(_)));
        assert!(matches!(next_inbound(&mut s).await, Inbound::Message(_)));
    }

    #[tokio::test]
    async fn test_control_and_binary_frames_are_skipped() {
        let mut s = frames(vec![
            Ok(Message::Ping(Bytes::new())),
            Ok(Message::Binary(Bytes::from_static(&[1, 2, 3]))),
        ]);

        assert!(matches!(next_inbound(&mut s).await, Inbound::Skip));
        assert!(matches!(next_inbound(&mut s).await, Inbound::Skip));
    }

    #[tokio::test]
    async fn test_close_and_errors_end_the_session() {
        let mut s = frames(vec![
            Ok(Message::Close(None)),
            Err(axum::Error::new(std::io::Error::other("reset"))),
        ]);

        assert!(matches!(next_inbound(&mut s).await, Inbound::Closed));
        assert!(matches!(next_inbound(&mut s).await, Inbound::Failed(_)));
    }

    #[tokio::test]
    async fn test_chat_echoes_then_broadcasts() {
        let registry = Arc::new(ConnectionRegistry::default());
        let (author, mut author_rx) = Connection::new(8);
        let (other, mut other_rx) = Connection::new(8);
        registry.register(&author).await;
        registry.register(&other).await;

        let user = User {
            id: 4,
            username: "dana".to_string(),
        };
        handle_client_message(
            &registry,
            &author,
            &user,
            ClientMessage::Chat {
                text: "hi".to_string(),
            },
        )
        .await;

        assert_eq!(author_rx.try_recv().unwrap(), ServerMessage::echo("hi"));
        assert_eq!(author_rx.try_recv().unwrap(), ServerMessage::said(4, "hi"));
        assert_eq!(other_rx.try_recv().unwrap(), ServerMessage::said(4, "hi"));
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ping_answers_sender_only() {
        let registry = Arc::new(ConnectionRegistry::default());
        let (author, mut author_rx) = Connection::new(8);
        let (other, mut other_rx) = Connection::new(8);
        registry.register(&author).await;
        registry.register(&other).await;

        let user = User {
            id: 1,
            username: "a".to_string(),
        };
        handle_client_message(&registry, &author, &user, ClientMessage::Ping).await;

        assert_eq!(author_rx.try_recv().unwrap(), ServerMessage::Pong);
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_queued_messages_are_flushed_before_close() {
        let registry = Arc::new(ConnectionRegistry::default());
        let (sink, client) = mpsc::unbounded::<Message>();
        let inbound = frames(vec![
            Ok(Message::Text(r#"{"type":"chat","text":"bye"}"#.into())),
            Ok(Message::Close(None)),
        ]);

        timeout(
            Duration::from_secs(2),
            run_session(inbound, sink, registry.clone(), 8, user(3)),
        )
        .await
        .expect("session should end on close");

        let received: Vec<Message> = timeout(Duration::from_secs(1), client.collect())
            .await
            .unwrap();
        assert_eq!(received.len(), 3);
        assert_eq!(text_json(&received[0])["type"], "welcome");
        assert_eq!(
            text_json(&received[1]),
            serde_json::to_value(ServerMessage::echo("bye")).unwrap()
        );
        assert_eq!(
            text_json(&received[2]),
            serde_json::to_value(ServerMessage::said(3, "bye")).unwrap()
        );
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_evicted_session_is_closed() {
        let registry = Arc::new(ConnectionRegistry::new(1));
        // a client that never reads: the sink holds one frame, then blocks
        let (sink, mut client) = mpsc::channel::<Message>(0);

        let session = tokio::spawn(run_session(
            stream::pending::<Result<Message, axum::Error>>(),
            sink,
            registry.clone(),
            1,
            user(5),
        ));

        let welcome = timeout(Duration::from_secs(1), client.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text_json(&welcome)["type"], "welcome");
        assert_eq!(registry.connection_count().await, 1);

        for i in 0..50 {
            if registry.connection_count().await == 0 {
                break;
            }
            registry
                .broadcast(ServerMessage::Broadcast {
                    text: i.to_string(),
                })
                .await;
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.connection_count().await, 0);

        // reading again lets the writer flush, then the session closes
        let rest: Vec<Message> = timeout(Duration::from_secs(2), client.collect())
            .await
            .expect("session should close the socket");
        assert!(matches!(
            rest.last(),
            Some(Message::Close(Some(frame))) if frame.code == close_code::AGAIN
        ));

        timeout(Duration::from_secs(1), session)
            .await
            .expect("session task should finish")
            .unwrap();
    }
}
