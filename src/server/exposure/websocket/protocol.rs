//! WebSocket message protocol definitions
//!
//! Defines the JSON messages exchanged between WebSocket clients and the server.
//!
//! ## Client → Server Messages
//!
//! ```json
//! // Chat message, echoed to the sender and broadcast to everyone
//! {"type": "chat", "text": "hi"}
//!
//! // Keepalive
//! {"type": "ping"}
//! ```
//!
//! ## Server → Client Messages
//!
//! ```json
//! // First message of every session
//! {"type": "welcome", "connection_id": "conn_abc123"}
//!
//! // Echo addressed to the sender only
//! {"type": "personal", "text": "You wrote: hi"}
//!
//! // Message sent to every connected client
//! {"type": "broadcast", "text": "Client #1 says: hi"}
//!
//! // Keepalive response
//! {"type": "pong"}
//!
//! // Error
//! {"type": "error", "message": "Invalid message: ..."}
//! ```

use super::registry::ConnectionId;
use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Chat text
    Chat {
        /// The text to echo and broadcast
        text: String,
    },
    /// Keepalive ping
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome message on connection
    Welcome {
        /// Unique connection ID
        connection_id: ConnectionId,
    },
    /// Text addressed to one client
    Personal { text: String },
    /// Text addressed to every client
    Broadcast { text: String },
    /// Keepalive response
    Pong,
    /// Error message
    Error {
        /// Human-readable error description
        message: String,
    },
}

impl ServerMessage {
    /// Echo sent back to the author of a chat message
    pub fn echo(text: &str) -> Self {
        ServerMessage::Personal {
            text: format!("You wrote: {}", text),
        }
    }

    /// Chat message relayed to everyone
    pub fn said(user_id: i64, text: &str) -> Self {
        ServerMessage::Broadcast {
            text: format!("Client #{} says: {}", user_id, text),
        }
    }

    /// Departure notice
    pub fn left(user_id: i64) -> Self {
        ServerMessage::Broadcast {
            text: format!("Client #{} left the chat", user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_chat_deserialization() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"chat","text":"hi"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Chat {
                text: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_client_ping_deserialization() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }

    #[test]
    fn test_unknown_or_untyped_payloads_are_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"text":"hi"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"chat"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>("hi").is_err());
    }

    #[test]
    fn test_server_message_serialization() {
        let welcome = ServerMessage::Welcome {
            connection_id: ConnectionId::generate(),
        };
        let json = serde_json::to_value(&welcome).unwrap();
        assert_eq!(json["type"], "welcome");
        assert!(json["connection_id"].as_str().unwrap().starts_with("conn_"));

        assert_eq!(
            serde_json::to_value(ServerMessage::Pong).unwrap(),
            json!({"type": "pong"})
        );
    }

    #[test]
    fn test_chat_texts() {
        assert_eq!(
            serde_json::to_value(ServerMessage::echo("hi")).unwrap(),
            json!({"type": "personal", "text": "You wrote: hi"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::said(7, "hi")).unwrap(),
            json!({"type": "broadcast", "text": "Client #7 says: hi"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::left(7)).unwrap(),
            json!({"type": "broadcast", "text": "Client #7 left the chat"})
        );
    }
}
