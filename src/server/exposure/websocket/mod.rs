//! WebSocket exposure: the chat broadcast channel
//!
//! Clients upgrade `GET /events` and exchange JSON messages. Every chat
//! message is echoed to its author and broadcast to all connected clients
//! through the shared [`ConnectionRegistry`].
//!
//! # Architecture
//!
//! ```text
//! Client ──ws──▶ GET /events ──auth──▶ run_session() ────register──▶ ConnectionRegistry
//!                                           │                             │
//!                                      read loop                     broadcast
//!                                           │                             │
//!                              send_to(self) + broadcast()        every session's
//!                                                                  write loop ──▶ Client
//! ```
//!
//! See [`protocol`] for the message format.

mod handler;
pub mod protocol;
pub mod registry;

pub(crate) use handler::accept;
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{Connection, ConnectionId, ConnectionRegistry, DeliveryError};

use axum::http::HeaderMap;
use axum::http::header::{CONNECTION, UPGRADE};

/// Whether a request asks for a WebSocket upgrade
///
/// `GET /events` serves both the event list and the chat channel, so the
/// router needs to tell them apart before picking extractors.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));

    let connection = headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        });

    upgrade && connection
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_websocket_upgrade() {
        let mut headers = HeaderMap::new();
        assert!(!is_websocket_upgrade(&headers));

        headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
        assert!(!is_websocket_upgrade(&headers));

        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        assert!(is_websocket_upgrade(&headers));

        headers.insert(UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_websocket_upgrade(&headers));
    }
}
