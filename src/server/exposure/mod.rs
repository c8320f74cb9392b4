//! Transport exposures of the events hub
//!
//! REST serves the event CRUD endpoints. WebSocket serves the chat channel
//! on the same `/events` path. Both share one [`AppState`](super::AppState).

pub mod rest;
pub mod websocket;

pub use rest::RestExposure;
pub use websocket::{ConnectionRegistry, ServerMessage};
