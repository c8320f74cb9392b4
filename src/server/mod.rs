//! Server module for building the events hub HTTP server
//!
//! [`ServerBuilder`] wires the repository, the auth provider and the
//! WebSocket [`ConnectionRegistry`](exposure::websocket::ConnectionRegistry)
//! into one [`AppState`] and exposes it through the REST router.

pub mod builder;
pub mod exposure;
pub mod state;

pub use builder::ServerBuilder;
pub use state::AppState;
