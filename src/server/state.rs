//! Shared application state injected into every handler

use crate::config::WsConfig;
use crate::core::auth::AuthProvider;
use crate::core::repository::EventRepository;
use crate::server::exposure::websocket::ConnectionRegistry;
use axum::extract::FromRef;
use std::sync::Arc;

/// Handles shared by all request handlers and WebSocket sessions
///
/// Built once by [`ServerBuilder`](super::ServerBuilder); cloning only bumps
/// reference counts. There is exactly one [`ConnectionRegistry`] per state.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub repository: Arc<dyn EventRepository>,
    pub auth: Arc<dyn AuthProvider>,
    pub registry: Arc<ConnectionRegistry>,
    pub ws: WsConfig,
}
