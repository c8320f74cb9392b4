//! REST API exposure
//!
//! Routes the event CRUD endpoints and the health checks. `GET /events` is
//! shared with the WebSocket chat channel, see [`handlers::events_root`].

pub mod handlers;

use crate::server::state::AppState;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

/// Name reported by the health endpoints
pub const SERVICE_NAME: &str = "events-hub";

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router around the shared state
    ///
    /// Returns a router with:
    /// - Health check routes
    /// - Event routes (and the chat upgrade on `GET /events`)
    /// - Custom routes
    pub fn build_router(state: AppState, custom_routes: Vec<Router>) -> Router {
        let mut app = Self::health_routes().merge(Self::event_routes(state));

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        app
    }

    fn event_routes(state: AppState) -> Router {
        Router::new()
            .route(
                "/events",
                get(handlers::events_root).post(handlers::create_event),
            )
            .route(
                "/events/{id}",
                get(handlers::get_event)
                    .patch(handlers::update_event)
                    .delete(handlers::delete_event),
            )
            .with_state(state)
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": SERVICE_NAME
        }))
    }
}
