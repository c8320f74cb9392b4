//! # Events Hub
//!
//! A small events web API with a live chat channel.
//!
//! ## Features
//!
//! - **Event CRUD**: create, list, fetch, update and delete events over REST
//! - **Owner-Scoped Writes**: only the creator of an event may change it
//! - **Chat Broadcast**: `GET /events` upgrades to a WebSocket where every
//!   message is echoed to its author and relayed to all connected clients
//! - **Connection Registry**: one shared registry, safe under concurrent
//!   connect, disconnect and broadcast
//! - **Configuration-Based**: listener, WebSocket tuning and tokens from YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use events_hub::prelude::*;
//!
//! let config = AppConfig::from_yaml_file("config/events-hub.yaml")?;
//!
//! ServerBuilder::from_config(&config)
//!     .with_repository(InMemoryEventRepository::new())
//!     .serve(config.server.bind_addr()?)
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthError, AuthProvider, StaticTokenAuthProvider, User},
        error::{ApiError, EventError, RequestError, ValidationError},
        event::{Event, EventCreate, EventResponse, EventUpdate, EventsResponse, WrapperResponse},
        extractors::{CurrentUser, EventId, Validated},
        query::EventsFilter,
        repository::EventRepository,
    };

    // === Config ===
    pub use crate::config::{AppConfig, AuthConfig, ServerConfig, TokenEntry, WsConfig};

    // === Server ===
    pub use crate::server::{
        AppState, ServerBuilder,
        exposure::{
            RestExposure,
            websocket::{
                ClientMessage, Connection, ConnectionId, ConnectionRegistry, DeliveryError,
                ServerMessage,
            },
        },
    };

    // === Storage ===
    pub use crate::storage::InMemoryEventRepository;

    // === Re-exports from dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use axum::{Json, Router};
}
