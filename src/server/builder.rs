//! ServerBuilder for fluent API to build the HTTP server

use super::exposure::RestExposure;
use super::exposure::websocket::ConnectionRegistry;
use super::state::AppState;
use crate::config::{AppConfig, WsConfig};
use crate::core::auth::AuthProvider;
use crate::core::repository::EventRepository;
use anyhow::{Result, anyhow};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the events hub router
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_repository(InMemoryEventRepository::new())
///     .with_auth_provider(config.auth.provider())
///     .build()?;
/// ```
pub struct ServerBuilder {
    repository: Option<Arc<dyn EventRepository>>,
    auth_provider: Option<Arc<dyn AuthProvider>>,
    registry: Option<Arc<ConnectionRegistry>>,
    ws: WsConfig,
    cors_permissive: bool,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            repository: None,
            auth_provider: None,
            registry: None,
            ws: WsConfig::default(),
            cors_permissive: false,
            custom_routes: Vec::new(),
        }
    }

    /// Seed the builder from a loaded configuration
    ///
    /// Sets the token table, WebSocket tuning and CORS policy. The repository
    /// still has to be provided.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new()
            .with_auth_provider(config.auth.provider())
            .with_ws_config(config.ws)
            .with_cors_permissive(config.server.cors_permissive)
    }

    /// Set the event repository (required)
    pub fn with_repository(mut self, repository: impl EventRepository + 'static) -> Self {
        self.repository = Some(Arc::new(repository));
        self
    }

    /// Set the auth provider (required)
    pub fn with_auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Some(Arc::new(provider));
        self
    }

    /// Share an existing connection registry
    ///
    /// Without this a fresh registry is created at build time.
    pub fn with_registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_ws_config(mut self, ws: WsConfig) -> Self {
        self.ws = ws;
        self
    }

    pub fn with_cors_permissive(mut self, enabled: bool) -> Self {
        self.cors_permissive = enabled;
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Assemble the shared state without building routes
    pub fn build_state(&self) -> Result<AppState> {
        let repository = self
            .repository
            .clone()
            .ok_or_else(|| anyhow!("EventRepository is required. Call .with_repository()"))?;
        let auth = self
            .auth_provider
            .clone()
            .ok_or_else(|| anyhow!("AuthProvider is required. Call .with_auth_provider()"))?;
        let registry = self
            .registry
            .clone()
            .unwrap_or_else(|| Arc::new(ConnectionRegistry::new(self.ws.max_dropped_messages)));

        Ok(AppState {
            repository,
            auth,
            registry,
            ws: self.ws,
        })
    }

    /// Build the router and return the state it was built around
    ///
    /// Callers that need to observe the registry (tests, admin tooling)
    /// use this instead of [`build`](Self::build).
    pub fn build_with_state(mut self) -> Result<(AppState, Router)> {
        let state = self.build_state()?;
        let custom_routes = std::mem::take(&mut self.custom_routes);

        let mut app = RestExposure::build_router(state.clone(), custom_routes)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        if self.cors_permissive {
            app = app.layer(CorsLayer::permissive());
        }

        Ok((state, app))
    }

    /// Build the complete router
    pub fn build(self) -> Result<Router> {
        self.build_with_state().map(|(_, app)| app)
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
///
/// A handler that fails to install never fires; the other one still can.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
