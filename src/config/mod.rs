//! Configuration loading and management
//!
//! The service reads a single YAML document. Every section is optional and
//! falls back to its defaults:
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 8000
//!   cors_permissive: true
//! ws:
//!   channel_capacity: 64
//!   max_dropped_messages: 100
//! log:
//!   filter: "info,events_hub=debug"
//! auth:
//!   tokens:
//!     - token: "alice-secret"
//!       user_id: 1
//!       username: alice
//! ```

use crate::core::auth::{StaticTokenAuthProvider, User};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Allow any origin (useful for browser clients during development)
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_permissive: false,
        }
    }
}

impl ServerConfig {
    /// Socket address to bind
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

/// WebSocket delivery settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    /// Outbound messages buffered per connection before hand-offs start failing
    pub channel_capacity: usize,

    /// Consecutive dropped messages after which a slow connection is evicted
    pub max_dropped_messages: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            max_dropped_messages: 100,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// A token accepted by the static auth provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: Vec<TokenEntry>,
}

impl AuthConfig {
    /// Build the token table provider
    pub fn provider(&self) -> StaticTokenAuthProvider {
        self.tokens
            .iter()
            .fold(StaticTokenAuthProvider::new(), |provider, entry| {
                provider.with_token(
                    entry.token.clone(),
                    User {
                        id: entry.user_id,
                        username: entry.username.clone(),
                    },
                )
            })
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ws: WsConfig,
    pub log: LogConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the service misbehave at runtime
    pub fn validate(&self) -> Result<()> {
        if self.ws.channel_capacity == 0 {
            bail!("ws.channel_capacity must be greater than 0");
        }
        if self.ws.max_dropped_messages == 0 {
            bail!("ws.max_dropped_messages must be greater than 0");
        }

        let mut seen = HashSet::new();
        for entry in &self.auth.tokens {
            if entry.token.trim().is_empty() {
                bail!("auth token for user {} is empty", entry.user_id);
            }
            if !seen.insert(entry.token.as_str()) {
                bail!("auth token for user {} is declared twice", entry.user_id);
            }
        }

        Ok(())
    }
}
