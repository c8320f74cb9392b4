//! Events hub server entry point
//!
//! ```text
//! events-hub [OPTIONS]
//!
//! Options:
//!   --config <PATH>   YAML configuration file   [env: EVENTS_HUB_CONFIG]
//!   --host   <HOST>   Override server.host      [env: EVENTS_HUB_HOST]
//!   --port   <PORT>   Override server.port      [env: EVENTS_HUB_PORT]
//! ```
//!
//! `RUST_LOG` takes precedence over `log.filter` from the configuration.

use anyhow::Context;
use clap::Parser;
use events_hub::config::AppConfig;
use events_hub::server::ServerBuilder;
use events_hub::storage::InMemoryEventRepository;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Events web API with a WebSocket chat channel
#[derive(Debug, Parser)]
#[command(name = "events-hub", version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, env = "EVENTS_HUB_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overrides `server.host`
    #[arg(long, env = "EVENTS_HUB_HOST")]
    host: Option<String>,

    /// Port to bind, overrides `server.port`
    #[arg(long, env = "EVENTS_HUB_PORT")]
    port: Option<u16>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_yaml_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .init();

    let addr = config.server.bind_addr()?;

    if config.auth.tokens.is_empty() {
        tracing::warn!("No auth tokens configured, only public endpoints will be usable");
    }

    tracing::info!(
        %addr,
        tokens = config.auth.tokens.len(),
        channel_capacity = config.ws.channel_capacity,
        "Starting events hub"
    );

    ServerBuilder::from_config(&config)
        .with_repository(InMemoryEventRepository::new())
        .serve(addr)
        .await
        .context("server terminated with an error")
}
