//! Material Relay - signed material upload with app deep-link hand-off
//!
//! Uploads images and videos to the Xiaohongshu ark API and answers with a
//! page or payload that opens the app's publish screen. Without credentials,
//! or when the upload fails, materials are parked in a single-use in-memory
//! cache and referenced through a callback URL instead.

mod config;
mod error;
mod fetch;
mod links;
mod pages;
mod publish;
mod qr;
mod server;
mod types;

use crate::config::Config;
use crate::error::Result;
use crate::fetch::SourceFetcher;
use crate::links::LinkSettings;
use crate::publish::Publisher;
use crate::server::{start_server, ServerState, SharedState};
use ark_client::ArkClient;
use ephemeral_material_cache::MaterialCache;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("material_relay=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Material Relay...");

    let config = Config::from_env();
    info!("Port: {}", config.port);
    info!("Base URL: {}", config.base_url);
    info!("Ark endpoint: {}", config.ark_endpoint);

    let credentials = config.credentials();
    if credentials.is_none() {
        warn!("XHS_APP_ID or XHS_APP_SECRET not set, uploads run in demo mode");
    }

    let cache = MaterialCache::new();
    info!("Material TTL: {} seconds", cache.ttl().as_secs());

    let ark = ArkClient::with_endpoint(&config.ark_endpoint, credentials);
    let publisher = Publisher::new(ark, cache, LinkSettings::from_config(&config));

    let state: SharedState = Arc::new(ServerState::new(publisher, SourceFetcher::new()));

    // Start HTTP server (blocking)
    start_server(state, config.port).await?;

    Ok(())
}
