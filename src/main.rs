//! Relay Service
//!
//! Main service binary that runs the REST API and the notification relay
//! concurrently until Ctrl+C.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin relay -- --config config/relay.toml
//! ```
//!
//! Or set the config path via environment variable:
//!
//! ```bash
//! RELAY_CONFIG_PATH=config/relay.toml cargo run --bin relay
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use relay::{
    api::ApiServer, Config, EvmSigner, FusionClient, NftClient, NotificationRelay, PushClient,
    SubscriptionStore,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "HTTP relay for Fusion orders, NFT lookups and Push messaging")]
struct Args {
    /// Path to configuration file (default: config/relay.toml or RELAY_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments first (before initializing logging)
    let args = Args::parse();

    // Initialize structured logging
    tracing_subscriber::fmt::init();

    info!("Starting Relay Service");

    // Priority: CLI arg > env var > default
    let config = if let Some(path) = args.config {
        info!("Loading configuration from: {}", path);
        Config::load_from_path(Some(&path))?
    } else {
        if let Ok(path) = std::env::var("RELAY_CONFIG_PATH") {
            info!("Loading configuration from RELAY_CONFIG_PATH: {}", path);
        } else {
            info!("Loading configuration from default location");
        }
        Config::load()?
    };
    let config = Arc::new(config);

    info!("Configuration loaded successfully");
    info!("Fusion API: {} (network {})", config.fusion.api_url, config.fusion.network_id);
    info!("NFT API: {} (chains {})", config.nft.api_url, config.nft.chain_ids_param());
    info!("Push API: {} (chain {})", config.push.api_url, config.push.chain_id);

    let signer = Arc::new(EvmSigner::from_config(&config.signer)?);

    let fusion = Arc::new(
        FusionClient::new(config.fusion.clone(), signer.clone())
            .context("Failed to create Fusion client")?,
    );
    let nft = Arc::new(NftClient::new(config.nft.clone()).context("Failed to create NFT client")?);
    let push = Arc::new(
        PushClient::new(config.push.clone(), signer.clone()).context("Failed to create Push client")?,
    );

    let store = Arc::new(match &config.storage.subscriptions_path {
        Some(path) => SubscriptionStore::load(path)
            .await
            .with_context(|| format!("Failed to load subscriptions from '{}'", path))?,
        None => {
            info!("No subscriptions_path configured, subscriptions are kept in memory");
            SubscriptionStore::in_memory()
        }
    });

    let relay = NotificationRelay::new(&config.push, push.clone(), store.clone())
        .context("Failed to create notification relay")?;
    let api_server = ApiServer::new(config.clone(), fusion, nft, push, store);

    info!("Starting all services...");

    tokio::select! {
        result = api_server.run() => {
            if let Err(e) = result {
                error!("API server error: {}", e);
            }
        }

        result = relay.run() => {
            if let Err(e) = result {
                error!("Notification relay error: {}", e);
            }
        }

        // Graceful shutdown on Ctrl+C
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping services...");
        }
    }

    info!("Relay service stopped");
    Ok(())
}
