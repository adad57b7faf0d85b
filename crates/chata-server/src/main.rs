//! # chata-server
//!
//! Chat backend process for chata.
//!
//! This binary:
//! - loads configuration from the environment
//! - opens the file-backed user and chat stores, tolerating corrupt records
//! - optionally registers a first admin user and writes its private key
//! - hands the stores to the request layer and runs until Ctrl+C

use chata_server::{ChatService, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,chata_server=debug,chata_store=debug")
            }),
        )
        .init();

    info!("Starting chata server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    config.validate()?;
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open stores
    // -----------------------------------------------------------------------
    let service = ChatService::open(&config).await?;

    if let Some(admin_id) = &config.bootstrap_admin {
        match service
            .bootstrap_admin(admin_id, &config.admin_key_file)
            .await?
        {
            Some(user) => info!(id = %user.id, "Admin key written, keep it safe"),
            None => info!("Users already registered, skipping admin bootstrap"),
        }
    }

    info!(
        address = %config.address,
        users = service.users().len().await,
        sessions = service.chats().len().await,
        "Chat service ready"
    );

    // -----------------------------------------------------------------------
    // 4. Run until shutdown
    // -----------------------------------------------------------------------
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");

    Ok(())
}
