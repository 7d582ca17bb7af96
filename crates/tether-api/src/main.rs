//! Tether handoff API - issues and redeems one-time desktop sign-in codes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tether_api::{router, AppState, LocalTokenIssuer};
use tether_config::{init_logging, Config, Paths, StoreBackend};
use tether_handoff::{CodeIssuer, CodeRedeemer};
use tether_store::{CodeStore, MemoryCodeStore, RedisCodeStore};

/// Tether handoff API command-line interface.
#[derive(Parser)]
#[command(name = "tether-api")]
#[command(about = "HTTP API for the web-to-desktop sign-in handoff")]
#[command(version)]
struct Cli {
    /// Address to bind (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Base directory for runtime files (config, logs). Defaults to ~/.tether
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    init_logging(&config.log_level);

    let store: Arc<dyn CodeStore> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory code store (single instance only)");
            Arc::new(MemoryCodeStore::new())
        }
        StoreBackend::Redis => {
            tracing::info!(url = %config.redis_url, "Using Redis code store");
            Arc::new(RedisCodeStore::new(&config.redis_url)?)
        }
    };

    let state = AppState {
        issuer: Arc::new(CodeIssuer::new(
            store.clone(),
            Duration::from_secs(config.code_ttl_secs),
        )),
        redeemer: Arc::new(CodeRedeemer::new(store)),
        tokens: Arc::new(LocalTokenIssuer::new()),
    };

    let bind_addr = cli.bind.unwrap_or(config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Handoff API listening");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
