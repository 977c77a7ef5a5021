//! Retrieval Server Entry Point

use retrieval::{api, Config, RetrievalEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,retrieval=debug".into()),
    );
    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting retrieval server...");

    // Load config
    let config = Config::from_env()?;
    tracing::info!("Loaded config: {:?}", config);

    // Create engine
    let engine = RetrievalEngine::from_config(&config).await?;
    tracing::info!("Retrieval engine initialized");

    // Start API server
    api::serve(engine, config.api).await?;

    Ok(())
}
