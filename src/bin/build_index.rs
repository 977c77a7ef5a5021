//! Index Builder CLI
//!
//! Embed a parsed-document corpus and upload it as a named index.
//!
//! Usage:
//!   cargo run --bin build-index -- --corpus parsed_documents.json --index civil
//!   STORAGE_MODE=aws cargo run --bin build-index --features aws-storage -- --index civil

use clap::Parser;
use retrieval::{Config, RetrievalEngine};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "build-index")]
#[command(about = "Build a retrieval index from a parsed-document corpus")]
#[command(version)]
struct Args {
    /// Corpus JSON file (overrides CORPUS_PATH)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Target index name (overrides CORPUS_INDEX)
    #[arg(long)]
    index: Option<String>,

    /// List indexes in storage and exit
    #[arg(long)]
    list: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("retrieval={},build_index={}", log_level, log_level)),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if let Some(corpus) = args.corpus {
        config.engine.corpus_path = corpus;
    }
    if let Some(index) = args.index {
        config.engine.corpus_index = index;
    }

    let engine = RetrievalEngine::from_config(&config).await?;

    if args.list {
        for name in engine.list_indexes().await? {
            println!("{}", name);
        }
        return Ok(());
    }

    let report = engine.create_index().await?;

    println!("\n=== Index Built ===");
    println!("Index:      {}", report.index);
    println!("Vectors:    {}", report.vectors);
    println!("Dimensions: {}", report.dims);

    Ok(())
}
