//! # Retrieval Service
//!
//! Semantic retrieval over prebuilt embedding indexes kept in object storage.
//!
//! ## Architecture
//!
//! ```text
//! HTTP API (Axum)
//!     │
//!     ▼
//! RetrievalEngine
//!     │
//!     ├── QueryAggregator (domain routing, dedup, merge)
//!     │       ├── Embedder (HuggingFace with hash fallback)
//!     │       └── SimilaritySearch (exact cosine top-k)
//!     │               │
//!     │               ▼
//!     │       IndexCache (single resident index, TTL)
//!     │               │
//!     ├── IndexBuilder ┤
//!     │               ▼
//!     └────── VectorStore (vectors.bin + metadata.jsonl)
//!                     │
//!                     ▼
//!             ObjectStorage (mock filesystem or S3)
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use retrieval::{Config, RetrievalEngine};
//!
//! let config = Config::from_env()?;
//! let engine = RetrievalEngine::from_config(&config).await?;
//! let results = engine.query(&facts, Some(5), false).await?;
//! ```

pub mod defaults;
pub mod error;
pub mod storage;
pub mod vectors;
pub mod cache;
pub mod search;
pub mod embed;
pub mod aggregate;
pub mod corpus;
pub mod engine;
pub mod api;
pub mod config;

pub use aggregate::QueryAggregator;
pub use cache::IndexCache;
pub use config::Config;
pub use engine::RetrievalEngine;
pub use error::{Result, RetrievalError};
pub use search::SimilaritySearch;
pub use vectors::VectorStore;
