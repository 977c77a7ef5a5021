//! Storage abstraction layer
//!
//! Provides the object storage trait (S3-like) that vector indexes are kept in,
//! with a filesystem-backed mock for local development and a real S3
//! implementation for production.

pub mod mock;
pub mod types;

#[cfg(feature = "aws-storage")]
pub mod aws;

use async_trait::async_trait;
use bytes::Bytes;

pub use types::*;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage operation timed out after {secs}s: {op} {key}")]
    Timeout {
        op: &'static str,
        key: String,
        secs: u64,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage trait (S3-like)
///
/// Whole-object operations only; there is no random access.
#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Put object
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Get object
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// List objects with prefix
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;
}
