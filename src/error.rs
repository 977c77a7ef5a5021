//! Unified error types for the retrieval service
//!
//! This module provides a centralized error hierarchy that all components
//! can use, enabling consistent error handling across the codebase.

use crate::storage::StorageError;

/// Main error type for retrieval operations
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Backing store errors (fetch or upload failed, object missing, timeout)
    #[error("Backing store error: {0}")]
    BackingStore(#[from] StorageError),

    /// Index blobs are unreadable or disagree with each other
    #[error("Corrupt index '{index}': {reason}")]
    CorruptIndex { index: String, reason: String },

    /// Vector dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Deserialization errors
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;

impl RetrievalError {
    /// Create a corrupt index error
    pub fn corrupt_index(index: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            index: index.into(),
            reason: reason.into(),
        }
    }

    /// Create the corrupt index error for a vectors/metadata row-count mismatch
    pub fn row_count_mismatch(index: impl Into<String>, vectors: usize, records: usize) -> Self {
        Self::corrupt_index(
            index,
            format!("{} vectors but {} metadata records", vectors, records),
        )
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the failure is scoped to a single query rather than the whole request
    pub fn is_per_query(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        RetrievalError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for RetrievalError {
    fn from(err: serde_json::Error) -> Self {
        RetrievalError::Deserialization(err.to_string())
    }
}
