//! Centralized default values and constants
//!
//! This module consolidates all magic numbers and default values used throughout
//! the codebase, making them easy to find, modify, and document.

// ============================================================================
// Vector Dimensions
// ============================================================================

/// Default embedding dimensionality (all-MiniLM-L6-v2)
pub const DEFAULT_DIMENSIONS: usize = 384;

// ============================================================================
// Vector Matrix Blob
// ============================================================================

/// Vector matrix blob magic number ("VECM" in big-endian ASCII)
pub const VECTOR_MATRIX_MAGIC: u32 = 0x5645434D;

/// Current vector matrix blob version
pub const VECTOR_MATRIX_VERSION: u32 = 1;

/// Vector matrix header size in bytes
pub const VECTOR_MATRIX_HEADER_SIZE: usize = 64;

/// Object key suffix for the vector matrix of an index
pub const VECTORS_OBJECT: &str = "vectors.bin";

/// Object key suffix for the newline-delimited metadata of an index
pub const METADATA_OBJECT: &str = "metadata.jsonl";

// ============================================================================
// Cache
// ============================================================================

/// Default time-to-live of the resident index, in seconds
pub const DEFAULT_CACHE_TTL_SECS: i64 = 600;

// ============================================================================
// Object Storage
// ============================================================================

/// Default bucket holding the vector indexes
pub const DEFAULT_BUCKET: &str = "legal-system-embeddings-v1";

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default timeout for a single backing-store operation, in seconds
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Embeddings
// ============================================================================

/// Hugging Face feature-extraction endpoint for the default sentence model
pub const DEFAULT_EMBEDDING_URL: &str =
    "https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2";

/// Default timeout for an embedding request, in seconds
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 10;

/// Number of texts sent per embedding request when building an index
pub const EMBED_BATCH_SIZE: usize = 32;

// ============================================================================
// Search Parameters
// ============================================================================

/// Default number of results to return per query (k)
pub const DEFAULT_TOP_K: usize = 5;

// ============================================================================
// Corpus
// ============================================================================

/// Default path of the parsed document corpus
pub const DEFAULT_CORPUS_PATH: &str = "parsed_documents.json";

/// Default index the corpus is uploaded to
pub const DEFAULT_CORPUS_INDEX: &str = "civil";

/// Domain mapping key used when a query's domain is unmapped
pub const DEFAULT_DOMAIN: &str = "default";

// ============================================================================
// Server Configuration
// ============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "retrieval-lambda";

/// Origins allowed to make credentialed cross-origin requests
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "https://kredilatam.com",
];

/// Header carrying the request correlation id
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
