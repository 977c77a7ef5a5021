//! Configuration module

use crate::aggregate::DomainMap;
use crate::defaults::*;
use crate::embed::{Embedder, FallbackEmbedder, HuggingFaceConfig, HuggingFaceEmbedder};
use crate::storage::{mock, ObjectStorage};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub embedding: EmbeddingConfig,
    pub api: ApiConfig,
}

/// Parse an optional environment variable, failing on malformed values
fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", key, v, e)),
        _ => Ok(None),
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let storage_mode = std::env::var("STORAGE_MODE").unwrap_or_else(|_| "mock".to_string());

        let bucket = env_string("S3_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        let timeout = Duration::from_secs(
            env_parse("STORE_TIMEOUT_SECS")?.unwrap_or(DEFAULT_STORE_TIMEOUT_SECS),
        );

        let backend = match storage_mode.as_str() {
            "mock" => StorageBackendConfig::Mock {
                root: env_string("S3_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp/retrieval/s3").join(&bucket)),
                simulate_latency: std::env::var("SIMULATE_LATENCY")
                    .map(|v| v == "true")
                    .unwrap_or(false),
            },
            #[cfg(feature = "aws-storage")]
            "aws" => StorageBackendConfig::Aws {
                region: env_string("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
                bucket: bucket.clone(),
                prefix: env_string("S3_PREFIX").unwrap_or_default(),
            },
            _ => anyhow::bail!("Unknown storage mode: {}", storage_mode),
        };

        let storage = StorageConfig { backend, timeout };

        let engine = EngineConfig {
            cache_ttl_secs: env_parse("CACHE_TTL_SECS")?.unwrap_or(DEFAULT_CACHE_TTL_SECS),
            default_top_k: env_parse("DEFAULT_TOP_K")?.unwrap_or(DEFAULT_TOP_K),
            domain_map_path: env_string("DOMAIN_MAP_PATH").map(PathBuf::from),
            corpus_path: env_string("CORPUS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CORPUS_PATH)),
            corpus_index: env_string("CORPUS_INDEX")
                .unwrap_or_else(|| DEFAULT_CORPUS_INDEX.to_string()),
        };
        if engine.default_top_k == 0 {
            anyhow::bail!("DEFAULT_TOP_K must be at least 1");
        }

        let embedding = EmbeddingConfig {
            dims: env_parse("EMBEDDING_DIMS")?.unwrap_or(DEFAULT_DIMENSIONS),
            hf_token: env_string("HF_TOKEN"),
            url: env_string("EMBEDDING_URL").unwrap_or_else(|| DEFAULT_EMBEDDING_URL.to_string()),
            timeout: Duration::from_secs(
                env_parse("EMBED_TIMEOUT_SECS")?.unwrap_or(DEFAULT_EMBED_TIMEOUT_SECS),
            ),
        };

        let api = ApiConfig {
            host: env_string("API_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env_parse("API_PORT")?.unwrap_or(DEFAULT_PORT),
            cors_origins: env_string("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(default_cors_origins),
        };

        Ok(Self {
            storage,
            engine,
            embedding,
            api,
        })
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackendConfig,
    /// Upper bound for a single backing-store call
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum StorageBackendConfig {
    Mock {
        root: PathBuf,
        simulate_latency: bool,
    },
    #[cfg(feature = "aws-storage")]
    Aws {
        region: String,
        bucket: String,
        prefix: String,
    },
}

impl StorageConfig {
    /// Create object storage from config
    pub async fn create_backend(&self) -> anyhow::Result<Arc<dyn ObjectStorage>> {
        match &self.backend {
            StorageBackendConfig::Mock {
                root,
                simulate_latency,
            } => {
                let config = if *simulate_latency {
                    mock::MockStorageConfig::realistic()
                } else {
                    mock::MockStorageConfig::fast()
                };

                Ok(mock::create_mock_storage(root, config)?)
            }
            #[cfg(feature = "aws-storage")]
            StorageBackendConfig::Aws {
                region,
                bucket,
                prefix,
            } => {
                use crate::storage::aws;
                aws::create_s3_storage(region, bucket, prefix).await
            }
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Resident index lifetime; zero or negative disables caching
    pub cache_ttl_secs: i64,
    pub default_top_k: usize,
    /// JSON domain table; the built-in table is used when unset
    pub domain_map_path: Option<PathBuf>,
    pub corpus_path: PathBuf,
    pub corpus_index: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            default_top_k: DEFAULT_TOP_K,
            domain_map_path: None,
            corpus_path: PathBuf::from(DEFAULT_CORPUS_PATH),
            corpus_index: DEFAULT_CORPUS_INDEX.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load_domain_map(&self) -> crate::Result<DomainMap> {
        match &self.domain_map_path {
            Some(path) => DomainMap::from_file(path),
            None => Ok(DomainMap::builtin()),
        }
    }
}

/// Embedding provider configuration
#[derive(Clone)]
pub struct EmbeddingConfig {
    pub dims: usize,
    pub hf_token: Option<String>,
    pub url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("dims", &self.dims)
            .field("hf_token", &self.hf_token.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dims: DEFAULT_DIMENSIONS,
            hf_token: None,
            url: DEFAULT_EMBEDDING_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_EMBED_TIMEOUT_SECS),
        }
    }
}

impl EmbeddingConfig {
    /// Provider with hash fallback; without a token only the fallback is used
    pub fn create_embedder(&self) -> crate::Result<Arc<dyn Embedder>> {
        let primary: Option<Arc<dyn Embedder>> = match &self.hf_token {
            Some(token) => {
                let config = HuggingFaceConfig::new(token.clone())
                    .with_url(self.url.clone())
                    .with_dims(self.dims)
                    .with_timeout(self.timeout);
                Some(Arc::new(HuggingFaceEmbedder::new(config)?))
            }
            None => None,
        };
        Ok(Arc::new(FallbackEmbedder::new(primary, self.dims)))
    }
}

/// API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: default_cors_origins(),
        }
    }
}
