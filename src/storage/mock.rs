//! Mock storage implementation for local development
//!
//! Features:
//! - Uses local filesystem, one file per object key
//! - Simulates S3 latency (configurable)
//! - Full API compatibility with the S3 backend

use super::*;
use async_trait::async_trait;
use bytes::Bytes;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for mock storage behavior
#[derive(Debug, Clone)]
pub struct MockStorageConfig {
    /// Simulated S3 PUT latency
    pub s3_put_latency: Duration,
    /// Simulated S3 GET latency
    pub s3_get_latency: Duration,
    /// Random latency variance (0.0 - 1.0)
    pub latency_variance: f64,
}

impl Default for MockStorageConfig {
    fn default() -> Self {
        Self {
            // Realistic S3 latencies
            s3_put_latency: Duration::from_millis(50),
            s3_get_latency: Duration::from_millis(20),
            latency_variance: 0.2,
        }
    }
}

impl MockStorageConfig {
    /// Config for fast tests (no artificial latency)
    pub fn fast() -> Self {
        Self {
            s3_put_latency: Duration::ZERO,
            s3_get_latency: Duration::ZERO,
            latency_variance: 0.0,
        }
    }

    /// Config for realistic simulation
    pub fn realistic() -> Self {
        Self::default()
    }
}

/// Mock S3 (object storage)
pub struct MockObjectStorage {
    root: PathBuf,
    config: MockStorageConfig,
}

impl MockObjectStorage {
    pub fn new(root: impl Into<PathBuf>, config: MockStorageConfig) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        Ok(Self { root, config })
    }

    /// Create with temp directory (for tests)
    pub fn temp(config: MockStorageConfig) -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?.into_path();
        Self::new(temp_dir, config)
    }

    /// Root directory objects are written under
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    async fn simulate_latency(&self, base: Duration) {
        if base.is_zero() {
            return;
        }

        let variance = self.config.latency_variance;
        let jitter = if variance > 0.0 {
            let factor = 1.0 + (rand::random::<f64>() * 2.0 - 1.0) * variance;
            base.mul_f64(factor)
        } else {
            base
        };

        sleep(jitter).await;
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.simulate_latency(self.config.s3_put_latency).await;

        let full_path = self.full_path(key);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a concurrent get never sees a torn object
        let mut staging = full_path.clone().into_os_string();
        staging.push(".part");
        let staging = PathBuf::from(staging);
        fs::write(&staging, &data)?;
        fs::rename(&staging, &full_path)?;

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.simulate_latency(self.config.s3_get_latency).await;

        let full_path = self.full_path(key);
        if !full_path.exists() {
            return Err(StorageError::NotFound {
                key: key.to_string(),
            });
        }

        let data = Bytes::from(fs::read(&full_path)?);
        Ok(data)
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let mut objects = Vec::new();

        fn visit_dir(
            base: &Path,
            current: &Path,
            prefix: &str,
            objects: &mut Vec<ObjectInfo>,
        ) -> std::io::Result<()> {
            if current.is_dir() {
                for entry in fs::read_dir(current)? {
                    let entry = entry?;
                    let path = entry.path();

                    if path.is_dir() {
                        visit_dir(base, &path, prefix, objects)?;
                        continue;
                    }

                    let Ok(relative) = path.strip_prefix(base) else {
                        continue;
                    };
                    // Object keys always use '/' regardless of platform
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");

                    if key.starts_with(prefix) && !key.ends_with(".part") {
                        let metadata = fs::metadata(&path)?;
                        objects.push(ObjectInfo {
                            key,
                            size: metadata.len(),
                            last_modified: metadata
                                .modified()
                                .map(chrono::DateTime::from)
                                .unwrap_or_else(|_| chrono::Utc::now()),
                        });
                    }
                }
            }
            Ok(())
        }

        visit_dir(&self.root, &self.root, prefix, &mut objects)?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(objects)
    }
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Create mock object storage rooted at a directory
pub fn create_mock_storage(
    root: impl Into<PathBuf>,
    config: MockStorageConfig,
) -> std::io::Result<Arc<dyn ObjectStorage>> {
    Ok(Arc::new(MockObjectStorage::new(root, config)?))
}

/// Create mock storage in a temp directory (for tests)
pub fn create_temp_storage(config: MockStorageConfig) -> std::io::Result<Arc<dyn ObjectStorage>> {
    Ok(Arc::new(MockObjectStorage::temp(config)?))
}
