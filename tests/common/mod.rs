//! Shared test utilities for retrieval testing
//!
//! This module provides:
//! - Deterministic vector generation with normalization
//! - Counting / failing object storage wrapper for fetch accounting and error injection
//! - Helpers to upload small indexes

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;

use retrieval::storage::mock::{MockObjectStorage, MockStorageConfig};
use retrieval::storage::{ObjectInfo, ObjectStorage, StorageError, StorageResult};
use retrieval::vectors::{IndexRecord, VectorMatrix};
use retrieval::VectorStore;

/// Generate a deterministic vector based on seed
pub fn seeded_vector(dims: usize, seed: u64) -> Vec<f32> {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let v: Vec<f32> = (0..dims).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect();
    normalize(&v)
}

/// Normalize a vector to unit length
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Failure injection mode for FailingStorage
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FailureMode {
    /// No failures
    None,
    /// Fail every get
    FailGets,
    /// Fail every put
    FailPuts,
    /// Serve truncated bytes for every get
    Truncate(usize),
}

/// Object storage wrapper that counts gets and can inject failures
pub struct FailingStorage {
    inner: Arc<dyn ObjectStorage>,
    failure_mode: std::sync::RwLock<FailureMode>,
    get_delay: std::sync::RwLock<Duration>,
    gets: AtomicU64,
    puts: AtomicU64,
}

impl FailingStorage {
    pub fn new(inner: Arc<dyn ObjectStorage>) -> Self {
        Self {
            inner,
            failure_mode: std::sync::RwLock::new(FailureMode::None),
            get_delay: std::sync::RwLock::new(Duration::ZERO),
            gets: AtomicU64::new(0),
            puts: AtomicU64::new(0),
        }
    }

    /// Wrap a fresh temp-dir mock store
    pub fn temp() -> Arc<Self> {
        let inner = Arc::new(MockObjectStorage::temp(MockStorageConfig::fast()).unwrap());
        Arc::new(Self::new(inner))
    }

    /// Set the failure mode
    pub fn set_failure_mode(&self, mode: FailureMode) {
        *self.failure_mode.write().unwrap() = mode;
    }

    /// Disable all failures
    pub fn disable_failures(&self) {
        self.set_failure_mode(FailureMode::None);
    }

    /// Delay applied before every get
    pub fn set_get_delay(&self, delay: Duration) {
        *self.get_delay.write().unwrap() = delay;
    }

    /// Number of gets issued (including failed ones)
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn reset_counts(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.puts.store(0, Ordering::SeqCst);
    }

    fn mode(&self) -> FailureMode {
        *self.failure_mode.read().unwrap()
    }
}

#[async_trait]
impl ObjectStorage for FailingStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.mode() == FailureMode::FailPuts {
            return Err(StorageError::Backend(format!("Injected put failure: {}", key)));
        }
        self.inner.put(key, data).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        let delay = *self.get_delay.read().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.mode() {
            FailureMode::FailGets => {
                Err(StorageError::Backend(format!("Injected get failure: {}", key)))
            }
            FailureMode::Truncate(len) => {
                let data = self.inner.get(key).await?;
                Ok(data.slice(..len.min(data.len())))
            }
            _ => self.inner.get(key).await,
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        self.inner.list(prefix).await
    }
}

/// Store over `storage` with a generous timeout
pub fn vector_store(storage: Arc<dyn ObjectStorage>) -> Arc<VectorStore> {
    Arc::new(VectorStore::new(storage, Duration::from_secs(5)))
}

/// Upload an index whose record ids are `ids` and whose rows are `rows`
pub async fn upload_index(store: &VectorStore, name: &str, ids: &[&str], rows: Vec<Vec<f32>>) {
    let records: Vec<IndexRecord> = ids
        .iter()
        .map(|id| IndexRecord::new(*id, format!("Title {}", id), format!("Text {}", id)))
        .collect();
    let vectors = VectorMatrix::from_rows(rows).unwrap();
    store.store(name, &vectors, &records).await.unwrap();
}

/// Upload `count` seeded rows named `{name}-{i}`
pub async fn upload_seeded_index(store: &VectorStore, name: &str, dims: usize, count: usize) {
    let ids: Vec<String> = (0..count).map(|i| format!("{}-{}", name, i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let rows = (0..count as u64).map(|i| seeded_vector(dims, i)).collect();
    upload_index(store, name, &id_refs, rows).await;
}
