//! Resident index cache
//!
//! Holds at most one loaded index. Readers clone an `Arc` to the resident
//! snapshot and never observe a partially loaded entry; a reload builds a
//! complete snapshot off to the side and swaps it in only after validation.
//!
//! Misses are single-flight: loads are serialized through a gate, and a caller
//! that waited behind another load re-checks the resident entry before going
//! to the backing store.

use crate::error::{Result, RetrievalError};
use crate::vectors::{IndexRecord, VectorMatrix, VectorStore};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// A fully materialized index
#[derive(Debug)]
pub struct IndexSnapshot {
    pub name: String,
    pub vectors: VectorMatrix,
    pub metadata: Vec<IndexRecord>,
    pub loaded_at: Instant,
}

impl IndexSnapshot {
    pub fn rows(&self) -> usize {
        self.vectors.rows()
    }

    pub fn dims(&self) -> usize {
        self.vectors.dims()
    }
}

/// Why a lookup went to the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// Nothing resident yet
    Cold,
    /// A different index was resident
    NameMismatch,
    /// The resident entry outlived the TTL
    Expired,
    /// The caller asked for a reload
    Forced,
    /// TTL is zero or negative
    CachingDisabled,
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    Loaded(MissReason),
}

impl CacheStatus {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

/// Snapshot plus how it was obtained
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub snapshot: Arc<IndexSnapshot>,
    pub status: CacheStatus,
}

/// Description of the resident entry, for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct ResidentIndex {
    pub name: String,
    pub rows: usize,
    pub dims: usize,
    pub age_secs: u64,
}

/// Process-wide single-entry index cache
pub struct IndexCache {
    store: Arc<VectorStore>,
    /// `None` disables caching
    ttl: Option<Duration>,
    resident: RwLock<Option<Arc<IndexSnapshot>>>,
    load_gate: Mutex<()>,
}

impl IndexCache {
    /// Create a cache; a TTL of zero or less disables caching
    pub fn new(store: Arc<VectorStore>, ttl_secs: i64) -> Self {
        let ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs as u64));
        Self {
            store,
            ttl,
            resident: RwLock::new(None),
            load_gate: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Decide whether the resident entry can serve `index_name`
    fn check(&self, index_name: &str) -> std::result::Result<Arc<IndexSnapshot>, MissReason> {
        let resident = self.resident.read().clone();
        let Some(snapshot) = resident else {
            return Err(MissReason::Cold);
        };
        if snapshot.name != index_name {
            return Err(MissReason::NameMismatch);
        }
        let Some(ttl) = self.ttl else {
            return Err(MissReason::CachingDisabled);
        };
        if snapshot.loaded_at.elapsed() > ttl {
            return Err(MissReason::Expired);
        }
        Ok(snapshot)
    }

    /// Return the named index, loading it from the backing store on a miss
    pub async fn get_or_load(&self, index_name: &str, force_reload: bool) -> Result<CacheLookup> {
        if force_reload {
            info!(event = "force_reload_triggered", index = %index_name, "Forced index reload");
        } else if let Ok(snapshot) = self.check(index_name) {
            info!(event = "index_cache_hit", index = %index_name, "Index cache hit");
            return Ok(CacheLookup {
                snapshot,
                status: CacheStatus::Hit,
            });
        }

        let _gate = self.load_gate.lock().await;

        // Another caller may have loaded it while we waited
        let reason = if force_reload {
            MissReason::Forced
        } else {
            match self.check(index_name) {
                Ok(snapshot) => {
                    info!(event = "index_cache_hit", index = %index_name, "Index cache hit after waiting on load");
                    return Ok(CacheLookup {
                        snapshot,
                        status: CacheStatus::Hit,
                    });
                }
                Err(reason) => reason,
            }
        };

        debug!(index = %index_name, ?reason, "Index cache miss");
        let snapshot = Arc::new(self.load(index_name).await?);
        *self.resident.write() = Some(snapshot.clone());

        info!(
            event = "index_loaded",
            index = %index_name,
            vectors = snapshot.rows(),
            "Index loaded"
        );
        Ok(CacheLookup {
            snapshot,
            status: CacheStatus::Loaded(reason),
        })
    }

    /// Fetch and validate a complete snapshot without touching the resident entry
    async fn load(&self, index_name: &str) -> Result<IndexSnapshot> {
        let (vectors, metadata) = self.store.fetch(index_name).await?;

        if vectors.rows() != metadata.len() {
            return Err(RetrievalError::row_count_mismatch(
                index_name,
                vectors.rows(),
                metadata.len(),
            ));
        }

        Ok(IndexSnapshot {
            name: index_name.to_string(),
            vectors,
            metadata,
            loaded_at: Instant::now(),
        })
    }

    /// Drop the resident entry if it holds `index_name`
    pub fn invalidate(&self, index_name: &str) -> bool {
        let mut resident = self.resident.write();
        if resident.as_ref().is_some_and(|s| s.name == index_name) {
            *resident = None;
            debug!(index = %index_name, "Invalidated resident index");
            true
        } else {
            false
        }
    }

    /// Describe the resident entry, if any
    pub fn resident(&self) -> Option<ResidentIndex> {
        self.resident.read().as_ref().map(|s| ResidentIndex {
            name: s.name.clone(),
            rows: s.rows(),
            dims: s.dims(),
            age_secs: s.loaded_at.elapsed().as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::{MockObjectStorage, MockStorageConfig};
    use crate::storage::ObjectStorage;
    use bytes::Bytes;

    async fn seeded_cache(ttl_secs: i64) -> (Arc<MockObjectStorage>, IndexCache) {
        let storage = Arc::new(MockObjectStorage::temp(MockStorageConfig::fast()).unwrap());
        let store = Arc::new(VectorStore::new(storage.clone(), Duration::from_secs(5)));

        let vectors = VectorMatrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let records = vec![IndexRecord::new("A", "a", "a"), IndexRecord::new("B", "b", "b")];
        store.store("civil", &vectors, &records).await.unwrap();
        store.store("penal", &vectors, &records).await.unwrap();

        (storage, IndexCache::new(store, ttl_secs))
    }

    #[tokio::test]
    async fn test_cold_then_hit() {
        let (_storage, cache) = seeded_cache(60).await;

        let first = cache.get_or_load("civil", false).await.unwrap();
        assert_eq!(first.status, CacheStatus::Loaded(MissReason::Cold));
        assert_eq!(first.snapshot.metadata.len(), first.snapshot.rows());

        let second = cache.get_or_load("civil", false).await.unwrap();
        assert!(second.status.is_hit());
        assert!(Arc::ptr_eq(&first.snapshot, &second.snapshot));
    }

    #[tokio::test]
    async fn test_name_mismatch_evicts() {
        let (_storage, cache) = seeded_cache(60).await;

        cache.get_or_load("civil", false).await.unwrap();
        let penal = cache.get_or_load("penal", false).await.unwrap();
        assert_eq!(penal.status, CacheStatus::Loaded(MissReason::NameMismatch));
        assert_eq!(cache.resident().unwrap().name, "penal");
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_caching() {
        let (_storage, cache) = seeded_cache(0).await;
        assert!(cache.ttl().is_none());

        cache.get_or_load("civil", false).await.unwrap();
        let again = cache.get_or_load("civil", false).await.unwrap();
        assert_eq!(again.status, CacheStatus::Loaded(MissReason::CachingDisabled));
    }

    #[tokio::test]
    async fn test_corrupt_reload_keeps_old_entry() {
        let (storage, cache) = seeded_cache(60).await;
        let good = cache.get_or_load("civil", false).await.unwrap();

        // One record for two vectors
        storage
            .put(
                "civil/metadata.jsonl",
                Bytes::from_static(br#"{"id":"A","title":"a","text":"a"}"#),
            )
            .await
            .unwrap();

        let err = cache.get_or_load("civil", true).await.unwrap_err();
        assert!(matches!(err, RetrievalError::CorruptIndex { .. }));

        let still = cache.get_or_load("civil", false).await.unwrap();
        assert!(still.status.is_hit());
        assert!(Arc::ptr_eq(&good.snapshot, &still.snapshot));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (_storage, cache) = seeded_cache(60).await;
        cache.get_or_load("civil", false).await.unwrap();

        assert!(!cache.invalidate("penal"));
        assert!(cache.invalidate("civil"));
        assert!(cache.resident().is_none());
    }
}
