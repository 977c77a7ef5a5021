//! Concurrent access to the index cache
//!
//! Tests verify:
//! - Concurrent misses for the same index coalesce into one fetch
//! - Readers holding a snapshot are unaffected by a reload
//! - Concurrent searches see complete snapshots only

mod common;

use common::*;
use futures::future::join_all;
use retrieval::{IndexCache, SimilaritySearch};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_fetch_once() {
    let storage = FailingStorage::temp();
    let store = vector_store(storage.clone());
    upload_seeded_index(&store, "civil", 16, 100).await;
    storage.reset_counts();
    storage.set_get_delay(Duration::from_millis(50));

    let cache = Arc::new(IndexCache::new(store, 600));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_load("civil", false).await })
        })
        .collect();

    let mut loaded = 0;
    for handle in handles {
        let lookup = handle.await.unwrap().unwrap();
        assert_eq!(lookup.snapshot.rows(), 100);
        if !lookup.status.is_hit() {
            loaded += 1;
        }
    }

    assert_eq!(loaded, 1);
    assert_eq!(storage.gets(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_held_snapshot_survives_reload() {
    let storage = FailingStorage::temp();
    let store = vector_store(storage.clone());
    upload_seeded_index(&store, "civil", 8, 10).await;

    let cache = Arc::new(IndexCache::new(store.clone(), 600));
    let old = cache.get_or_load("civil", false).await.unwrap().snapshot;

    upload_seeded_index(&store, "civil", 8, 20).await;
    let new = cache.get_or_load("civil", true).await.unwrap().snapshot;

    assert_eq!(old.rows(), 10);
    assert_eq!(old.metadata.len(), 10);
    assert_eq!(new.rows(), 20);
    assert_eq!(cache.resident().unwrap().rows, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_searches_during_reloads_see_whole_snapshots() {
    let storage = FailingStorage::temp();
    let store = vector_store(storage.clone());
    upload_seeded_index(&store, "civil", 8, 30).await;

    let search = SimilaritySearch::new(Arc::new(IndexCache::new(store, 600)));
    let query = seeded_vector(8, 3);

    let readers = (0..32).map(|i| {
        let search = search.clone();
        let query = query.clone();
        async move {
            let force = i % 4 == 0;
            let (_, results) = search
                .search_many("civil", &[query], 5, force)
                .await
                .unwrap();
            results.into_iter().next().unwrap().unwrap()
        }
    });

    for results in join_all(readers).await {
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].metadata.id.to_string(), "civil-3");
    }
}
