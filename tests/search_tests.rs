//! End-to-end similarity search over uploaded indexes

mod common;

use common::*;
use retrieval::{IndexCache, RetrievalError, SimilaritySearch};
use std::sync::Arc;

async fn search_over(storage: Arc<FailingStorage>) -> SimilaritySearch {
    let store = vector_store(storage);
    SimilaritySearch::new(Arc::new(IndexCache::new(store, 600)))
}

#[tokio::test]
async fn test_civil_scenario() {
    let storage = FailingStorage::temp();
    let store = vector_store(storage.clone());
    upload_index(
        &store,
        "civil",
        &["A", "B", "C"],
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]],
    )
    .await;

    let search = search_over(storage).await;
    let results = search.search(&[1.0, 0.0], "civil", 2).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metadata.id.to_string(), "A");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[1].metadata.id.to_string(), "C");
    assert!((results[1].score - 0.9939).abs() < 1e-3);
    assert_eq!(results[1].metadata.title, "Title C");
}

#[tokio::test]
async fn test_top_k_bound() {
    let storage = FailingStorage::temp();
    upload_seeded_index(&vector_store(storage.clone()), "civil", 16, 7).await;
    let search = search_over(storage).await;
    let query = seeded_vector(16, 99);

    for top_k in [1, 3, 7, 8, 100] {
        let results = search.search(&query, "civil", top_k).await.unwrap();
        assert_eq!(results.len(), top_k.min(7), "top_k = {}", top_k);
    }
}

#[tokio::test]
async fn test_results_sorted_and_deterministic() {
    let storage = FailingStorage::temp();
    upload_seeded_index(&vector_store(storage.clone()), "civil", 32, 200).await;
    let search = search_over(storage).await;
    let query = seeded_vector(32, 1234);

    let first = search.search(&query, "civil", 20).await.unwrap();
    for pair in first.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    for _ in 0..5 {
        let again = search.search(&query, "civil", 20).await.unwrap();
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_query_equal_to_row_ranks_first() {
    let storage = FailingStorage::temp();
    upload_seeded_index(&vector_store(storage.clone()), "civil", 32, 50).await;
    let search = search_over(storage).await;

    let results = search.search(&seeded_vector(32, 17), "civil", 1).await.unwrap();
    assert_eq!(results[0].metadata.id.to_string(), "civil-17");
    assert!((results[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_dimension_mismatch() {
    let storage = FailingStorage::temp();
    upload_seeded_index(&vector_store(storage.clone()), "civil", 8, 3).await;
    let search = search_over(storage).await;

    let err = search.search(&[1.0, 0.0], "civil", 2).await.unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::DimensionMismatch { expected: 8, actual: 2 }
    ));
}

#[tokio::test]
async fn test_search_many_isolates_bad_query() {
    let storage = FailingStorage::temp();
    upload_seeded_index(&vector_store(storage.clone()), "civil", 8, 5).await;
    let search = search_over(storage.clone()).await;

    let queries = vec![seeded_vector(8, 0), vec![1.0; 3], seeded_vector(8, 1)];
    let (status, results) = search.search_many("civil", &queries, 2, false).await.unwrap();

    assert!(!status.is_hit());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().len(), 2);
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap()[0].metadata.id.to_string(), "civil-1");
    assert_eq!(storage.gets(), 2);
}
