//! Exact cosine similarity search
//!
//! Every query scans all N rows of the resident index (O(N·D)). That is the
//! intended trade-off for indexes in the hundreds to low thousands of rows;
//! there is no approximate structure to build or keep in sync.

use crate::cache::{CacheStatus, IndexCache, IndexSnapshot};
use crate::error::{Result, RetrievalError};
use crate::vectors::IndexRecord;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// One ranked hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub score: f32,
    pub metadata: IndexRecord,
}

/// Euclidean norm
pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity of `row` against a query whose norm is already known
///
/// Zero when either side has zero magnitude, and for rows holding non-finite
/// values, so every score is finite.
fn cosine(row: &[f32], query: &[f32], query_norm: f32) -> f32 {
    let denom = norm(row) * query_norm;
    if denom == 0.0 {
        return 0.0;
    }
    let score = row.iter().zip(query).map(|(x, y)| x * y).sum::<f32>() / denom;
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Rank every row of `snapshot` against `query` and keep the best `top_k`
///
/// Ties keep row order.
pub fn rank(snapshot: &IndexSnapshot, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
    if top_k == 0 {
        return Err(RetrievalError::invalid_input("top_k must be at least 1"));
    }
    if query.len() != snapshot.dims() {
        return Err(RetrievalError::dimension_mismatch(snapshot.dims(), query.len()));
    }

    let query_norm = norm(query);
    let mut scored: Vec<(usize, f32)> = snapshot
        .vectors
        .iter_rows()
        .enumerate()
        .map(|(i, row)| (i, cosine(row, query, query_norm)))
        .collect();

    // Stable: equal scores stay in row order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(i, score)| SearchResult {
            score,
            metadata: snapshot.metadata[i].clone(),
        })
        .collect())
}

/// Similarity search over indexes served by the cache
#[derive(Clone)]
pub struct SimilaritySearch {
    cache: Arc<IndexCache>,
}

impl SimilaritySearch {
    pub fn new(cache: Arc<IndexCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<IndexCache> {
        &self.cache
    }

    /// Top-k rows of `index_name` most similar to `query`
    pub async fn search(
        &self,
        query: &[f32],
        index_name: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let lookup = self.cache.get_or_load(index_name, false).await?;
        let results = rank(&lookup.snapshot, query, top_k)?;
        debug!(event = "search_completed", index = %index_name, top_k, hits = results.len(), "Search completed");
        Ok(results)
    }

    /// Search several queries against one snapshot of `index_name`
    ///
    /// Loading failures fail the whole call. Per-query failures (such as a
    /// dimension mismatch) are reported in that query's slot only.
    pub async fn search_many(
        &self,
        index_name: &str,
        queries: &[Vec<f32>],
        top_k: usize,
        force_reload: bool,
    ) -> Result<(CacheStatus, Vec<Result<Vec<SearchResult>>>)> {
        let lookup = self.cache.get_or_load(index_name, force_reload).await?;

        let results = queries
            .iter()
            .map(|query| {
                let ranked = rank(&lookup.snapshot, query, top_k);
                if let Ok(hits) = &ranked {
                    debug!(event = "search_completed", index = %index_name, top_k, hits = hits.len(), "Search completed");
                }
                ranked
            })
            .collect();

        Ok((lookup.status, results))
    }
}
