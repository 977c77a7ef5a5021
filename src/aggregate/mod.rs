//! Multi-query aggregation
//!
//! A request carries facts, each with queries tagged by domain. Queries are
//! routed to target indexes through the [`DomainMap`], collapsed to unique
//! strings per index, searched, and the hits merged per index with duplicates
//! removed by record id.

pub mod domains;

pub use domains::DomainMap;

use crate::embed::Embedder;
use crate::error::Result;
use crate::search::{SearchResult, SimilaritySearch};
use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Caller-supplied fact identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactId {
    Int(i64),
    Text(String),
}

/// Queries for one domain
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainQueries {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub queries: Vec<String>,
}

/// All queries derived from one fact
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactQueries {
    #[serde(default)]
    pub fact_id: Option<FactId>,
    #[serde(default)]
    pub data: Vec<DomainQueries>,
}

/// Request-scoped accumulation for one target index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryGroup {
    pub facts: BTreeSet<Option<FactId>>,
    pub queries: BTreeSet<String>,
}

/// Output for one target index
#[derive(Debug, Clone, Serialize)]
pub struct GroupResult {
    pub facts: Vec<Option<FactId>>,
    pub queries: Vec<String>,
    pub results: Vec<SearchResult>,
}

/// Routes, executes and merges multi-domain queries
pub struct QueryAggregator {
    search: SimilaritySearch,
    embedder: Arc<dyn Embedder>,
    domains: Arc<DomainMap>,
    /// Cleared by the first run of this process
    cold: AtomicBool,
}

impl QueryAggregator {
    pub fn new(
        search: SimilaritySearch,
        embedder: Arc<dyn Embedder>,
        domains: Arc<DomainMap>,
    ) -> Self {
        Self {
            search,
            embedder,
            domains,
            cold: AtomicBool::new(true),
        }
    }

    /// Partition queries by target index
    pub fn group(&self, facts: &[FactQueries]) -> BTreeMap<String, QueryGroup> {
        let mut groups: BTreeMap<String, QueryGroup> = BTreeMap::new();

        for fact in facts {
            for entry in &fact.data {
                let Some(targets) = self.domains.resolve(entry.domain.as_deref()) else {
                    warn!(
                        event = "unmapped_domain_dropped",
                        domain = entry.domain.as_deref().unwrap_or(""),
                        fact_id = ?fact.fact_id,
                        queries = entry.queries.len(),
                        "Domain has no mapping and no default entry; queries dropped"
                    );
                    continue;
                };

                for index in targets {
                    let group = groups.entry(index.clone()).or_default();
                    group.facts.insert(fact.fact_id.clone());
                    group.queries.extend(entry.queries.iter().cloned());
                }
            }
        }

        groups
    }

    /// Run every group and return merged results keyed by index name
    pub async fn run(
        &self,
        facts: &[FactQueries],
        top_k: usize,
        force_reload: bool,
    ) -> Result<BTreeMap<String, GroupResult>> {
        if self.cold.swap(false, Ordering::AcqRel) {
            info!(event = "cold_start", "First query of this process");
        } else {
            info!(event = "warm_start", "Reusing warm process");
        }

        let groups = self.group(facts);

        let outputs = try_join_all(
            groups
                .into_iter()
                .map(|(index, group)| self.run_group(index, group, top_k, force_reload)),
        )
        .await?;

        Ok(outputs.into_iter().collect())
    }

    async fn run_group(
        &self,
        index: String,
        group: QueryGroup,
        top_k: usize,
        force_reload: bool,
    ) -> Result<(String, GroupResult)> {
        let queries: Vec<String> = group.queries.into_iter().collect();

        let merged = if queries.is_empty() {
            Vec::new()
        } else {
            let vectors = join_all(queries.iter().map(|q| self.embedder.embed_one(q)))
                .await
                .into_iter()
                .collect::<Result<Vec<_>>>()?;

            let (_status, per_query) = self
                .search
                .search_many(&index, &vectors, top_k, force_reload)
                .await?;

            let mut hits = Vec::new();
            for (query, outcome) in queries.iter().zip(per_query) {
                match outcome {
                    Ok(results) => hits.push(results),
                    Err(e) if e.is_per_query() => {
                        warn!(index = %index, query = %query, error = %e, "Query skipped");
                    }
                    Err(e) => return Err(e),
                }
            }
            merge_results(hits)
        };

        info!(
            event = "multi_query_end",
            index = %index,
            queries = queries.len(),
            unique_results = merged.len(),
            "Multi-query finished"
        );

        Ok((
            index,
            GroupResult {
                facts: group.facts.into_iter().collect(),
                queries,
                results: merged,
            },
        ))
    }
}

/// Concatenate per-query hits, keep the first occurrence of each record id,
/// then order by score descending (stable)
pub fn merge_results(per_query: Vec<Vec<SearchResult>>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut merged: Vec<SearchResult> = per_query
        .into_iter()
        .flatten()
        .filter(|r| seen.insert(r.metadata.id.clone()))
        .collect();

    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged
}
