//! Retrieval Engine
//!
//! Top-level wiring of storage, cache, embedding, search and aggregation.

use crate::aggregate::{FactQueries, GroupResult, QueryAggregator};
use crate::cache::{IndexCache, ResidentIndex};
use crate::config::{Config, EngineConfig};
use crate::corpus::{BuildReport, IndexBuilder};
use crate::embed::Embedder;
use crate::error::{Result, RetrievalError};
use crate::search::SimilaritySearch;
use crate::storage::ObjectStorage;
use crate::vectors::VectorStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Liveness snapshot
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub embedder: &'static str,
    pub cache_ttl_secs: Option<u64>,
    pub resident: Option<ResidentIndex>,
}

/// Retrieval engine
pub struct RetrievalEngine {
    config: EngineConfig,
    store: Arc<VectorStore>,
    cache: Arc<IndexCache>,
    embedder: Arc<dyn Embedder>,
    aggregator: QueryAggregator,
    builder: IndexBuilder,
}

impl RetrievalEngine {
    /// Assemble an engine over an existing storage backend
    pub fn new(
        config: EngineConfig,
        storage: Arc<dyn ObjectStorage>,
        store_timeout: Duration,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Arc<Self>> {
        let domains = Arc::new(config.load_domain_map()?);
        let store = Arc::new(VectorStore::new(storage, store_timeout));
        let cache = Arc::new(IndexCache::new(store.clone(), config.cache_ttl_secs));

        let aggregator = QueryAggregator::new(
            SimilaritySearch::new(cache.clone()),
            embedder.clone(),
            domains,
        );
        let builder = IndexBuilder::new(store.clone(), embedder.clone(), cache.clone());

        Ok(Arc::new(Self {
            config,
            store,
            cache,
            embedder,
            aggregator,
            builder,
        }))
    }

    /// Build storage and embedder from `config`, then assemble
    pub async fn from_config(config: &Config) -> anyhow::Result<Arc<Self>> {
        let storage = config.storage.create_backend().await?;
        tracing::info!("Storage backend initialized");

        let embedder = config.embedding.create_embedder()?;
        tracing::info!(embedder = embedder.name(), dims = embedder.dims(), "Embedder initialized");

        Ok(Self::new(
            config.engine.clone(),
            storage,
            config.storage.timeout,
            embedder,
        )?)
    }

    /// Run a multi-fact query; `top_k` falls back to the configured default
    pub async fn query(
        &self,
        facts: &[FactQueries],
        top_k: Option<usize>,
        force_reload: bool,
    ) -> Result<BTreeMap<String, GroupResult>> {
        let top_k = top_k.unwrap_or(self.config.default_top_k);
        if top_k == 0 {
            return Err(RetrievalError::invalid_input("top_k must be at least 1"));
        }
        self.aggregator.run(facts, top_k, force_reload).await
    }

    /// Rebuild the configured index from the local corpus file
    pub async fn create_index(&self) -> Result<BuildReport> {
        self.builder
            .build_from_file(&self.config.corpus_path, &self.config.corpus_index)
            .await
    }

    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        self.store.list_indexes().await
    }

    pub fn health(&self) -> EngineHealth {
        EngineHealth {
            embedder: self.embedder.name(),
            cache_ttl_secs: self.cache.ttl().map(|t| t.as_secs()),
            resident: self.cache.resident(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<IndexCache> {
        &self.cache
    }

    pub fn builder(&self) -> &IndexBuilder {
        &self.builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::FallbackEmbedder;
    use crate::storage::mock::{create_temp_storage, MockStorageConfig};

    const CORPUS: &str = r#"{"documents": [{"articles": [
        {"article_number": 1, "article_title": "Art. 1", "content": "Obligaciones"},
        {"article_number": 2, "article_title": "Art. 2", "content": "Contratos"}
    ]}]}"#;

    fn engine(corpus_path: std::path::PathBuf) -> Arc<RetrievalEngine> {
        let storage = create_temp_storage(MockStorageConfig::fast()).unwrap();
        let config = EngineConfig {
            corpus_path,
            ..Default::default()
        };
        RetrievalEngine::new(
            config,
            storage,
            Duration::from_secs(5),
            Arc::new(FallbackEmbedder::offline(8)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_index_then_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parsed_documents.json");
        std::fs::write(&path, CORPUS).unwrap();
        let engine = engine(path);

        let report = engine.create_index().await.unwrap();
        assert_eq!(report.index, "civil");
        assert_eq!(report.vectors, 2);
        assert_eq!(engine.list_indexes().await.unwrap(), vec!["civil".to_string()]);

        let facts: Vec<FactQueries> = serde_json::from_value(serde_json::json!([
            {"fact_id": 1, "data": [{"domain": "civil", "queries": ["Art. 1: Obligaciones"]}]}
        ]))
        .unwrap();

        let out = engine.query(&facts, None, false).await.unwrap();
        let civil = &out["civil"];
        assert_eq!(civil.results.len(), 2);
        assert_eq!(civil.results[0].metadata.id.to_string(), "1");
        assert!((civil.results[0].score - 1.0).abs() < 1e-5);

        let health = engine.health();
        assert_eq!(health.embedder, "hash");
        assert_eq!(health.resident.unwrap().name, "civil");
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected() {
        let engine = engine("missing.json".into());
        let err = engine.query(&[], Some(0), false).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_corpus_is_invalid_input() {
        let engine = engine("/nonexistent/parsed_documents.json".into());
        let err = engine.create_index().await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidInput(_)));
    }
}
