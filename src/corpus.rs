//! Index construction from a parsed document corpus
//!
//! Corpus layout:
//!
//! ```json
//! {"documents": [{"articles": [{"article_number": 1, "article_title": "...", "content": "..."}]}]}
//! ```

use crate::cache::IndexCache;
use crate::defaults::EMBED_BATCH_SIZE;
use crate::embed::Embedder;
use crate::error::{Result, RetrievalError};
use crate::vectors::{IndexRecord, RecordId, VectorMatrix, VectorStore};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub article_number: RecordId,
    pub article_title: String,
    pub content: String,
}

impl Article {
    /// Text that gets embedded and stored
    pub fn passage(&self) -> String {
        format!("{}: {}", self.article_title, self.content)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Corpus {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::invalid_input(format!("corpus {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Articles of every document, in document order
    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.documents.iter().flat_map(|d| d.articles.iter())
    }
}

/// Summary of a finished build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub message: String,
    pub index: String,
    pub vectors: usize,
    pub dims: usize,
}

/// Embeds a corpus and uploads it as a named index
pub struct IndexBuilder {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    cache: Arc<IndexCache>,
}

impl IndexBuilder {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>, cache: Arc<IndexCache>) -> Self {
        Self {
            store,
            embedder,
            cache,
        }
    }

    pub async fn build(&self, corpus: &Corpus, index_name: &str) -> Result<BuildReport> {
        let articles: Vec<&Article> = corpus.articles().collect();
        if articles.is_empty() {
            return Err(RetrievalError::invalid_input("corpus contains no articles"));
        }
        info!(index = %index_name, articles = articles.len(), "Creating index");

        let passages: Vec<String> = articles.iter().map(|a| a.passage()).collect();
        let mut rows = Vec::with_capacity(passages.len());
        for batch in passages.chunks(EMBED_BATCH_SIZE) {
            rows.extend(self.embedder.embed(batch).await?);
        }
        let vectors = VectorMatrix::from_rows(rows)?;

        let records: Vec<IndexRecord> = articles
            .iter()
            .zip(passages)
            .map(|(a, text)| IndexRecord::new(a.article_number.clone(), a.article_title.clone(), text))
            .collect();

        self.store.store(index_name, &vectors, &records).await?;

        // The resident copy, if any, predates this upload
        self.cache.invalidate(index_name);

        Ok(BuildReport {
            message: "Index created successfully".to_string(),
            index: index_name.to_string(),
            vectors: vectors.rows(),
            dims: vectors.dims(),
        })
    }

    pub async fn build_from_file(&self, path: &Path, index_name: &str) -> Result<BuildReport> {
        let corpus = Corpus::from_file(path)?;
        self.build(&corpus, index_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use crate::storage::mock::{create_temp_storage, MockStorageConfig};
    use std::time::Duration;

    const CORPUS: &str = r#"{
        "documents": [
            {"articles": [
                {"article_number": 1, "article_title": "Art. 1", "content": "La ley obliga."},
                {"article_number": 2, "article_title": "Art. 2", "content": "La costumbre."}
            ]},
            {"articles": [
                {"article_number": "3-bis", "article_title": "Art. 3 bis", "content": "Plazos."}
            ]}
        ]
    }"#;

    fn builder() -> (Arc<VectorStore>, Arc<IndexCache>, IndexBuilder) {
        let storage = create_temp_storage(MockStorageConfig::fast()).unwrap();
        let store = Arc::new(VectorStore::new(storage, Duration::from_secs(5)));
        let cache = Arc::new(IndexCache::new(store.clone(), 60));
        let builder = IndexBuilder::new(store.clone(), Arc::new(HashEmbedder::new(16)), cache.clone());
        (store, cache, builder)
    }

    #[test]
    fn test_articles_from_all_documents() {
        let corpus = Corpus::from_json(CORPUS).unwrap();
        let numbers: Vec<String> = corpus.articles().map(|a| a.article_number.to_string()).collect();
        assert_eq!(numbers, vec!["1", "2", "3-bis"]);
        assert_eq!(corpus.articles().next().unwrap().passage(), "Art. 1: La ley obliga.");
    }

    #[tokio::test]
    async fn test_build_uploads_index() {
        let (store, _cache, builder) = builder();
        let corpus = Corpus::from_json(CORPUS).unwrap();

        let report = builder.build(&corpus, "civil").await.unwrap();
        assert_eq!(report.vectors, 3);
        assert_eq!(report.dims, 16);

        let (vectors, records) = store.fetch("civil").await.unwrap();
        assert_eq!(vectors.rows(), 3);
        assert_eq!(records[2].id, RecordId::from("3-bis"));
        assert_eq!(records[1].text, "Art. 2: La costumbre.");
    }

    #[tokio::test]
    async fn test_build_invalidates_resident_copy() {
        let (_store, cache, builder) = builder();
        let corpus = Corpus::from_json(CORPUS).unwrap();

        builder.build(&corpus, "civil").await.unwrap();
        cache.get_or_load("civil", false).await.unwrap();
        assert!(cache.resident().is_some());

        builder.build(&corpus, "civil").await.unwrap();
        assert!(cache.resident().is_none());
    }

    #[tokio::test]
    async fn test_empty_corpus_rejected() {
        let (_store, _cache, builder) = builder();
        let err = builder.build(&Corpus::default(), "civil").await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidInput(_)));
    }
}
