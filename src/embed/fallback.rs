use super::{Embedder, HashEmbedder};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Uses the configured provider when there is one, and hash embeddings when
/// there is none or it fails
///
/// Provider failures never reach the caller; search quality degrades instead.
pub struct FallbackEmbedder {
    primary: Option<Arc<dyn Embedder>>,
    fallback: HashEmbedder,
}

impl FallbackEmbedder {
    pub fn new(primary: Option<Arc<dyn Embedder>>, dims: usize) -> Self {
        Self {
            primary,
            fallback: HashEmbedder::new(dims),
        }
    }

    /// Hash embeddings only
    pub fn offline(dims: usize) -> Self {
        Self::new(None, dims)
    }

    pub fn has_provider(&self) -> bool {
        self.primary.is_some()
    }
}

#[async_trait]
impl Embedder for FallbackEmbedder {
    fn name(&self) -> &'static str {
        self.primary.as_ref().map_or("hash", |p| p.name())
    }

    fn dims(&self) -> usize {
        self.fallback.dims()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match &self.primary {
            Some(primary) => match primary.embed(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) => {
                    warn!(
                        event = "embedding_fallback",
                        provider = primary.name(),
                        texts = texts.len(),
                        error = %e,
                        "Embedding provider failed, using hash embeddings"
                    );
                }
            },
            None => {
                debug!(texts = texts.len(), "No embedding provider configured, using hash embeddings");
            }
        }

        self.fallback.embed(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrievalError;

    struct Broken;

    #[async_trait]
    impl Embedder for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn dims(&self) -> usize {
            4
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(RetrievalError::embedding("503 Service Unavailable"))
        }
    }

    struct Constant;

    #[async_trait]
    impl Embedder for Constant {
        fn name(&self) -> &'static str {
            "constant"
        }

        fn dims(&self) -> usize {
            4
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_hash() {
        let embedder = FallbackEmbedder::new(Some(Arc::new(Broken)), 4);
        let texts = vec!["q".to_string()];

        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors, HashEmbedder::new(4).embed(&texts).await.unwrap());
    }

    #[tokio::test]
    async fn test_healthy_provider_is_used() {
        let embedder = FallbackEmbedder::new(Some(Arc::new(Constant)), 4);
        assert!(embedder.has_provider());
        assert_eq!(embedder.name(), "constant");

        let vectors = embedder.embed(&["q".to_string()]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0, 0.0]]);
    }

    #[tokio::test]
    async fn test_offline() {
        let embedder = FallbackEmbedder::offline(4);
        assert!(!embedder.has_provider());
        assert_eq!(embedder.embed_one("q").await.unwrap().len(), 4);
    }
}
