use super::Embedder;
use crate::defaults::{DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_URL, DEFAULT_EMBED_TIMEOUT_SECS};
use crate::error::{Result, RetrievalError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Hugging Face Inference API configuration
#[derive(Clone)]
pub struct HuggingFaceConfig {
    pub token: String,
    pub url: String,
    pub dims: usize,
    pub timeout: Duration,
}

impl HuggingFaceConfig {
    pub fn new(token: String) -> Self {
        Self {
            token,
            url: DEFAULT_EMBEDDING_URL.to_string(),
            dims: DEFAULT_DIMENSIONS,
            timeout: Duration::from_secs(DEFAULT_EMBED_TIMEOUT_SECS),
        }
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }

    pub fn with_dims(mut self, dims: usize) -> Self {
        self.dims = dims;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for HuggingFaceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceConfig")
            .field("token", &"<redacted>")
            .field("url", &self.url)
            .field("dims", &self.dims)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Feature-extraction pipeline client
pub struct HuggingFaceEmbedder {
    client: Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceEmbedder {
    pub fn new(config: HuggingFaceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RetrievalError::config(format!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn dims(&self) -> usize {
        self.config.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.token)
            .json(&FeatureExtractionRequest { inputs: texts })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::embedding(format!(
                "Hugging Face API error ({}): {}",
                status, error_text
            )));
        }

        let vectors: Vec<Vec<f32>> = response.json().await?;

        if vectors.len() != texts.len() {
            return Err(RetrievalError::embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.config.dims) {
            return Err(RetrievalError::embedding(format!(
                "expected dimension {}, got {}",
                self.config.dims,
                bad.len()
            )));
        }

        debug!(count = vectors.len(), dims = self.config.dims, "Hugging Face embeddings received");
        Ok(vectors)
    }
}
