//! Text embedding providers
//!
//! - [`HuggingFaceEmbedder`]: Hugging Face Inference API (sentence-transformers)
//! - [`HashEmbedder`]: deterministic pseudo-random vectors keyed by the text
//! - [`FallbackEmbedder`]: tries a provider, degrades to hash vectors on failure

mod fallback;
mod hash;
mod huggingface;

pub use fallback::FallbackEmbedder;
pub use hash::HashEmbedder;
pub use huggingface::{HuggingFaceConfig, HuggingFaceEmbedder};

use crate::error::Result;
use async_trait::async_trait;

/// Converts texts into fixed-dimension vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name, for logging
    fn name(&self) -> &'static str;

    /// Output dimension
    fn dims(&self) -> usize;

    /// One vector per input text, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::error::RetrievalError::embedding("No embedding returned"))
    }
}
