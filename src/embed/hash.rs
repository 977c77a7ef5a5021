use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic stand-in embedder
///
/// The CRC32 of the text seeds a PRNG, so equal texts always map to the same
/// unit vector. Vectors carry no semantic meaning.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let seed = crc32fast::hash(text.as_bytes()) as u64;
        let mut rng = StdRng::seed_from_u64(seed);
        let v: Vec<f32> = (0..self.dims).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect();

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter().map(|x| x / norm).collect()
        } else {
            v
        }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic_unit_vectors() {
        let embedder = HashEmbedder::new(384);
        let texts = vec!["arrendamiento".to_string(), "compraventa".to_string()];

        let a = embedder.embed(&texts).await.unwrap();
        let b = embedder.embed(&texts).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_ne!(a[0], a[1]);
        for v in &a {
            assert_eq!(v.len(), 384);
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn test_embed_one_matches_batch() {
        let embedder = HashEmbedder::new(8);
        let single = embedder.embed_one("plazo").await.unwrap();
        assert_eq!(single, embedder.vector_for("plazo"));
    }
}
