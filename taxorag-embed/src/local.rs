//! Local and deterministic embedding fallback tiers.
//!
//! A true local sentence-transformer would be wired in via candle +
//! hf-hub, the way the reference platform's RAG crate sketches it; until
//! a model is actually loaded and exercised by this core, this crate
//! keeps that concern behind a trait and ships a deterministic
//! placeholder, exactly as the reference platform's own `LocalEmbedding`
//! placeholder does (see DESIGN.md).

use async_trait::async_trait;
use md5::{Digest, Md5};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use taxorag_core::entities::EMBEDDING_DIM;

/// A local model producing fixed-dimension embeddings without a network
/// call. Fallback A is defined against this trait so a real
/// sentence-transformer backend can be swapped in without touching the
/// tiering logic in `EmbeddingService`.
#[async_trait]
pub trait LocalEmbeddingModel: Send + Sync {
    async fn embed_one(&self, text: &str) -> Vec<f32>;
    fn dimensions(&self) -> usize;
}

/// Deterministic 768-d placeholder standing in for a local
/// sentence-transformer (e.g. BGE, E5). Hashes the input so the same
/// text always yields the same vector, which keeps Fallback A testable
/// without bundling model weights.
pub struct PlaceholderLocalModel {
    dimensions: usize,
}

impl Default for PlaceholderLocalModel {
    fn default() -> Self {
        Self { dimensions: 768 }
    }
}

impl PlaceholderLocalModel {
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl LocalEmbeddingModel for PlaceholderLocalModel {
    async fn embed_one(&self, text: &str) -> Vec<f32> {
        let seed = md5_seed(text);
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0_f32, 1.0_f32).expect("fixed normal params are valid");
        let mut v: Vec<f32> = (0..self.dimensions).map(|_| normal.sample(&mut rng)).collect();
        l2_normalize(&mut v);
        v
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Right-pad a (possibly shorter) vector with zeros to `EMBEDDING_DIM`.
/// Never truncates if the model already yields more 
#[must_use]
pub fn right_pad_to_embedding_dim(mut v: Vec<f32>) -> Vec<f32> {
    if v.len() < EMBEDDING_DIM {
        v.resize(EMBEDDING_DIM, 0.0);
    }
    v
}

/// Fallback B: deterministic pseudo-embedding seeded from the text's MD5
/// digest, 1536 samples from N(0, 0.1), L2-normalized 
#[must_use]
pub fn pseudo_embedding(text: &str) -> Vec<f32> {
    let seed = md5_seed(text);
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0_f32, 0.1_f32).expect("fixed normal params are valid");
    let mut v: Vec<f32> = (0..EMBEDDING_DIM).map(|_| normal.sample(&mut rng)).collect();
    l2_normalize(&mut v);
    v
}

fn md5_seed(text: &str) -> u64 {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    // int(md5(text), 16) mod 2^32: take the low 4 bytes of the digest as
    // the big-endian integer's low-order bits, matching `% 2**32`.
    let bytes = digest.as_slice();
    let low4 = &bytes[bytes.len() - 4..];
    u64::from(u32::from_be_bytes([low4[0], low4[1], low4[2], low4[3]]))
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn placeholder_model_is_deterministic() {
        let model = PlaceholderLocalModel::default();
        let a = model.embed_one("hello world").await;
        let b = model.embed_one("hello world").await;
        assert_eq!(a, b);
        assert_eq!(a.len(), 768);
    }

    #[test]
    fn right_pad_extends_to_1536_without_truncating_larger() {
        let short = right_pad_to_embedding_dim(vec![1.0; 768]);
        assert_eq!(short.len(), EMBEDDING_DIM);
        assert!(short[768..].iter().all(|&x| x == 0.0));

        let long = right_pad_to_embedding_dim(vec![1.0; 2000]);
        assert_eq!(long.len(), 2000);
    }

    #[test]
    fn pseudo_embedding_is_deterministic_and_unit_norm() {
        let a = pseudo_embedding("some query text");
        let b = pseudo_embedding("some query text");
        assert_eq!(a, b);
        assert_eq!(a.len(), EMBEDDING_DIM);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn pseudo_embedding_differs_across_inputs() {
        let a = pseudo_embedding("text one");
        let b = pseudo_embedding("text two");
        assert_ne!(a, b);
    }
}
