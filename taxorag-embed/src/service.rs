//! The embedding service: preprocessing, caching, and the three-tier
//! fallback chain 

use crate::cache::EmbeddingCache;
use crate::local::{pseudo_embedding, right_pad_to_embedding_dim, LocalEmbeddingModel};
use crate::provider::HostedEmbeddingProvider;
use std::sync::Arc;
use taxorag_config::Environment;
use taxorag_core::entities::EMBEDDING_DIM;
use taxorag_core::error::{CoreError, Result};
use tokio::time::Duration;
use tracing::{debug, warn};

const MAX_CHARS: usize = 8000;
const BATCH_SLEEP: Duration = Duration::from_millis(10);

/// Per-item outcome of a batch embedding call ("continue on
/// per-item failure ... never abort the batch").
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub vector: Vec<f32>,
    pub error: Option<String>,
}

/// Text → 1536-d vector with deterministic multi-tier fallback.
pub struct EmbeddingService {
    hosted: Option<Arc<dyn HostedEmbeddingProvider>>,
    local: Arc<dyn LocalEmbeddingModel>,
    cache: EmbeddingCache,
    environment: Environment,
}

impl EmbeddingService {
    #[must_use]
    pub fn new(
        hosted: Option<Arc<dyn HostedEmbeddingProvider>>,
        local: Arc<dyn LocalEmbeddingModel>,
        cache_capacity: usize,
        environment: Environment,
    ) -> Self {
        Self {
            hosted,
            local,
            cache: EmbeddingCache::new(cache_capacity),
            environment,
        }
    }

    fn preprocess(text: &str) -> String {
        let trimmed = text.trim();
        if trimmed.chars().count() <= MAX_CHARS {
            trimmed.to_string()
        } else {
            trimmed.chars().take(MAX_CHARS).collect()
        }
    }

    /// Embed a single piece of text 
    ///
    /// # Errors
    /// `CoreError::Configuration` if every real path is unavailable and
    /// the process is running in production (Fallback B is disabled
    /// there by design).
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let processed = Self::preprocess(text);
        if processed.is_empty() {
            return Ok(vec![0.0; EMBEDDING_DIM]);
        }

        if let Some(cached) = self.cache.get(&processed) {
            return Ok(cached);
        }

        let vector = self.compute(&processed).await?;
        self.cache.put(&processed, vector.clone());
        Ok(vector)
    }

    async fn compute(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hosted) = &self.hosted {
            match hosted.embed_one(text).await {
                Ok(v) => return Ok(v),
                Err(CoreError::UpstreamAuth { .. }) if self.environment == Environment::Production => {
                    return Err(CoreError::configuration(
                        "embedding API returned 401 in production; treating as configuration error",
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "hosted embedding call failed, falling back to local model");
                }
            }
        }

        let local_vec = self.local.embed_one(text).await;
        if !local_vec.is_empty() {
            return Ok(right_pad_to_embedding_dim(local_vec));
        }

        if !self.environment.allows_fallback() {
            return Err(CoreError::configuration(
                "all embedding paths failed and deterministic fallback is disabled in production",
            ));
        }

        debug!("using deterministic pseudo-embedding fallback");
        Ok(pseudo_embedding(text))
    }

    /// Embed a batch of texts, chunked by `batch_size` ("chunk
    /// by batch_size with a ≈10 ms inter-batch sleep; continue on
    /// per-item failure").
    ///
    /// # Errors
    /// Never returns an error for per-item embedding failures; those are
    /// captured in each `BatchItem::error`. Only returns `Err` for
    /// configuration failures that would also abort `embed()`.
    pub async fn embed_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<BatchItem>> {
        let batch_size = batch_size.clamp(1, 100);
        let mut results = Vec::with_capacity(texts.len());

        for (chunk_idx, chunk) in texts.chunks(batch_size).enumerate() {
            if chunk_idx > 0 {
                tokio::time::sleep(BATCH_SLEEP).await;
            }
            for text in chunk {
                match self.embed(text).await {
                    Ok(vector) => results.push(BatchItem { vector, error: None }),
                    Err(e) if self.environment.allows_fallback() => {
                        warn!(error = %e, "batch item failed, substituting fallback vector");
                        results.push(BatchItem {
                            vector: pseudo_embedding(text),
                            error: Some(e.to_string()),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(results)
    }

    /// Cosine similarity; mismatched dimensions or both-zero vectors
    /// return 0.0 
    #[must_use]
    pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::PlaceholderLocalModel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingProvider;
    #[async_trait]
    impl HostedEmbeddingProvider for FailingProvider {
        async fn embed_one(&self, _text: &str) -> Result<Vec<f32>> {
            Err(CoreError::UpstreamTransient {
                upstream: "embedding_api".into(),
                message: "boom".into(),
            })
        }
        fn dimensions(&self) -> usize {
            EMBEDDING_DIM
        }
        fn model_name(&self) -> &str {
            "failing"
        }
    }

    struct CountingProvider {
        calls: AtomicUsize,
    }
    #[async_trait]
    impl HostedEmbeddingProvider for CountingProvider {
        async fn embed_one(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0; EMBEDDING_DIM])
        }
        fn dimensions(&self) -> usize {
            EMBEDDING_DIM
        }
        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn empty_text_returns_zero_vector_without_calling_provider() {
        let svc = EmbeddingService::new(
            Some(Arc::new(FailingProvider)),
            Arc::new(PlaceholderLocalModel::default()),
            10,
            Environment::Development,
        );
        let v = svc.embed("   ").await.unwrap();
        assert_eq!(v, vec![0.0; EMBEDDING_DIM]);
    }

    #[tokio::test]
    async fn cache_hit_returns_identical_vector() {
        let svc = EmbeddingService::new(
            None,
            Arc::new(PlaceholderLocalModel::default()),
            10,
            Environment::Development,
        );
        let a = svc.embed("hello").await.unwrap();
        let b = svc.embed("hello").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache_not_provider() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let svc = EmbeddingService::new(
            Some(Arc::clone(&provider) as Arc<dyn HostedEmbeddingProvider>),
            Arc::new(PlaceholderLocalModel::default()),
            10,
            Environment::Development,
        );
        svc.embed("hello").await.unwrap();
        svc.embed("hello").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_to_local_model_on_provider_failure() {
        let svc = EmbeddingService::new(
            Some(Arc::new(FailingProvider)),
            Arc::new(PlaceholderLocalModel::default()),
            10,
            Environment::Development,
        );
        let v = svc.embed("hello").await.unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!(v[768..].iter().all(|&x| x == 0.0), "right-padded tail must be zero");
    }

    #[tokio::test]
    async fn batch_of_exactly_100_makes_one_outer_step() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let svc = EmbeddingService::new(
            Some(provider as Arc<dyn HostedEmbeddingProvider>),
            Arc::new(PlaceholderLocalModel::default()),
            1000,
            Environment::Development,
        );
        let texts: Vec<String> = (0..100).map(|i| format!("text {i}")).collect();
        let results = svc.embed_batch(&texts, 100).await.unwrap();
        assert_eq!(results.len(), 100);
        assert!(results.iter().all(|r| r.error.is_none()));
    }

    #[test]
    fn similarity_handles_mismatched_and_zero_vectors() {
        assert_eq!(EmbeddingService::similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(EmbeddingService::similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        let sim = EmbeddingService::similarity(&[1.0, 0.0], &[1.0, 0.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }
}
