//! Hosted embedding provider trait and an HTTP-backed implementation —
//! the primary embedding path, ahead of the local/deterministic
//! fallback tiers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taxorag_core::error::{CoreError, Result};

/// A provider that turns text into vectors via a network call. The
/// returned vector is expected to already be unit-norm; callers must not
/// renormalize it ("is not renormalized").
#[async_trait]
pub trait HostedEmbeddingProvider: Send + Sync {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
    fn model_name(&self) -> &str;
}

/// Configuration for an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponseItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingResponseItem>,
}

/// Calls a hosted, OpenAI-shaped `/embeddings` endpoint over HTTP.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    config: HttpProviderConfig,
}

impl HttpEmbeddingProvider {
    #[must_use]
    pub fn new(client: reqwest::Client, config: HttpProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl HostedEmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&EmbeddingRequest {
                input: text,
                model: &self.config.model,
            })
            .send()
            .await
            .map_err(|e| CoreError::UpstreamTransient {
                upstream: "embedding_api".to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CoreError::UpstreamAuth {
                upstream: "embedding_api".to_string(),
                message: "401 from embedding API".to_string(),
            });
        }
        if status.is_server_error() {
            return Err(CoreError::UpstreamTransient {
                upstream: "embedding_api".to_string(),
                message: format!("embedding API returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(CoreError::validation(format!(
                "embedding API returned unexpected status {status}"
            )));
        }

        let parsed: EmbeddingResponse = resp.json().await.map_err(|e| CoreError::UpstreamTransient {
            upstream: "embedding_api".to_string(),
            message: format!("failed to parse embedding response: {e}"),
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| CoreError::UpstreamTransient {
                upstream: "embedding_api".to_string(),
                message: "embedding API returned no vectors".to_string(),
            })
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
