//! The LLM call abstraction the debate engine is built against, modeled
//! after the reference platform's provider trait: a single `complete`
//! seam that every orchestration component calls through rather than
//! importing a concrete client.

use async_trait::async_trait;
use taxorag_core::error::Result;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}
