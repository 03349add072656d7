//! The `Tool` trait every registered helper implements 

use async_trait::async_trait;
use serde_json::Value;
use taxorag_core::error::Result;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// JSON Schema describing the expected `args` shape.
    fn schema(&self) -> &Value;

    /// Whether repeated calls with the same args are safe to retry.
    /// Idempotent tools get up to 3 attempts with exponential backoff.
    fn idempotent(&self) -> bool {
        false
    }

    async fn call(&self, args: Value) -> Result<Value>;
}
