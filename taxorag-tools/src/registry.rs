//! The tool registry: schema validation, per-tool timeout, and retry
//! with exponential backoff for idempotent tools.

use crate::outcome::ToolOutcome;
use crate::tool::Tool;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use taxorag_core::error::{CoreError, Result};
use tracing::warn;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_RETRIES_IDEMPOTENT: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(100);

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    timeout: Duration,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Invoke a registered tool by name 
    ///
    /// # Errors
    /// Only when `name` isn't registered — a caller/config error, not a
    /// tool execution failure. Execution failures (schema rejection,
    /// timeout, exhausted retries) are captured in `Ok(ToolOutcome)`.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<ToolOutcome> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CoreError::validation(format!("unknown tool {name:?}")))?;

        let start = Instant::now();

        if let Err(message) = validate_against_schema(tool.schema(), &args) {
            return Ok(ToolOutcome::failed(name, message, 0, elapsed_ms(start)));
        }

        let max_attempts = if tool.idempotent() { MAX_RETRIES_IDEMPOTENT } else { 1 };
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match tokio::time::timeout(self.timeout, tool.call(args.clone())).await {
                Ok(Ok(output)) => return Ok(ToolOutcome::ok(name, output, attempt, elapsed_ms(start))),
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    warn!(tool = name, attempt, error = %e, "tool call failed");
                }
                Err(_) => {
                    last_error = format!("tool call exceeded {:?} timeout", self.timeout);
                    warn!(tool = name, attempt, "tool call timed out");
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(BACKOFF_BASE * 2_u32.pow(attempt - 1)).await;
            }
        }

        Ok(ToolOutcome::failed(name, last_error, max_attempts, elapsed_ms(start)))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_against_schema(schema: &Value, instance: &Value) -> std::result::Result<(), String> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| format!("invalid tool schema: {e}"))?;
    let errors: Vec<String> = match validator.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.map(|e| e.to_string()).collect(),
    };
    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("args failed schema validation: {}", errors.join("; ")))
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Tool;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CalculatorTool {
        schema: Value,
    }
    impl CalculatorTool {
        fn new() -> Self {
            Self {
                schema: json!({
                    "type": "object",
                    "properties": {
                        "a": {"type": "number"},
                        "b": {"type": "number"}
                    },
                    "required": ["a", "b"]
                }),
            }
        }
    }
    #[async_trait]
    impl Tool for CalculatorTool {
        fn name(&self) -> &str {
            "calculator"
        }
        fn schema(&self) -> &Value {
            &self.schema
        }
        fn idempotent(&self) -> bool {
            true
        }
        async fn call(&self, args: Value) -> Result<Value> {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            Ok(json!({ "sum": a + b }))
        }
    }

    struct FlakyTool {
        schema: Value,
        calls: AtomicUsize,
        fail_times: usize,
    }
    #[async_trait]
    impl Tool for FlakyTool {
        fn name(&self) -> &str {
            "flaky"
        }
        fn schema(&self) -> &Value {
            &self.schema
        }
        fn idempotent(&self) -> bool {
            true
        }
        async fn call(&self, _args: Value) -> Result<Value> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(CoreError::UpstreamTransient {
                    upstream: "flaky".into(),
                    message: "simulated failure".into(),
                })
            } else {
                Ok(json!({ "ok": true }))
            }
        }
    }

    #[tokio::test]
    async fn valid_args_invoke_successfully() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CalculatorTool::new()));
        let outcome = registry
            .invoke("calculator", json!({"a": 2, "b": 3}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output.unwrap()["sum"], 5.0);
    }

    #[tokio::test]
    async fn invalid_args_fail_without_calling_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CalculatorTool::new()));
        let outcome = registry.invoke("calculator", json!({"a": 2})).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 0);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_registry_error_not_an_outcome() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("nonexistent", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn idempotent_tool_retries_until_success() {
        let mut registry = ToolRegistry::new().with_timeout(Duration::from_millis(500));
        registry.register(Arc::new(FlakyTool {
            schema: json!({"type": "object"}),
            calls: AtomicUsize::new(0),
            fail_times: 2,
        }));
        let outcome = registry.invoke("flaky", json!({})).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn exhausting_retries_reports_failure_not_error() {
        let mut registry = ToolRegistry::new().with_timeout(Duration::from_millis(500));
        registry.register(Arc::new(FlakyTool {
            schema: json!({"type": "object"}),
            calls: AtomicUsize::new(0),
            fail_times: 100,
        }));
        let outcome = registry.invoke("flaky", json!({})).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, MAX_RETRIES_IDEMPOTENT);
    }
}
