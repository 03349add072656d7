//! Invocation outcome shape ("tool failures are captured,
//! never raised into the pipeline").

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub tool_name: String,
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

impl ToolOutcome {
    #[must_use]
    pub fn ok(tool_name: impl Into<String>, output: Value, attempts: u32, elapsed_ms: u64) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output),
            error: None,
            attempts,
            elapsed_ms,
        }
    }

    #[must_use]
    pub fn failed(
        tool_name: impl Into<String>,
        error: impl Into<String>,
        attempts: u32,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error.into()),
            attempts,
            elapsed_ms,
        }
    }
}
