//! Registry of side-effecting tools invoked with schema validation,
//! timeout, and retry 

pub mod outcome;
pub mod registry;
pub mod tool;

pub use outcome::ToolOutcome;
pub use registry::{ToolRegistry, DEFAULT_TIMEOUT, MAX_RETRIES_IDEMPOTENT};
pub use tool::Tool;
