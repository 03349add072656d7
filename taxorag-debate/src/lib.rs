//! Two-agent affirmative/critical debate with judge synthesis over
//! retrieved evidence 

pub mod engine;
pub mod llm;
pub mod types;

pub use engine::DebateEngine;
pub use llm::LlmClient;
pub use types::{DebateInput, DebateOutcome, DebateRole, DebateTurn};
