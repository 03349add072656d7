//! Debate inputs/outputs 

use serde::{Deserialize, Serialize};
use taxorag_retrieval::SearchHit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateTurn {
    pub role: DebateRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateRole {
    Affirmative,
    Critical,
    Judge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateOutcome {
    pub answer: String,
    pub turns: Vec<DebateTurn>,
    /// `true` when every LLM call failed and the answer is the single-shot
    /// fallback compose ("on any LLM failure, falls back to a
    /// single-shot compose").
    pub fell_back: bool,
}

#[derive(Debug, Clone)]
pub struct DebateInput<'a> {
    pub query: &'a str,
    pub evidence: &'a [SearchHit],
    pub rounds: u32,
}
