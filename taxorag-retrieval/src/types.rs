//! Query/result shapes for hybrid retrieval 

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side(s) of the fusion to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Bm25,
    Vector,
    Hybrid,
}

/// Weighted-sum fusion weights (default: 0.3 lexical / 0.7 vector).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalWeights {
    pub w_bm25: f32,
    pub w_vec: f32,
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            w_bm25: 0.3,
            w_vec: 0.7,
        }
    }
}

/// One row of raw search output from a lexical or vector backend, before
/// fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub chunk_id: Uuid,
    pub doc_id: Uuid,
    pub text: String,
    pub raw_score: f32,
}

/// Taxonomy scoping filter (`canonical_in`).
#[derive(Debug, Clone, Default)]
pub struct TaxonomyFilter {
    pub canonical_in: Vec<Vec<String>>,
    pub version: Option<String>,
}

/// A request into the hybrid retrieval engine.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub filter: Option<TaxonomyFilter>,
    pub mode: SearchMode,
    pub weights: RetrievalWeights,
    /// How many candidates to keep before an optional rerank pass.
    pub fetch_size: usize,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: 5,
            filter: None,
            mode: SearchMode::Hybrid,
            weights: RetrievalWeights::default(),
            fetch_size: 50,
        }
    }

    /// Clamp `top_k` to `[0, 100]` ("`top_k > 100` is clamped").
    #[must_use]
    pub fn clamped_top_k(&self) -> usize {
        self.top_k.min(100)
    }
}

/// Per-side normalized contribution to a hit's final score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub bm25: f32,
    pub vec: f32,
}

/// A citation back to the classification that made a chunk eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: Uuid,
    pub path: Vec<String>,
    pub confidence: f32,
}

/// One ranked retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: Uuid,
    pub doc_id: Uuid,
    pub text: String,
    pub score: f32,
    pub score_breakdown: ScoreBreakdown,
    pub citations: Vec<Citation>,
}

/// Which optional steps were skipped or simplified for this search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Degraded {
    pub steps: Vec<String>,
}

/// Full response from the hybrid retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    pub latency_ms: u64,
    pub strategy: SearchMode,
    pub degraded: Option<Degraded>,
}
