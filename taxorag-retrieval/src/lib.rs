//! Hybrid lexical + vector retrieval bound to taxonomy scope.

pub mod dao;
pub mod engine;
pub mod fusion;
pub mod types;

pub use dao::{DocTaxonomyDao, LexicalSearchDao, VectorSearchDao};
pub use engine::{HybridRetrievalEngine, Reranker};
pub use types::{
    Citation, Degraded, RawCandidate, RetrievalWeights, ScoreBreakdown, SearchHit, SearchMode,
    SearchRequest, SearchResult, TaxonomyFilter,
};
