//! DAO traits the retrieval engine is built against ("Consolidate
//! [raw SQL] into typed DAO methods; each SQL fragment is named and
//! tested"). Concrete implementations live outside this crate's test
//! surface and talk to Postgres/pgvector per the schema in; tests
//! here use `mockall`-generated mocks.

use crate::types::RawCandidate;
use async_trait::async_trait;
use taxorag_core::entities::DocTaxonomy;
use taxorag_core::error::Result;
use uuid::Uuid;

/// Full-text search over `chunks.text`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LexicalSearchDao: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawCandidate>>;
}

/// Cosine similarity search against `embeddings.vec`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorSearchDao: Send + Sync {
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<RawCandidate>>;
}

/// Lookup of a document's classification rows, used to apply the
/// taxonomy scope filter
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocTaxonomyDao: Send + Sync {
    async fn classifications_for(&self, doc_id: Uuid, version: &str) -> Result<Vec<DocTaxonomy>>;
}
