//! Shared entities, error taxonomy, and taxonomy DAG manager for the
//! taxorag workspace

pub mod dag;
pub mod entities;
pub mod error;

pub use dag::{is_descendant_of, TaxonomyDagManager};
pub use entities::{
    Agent, ArchiveReason, CaseBankArchiveRow, CaseBankEntry, CaseStatus, Chunk, ChunkReference,
    DocTaxonomy, Document, Embedding, ExecutionLog, HitlItem, HitlReviewState,
    RetrievalConfigOverride, TaxonomyNode, EMBEDDING_DIM,
};
pub use error::{CoreError, Result};
