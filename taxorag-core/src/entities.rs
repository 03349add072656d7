//! Entity records for the data model in
//!
//! These are plain records, not live ORM handles: per ("re-architect
//! as (entity records) + (DAO modules operating on a session)"), nothing
//! here owns a database connection or can mutate itself in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A node in a versioned taxonomy DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub node_id: Uuid,
    pub label: String,
    /// Ordered sequence of ancestor labels, root first, ending in `label`.
    pub canonical_path: Vec<String>,
    pub version: String,
    pub confidence: f32,
    pub parent_id: Option<Uuid>,
}

/// An ingested document. Never mutated in place after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: Uuid,
    pub title: String,
    pub content_type: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub source_url: Option<String>,
}

/// One chunk of a document's post-PII-mask text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: Uuid,
    pub doc_id: Uuid,
    pub ordinal: i32,
    pub text: String,
    pub metadata: Option<serde_json::Value>,
}

/// A unit-length 1536-d embedding, at most one per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub chunk_id: Uuid,
    pub vec: Vec<f32>,
    pub model_name: String,
}

/// Fixed dimensionality for every stored embedding.
pub const EMBEDDING_DIM: usize = 1536;

/// `(doc_id, node_id, version)` classification row. No surrogate key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocTaxonomy {
    pub doc_id: Uuid,
    pub node_id: Uuid,
    pub version: String,
    /// Denormalized snapshot of `TaxonomyNode::canonical_path` at insert time.
    pub path: Vec<String>,
    pub confidence: f32,
    pub hitl_required: bool,
    pub created_at: DateTime<Utc>,
}

/// A scoped view onto the corpus; users interact with agents, not the
/// raw corpus (glossary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: Uuid,
    pub name: String,
    pub taxonomy_node_ids: Vec<Uuid>,
    pub taxonomy_version: String,
    pub level: i32,
    pub current_xp: i64,
    pub coverage_percent: f32,
    pub total_documents: i64,
    pub total_chunks: i64,
    pub retrieval_config: RetrievalConfigOverride,
    pub features_config: HashMap<String, bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-agent override of the global hybrid-retrieval weights and persist
/// threshold; unset fields fall back to the platform-wide default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfigOverride {
    pub w_bm25: Option<f32>,
    pub w_vec: Option<f32>,
    pub persist_threshold: Option<f32>,
}

/// Lifecycle status of a case bank entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Active,
    Archived,
}

/// A cached (query, answer, sources, quality, embedding) tuple (glossary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBankEntry {
    pub case_id: Uuid,
    pub query: String,
    pub answer: String,
    pub sources: Vec<ChunkReference>,
    pub query_vector: Option<Vec<f32>>,
    /// `None` means quality has not yet been established; otherwise
    /// constrained to `[0, 1]`.
    pub quality: Option<f32>,
    pub usage_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub status: CaseStatus,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

/// A source citation pointing back into retrieved evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkReference {
    pub chunk_id: Uuid,
    pub doc_id: Uuid,
    pub path: Vec<String>,
    pub confidence: f32,
}

/// Reason a case bank entry was archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveReason {
    LowPerformance,
    Duplicate,
    Inactive,
}

impl std::fmt::Display for ArchiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LowPerformance => "low_performance",
            Self::Duplicate => "duplicate",
            Self::Inactive => "inactive",
        };
        f.write_str(s)
    }
}

/// Full snapshot row written to `case_bank_archive` on soft-archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBankArchiveRow {
    pub archive_id: i64,
    pub case_id: Uuid,
    pub snapshot: CaseBankEntry,
    pub archived_reason: ArchiveReason,
    pub archived_at: DateTime<Utc>,
}

/// Append-only execution log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub log_id: i64,
    pub case_id: Option<Uuid>,
    pub success: bool,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub execution_time_ms: i64,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Review state of an HITL item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitlReviewState {
    Pending,
    Approved,
    Rejected,
}

/// A review queue entry created when the classifier isn't confident enough
/// to auto-assign a document to a taxonomy node (glossary: HITL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitlItem {
    pub item_id: Uuid,
    pub doc_id: Uuid,
    pub node_id: Uuid,
    pub version: String,
    pub confidence: f32,
    pub state: HitlReviewState,
    pub created_at: DateTime<Utc>,
}
