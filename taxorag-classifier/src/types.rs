//! Types for chunk-to-taxonomy-node classification 

use uuid::Uuid;

/// A precomputed taxonomy node descriptor embedding, used as the
/// comparison target for classification ("candidate taxonomy
/// node descriptors (precomputed)").
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub node_id: Uuid,
    pub path: Vec<String>,
    pub version: String,
    pub embedding: Vec<f32>,
}

/// Default number of top-scoring candidates kept per classification call
/// ("keep top-K (default 5)").
pub const DEFAULT_TOP_K: usize = 5;

/// Default minimum similarity a candidate must clear to be emitted as a
/// `DocTaxonomy` row at all.
pub const DEFAULT_FLOOR: f32 = 0.5;

/// Default confidence below which the top-1 candidate is routed to HITL.
pub const DEFAULT_HITL_THRESHOLD: f32 = 0.7;

/// Outcome of classifying one chunk/document against one taxonomy
/// version.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub assignments: Vec<taxorag_core::entities::DocTaxonomy>,
    pub hitl_item: Option<taxorag_core::entities::HitlItem>,
}
