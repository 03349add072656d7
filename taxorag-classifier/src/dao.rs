//! DAO traits backing the classifier 

use async_trait::async_trait;
use taxorag_core::entities::{DocTaxonomy, HitlItem};
use taxorag_core::error::Result;

use crate::types::NodeDescriptor;

/// Candidate descriptor lookup, keyed by taxonomy version.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NodeDescriptorDao: Send + Sync {
    async fn descriptors_for_version(&self, version: &str) -> Result<Vec<NodeDescriptor>>;
}

/// Persists classification output. `upsert` must be idempotent on
/// `(doc_id, node_id, version)` 
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocTaxonomyDao: Send + Sync {
    async fn upsert(&self, row: &DocTaxonomy) -> Result<()>;
}

/// The HITL review queue, owned by the classifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HitlQueueDao: Send + Sync {
    async fn enqueue(&self, item: &HitlItem) -> Result<()>;
    async fn list_pending(&self) -> Result<Vec<HitlItem>>;
    async fn resolve(
        &self,
        item_id: uuid::Uuid,
        state: taxorag_core::entities::HitlReviewState,
    ) -> Result<()>;
}
