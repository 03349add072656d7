//! DAO traits backing the coverage meter ("One SQL
//! aggregation ... any N+1 pattern is a bug").

use async_trait::async_trait;
use std::collections::HashMap;
use taxorag_core::error::Result;
use uuid::Uuid;

/// Single aggregation: distinct document counts per node, already
/// filtered by version and confidence threshold.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoverageCountsDao: Send + Sync {
    async fn counts_for(
        &self,
        node_ids: &[Uuid],
        version: &str,
        confidence_threshold: f32,
    ) -> Result<HashMap<Uuid, i64>>;
}

/// Optional per-node target counts from a side table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TargetCountsDao: Send + Sync {
    async fn targets_for(&self, node_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;
}
