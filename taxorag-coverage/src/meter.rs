//! The coverage meter 

use crate::dao::{CoverageCountsDao, TargetCountsDao};
use crate::types::{CoverageResult, Gap, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_GAP_THRESHOLD};
use std::sync::Arc;
use taxorag_core::dag::TaxonomyDagManager;
use taxorag_core::error::Result;
use uuid::Uuid;

pub struct CoverageMeter {
    dag: Arc<TaxonomyDagManager>,
    counts_dao: Arc<dyn CoverageCountsDao>,
    targets_dao: Arc<dyn TargetCountsDao>,
}

impl CoverageMeter {
    #[must_use]
    pub fn new(
        dag: Arc<TaxonomyDagManager>,
        counts_dao: Arc<dyn CoverageCountsDao>,
        targets_dao: Arc<dyn TargetCountsDao>,
    ) -> Self {
        Self {
            dag,
            counts_dao,
            targets_dao,
        }
    }

    /// Compute coverage for `node_ids`
    ///
    /// An empty scope expands to zero nodes, zero counts, and zero
    /// targets, which yields `overall = 100.0` ("Agent with
    /// empty taxonomy scope returns coverage 100% over zero targets, no
    /// division by zero").
    ///
    /// # Errors
    /// Propagates DAO and DAG lookup failures.
    pub async fn calculate_coverage(
        &self,
        agent_id: Uuid,
        node_ids: &[Uuid],
        version: &str,
    ) -> Result<CoverageResult> {
        let expanded: Vec<Uuid> = if node_ids.is_empty() {
            Vec::new()
        } else {
            self.dag.descendants(node_ids, version)?.into_iter().collect()
        };

        let counts = self
            .counts_dao
            .counts_for(&expanded, version, DEFAULT_CONFIDENCE_THRESHOLD)
            .await?;
        let targets = self.targets_dao.targets_for(&expanded).await?;

        let mut node_coverage = std::collections::HashMap::with_capacity(expanded.len());
        let mut total_counts: i64 = 0;
        let mut total_targets: i64 = 0;

        for node_id in &expanded {
            let count = counts.get(node_id).copied().unwrap_or(0);
            // absent target => target equals observed, so that node's
            // coverage is 100%
            let target = targets.get(node_id).copied().unwrap_or(count);
            let coverage = 100.0 * count as f32 / (target.max(1)) as f32;
            node_coverage.insert(*node_id, coverage);
            total_counts += count;
            total_targets += target;
        }

        let overall = if total_targets == 0 {
            100.0
        } else {
            100.0 * total_counts as f32 / total_targets as f32
        };

        Ok(CoverageResult {
            agent_id,
            version: version.to_string(),
            node_coverage,
            counts,
            targets,
            overall,
        })
    }

    /// Nodes whose coverage is below `threshold * 100`, sorted by
    /// missing-document count descending
    #[must_use]
    pub fn detect_gaps(result: &CoverageResult, threshold: f32) -> Vec<Gap> {
        let cutoff = threshold * 100.0;
        let mut gaps: Vec<Gap> = result
            .node_coverage
            .iter()
            .filter(|(_, &coverage)| coverage < cutoff)
            .map(|(node_id, &coverage)| {
                let count = result.counts.get(node_id).copied().unwrap_or(0);
                let target = result.targets.get(node_id).copied().unwrap_or(count);
                Gap {
                    node_id: *node_id,
                    coverage_percent: coverage,
                    missing: (target - count).max(0),
                }
            })
            .collect();
        gaps.sort_by(|a, b| b.missing.cmp(&a.missing).then_with(|| a.node_id.cmp(&b.node_id)));
        gaps
    }

    /// Convenience wrapper using the default gap threshold.
    #[must_use]
    pub fn detect_gaps_default(result: &CoverageResult) -> Vec<Gap> {
        Self::detect_gaps(result, DEFAULT_GAP_THRESHOLD)
    }
}
