//! The classifier itself 

use crate::dao::{DocTaxonomyDao, HitlQueueDao, NodeDescriptorDao};
use crate::types::{ClassificationOutcome, DEFAULT_FLOOR, DEFAULT_HITL_THRESHOLD, DEFAULT_TOP_K};
use chrono::Utc;
use std::sync::Arc;
use taxorag_core::entities::{DocTaxonomy, HitlItem, HitlReviewState};
use taxorag_core::error::Result;
use taxorag_embed::EmbeddingService;
use uuid::Uuid;

pub struct Classifier {
    descriptors: Arc<dyn NodeDescriptorDao>,
    doc_taxonomy: Arc<dyn DocTaxonomyDao>,
    hitl: Arc<dyn HitlQueueDao>,
    top_k: usize,
    floor: f32,
    hitl_threshold: f32,
}

impl Classifier {
    #[must_use]
    pub fn new(
        descriptors: Arc<dyn NodeDescriptorDao>,
        doc_taxonomy: Arc<dyn DocTaxonomyDao>,
        hitl: Arc<dyn HitlQueueDao>,
    ) -> Self {
        Self {
            descriptors,
            doc_taxonomy,
            hitl,
            top_k: DEFAULT_TOP_K,
            floor: DEFAULT_FLOOR,
            hitl_threshold: DEFAULT_HITL_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, top_k: usize, floor: f32, hitl_threshold: f32) -> Self {
        self.top_k = top_k.max(1);
        self.floor = floor;
        self.hitl_threshold = hitl_threshold;
        self
    }

    /// Classify one chunk/document embedding against `version`'s taxonomy
    /// descriptors 
    ///
    /// Never mutates `TaxonomyNode`; `upsert` on the DAO must itself be
    /// idempotent on `(doc_id, node_id, version)` so repeated calls with
    /// the same inputs are safe.
    ///
    /// # Errors
    /// Propagates DAO failures.
    pub async fn classify(
        &self,
        doc_id: Uuid,
        chunk_embedding: &[f32],
        version: &str,
    ) -> Result<ClassificationOutcome> {
        let candidates = self.descriptors.descriptors_for_version(version).await?;

        let mut scored: Vec<(f32, &crate::types::NodeDescriptor)> = candidates
            .iter()
            .map(|c| (EmbeddingService::similarity(chunk_embedding, &c.embedding), c))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_k);

        let top1_confidence = scored.first().map_or(0.0, |(score, _)| *score);
        let hitl_required = top1_confidence < self.hitl_threshold;

        let now = Utc::now();
        let mut assignments = Vec::new();
        for (score, descriptor) in scored.into_iter().filter(|(score, _)| *score >= self.floor) {
            let row = DocTaxonomy {
                doc_id,
                node_id: descriptor.node_id,
                version: version.to_string(),
                path: descriptor.path.clone(),
                confidence: score,
                hitl_required,
                created_at: now,
            };
            self.doc_taxonomy.upsert(&row).await?;
            assignments.push(row);
        }

        let hitl_item = if hitl_required {
            if let Some(top) = assignments.first() {
                let item = HitlItem {
                    item_id: Uuid::new_v4(),
                    doc_id,
                    node_id: top.node_id,
                    version: version.to_string(),
                    confidence: top1_confidence,
                    state: HitlReviewState::Pending,
                    created_at: now,
                };
                self.hitl.enqueue(&item).await?;
                Some(item)
            } else {
                None
            }
        } else {
            None
        };

        Ok(ClassificationOutcome {
            assignments,
            hitl_item,
        })
    }
}
