//! The case bank: CRUD and lifecycle transitions over `CaseBankEntry`.

use crate::dao::{CaseBankDao, CasePatch, ListOrder};
use std::sync::Arc;
use taxorag_core::entities::{ArchiveReason, CaseBankEntry, CaseStatus};
use taxorag_core::error::{CoreError, Result};
use uuid::Uuid;

/// Cosine similarity above which a candidate query is considered
/// identical to an existing case for dedup purposes on the *insert*
/// path, distinct from the consolidation merge threshold.
pub const IDENTICAL_QUERY_SIMILARITY: f32 = 0.98;

pub struct CaseBank {
    dao: Arc<dyn CaseBankDao>,
}

impl CaseBank {
    #[must_use]
    pub fn new(dao: Arc<dyn CaseBankDao>) -> Self {
        Self { dao }
    }

    /// # Errors
    /// Propagates DAO failures.
    pub async fn get(&self, case_id: Uuid) -> Result<Option<CaseBankEntry>> {
        self.dao.get(case_id).await
    }

    /// # Errors
    /// Propagates DAO failures.
    pub async fn find_similar(
        &self,
        query_vector: &[f32],
        top_n: usize,
        min_quality: f32,
    ) -> Result<Vec<CaseBankEntry>> {
        self.dao.find_similar(query_vector, top_n, min_quality).await
    }

    /// Whether an existing active case already answers this query,
    /// either by exact text match or by near-duplicate embedding
    /// (query_vector cosine ≥ 0.98).
    ///
    /// # Errors
    /// Propagates DAO failures.
    pub async fn find_identical(
        &self,
        query: &str,
        query_vector: &[f32],
    ) -> Result<Option<CaseBankEntry>> {
        let candidates = self.dao.find_similar(query_vector, 5, 0.0).await?;
        for candidate in candidates {
            if candidate.query == query {
                return Ok(Some(candidate));
            }
            if let Some(vec) = &candidate.query_vector {
                if taxorag_embed::EmbeddingService::similarity(vec, query_vector)
                    >= IDENTICAL_QUERY_SIMILARITY
                {
                    return Ok(Some(candidate));
                }
            }
        }
        Ok(None)
    }

    /// # Errors
    /// `CoreError::Validation` if `entry.usage_count < 0`. Otherwise
    /// propagates DAO failures.
    pub async fn insert(&self, entry: CaseBankEntry) -> Result<()> {
        if entry.usage_count < 0 {
            return Err(CoreError::validation("usage_count must be >= 0"));
        }
        self.dao.insert(entry).await
    }

    /// # Errors
    /// Propagates DAO failures.
    pub async fn update(&self, case_id: Uuid, patch: CasePatch) -> Result<()> {
        if let Some(usage_count) = patch.usage_count {
            if usage_count < 0 {
                return Err(CoreError::validation("usage_count must be >= 0"));
            }
        }
        self.dao.update(case_id, patch).await
    }

    /// Transition `active -> archived`, recording a full snapshot in the
    /// archive table 
    ///
    /// # Errors
    /// Propagates DAO failures.
    pub async fn soft_archive(&self, case_id: Uuid, reason: ArchiveReason) -> Result<()> {
        self.dao.soft_archive(case_id, reason).await
    }

    /// Restore an archived case to active (`archived -> active`).
    ///
    /// # Errors
    /// Propagates DAO failures.
    pub async fn restore(&self, case_id: Uuid) -> Result<()> {
        self.dao
            .update(
                case_id,
                CasePatch {
                    status: Some(CaseStatus::Active),
                    ..Default::default()
                },
            )
            .await
    }

    /// # Errors
    /// Propagates DAO failures.
    pub async fn list(
        &self,
        status: CaseStatus,
        limit: usize,
        order: ListOrder,
    ) -> Result<Vec<CaseBankEntry>> {
        self.dao.list(status, limit, order).await
    }
}
