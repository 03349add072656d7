//! DAO traits backing the case bank 

use async_trait::async_trait;
use taxorag_core::entities::{
    ArchiveReason, CaseBankArchiveRow, CaseBankEntry, CaseStatus, ExecutionLog,
};
use taxorag_core::error::Result;
use uuid::Uuid;

/// Fields that may change on an update; `None` leaves a field untouched.
/// `version` and `updated_at` are never set directly by callers — the
/// DAO implementation bumps `version` and refreshes `updated_at` on
/// every successful update, modeled after a DB trigger.
#[derive(Debug, Clone, Default)]
pub struct CasePatch {
    pub answer: Option<String>,
    pub quality: Option<Option<f32>>,
    pub usage_count: Option<i64>,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub status: Option<CaseStatus>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    UpdatedAtDesc,
    UsageCountDesc,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaseBankDao: Send + Sync {
    async fn get(&self, case_id: Uuid) -> Result<Option<CaseBankEntry>>;

    async fn find_similar(
        &self,
        query_vector: &[f32],
        top_n: usize,
        min_quality: f32,
    ) -> Result<Vec<CaseBankEntry>>;

    async fn insert(&self, entry: CaseBankEntry) -> Result<()>;

    async fn update(&self, case_id: Uuid, patch: CasePatch) -> Result<()>;

    async fn soft_archive(&self, case_id: Uuid, reason: ArchiveReason) -> Result<()>;

    async fn list(
        &self,
        status: CaseStatus,
        limit: usize,
        order: ListOrder,
    ) -> Result<Vec<CaseBankEntry>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveDao: Send + Sync {
    async fn archived_rows_for(&self, case_id: Uuid) -> Result<Vec<CaseBankArchiveRow>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionLogDao: Send + Sync {
    async fn last_n_for_case(&self, case_id: Uuid, n: usize) -> Result<Vec<ExecutionLog>>;

    /// Persist a completed request's outcome. Callers that also insert a
    /// `CaseBankEntry` for the same request are expected to run both
    /// writes in one transaction ("insert case + insert
    /// execution log is one transaction").
    async fn insert(&self, log: ExecutionLog) -> Result<()>;
}
