//! Reflection engine: updates per-case quality from execution history.

use crate::dao::{CaseBankDao, CasePatch, ExecutionLogDao};
use std::sync::Arc;
use taxorag_core::error::Result;
use tracing::debug;
use uuid::Uuid;

/// Minimum sample count below which `success_rate` is undefined.
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// EMA smoothing coefficient, configurable with a stated default.
pub const DEFAULT_ALPHA: f32 = 0.7;

pub struct ReflectionEngine {
    case_bank: Arc<dyn CaseBankDao>,
    execution_log: Arc<dyn ExecutionLogDao>,
    min_samples: usize,
    alpha: f32,
}

impl ReflectionEngine {
    #[must_use]
    pub fn new(case_bank: Arc<dyn CaseBankDao>, execution_log: Arc<dyn ExecutionLogDao>) -> Self {
        Self {
            case_bank,
            execution_log,
            min_samples: DEFAULT_MIN_SAMPLES,
            alpha: DEFAULT_ALPHA,
        }
    }

    #[must_use]
    pub fn with_params(mut self, min_samples: usize, alpha: f32) -> Self {
        self.min_samples = min_samples;
        self.alpha = alpha;
        self
    }

    /// Recompute and persist one case's quality from its last
    /// `min_samples`-or-more execution log rows. Never called on the
    /// request path ("must never block the request path") —
    /// callers invoke this from a schedule or an on-demand admin action,
    /// both external to this crate.
    ///
    /// Returns `None` (quality left untouched) when fewer than
    /// `min_samples` log rows exist yet.
    ///
    /// # Errors
    /// Propagates DAO failures.
    pub async fn reflect_on_case(&self, case_id: Uuid) -> Result<Option<f32>> {
        let logs = self
            .execution_log
            .last_n_for_case(case_id, self.min_samples.max(1) * 10)
            .await?;

        if logs.len() < self.min_samples {
            debug!(
                case_id = %case_id,
                samples = logs.len(),
                required = self.min_samples,
                "not enough execution samples to reflect yet"
            );
            return Ok(None);
        }

        let successes = logs.iter().filter(|l| l.success).count();
        #[allow(clippy::cast_precision_loss)]
        let success_rate = successes as f32 / logs.len() as f32;

        let current = self.case_bank.get(case_id).await?;
        let new_quality = match current.and_then(|c| c.quality) {
            Some(quality) => self.alpha.mul_add(quality, (1.0 - self.alpha) * success_rate),
            None => success_rate,
        };

        self.case_bank
            .update(
                case_id,
                CasePatch {
                    quality: Some(Some(new_quality)),
                    ..Default::default()
                },
            )
            .await?;

        Ok(Some(new_quality))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{MockCaseBankDao, MockExecutionLogDao};
    use chrono::Utc;
    use taxorag_core::entities::{CaseBankEntry, CaseStatus, ExecutionLog};

    fn log(success: bool) -> ExecutionLog {
        ExecutionLog {
            log_id: 1,
            case_id: Some(Uuid::new_v4()),
            success,
            error_type: None,
            error_message: None,
            execution_time_ms: 10,
            context: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    fn entry(quality: Option<f32>) -> CaseBankEntry {
        CaseBankEntry {
            case_id: Uuid::new_v4(),
            query: "q".into(),
            answer: "a".into(),
            sources: vec![],
            query_vector: None,
            quality,
            usage_count: 1,
            last_used_at: Some(Utc::now()),
            status: CaseStatus::Active,
            version: 1,
            updated_at: Utc::now(),
            updated_by: None,
        }
    }

    #[tokio::test]
    async fn fewer_than_min_samples_leaves_quality_untouched() {
        let mut execution_log = MockExecutionLogDao::new();
        execution_log
            .expect_last_n_for_case()
            .returning(|_, _| Ok(vec![log(true), log(true)]));
        let mut case_bank = MockCaseBankDao::new();
        case_bank.expect_update().times(0);

        let engine = ReflectionEngine::new(Arc::new(case_bank), Arc::new(execution_log));
        let result = engine.reflect_on_case(Uuid::new_v4()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn ema_blends_current_quality_with_new_success_rate() {
        let mut execution_log = MockExecutionLogDao::new();
        execution_log.expect_last_n_for_case().returning(|_, _| {
            Ok((0..10)
                .map(|i| log(i < 8)) // 8/10 = 0.8 success rate
                .collect())
        });
        let mut case_bank = MockCaseBankDao::new();
        case_bank
            .expect_get()
            .returning(|_| Ok(Some(entry(Some(0.5)))));
        case_bank
            .expect_update()
            .withf(|_, patch| matches!(patch.quality, Some(Some(q)) if (q - (0.7 * 0.5 + 0.3 * 0.8)).abs() < 1e-5))
            .returning(|_, _| Ok(()));

        let engine = ReflectionEngine::new(Arc::new(case_bank), Arc::new(execution_log));
        let quality = engine.reflect_on_case(Uuid::new_v4()).await.unwrap().unwrap();
        assert!((quality - 0.65).abs() < 1e-5);
    }

    #[tokio::test]
    async fn null_quality_bootstraps_from_success_rate_directly() {
        let mut execution_log = MockExecutionLogDao::new();
        execution_log
            .expect_last_n_for_case()
            .returning(|_, _| Ok((0..10).map(|_| log(true)).collect()));
        let mut case_bank = MockCaseBankDao::new();
        case_bank.expect_get().returning(|_| Ok(Some(entry(None))));
        case_bank.expect_update().returning(|_, _| Ok(()));

        let engine = ReflectionEngine::new(Arc::new(case_bank), Arc::new(execution_log));
        let quality = engine.reflect_on_case(Uuid::new_v4()).await.unwrap().unwrap();
        assert!((quality - 1.0).abs() < 1e-6);
    }
}
