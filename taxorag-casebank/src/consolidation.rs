//! Consolidation policy: archive low-value cases, merge near-duplicates,
//! retire stale cases 

use crate::dao::{CaseBankDao, CasePatch, ListOrder};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use taxorag_config::ConsolidationConfig;
use taxorag_core::entities::{ArchiveReason, CaseBankEntry, CaseStatus};
use taxorag_core::error::Result;
use taxorag_embed::EmbeddingService;
use tracing::info;
use uuid::Uuid;

/// Active cases whose `last_used_at` is this recent are never touched by
/// low-performance removal, regardless of quality or usage/// step 1 safety exclusion).
const RECENT_USE_EXCLUSION_DAYS: i64 = 7;

/// Usage ceiling for the inactivity-archive phase. Distinct from
/// `ConsolidationConfig::high_usage_exclude`, which only gates phase 1.
const INACTIVITY_USAGE_CEILING: i64 = 100;

/// How many active cases a single run will consider. A production
/// deployment would page through this; the core caps it generously so a
/// single `list` call stays one SQL round trip per phase.
const MAX_CANDIDATES: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub keeper: Uuid,
    pub remover: Uuid,
    pub similarity: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub removed: Vec<Uuid>,
    pub merged: Vec<MergeOutcome>,
    pub archived: Vec<Uuid>,
    pub details: Vec<String>,
}

pub struct ConsolidationPolicy {
    case_bank: Arc<dyn CaseBankDao>,
    config: ConsolidationConfig,
}

impl ConsolidationPolicy {
    #[must_use]
    pub fn new(case_bank: Arc<dyn CaseBankDao>, config: ConsolidationConfig) -> Self {
        Self { case_bank, config }
    }

    /// Run all three phases in order  `dry_run` computes and
    /// reports without mutating anything ("after
    /// `consolidation_run(dry_run=true)`, the counts of active / archived
    /// rows are unchanged").
    ///
    /// # Errors
    /// Propagates DAO failures.
    pub async fn run(&self, dry_run: bool) -> Result<Report> {
        self.run_at(dry_run, Utc::now()).await
    }

    /// Same as [`Self::run`] but with an explicit clock, for
    /// deterministic tests.
    ///
    /// # Errors
    /// Propagates DAO failures.
    pub async fn run_at(&self, dry_run: bool, now: DateTime<Utc>) -> Result<Report> {
        let active = self
            .case_bank
            .list(CaseStatus::Active, MAX_CANDIDATES, ListOrder::UsageCountDesc)
            .await?;

        let mut settled: HashSet<Uuid> = HashSet::new();
        let mut report = Report::default();

        self.phase_low_performance(&active, &mut settled, &mut report, dry_run, now)
            .await?;
        self.phase_duplicate_merge(&active, &mut settled, &mut report, dry_run)
            .await?;
        self.phase_inactivity(&active, &mut settled, &mut report, dry_run, now)
            .await?;

        info!(
            removed = report.removed.len(),
            merged = report.merged.len(),
            archived = report.archived.len(),
            dry_run,
            "consolidation run complete"
        );
        Ok(report)
    }

    async fn phase_low_performance(
        &self,
        active: &[CaseBankEntry],
        settled: &mut HashSet<Uuid>,
        report: &mut Report,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let recent_cutoff = now - Duration::days(RECENT_USE_EXCLUSION_DAYS);

        for case in active {
            if settled.contains(&case.case_id) {
                continue;
            }
            let Some(quality) = case.quality else { continue };
            if quality >= self.config.quality_threshold {
                continue;
            }
            if case.usage_count <= self.config.min_usage {
                continue;
            }
            if case.usage_count > self.config.high_usage_exclude {
                continue;
            }
            if let Some(last_used) = case.last_used_at {
                if last_used >= recent_cutoff {
                    continue;
                }
            }

            if !dry_run {
                self.case_bank
                    .soft_archive(case.case_id, ArchiveReason::LowPerformance)
                    .await?;
            }
            settled.insert(case.case_id);
            report.removed.push(case.case_id);
            report
                .details
                .push(format!("{} removed: low_performance (quality={quality:.2})", case.case_id));
        }
        Ok(())
    }

    async fn phase_duplicate_merge(
        &self,
        active: &[CaseBankEntry],
        settled: &mut HashSet<Uuid>,
        report: &mut Report,
        dry_run: bool,
    ) -> Result<()> {
        let candidates: Vec<&CaseBankEntry> = active
            .iter()
            .filter(|c| !settled.contains(&c.case_id) && c.query_vector.is_some())
            .collect();

        let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let (Some(a), Some(b)) = (&candidates[i].query_vector, &candidates[j].query_vector)
                else {
                    continue;
                };
                let similarity = EmbeddingService::similarity(a, b);
                if similarity > self.config.dup_similarity {
                    pairs.push((i, j, similarity));
                }
            }
        }
        // highest-similarity pair wins when a case is eligible for more
        // than one merge.
        pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

        let mut merged_this_phase: HashSet<Uuid> = HashSet::new();
        for (i, j, similarity) in pairs {
            let a = candidates[i];
            let b = candidates[j];
            if merged_this_phase.contains(&a.case_id) || merged_this_phase.contains(&b.case_id) {
                continue;
            }

            let (keeper, remover) = pick_keeper(a, b);

            let new_usage = keeper.usage_count + remover.usage_count;
            let new_quality = match (keeper.quality, remover.quality) {
                (Some(ka), Some(rb)) => Some((ka + rb) / 2.0),
                (Some(ka), None) => Some(ka),
                (None, Some(rb)) => Some(rb),
                (None, None) => None,
            };

            if !dry_run {
                self.case_bank
                    .update(
                        keeper.case_id,
                        CasePatch {
                            usage_count: Some(new_usage),
                            quality: Some(new_quality),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.case_bank
                    .soft_archive(remover.case_id, ArchiveReason::Duplicate)
                    .await?;
            }

            merged_this_phase.insert(keeper.case_id);
            merged_this_phase.insert(remover.case_id);
            settled.insert(keeper.case_id);
            settled.insert(remover.case_id);
            report.merged.push(MergeOutcome {
                keeper: keeper.case_id,
                remover: remover.case_id,
                similarity,
            });
            report.details.push(format!(
                "{} merged into {} (similarity={similarity:.3})",
                remover.case_id, keeper.case_id
            ));
        }
        Ok(())
    }

    async fn phase_inactivity(
        &self,
        active: &[CaseBankEntry],
        settled: &mut HashSet<Uuid>,
        report: &mut Report,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let inactive_cutoff = now - Duration::days(self.config.inactive_days);

        for case in active {
            if settled.contains(&case.case_id) {
                continue;
            }
            if case.usage_count >= INACTIVITY_USAGE_CEILING {
                continue;
            }
            let Some(last_used) = case.last_used_at else { continue };
            if last_used >= inactive_cutoff {
                continue;
            }

            if !dry_run {
                self.case_bank
                    .soft_archive(case.case_id, ArchiveReason::Inactive)
                    .await?;
            }
            settled.insert(case.case_id);
            report.archived.push(case.case_id);
            report
                .details
                .push(format!("{} archived: inactive", case.case_id));
        }
        Ok(())
    }
}

/// Keeper = higher `usage_count`; ties by higher `quality`, then lower
/// `case_id`
fn pick_keeper<'a>(
    a: &'a CaseBankEntry,
    b: &'a CaseBankEntry,
) -> (&'a CaseBankEntry, &'a CaseBankEntry) {
    let a_quality = a.quality.unwrap_or(f32::MIN);
    let b_quality = b.quality.unwrap_or(f32::MIN);
    let a_wins = (a.usage_count, ordered_float(a_quality), std::cmp::Reverse(a.case_id))
        > (b.usage_count, ordered_float(b_quality), std::cmp::Reverse(b.case_id));
    if a_wins {
        (a, b)
    } else {
        (b, a)
    }
}

/// `f32` has no `Ord`; NaN cannot occur in a stored quality (it's
/// constrained to `[0, 1]` or absent), so bit-pattern comparison via a
/// monotone mapping is safe here.
fn ordered_float(x: f32) -> i32 {
    if x >= 0.0 {
        x.to_bits() as i32
    } else {
        -(((-x).to_bits()) as i32)
    }
}
