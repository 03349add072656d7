//! Response quality estimate used both for the `respond` step's logged
//! outcome and as the adaptive strategy selector's reward signal: the
//! post-response quality combined with a latency penalty.

use crate::types::PipelineState;

const NO_EVIDENCE_PENALTY: f32 = 0.2;
const UNVERIFIED_CLAIM_PENALTY: f32 = 0.3;
const DEBATE_FALLBACK_PENALTY: f32 = 0.2;

/// Cheap heuristic: start from 1.0 and deduct for signals the pipeline
/// already observed — no evidence, unverifiable claims, or a debate
/// engine that had to fall back to single-shot compose.
#[must_use]
pub fn estimate_quality(state: &PipelineState) -> f32 {
    let mut quality = 1.0;
    if state.evidence.is_empty() {
        quality -= NO_EVIDENCE_PENALTY;
    }
    if state.degraded_steps.iter().any(|s| s == "cite.unverified_claims") {
        quality -= UNVERIFIED_CLAIM_PENALTY;
    }
    if state.debate.as_ref().is_some_and(|d| d.fell_back) {
        quality -= DEBATE_FALLBACK_PENALTY;
    }
    quality.clamp(0.0, 1.0)
}
