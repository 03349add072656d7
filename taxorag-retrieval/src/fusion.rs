//! Score normalization and fusion

use crate::types::RawCandidate;
use std::collections::HashMap;
use uuid::Uuid;

/// Min-max normalize raw BM25 scores to `[0,1]` within the candidate set
/// An empty or constant-score set normalizes to all
/// zeros rather than dividing by zero.
#[must_use]
pub fn minmax_normalize(candidates: &[RawCandidate]) -> HashMap<Uuid, f32> {
    if candidates.is_empty() {
        return HashMap::new();
    }
    let min = candidates
        .iter()
        .map(|c| c.raw_score)
        .fold(f32::INFINITY, f32::min);
    let max = candidates
        .iter()
        .map(|c| c.raw_score)
        .fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    candidates
        .iter()
        .map(|c| {
            let norm = if range > 0.0 {
                (c.raw_score - min) / range
            } else {
                0.0
            };
            (c.chunk_id, norm)
        })
        .collect()
}

/// Map raw cosine similarity in `[-1,1]` to `[0,1]`
#[must_use]
pub fn vector_score_to_unit(raw_cosine: f32) -> f32 {
    (raw_cosine + 1.0) / 2.0
}

#[must_use]
pub fn vector_normalize(candidates: &[RawCandidate]) -> HashMap<Uuid, f32> {
    candidates
        .iter()
        .map(|c| (c.chunk_id, vector_score_to_unit(c.raw_score)))
        .collect()
}

/// One fused candidate before ordering/truncation.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub chunk_id: Uuid,
    pub doc_id: Uuid,
    pub text: String,
    pub final_score: f32,
    pub bm25_norm: f32,
    pub vec_norm: f32,
}

/// Merge lexical and vector candidate sets by `chunk_id`, using 0 for the
/// missing side, then compute the weighted fusion
/// score (step 3).
#[must_use]
pub fn fuse(
    lexical: &[RawCandidate],
    vector: &[RawCandidate],
    w_bm25: f32,
    w_vec: f32,
) -> Vec<FusedCandidate> {
    let bm25_norm = minmax_normalize(lexical);
    let vec_norm = vector_normalize(vector);

    let mut by_chunk: HashMap<Uuid, (Uuid, String)> = HashMap::new();
    for c in lexical.iter().chain(vector.iter()) {
        by_chunk
            .entry(c.chunk_id)
            .or_insert_with(|| (c.doc_id, c.text.clone()));
    }

    by_chunk
        .into_iter()
        .map(|(chunk_id, (doc_id, text))| {
            let bm25 = bm25_norm.get(&chunk_id).copied().unwrap_or(0.0);
            let vec = vec_norm.get(&chunk_id).copied().unwrap_or(0.0);
            FusedCandidate {
                chunk_id,
                doc_id,
                text,
                final_score: w_bm25 * bm25 + w_vec * vec,
                bm25_norm: bm25,
                vec_norm: vec,
            }
        })
        .collect()
}

/// Order strictly by `final` desc, tie-break `bm25_norm` desc, then
/// `doc_id` asc, stably ("Ordering guarantee").
pub fn order(candidates: &mut [FusedCandidate]) {
    candidates.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.bm25_norm
                    .partial_cmp(&a.bm25_norm)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
}
