//! Intent classification: the first pipeline step ("classify
//! the query into {search, answer, classify}"). A cheap heuristic rather
//! than a model call — intent gates which later steps run, so it sits on
//! the hot path and must stay sub-millisecond.

use crate::types::Intent;

const CLASSIFY_MARKERS: [&str; 4] = ["classify", "which taxonomy", "what category", "tag this"];
const SEARCH_MARKERS: [&str; 4] = ["find", "search for", "list", "show me"];

/// Heuristic intent classification for the "intent" pipeline step.
#[must_use]
pub fn classify_intent(query: &str) -> Intent {
    let lower = query.to_lowercase();

    if CLASSIFY_MARKERS.iter().any(|m| lower.contains(m)) {
        return Intent::Classify;
    }

    let looks_like_question = lower.trim_end().ends_with('?')
        || lower.starts_with("what")
        || lower.starts_with("why")
        || lower.starts_with("how")
        || lower.starts_with("who")
        || lower.starts_with("when")
        || lower.starts_with("explain")
        || lower.starts_with("describe");

    if looks_like_question && !SEARCH_MARKERS.iter().any(|m| lower.starts_with(m)) {
        return Intent::Answer;
    }

    if SEARCH_MARKERS.iter().any(|m| lower.contains(m)) {
        return Intent::Search;
    }

    Intent::Answer
}
