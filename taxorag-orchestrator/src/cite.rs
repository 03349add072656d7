//! Citation validation: the `cite` pipeline step ("every
//! factual claim must carry at least one citation into the evidence
//! set; sentences the evidence doesn't support are dropped, or the
//! answer is marked unverified if dropping would empty it").

use std::collections::HashSet;
use taxorag_retrieval::{Citation, SearchHit};

const MIN_OVERLAP_WORD_LEN: usize = 4;

/// Outcome of running the answer text through citation validation.
pub struct CiteResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    /// `true` when at least one sentence was dropped or the whole answer
    /// had to be kept unverified.
    pub degraded: bool,
}

/// # Panics
/// Never.
#[must_use]
pub fn validate_citations(answer: &str, evidence: &[SearchHit]) -> CiteResult {
    let sentences = split_sentences(answer);
    if sentences.is_empty() {
        return CiteResult {
            answer: answer.to_string(),
            citations: union_citations(evidence),
            degraded: false,
        };
    }

    let mut kept = Vec::with_capacity(sentences.len());
    let mut any_dropped = false;
    for sentence in &sentences {
        if is_supported(sentence, evidence) {
            kept.push(sentence.clone());
        } else {
            any_dropped = true;
        }
    }

    if kept.is_empty() {
        // Dropping every sentence would leave nothing to answer with;
        // keep the original text but mark it unverified instead.
        return CiteResult {
            answer: answer.to_string(),
            citations: union_citations(evidence),
            degraded: true,
        };
    }

    CiteResult {
        answer: kept.join(" "),
        citations: union_citations(evidence),
        degraded: any_dropped,
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '?', '!'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{s}."))
        .collect()
}

fn is_supported(sentence: &str, evidence: &[SearchHit]) -> bool {
    let sentence_words = content_words(sentence);
    if sentence_words.is_empty() {
        return true;
    }
    evidence.iter().any(|hit| {
        let hit_words = content_words(&hit.text);
        sentence_words.iter().any(|w| hit_words.contains(w))
    })
}

fn content_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= MIN_OVERLAP_WORD_LEN)
        .map(str::to_string)
        .collect()
}

fn union_citations(evidence: &[SearchHit]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for hit in evidence {
        for citation in &hit.citations {
            let key = (citation.doc_id, citation.path.clone());
            if seen.insert(key) {
                out.push(citation.clone());
            }
        }
    }
    out
}
