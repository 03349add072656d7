//! Direct single-shot composition: an answer-intent query without the
//! debate feature enabled falls back to a single LLM call over the
//! retrieved evidence.

use taxorag_core::error::Result;
use taxorag_debate::LlmClient;
use taxorag_retrieval::SearchHit;

const COMPOSE_SYSTEM: &str =
    "You answer the question directly from the given evidence, citing only what it supports.";

/// # Errors
/// Propagates the underlying LLM call's error.
pub async fn compose_answer(llm: &dyn LlmClient, query: &str, evidence: &[SearchHit]) -> Result<String> {
    let evidence_block = evidence
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[{i}] {}", hit.text))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!("Question: {query}\n\nEvidence:\n{evidence_block}\n\nAnswer:");
    llm.complete(COMPOSE_SYSTEM, &prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct EchoLlm;
    #[async_trait]
    impl LlmClient for EchoLlm {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
            Ok(format!("answered: {prompt}"))
        }
    }

    #[tokio::test]
    async fn composes_from_evidence_text() {
        let hit = SearchHit {
            chunk_id: Uuid::new_v4(),
            doc_id: Uuid::new_v4(),
            text: "gradient descent minimizes loss iteratively".into(),
            score: 1.0,
            score_breakdown: taxorag_retrieval::ScoreBreakdown::default(),
            citations: Vec::new(),
        };
        let answer = compose_answer(&EchoLlm, "what is gradient descent", &[hit]).await.unwrap();
        assert!(answer.contains("gradient descent minimizes loss iteratively"));
    }
}
