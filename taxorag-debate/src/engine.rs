//! The debate engine itself 

use crate::llm::LlmClient;
use crate::types::{DebateInput, DebateOutcome, DebateRole, DebateTurn};
use std::sync::Arc;
use taxorag_core::error::Result;
use taxorag_retrieval::SearchHit;
use tracing::warn;

const AFFIRMATIVE_SYSTEM: &str = "You argue for the strongest answer supported by the evidence.";
const CRITICAL_SYSTEM: &str =
    "You find weaknesses, omissions, or unsupported claims in the affirmative answer.";
const JUDGE_SYSTEM: &str =
    "You synthesize a single final answer from the affirmative and critical turns, keeping only claims the evidence supports.";
const SINGLE_SHOT_SYSTEM: &str = "You answer the question directly from the given evidence.";

pub struct DebateEngine {
    llm: Arc<dyn LlmClient>,
}

impl DebateEngine {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Run the two-agent exchange plus judge synthesis 
    /// Falls back to a single LLM call if any of the three calls fails.
    ///
    /// # Errors
    /// Only if the single-shot fallback itself also fails.
    pub async fn run(&self, input: &DebateInput<'_>) -> Result<DebateOutcome> {
        match self.debate_rounds(input).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(error = %e, "debate round failed, falling back to single-shot compose");
                let answer = self.single_shot_compose(input).await?;
                Ok(DebateOutcome {
                    answer,
                    turns: Vec::new(),
                    fell_back: true,
                })
            }
        }
    }

    async fn debate_rounds(&self, input: &DebateInput<'_>) -> Result<DebateOutcome> {
        let evidence_block = render_evidence(input.evidence);
        let mut turns = Vec::new();
        let rounds = input.rounds.max(1);

        let mut affirmative_content = String::new();
        let mut critical_content = String::new();

        for _ in 0..rounds {
            let affirmative_prompt = format!(
                "Question: {}\n\nEvidence:\n{evidence_block}\n\nPrior critique: {}\n\nGive your best supported answer.",
                input.query, critical_content
            );
            affirmative_content = self.llm.complete(AFFIRMATIVE_SYSTEM, &affirmative_prompt).await?;
            turns.push(DebateTurn {
                role: DebateRole::Affirmative,
                content: affirmative_content.clone(),
            });

            let critical_prompt = format!(
                "Question: {}\n\nEvidence:\n{evidence_block}\n\nAffirmative answer:\n{affirmative_content}\n\nChallenge any unsupported claims.",
                input.query
            );
            critical_content = self.llm.complete(CRITICAL_SYSTEM, &critical_prompt).await?;
            turns.push(DebateTurn {
                role: DebateRole::Critical,
                content: critical_content.clone(),
            });
        }

        let judge_prompt = format!(
            "Question: {}\n\nEvidence:\n{evidence_block}\n\nAffirmative:\n{affirmative_content}\n\nCritical:\n{critical_content}\n\nSynthesize the final answer.",
            input.query
        );
        let answer = self.llm.complete(JUDGE_SYSTEM, &judge_prompt).await?;
        turns.push(DebateTurn {
            role: DebateRole::Judge,
            content: answer.clone(),
        });

        Ok(DebateOutcome {
            answer,
            turns,
            fell_back: false,
        })
    }

    async fn single_shot_compose(&self, input: &DebateInput<'_>) -> Result<String> {
        let evidence_block = render_evidence(input.evidence);
        let prompt = format!("Question: {}\n\nEvidence:\n{evidence_block}", input.query);
        self.llm.complete(SINGLE_SHOT_SYSTEM, &prompt).await
    }
}

fn render_evidence(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, h)| format!("[{i}] {}", h.text))
        .collect::<Vec<_>>()
        .join("\n")
}
