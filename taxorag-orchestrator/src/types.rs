//! Wire-shaped request/response types and the in-flight pipeline state
//! threaded through the seven steps 

use serde::{Deserialize, Serialize};
use std::time::Duration;
use taxorag_debate::DebateOutcome;
use taxorag_retrieval::{Citation, SearchHit, SearchMode};
use taxorag_strategy::QueryFeatures;
use taxorag_tools::ToolOutcome;
use uuid::Uuid;

/// What the query wants done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Search,
    Answer,
    Classify,
}

#[derive(Debug, Clone)]
pub struct OrchestrateRequest {
    pub request_id: Option<Uuid>,
    pub query: String,
    pub agent_id: Uuid,
    pub taxonomy_scope: Vec<Uuid>,
    pub taxonomy_version: String,
}

/// Timed record of one pipeline step, for the `trace` field on a
/// completed response ("every suspension point is observable").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTrace {
    pub step: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineTrace {
    pub steps: Vec<StepTrace>,
}

impl PipelineTrace {
    pub fn record(&mut self, step: &str, elapsed: Duration) {
        self.steps.push(StepTrace {
            step: step.to_string(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
    }
}

/// Which optional steps were skipped or simplified for this request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Degraded {
    pub steps: Vec<String>,
}

/// Mutable state threaded through `intent` -> `respond` 
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub request_id: Uuid,
    pub query: String,
    pub agent_id: Uuid,
    pub intent: Option<Intent>,
    pub strategy: Option<SearchMode>,
    pub strategy_features: Option<QueryFeatures>,
    pub retrieve_latency_ms: u64,
    pub evidence: Vec<SearchHit>,
    pub planned_tools: Vec<String>,
    pub tool_outcomes: Vec<ToolOutcome>,
    pub debate: Option<DebateOutcome>,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub quality: Option<f32>,
    pub degraded_steps: Vec<String>,
    pub trace: PipelineTrace,
}

impl PipelineState {
    #[must_use]
    pub fn new(request_id: Uuid, query: String, agent_id: Uuid) -> Self {
        Self {
            request_id,
            query,
            agent_id,
            intent: None,
            strategy: None,
            strategy_features: None,
            retrieve_latency_ms: 0,
            evidence: Vec::new(),
            planned_tools: Vec::new(),
            tool_outcomes: Vec::new(),
            debate: None,
            answer: String::new(),
            citations: Vec::new(),
            quality: None,
            degraded_steps: Vec::new(),
            trace: PipelineTrace::default(),
        }
    }

    pub fn degrade(&mut self, step: &str) {
        self.degraded_steps.push(step.to_string());
    }

    fn degraded(&self) -> Option<Degraded> {
        if self.degraded_steps.is_empty() {
            None
        } else {
            Some(Degraded {
                steps: self.degraded_steps.clone(),
            })
        }
    }

    #[must_use]
    pub fn into_response(self) -> OrchestrateResponse {
        let degraded = self.degraded();
        OrchestrateResponse {
            request_id: self.request_id,
            answer: self.answer,
            citations: self.citations,
            evidence: self.evidence,
            quality: self.quality,
            trace: self.trace,
            degraded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrateResponse {
    pub request_id: Uuid,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub evidence: Vec<SearchHit>,
    pub quality: Option<f32>,
    pub trace: PipelineTrace,
    pub degraded: Option<Degraded>,
}

/// The `{error: {kind, message, request_id}}` wire shape ("no
/// stack traces, no internal detail leaks to the client").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    pub request_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OrchestrateOutcome {
    Completed { response: OrchestrateResponse },
    Failed { error: ErrorBody },
}
