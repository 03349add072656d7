//! The seven-step query pipeline: intent, retrieve, plan, tools_debate,
//! compose, cite, respond  Ties together
//! every other crate in the workspace behind the wire-shaped
//! `orchestrate`/`search`/`create_agent` entry points from

pub mod agent;
pub mod cite;
pub mod compose;
pub mod intent;
pub mod orchestrator;
pub mod plan;
pub mod quality;
pub mod timeout;
pub mod types;

pub use agent::{CreateAgentRequest, CreateAgentResponse};
pub use orchestrator::PipelineOrchestrator;
pub use timeout::with_timeout;
pub use types::{
    Degraded, ErrorBody, Intent, OrchestrateOutcome, OrchestrateRequest, OrchestrateResponse,
    PipelineState, PipelineTrace, StepTrace,
};
