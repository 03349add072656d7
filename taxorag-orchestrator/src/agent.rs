//! The `create_agent` wire entry point : provisions an agent's
//! taxonomy scope and reports its starting coverage. Agent persistence
//! (the `agents` table) is a concrete Postgres DAO outside this crate's
//! test surface, same as the retrieval/case-bank DAOs — this computes
//! the coverage snapshot a caller would store alongside the row.

use taxorag_coverage::CoverageResult;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateAgentRequest {
    pub name: String,
    pub taxonomy_node_ids: Vec<Uuid>,
    pub taxonomy_version: String,
}

#[derive(Debug, Clone)]
pub struct CreateAgentResponse {
    pub agent_id: Uuid,
    pub name: String,
    pub coverage: CoverageResult,
}
