//! Coverage result and gap shapes 

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Confidence floor applied to the classification rows counted toward
/// coverage
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Fraction-of-target floor below which a node is reported as a gap
///
pub const DEFAULT_GAP_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    pub agent_id: Uuid,
    pub version: String,
    pub node_coverage: HashMap<Uuid, f32>,
    pub counts: HashMap<Uuid, i64>,
    pub targets: HashMap<Uuid, i64>,
    pub overall: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub node_id: Uuid,
    pub coverage_percent: f32,
    pub missing: i64,
}
