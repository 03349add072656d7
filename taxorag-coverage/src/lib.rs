//! Document coverage against an agent's taxonomy scope, and gap
//! detection 

pub mod dao;
pub mod meter;
pub mod types;

pub use dao::{CoverageCountsDao, TargetCountsDao};
pub use meter::CoverageMeter;
pub use types::{CoverageResult, Gap, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_GAP_THRESHOLD};
