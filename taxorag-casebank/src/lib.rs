//! The case bank and its two background maintenance engines: reflection
//! (C7) and consolidation (C8) 

pub mod bank;
pub mod consolidation;
pub mod dao;
pub mod reflection;

pub use bank::{CaseBank, IDENTICAL_QUERY_SIMILARITY};
pub use consolidation::{ConsolidationPolicy, MergeOutcome, Report};
pub use dao::{ArchiveDao, CaseBankDao, CasePatch, ExecutionLogDao, ListOrder};
pub use reflection::{ReflectionEngine, DEFAULT_ALPHA, DEFAULT_MIN_SAMPLES};
