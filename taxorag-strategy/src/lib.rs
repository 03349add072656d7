//! Soft-Q contextual bandit choosing a retrieval strategy from query
//! features  Guarded behind a feature flag by
//! the orchestrator; this crate is pure compute with no I/O.

pub mod features;
pub mod replay;
pub mod selector;

pub use features::QueryFeatures;
pub use replay::{ReplayBuffer, Transition, DEFAULT_CAPACITY};
pub use selector::{combined_reward, AdaptiveStrategySelector};
