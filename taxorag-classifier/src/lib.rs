//! Assigns chunks/documents to taxonomy nodes with confidence, routing
//! low-confidence items to HITL review 

pub mod classifier;
pub mod dao;
pub mod types;

pub use classifier::Classifier;
pub use dao::{DocTaxonomyDao, HitlQueueDao, NodeDescriptorDao};
pub use types::{
    ClassificationOutcome, NodeDescriptor, DEFAULT_FLOOR, DEFAULT_HITL_THRESHOLD, DEFAULT_TOP_K,
};
