//! Embedding service with tiered fallback 

pub mod cache;
pub mod local;
pub mod provider;
pub mod service;

pub use cache::EmbeddingCache;
pub use local::{pseudo_embedding, LocalEmbeddingModel, PlaceholderLocalModel};
pub use provider::{HostedEmbeddingProvider, HttpEmbeddingProvider, HttpProviderConfig};
pub use service::{BatchItem, EmbeddingService};
