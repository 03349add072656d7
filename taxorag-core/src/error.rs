//! Error taxonomy shared across the taxorag workspace.
//!
//! Every crate in this workspace either returns `CoreError` directly or
//! defines its own error enum with a `#[from] CoreError` variant so that
//! kinds survive unchanged up to the orchestrator boundary (//! "each step catches only the kinds it can act on; everything else
//! bubbles to the orchestrator").

use thiserror::Error;
use uuid::Uuid;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CoreError>;

/// The error taxonomy from, expressed as variants rather than
/// free-form strings so callers can `match` on kind.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing/malformed API key, invalid env enum. Always fatal at startup.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Bad request payload, unknown taxonomy path, scope references a
    /// nonexistent node. No retry.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Embedding API 5xx/timeout, LLM call timeout. Retried with backoff
    /// up to a fixed budget before falling back or degrading.
    #[error("upstream transient error calling {upstream}: {message}")]
    UpstreamTransient { upstream: String, message: String },

    /// 401 from an upstream provider. Treated as configuration in
    /// production, as transient in dev (see `taxorag-config::Environment`).
    #[error("upstream auth error calling {upstream}: {message}")]
    UpstreamAuth { upstream: String, message: String },

    /// Composite-PK conflict, FK violation, NOT NULL violation. Transaction
    /// rolls back; this is what callers should map to a validation error.
    #[error("data integrity violation: {message}")]
    DataIntegrity { message: String },

    /// DB pool exhausted, in-process queue full. No retry inside the core.
    #[error("resource exhausted: {message}")]
    Resource { message: String },

    /// Assertion failure / invariant violation. Fatal for the request.
    #[error("internal error (request_id={request_id:?}): {message}")]
    Internal {
        message: String,
        request_id: Option<Uuid>,
    },

    /// The caller's cancellation signal fired.
    #[error("operation cancelled")]
    Cancelled,

    /// A declared timeout elapsed.
    #[error("operation timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },

    /// A taxonomy path was resolved against a version where it doesn't
    /// exist  Kept as a distinct variant because the
    /// orchestrator must treat it as validation, not internal.
    #[error("taxonomy path not found: {path:?} at version {version}")]
    TaxonomyPathNotFound { path: Vec<String>, version: String },
}

impl CoreError {
    /// Short, stable kind string for the `{error: {kind, ...}}` wire shape.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Validation { .. } | Self::TaxonomyPathNotFound { .. } => "validation",
            Self::UpstreamTransient { .. } => "upstream_transient",
            Self::UpstreamAuth { .. } => "upstream_auth",
            Self::DataIntegrity { .. } => "data_integrity",
            Self::Resource { .. } => "resource",
            Self::Internal { .. } => "internal",
            Self::Cancelled => "cancelled",
            Self::TimedOut { .. } => "timed_out",
        }
    }

    /// Whether this kind is safe to retry with backoff up to a fixed
    /// budget. Only upstream-transient failures qualify.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamTransient { .. })
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>, request_id: Option<Uuid>) -> Self {
        Self::Internal {
            message: message.into(),
            request_id,
        }
    }
}
