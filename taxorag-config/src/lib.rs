//! Centralized environment variable registry for the taxorag core 
//!
//! Mirrors the reference platform's configuration layer: a single typed
//! struct with documented defaults, populated from `std::env` and
//! validated at startup rather than defensively re-checked throughout the
//! codebase ("replace dynamic field access ... with mandatory
//! fields ... no defensive defaulting in the core").

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use taxorag_core::error::{CoreError, Result};

/// Deployment environment, gating fallback behavior and validation
/// strictness 
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Staging,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "development" => Ok(Self::Development),
            "testing" => Ok(Self::Testing),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(CoreError::configuration(format!(
                "invalid ENVIRONMENT value {other:?}; expected one of development|testing|staging|production"
            ))),
        }
    }

    /// Whether Fallback B (deterministic pseudo-embedding) and other
    /// dev-only relaxations are permitted
    #[must_use]
    pub const fn allows_fallback(self) -> bool {
        !matches!(self, Self::Production)
    }
}

/// Boolean feature flags, default `false`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub debate: bool,
    pub meta_plan: bool,
    pub tools: bool,
    pub adaptive_strategy: bool,
}

/// Timeouts for every suspension point named in, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsMs {
    pub embed: u64,
    pub bm25_query: u64,
    pub vector_query: u64,
    pub tool: u64,
    pub llm_compose: u64,
    pub total_request: u64,
}

impl Default for TimeoutsMs {
    fn default() -> Self {
        Self {
            embed: 10_000,
            bm25_query: 2_000,
            vector_query: 2_000,
            tool: 10_000,
            llm_compose: 30_000,
            total_request: 60_000,
        }
    }
}

impl TimeoutsMs {
    #[must_use]
    pub const fn embed(self) -> Duration {
        Duration::from_millis(self.embed)
    }
    #[must_use]
    pub const fn bm25_query(self) -> Duration {
        Duration::from_millis(self.bm25_query)
    }
    #[must_use]
    pub const fn vector_query(self) -> Duration {
        Duration::from_millis(self.vector_query)
    }
    #[must_use]
    pub const fn tool(self) -> Duration {
        Duration::from_millis(self.tool)
    }
    #[must_use]
    pub const fn llm_compose(self) -> Duration {
        Duration::from_millis(self.llm_compose)
    }
    #[must_use]
    pub const fn total_request(self) -> Duration {
        Duration::from_millis(self.total_request)
    }
}

/// Consolidation policy tuning knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    pub min_usage: i64,
    pub quality_threshold: f32,
    pub dup_similarity: f32,
    pub inactive_days: i64,
    pub high_usage_exclude: i64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            min_usage: 10,
            quality_threshold: 0.30,
            dup_similarity: 0.95,
            inactive_days: 90,
            high_usage_exclude: 500,
        }
    }
}

/// Bounded-resource knobs (DB pool, background queue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub db_pool_min: u32,
    pub db_pool_max: u32,
    pub job_queue_capacity: usize,
    pub max_workers: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            db_pool_min: 10,
            db_pool_max: 20,
            job_queue_capacity: 100,
            max_workers: 10,
        }
    }
}

/// Top-level application configuration, loaded once at process start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    pub embedding_api_key: Option<String>,
    pub features: FeatureFlags,
    pub embed_cache_max: usize,
    pub retrieval_top_k_default: usize,
    pub hitl_confidence_threshold: f32,
    pub consolidation: ConsolidationConfig,
    pub timeouts: TimeoutsMs,
    pub resources: ResourceLimits,
    /// Global default; agents may override via `RetrievalConfigOverride`
    ///
    pub persist_threshold: f32,
}

impl AppConfig {
    /// Load configuration from the process environment, applying the
    /// documented defaults  and failing fast on malformed or
    /// missing required values.
    ///
    /// # Errors
    /// `CoreError::Configuration` if `DATABASE_URL` is absent, `ENVIRONMENT`
    /// is not one of the four accepted values, or `EMBEDDING_API_KEY` is
    /// missing/malformed while `ENVIRONMENT=production`.
    pub fn from_env() -> Result<Self> {
        let environment = match env::var("ENVIRONMENT") {
            Ok(raw) => Environment::parse(&raw)?,
            Err(_) => Environment::Development,
        };

        let database_url = env::var("DATABASE_URL").map_err(|_| {
            CoreError::configuration("DATABASE_URL is required and was not set")
        })?;

        let embedding_api_key = env::var("EMBEDDING_API_KEY").ok();
        validate_embedding_api_key(environment, embedding_api_key.as_deref())?;

        let features = FeatureFlags {
            debate: read_bool("FEATURE_DEBATE", false),
            meta_plan: read_bool("FEATURE_META_PLAN", false),
            tools: read_bool("FEATURE_TOOLS", false),
            adaptive_strategy: read_bool("FEATURE_ADAPTIVE_STRATEGY", false),
        };

        let mut consolidation = ConsolidationConfig::default();
        consolidation.min_usage = read_num("CONSOLIDATION_MIN_USAGE", consolidation.min_usage);
        consolidation.quality_threshold =
            read_f32("CONSOLIDATION_QUALITY_THRESHOLD", consolidation.quality_threshold);
        consolidation.dup_similarity =
            read_f32("CONSOLIDATION_DUP_SIMILARITY", consolidation.dup_similarity);
        consolidation.inactive_days =
            read_num("CONSOLIDATION_INACTIVE_DAYS", consolidation.inactive_days);
        consolidation.high_usage_exclude = read_num(
            "CONSOLIDATION_HIGH_USAGE_EXCLUDE",
            consolidation.high_usage_exclude,
        );

        Ok(Self {
            environment,
            database_url,
            embedding_api_key,
            features,
            embed_cache_max: read_num("EMBED_CACHE_MAX", 1000_usize),
            retrieval_top_k_default: read_num("RETRIEVAL_TOP_K_DEFAULT", 5_usize),
            hitl_confidence_threshold: read_f32("HITL_CONFIDENCE_THRESHOLD", 0.7),
            consolidation,
            timeouts: TimeoutsMs::default(),
            resources: ResourceLimits::default(),
            persist_threshold: 0.75,
        })
    }
}

/// Validate `EMBEDDING_API_KEY` per: must start with `sk-` or
/// `sk-proj-` and be at least 48 characters, required in production.
fn validate_embedding_api_key(env: Environment, key: Option<&str>) -> Result<()> {
    match (env, key) {
        (Environment::Production, None) => Err(CoreError::configuration(
            "EMBEDDING_API_KEY is required in production",
        )),
        (Environment::Production, Some(k)) => validate_key_shape(k),
        (_, None) => {
            tracing::warn!("EMBEDDING_API_KEY not set outside production; fallback paths will be used");
            Ok(())
        }
        (_, Some(k)) => validate_key_shape(k),
    }
}

fn validate_key_shape(key: &str) -> Result<()> {
    let well_formed = (key.starts_with("sk-proj-") || key.starts_with("sk-")) && key.len() >= 48;
    if well_formed {
        Ok(())
    } else {
        Err(CoreError::configuration(
            "EMBEDDING_API_KEY must start with sk- or sk-proj- and be at least 48 characters",
        ))
    }
}

fn read_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

fn read_num<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn read_f32(name: &str, default: f32) -> f32 {
    read_num(name, default)
}
