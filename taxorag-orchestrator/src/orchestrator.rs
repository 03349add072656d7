//! `PipelineOrchestrator`: the seven-step request pipeline wiring every
//! other component together 
//!
//! Steps run strictly in order — intent, retrieve, plan, tools_debate,
//! compose, cite, respond — each checked against the caller's
//! cancellation token before it starts, and each suspension point raced
//! against its configured timeout  A step failure that can't
//! be degraded around bubbles up as a typed error; the public
//! `orchestrate` entry point never panics and always returns one of the
//! two wire shapes from

use crate::agent::{CreateAgentRequest, CreateAgentResponse};
use crate::cite::validate_citations;
use crate::compose::compose_answer;
use crate::intent::classify_intent;
use crate::plan::plan_tool_calls;
use crate::quality::estimate_quality;
use crate::timeout::with_timeout;
use crate::types::{ErrorBody, Intent, OrchestrateOutcome, OrchestrateRequest, PipelineState};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use taxorag_casebank::{CaseBank, ExecutionLogDao};
use taxorag_config::AppConfig;
use taxorag_core::dag::TaxonomyDagManager;
use taxorag_core::entities::{CaseBankEntry, CaseStatus, ChunkReference, ExecutionLog};
use taxorag_core::error::{CoreError, Result};
use taxorag_coverage::CoverageMeter;
use taxorag_debate::{DebateEngine, DebateInput, LlmClient};
use taxorag_embed::EmbeddingService;
use taxorag_retrieval::{
    HybridRetrievalEngine, RetrievalWeights, SearchMode, SearchRequest, SearchResult, TaxonomyFilter,
};
use taxorag_strategy::{combined_reward, AdaptiveStrategySelector, QueryFeatures};
use taxorag_tools::ToolRegistry;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

pub struct PipelineOrchestrator {
    config: Arc<AppConfig>,
    embeddings: Arc<EmbeddingService>,
    retrieval: Arc<HybridRetrievalEngine>,
    coverage: Arc<CoverageMeter>,
    dag: Arc<TaxonomyDagManager>,
    strategy: Option<Arc<AdaptiveStrategySelector>>,
    debate: Option<Arc<DebateEngine>>,
    tools: Option<Arc<ToolRegistry>>,
    llm: Arc<dyn LlmClient>,
    case_bank: Arc<CaseBank>,
    execution_log: Arc<dyn ExecutionLogDao>,
}

impl PipelineOrchestrator {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<AppConfig>,
        embeddings: Arc<EmbeddingService>,
        retrieval: Arc<HybridRetrievalEngine>,
        coverage: Arc<CoverageMeter>,
        dag: Arc<TaxonomyDagManager>,
        strategy: Option<Arc<AdaptiveStrategySelector>>,
        debate: Option<Arc<DebateEngine>>,
        tools: Option<Arc<ToolRegistry>>,
        llm: Arc<dyn LlmClient>,
        case_bank: Arc<CaseBank>,
        execution_log: Arc<dyn ExecutionLogDao>,
    ) -> Self {
        Self {
            config,
            embeddings,
            retrieval,
            coverage,
            dag,
            strategy,
            debate,
            tools,
            llm,
            case_bank,
            execution_log,
        }
    }

    /// Run the full seven-step pipeline for one request. Never returns
    /// an `Err` — internal failures are mapped to
    /// `OrchestrateOutcome::Failed` at the boundary (the
    /// client-visible wire shapes are `{degraded:...}` or
    /// `{error:{kind,message,request_id}}`, never a raw error).
    pub async fn orchestrate(&self, req: OrchestrateRequest, cancel: CancellationToken) -> OrchestrateOutcome {
        let request_id = req.request_id.unwrap_or_else(Uuid::new_v4);
        match with_timeout(
            "total_request",
            self.config.timeouts.total_request(),
            &cancel,
            self.run_pipeline(&req, request_id, &cancel),
        )
        .await
        {
            Ok(state) => OrchestrateOutcome::Completed {
                response: state.into_response(),
            },
            Err(e) => OrchestrateOutcome::Failed {
                error: ErrorBody {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                    request_id,
                },
            },
        }
    }

    async fn run_pipeline(
        &self,
        req: &OrchestrateRequest,
        request_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<PipelineState> {
        let mut state = PipelineState::new(request_id, req.query.clone(), req.agent_id);

        self.step_intent(&mut state, cancel)?;
        self.step_retrieve(&mut state, req, cancel).await?;
        self.step_plan(&mut state, cancel)?;
        self.step_tools_debate(&mut state, cancel).await?;
        self.step_compose(&mut state, cancel).await?;
        self.step_cite(&mut state, cancel)?;
        self.step_respond(&mut state, cancel).await?;

        Ok(state)
    }

    fn step_intent(&self, state: &mut PipelineState, cancel: &CancellationToken) -> Result<()> {
        check_cancel(cancel)?;
        let start = Instant::now();
        state.intent = Some(classify_intent(&state.query));
        state.trace.record("intent", start.elapsed());
        Ok(())
    }

    async fn step_retrieve(
        &self,
        state: &mut PipelineState,
        req: &OrchestrateRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancel(cancel)?;
        let start = Instant::now();

        let features = QueryFeatures::extract(&state.query);
        let mode = if self.config.features.adaptive_strategy {
            self.strategy.as_ref().map_or(SearchMode::Hybrid, |s| s.select(&features))
        } else {
            SearchMode::Hybrid
        };
        state.strategy = Some(mode);
        state.strategy_features = Some(features);

        let filter = if req.taxonomy_scope.is_empty() {
            None
        } else {
            match self.dag.paths_for(&req.taxonomy_scope, &req.taxonomy_version) {
                Ok(paths) if !paths.is_empty() => Some(TaxonomyFilter {
                    canonical_in: paths,
                    version: Some(req.taxonomy_version.clone()),
                }),
                Ok(_) => {
                    warn!(
                        version = %req.taxonomy_version,
                        "none of the agent's taxonomy_scope node ids resolved to a path, searching unscoped"
                    );
                    None
                }
                Err(e) => {
                    warn!(error = %e, version = %req.taxonomy_version, "failed to resolve taxonomy scope, searching unscoped");
                    None
                }
            }
        };

        let search_req = SearchRequest {
            query: state.query.clone(),
            top_k: self.config.retrieval_top_k_default,
            filter,
            mode,
            weights: RetrievalWeights::default(),
            fetch_size: 50,
        };

        // The retrieval engine's own DAO calls aren't individually
        // timed; bound the whole step by the sum of its two suspension
        // points (bm25_query + vector_query timeouts).
        let combined = self.config.timeouts.bm25_query() + self.config.timeouts.vector_query();
        let result: SearchResult =
            with_timeout("retrieve", combined, cancel, self.retrieval.search(&search_req)).await?;

        if let Some(degraded) = result.degraded {
            for step in degraded.steps {
                state.degrade(&step);
            }
        }
        state.evidence = result.hits;
        state.retrieve_latency_ms = result.latency_ms;
        state.trace.record("retrieve", start.elapsed());
        Ok(())
    }

    fn step_plan(&self, state: &mut PipelineState, cancel: &CancellationToken) -> Result<()> {
        check_cancel(cancel)?;
        let start = Instant::now();
        if self.config.features.meta_plan {
            state.planned_tools = plan_tool_calls(&state.query);
        }
        state.trace.record("plan", start.elapsed());
        Ok(())
    }

    async fn step_tools_debate(&self, state: &mut PipelineState, cancel: &CancellationToken) -> Result<()> {
        check_cancel(cancel)?;
        let start = Instant::now();

        if self.config.features.tools {
            if let Some(registry) = &self.tools {
                for tool_name in state.planned_tools.clone() {
                    let outcome = with_timeout(
                        "tools_debate.tool",
                        self.config.timeouts.tool(),
                        cancel,
                        registry.invoke(&tool_name, json!({})),
                    )
                    .await;
                    match outcome {
                        Ok(outcome) => state.tool_outcomes.push(outcome),
                        Err(e) => {
                            warn!(tool = %tool_name, error = %e, "tool invocation did not complete");
                            state.degrade("tools_debate.tool_error");
                        }
                    }
                }
            }
        }

        if matches!(state.intent, Some(Intent::Answer)) && self.config.features.debate {
            if let Some(engine) = &self.debate {
                let input = DebateInput {
                    query: &state.query,
                    evidence: &state.evidence,
                    rounds: 1,
                };
                let result = with_timeout(
                    "tools_debate.debate",
                    self.config.timeouts.llm_compose(),
                    cancel,
                    engine.run(&input),
                )
                .await;
                match result {
                    Ok(outcome) => {
                        if outcome.fell_back {
                            state.degrade("tools_debate.debate_fallback");
                        }
                        state.answer.clone_from(&outcome.answer);
                        state.debate = Some(outcome);
                    }
                    Err(e) => {
                        warn!(error = %e, "debate step did not complete, compose will run single-shot");
                        state.degrade("tools_debate.debate_error");
                    }
                }
            }
        }

        state.trace.record("tools_debate", start.elapsed());
        Ok(())
    }

    async fn step_compose(&self, state: &mut PipelineState, cancel: &CancellationToken) -> Result<()> {
        check_cancel(cancel)?;
        let start = Instant::now();

        if state.answer.is_empty() {
            let result = with_timeout(
                "compose",
                self.config.timeouts.llm_compose(),
                cancel,
                compose_answer(self.llm.as_ref(), &state.query, &state.evidence),
            )
            .await;
            match result {
                Ok(answer) => state.answer = answer,
                Err(e) => {
                    warn!(error = %e, "compose call did not complete, falling back to a bare evidence summary");
                    state.degrade("compose.fallback");
                    state.answer = fallback_answer(&state.evidence);
                }
            }
        }

        state.trace.record("compose", start.elapsed());
        Ok(())
    }

    fn step_cite(&self, state: &mut PipelineState, cancel: &CancellationToken) -> Result<()> {
        check_cancel(cancel)?;
        let start = Instant::now();

        let result = validate_citations(&state.answer, &state.evidence);
        state.answer = result.answer;
        state.citations = result.citations;
        if result.degraded {
            state.degrade("cite.unverified_claims");
        }

        state.trace.record("cite", start.elapsed());
        Ok(())
    }

    async fn step_respond(&self, state: &mut PipelineState, cancel: &CancellationToken) -> Result<()> {
        check_cancel(cancel)?;
        let start = Instant::now();

        state.quality = Some(estimate_quality(state));

        if let (Some(selector), Some(features)) = (&self.strategy, state.strategy_features.clone()) {
            if self.config.features.adaptive_strategy {
                let reward = combined_reward(
                    state.quality.unwrap_or(0.0),
                    state.retrieve_latency_ms,
                    self.config.timeouts.total_request,
                );
                selector.update(&features, state.strategy.unwrap_or(SearchMode::Hybrid), reward);
            }
        }

        self.persist(state).await;

        state.trace.record("respond", start.elapsed());
        Ok(())
    }

    /// Write the execution log and, if this answer is good enough and no
    /// identical case already exists, persist it to the case bank.
    /// Inserting the case and inserting the execution log are meant to
    /// be one transaction, so both writes are issued from this one
    /// method for a concrete DAO to wrap accordingly.
    /// Persistence failures are logged, not propagated: the response the
    /// pipeline already computed must still reach the caller.
    async fn persist(&self, state: &PipelineState) {
        let log = ExecutionLog {
            log_id: 0,
            case_id: None,
            success: state.quality.unwrap_or(0.0) > 0.0,
            error_type: None,
            error_message: None,
            execution_time_ms: i64::try_from(state.trace.steps.iter().map(|s| s.elapsed_ms).sum::<u64>())
                .unwrap_or(i64::MAX),
            context: json!({
                "request_id": state.request_id,
                "intent": state.intent,
                "degraded_steps": state.degraded_steps,
            }),
            created_at: chrono::Utc::now(),
        };
        if let Err(e) = self.execution_log.insert(log).await {
            warn!(error = %e, "failed to persist execution log");
        }

        let quality = state.quality.unwrap_or(0.0);
        if quality < self.config.persist_threshold {
            return;
        }

        let query_vector = match self.embeddings.embed(&state.query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "failed to embed query for case bank persistence, skipping");
                return;
            }
        };

        match self.case_bank.find_identical(&state.query, &query_vector).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let sources: Vec<ChunkReference> = state
                    .evidence
                    .iter()
                    .filter_map(|hit| {
                        hit.citations.first().map(|c| ChunkReference {
                            chunk_id: hit.chunk_id,
                            doc_id: hit.doc_id,
                            path: c.path.clone(),
                            confidence: c.confidence,
                        })
                    })
                    .collect();
                let entry = CaseBankEntry {
                    case_id: Uuid::new_v4(),
                    query: state.query.clone(),
                    answer: state.answer.clone(),
                    sources,
                    query_vector: Some(query_vector),
                    quality: Some(quality),
                    usage_count: 0,
                    last_used_at: Some(chrono::Utc::now()),
                    status: CaseStatus::Active,
                    version: 1,
                    updated_at: chrono::Utc::now(),
                    updated_by: Some("orchestrator".to_string()),
                };
                if let Err(e) = self.case_bank.insert(entry).await {
                    warn!(error = %e, "failed to persist new case bank entry");
                }
            }
            Err(e) => warn!(error = %e, "failed to check for an identical case"),
        }
    }

    /// The `search()` wire entry point : a thin pass-through to
    /// the retrieval engine for callers that don't need the full
    /// compose/cite/respond pipeline.
    ///
    /// # Errors
    /// Propagates the retrieval engine's own errors (in practice it
    /// degrades rather than erroring; see [`HybridRetrievalEngine::search`]).
    pub async fn search(&self, req: SearchRequest) -> Result<SearchResult> {
        self.retrieval.search(&req).await
    }

    /// The `create_agent()` wire entry point : computes the
    /// starting coverage snapshot for a freshly provisioned agent scope.
    ///
    /// # Errors
    /// Propagates DAO/DAG lookup failures from the coverage meter.
    pub async fn create_agent(&self, req: CreateAgentRequest) -> Result<CreateAgentResponse> {
        let agent_id = Uuid::new_v4();
        let coverage = self
            .coverage
            .calculate_coverage(agent_id, &req.taxonomy_node_ids, &req.taxonomy_version)
            .await?;
        Ok(CreateAgentResponse {
            agent_id,
            name: req.name,
            coverage,
        })
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(CoreError::Cancelled)
    } else {
        Ok(())
    }
}

fn fallback_answer(evidence: &[taxorag_retrieval::SearchHit]) -> String {
    evidence.first().map_or_else(
        || "No answer could be composed and no evidence was retrieved.".to_string(),
        |hit| hit.text.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use std::collections::HashMap;
    use taxorag_casebank::{CaseBankDao, CasePatch, ListOrder};
    use taxorag_config::{Environment, FeatureFlags};
    use taxorag_core::dag::TaxonomyDagManager;
    use taxorag_core::entities::ArchiveReason;
    use taxorag_coverage::{CoverageCountsDao, TargetCountsDao};
    use taxorag_embed::local::PlaceholderLocalModel;
    use taxorag_retrieval::dao::{DocTaxonomyDao, LexicalSearchDao, VectorSearchDao};
    use taxorag_retrieval::RawCandidate;

    mock! {
        Lexical {}
        #[async_trait]
        impl LexicalSearchDao for Lexical {
            async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawCandidate>>;
        }
    }
    mock! {
        Vector {}
        #[async_trait]
        impl VectorSearchDao for Vector {
            async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<RawCandidate>>;
        }
    }
    mock! {
        DocTax {}
        #[async_trait]
        impl DocTaxonomyDao for DocTax {
            async fn classifications_for(&self, doc_id: Uuid, version: &str) -> Result<Vec<taxorag_core::entities::DocTaxonomy>>;
        }
    }
    mock! {
        CaseBankStore {}
        #[async_trait]
        impl CaseBankDao for CaseBankStore {
            async fn get(&self, case_id: Uuid) -> Result<Option<CaseBankEntry>>;
            async fn find_similar(&self, query_vector: &[f32], top_n: usize, min_quality: f32) -> Result<Vec<CaseBankEntry>>;
            async fn insert(&self, entry: CaseBankEntry) -> Result<()>;
            async fn update(&self, case_id: Uuid, patch: CasePatch) -> Result<()>;
            async fn soft_archive(&self, case_id: Uuid, reason: ArchiveReason) -> Result<()>;
            async fn list(&self, status: CaseStatus, limit: usize, order: ListOrder) -> Result<Vec<CaseBankEntry>>;
        }
    }
    mock! {
        ExecLog {}
        #[async_trait]
        impl ExecutionLogDao for ExecLog {
            async fn last_n_for_case(&self, case_id: Uuid, n: usize) -> Result<Vec<ExecutionLog>>;
            async fn insert(&self, log: ExecutionLog) -> Result<()>;
        }
    }

    struct EchoLlm;
    #[async_trait]
    impl LlmClient for EchoLlm {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
            Ok(format!("answer based on: {prompt}"))
        }
    }

    fn build_orchestrator() -> PipelineOrchestrator {
        let mut lexical = MockLexical::new();
        lexical.expect_search().returning(|_, _| {
            Ok(vec![RawCandidate {
                chunk_id: Uuid::new_v4(),
                doc_id: Uuid::new_v4(),
                text: "gradient descent minimizes loss by iterating over batches".into(),
                raw_score: 1.0,
            }])
        });
        let mut vector = MockVector::new();
        vector.expect_search().returning(|_, _| Ok(Vec::new()));
        let mut doc_tax = MockDocTax::new();
        doc_tax.expect_classifications_for().returning(|_, _| Ok(Vec::new()));

        let embeddings = Arc::new(EmbeddingService::new(
            None,
            Arc::new(PlaceholderLocalModel::default()),
            10,
            Environment::Testing,
        ));
        let dag = Arc::new(TaxonomyDagManager::new());
        let retrieval = Arc::new(HybridRetrievalEngine::new(
            Arc::new(lexical),
            Arc::new(vector),
            Arc::new(doc_tax),
            Arc::clone(&embeddings),
            Arc::clone(&dag),
            None,
        ));

        struct NoCounts;
        #[async_trait]
        impl CoverageCountsDao for NoCounts {
            async fn counts_for(
                &self,
                _node_ids: &[Uuid],
                _version: &str,
                _confidence_threshold: f32,
            ) -> Result<HashMap<Uuid, i64>> {
                Ok(HashMap::new())
            }
        }
        struct NoTargets;
        #[async_trait]
        impl TargetCountsDao for NoTargets {
            async fn targets_for(&self, _node_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
                Ok(HashMap::new())
            }
        }
        let coverage = Arc::new(CoverageMeter::new(Arc::clone(&dag), Arc::new(NoCounts), Arc::new(NoTargets)));

        let mut case_dao = MockCaseBankStore::new();
        case_dao.expect_find_similar().returning(|_, _, _| Ok(Vec::new()));
        case_dao.expect_insert().returning(|_| Ok(()));
        let case_bank = Arc::new(CaseBank::new(Arc::new(case_dao)));

        let mut exec_log = MockExecLog::new();
        exec_log.expect_insert().returning(|_| Ok(()));

        let mut config = AppConfig {
            environment: Environment::Testing,
            database_url: "postgres://localhost/test".into(),
            embedding_api_key: None,
            features: FeatureFlags::default(),
            embed_cache_max: 10,
            retrieval_top_k_default: 5,
            hitl_confidence_threshold: 0.7,
            consolidation: taxorag_config::ConsolidationConfig::default(),
            timeouts: taxorag_config::TimeoutsMs::default(),
            resources: taxorag_config::ResourceLimits::default(),
            persist_threshold: 0.75,
        };
        config.timeouts.total_request = 5_000;

        PipelineOrchestrator::new(
            Arc::new(config),
            embeddings,
            retrieval,
            coverage,
            dag,
            None,
            None,
            None,
            Arc::new(EchoLlm),
            case_bank,
            Arc::new(exec_log),
        )
    }

    #[tokio::test]
    async fn happy_path_produces_a_completed_response_with_citations() {
        let orchestrator = build_orchestrator();
        let req = OrchestrateRequest {
            request_id: None,
            query: "what is gradient descent".into(),
            agent_id: Uuid::new_v4(),
            taxonomy_scope: Vec::new(),
            taxonomy_version: "v1".into(),
        };
        match orchestrator.orchestrate(req, CancellationToken::new()).await {
            OrchestrateOutcome::Completed { response } => {
                assert!(!response.answer.is_empty());
                assert!(response.quality.unwrap() > 0.0);
                assert_eq!(response.trace.steps.len(), 7);
            }
            OrchestrateOutcome::Failed { error } => panic!("expected success, got {error:?}"),
        }
    }

    #[tokio::test]
    async fn retrieve_step_resolves_agent_taxonomy_scope_into_a_filter() {
        let ai = Uuid::new_v4();
        let in_scope_doc = Uuid::new_v4();
        let out_of_scope_doc = Uuid::new_v4();

        let mut lexical = MockLexical::new();
        lexical.expect_search().returning(move |_, _| {
            Ok(vec![
                RawCandidate {
                    chunk_id: Uuid::new_v4(),
                    doc_id: in_scope_doc,
                    text: "gradient descent minimizes loss over AI training runs".into(),
                    raw_score: 1.0,
                },
                RawCandidate {
                    chunk_id: Uuid::new_v4(),
                    doc_id: out_of_scope_doc,
                    text: "unrelated gardening tips".into(),
                    raw_score: 2.0,
                },
            ])
        });
        let mut vector = MockVector::new();
        vector.expect_search().returning(|_, _| Ok(Vec::new()));
        let mut doc_tax = MockDocTax::new();
        doc_tax.expect_classifications_for().returning(move |doc_id, _version| {
            let path = if doc_id == in_scope_doc {
                vec!["AI".to_string()]
            } else {
                vec!["Gardening".to_string()]
            };
            Ok(vec![taxorag_core::entities::DocTaxonomy {
                doc_id,
                node_id: Uuid::new_v4(),
                version: "v1".into(),
                path,
                confidence: 0.9,
                hitl_required: false,
                created_at: chrono::Utc::now(),
            }])
        });

        let embeddings = Arc::new(EmbeddingService::new(
            None,
            Arc::new(PlaceholderLocalModel::default()),
            10,
            Environment::Testing,
        ));
        let dag = Arc::new(TaxonomyDagManager::new());
        dag.load_version(
            "v1",
            vec![taxorag_core::entities::TaxonomyNode {
                node_id: ai,
                label: "AI".into(),
                canonical_path: vec!["AI".into()],
                version: "v1".into(),
                confidence: 1.0,
                parent_id: None,
            }],
        )
        .unwrap();
        let retrieval = Arc::new(HybridRetrievalEngine::new(
            Arc::new(lexical),
            Arc::new(vector),
            Arc::new(doc_tax),
            Arc::clone(&embeddings),
            Arc::clone(&dag),
            None,
        ));

        struct NoCounts3;
        #[async_trait]
        impl CoverageCountsDao for NoCounts3 {
            async fn counts_for(
                &self,
                _node_ids: &[Uuid],
                _version: &str,
                _confidence_threshold: f32,
            ) -> Result<HashMap<Uuid, i64>> {
                Ok(HashMap::new())
            }
        }
        struct NoTargets3;
        #[async_trait]
        impl TargetCountsDao for NoTargets3 {
            async fn targets_for(&self, _node_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
                Ok(HashMap::new())
            }
        }
        let coverage = Arc::new(CoverageMeter::new(Arc::clone(&dag), Arc::new(NoCounts3), Arc::new(NoTargets3)));

        let mut case_dao = MockCaseBankStore::new();
        case_dao.expect_find_similar().returning(|_, _, _| Ok(Vec::new()));
        case_dao.expect_insert().returning(|_| Ok(()));
        let case_bank = Arc::new(CaseBank::new(Arc::new(case_dao)));

        let mut exec_log = MockExecLog::new();
        exec_log.expect_insert().returning(|_| Ok(()));

        let mut config = AppConfig {
            environment: Environment::Testing,
            database_url: "postgres://localhost/test".into(),
            embedding_api_key: None,
            features: FeatureFlags::default(),
            embed_cache_max: 10,
            retrieval_top_k_default: 5,
            hitl_confidence_threshold: 0.7,
            consolidation: taxorag_config::ConsolidationConfig::default(),
            timeouts: taxorag_config::TimeoutsMs::default(),
            resources: taxorag_config::ResourceLimits::default(),
            persist_threshold: 0.75,
        };
        config.timeouts.total_request = 5_000;

        let orchestrator = PipelineOrchestrator::new(
            Arc::new(config),
            embeddings,
            retrieval,
            coverage,
            dag,
            None,
            None,
            None,
            Arc::new(EchoLlm),
            case_bank,
            Arc::new(exec_log),
        );

        let req = OrchestrateRequest {
            request_id: None,
            query: "what is gradient descent".into(),
            agent_id: Uuid::new_v4(),
            taxonomy_scope: vec![ai],
            taxonomy_version: "v1".into(),
        };
        match orchestrator.orchestrate(req, CancellationToken::new()).await {
            OrchestrateOutcome::Completed { response } => {
                assert!(response.citations.iter().all(|c| c.doc_id != out_of_scope_doc));
                assert!(response.citations.iter().any(|c| c.doc_id == in_scope_doc));
            }
            OrchestrateOutcome::Failed { error } => panic!("expected success, got {error:?}"),
        }
    }

    #[tokio::test]
    async fn pre_cancelled_token_fails_fast_with_cancelled_kind() {
        let orchestrator = build_orchestrator();
        let req = OrchestrateRequest {
            request_id: None,
            query: "what is gradient descent".into(),
            agent_id: Uuid::new_v4(),
            taxonomy_scope: Vec::new(),
            taxonomy_version: "v1".into(),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        match orchestrator.orchestrate(req, cancel).await {
            OrchestrateOutcome::Failed { error } => assert_eq!(error.kind, "cancelled"),
            OrchestrateOutcome::Completed { .. } => panic!("expected cancellation to win"),
        }
    }

    #[tokio::test]
    async fn create_agent_reports_full_coverage_for_an_empty_scope() {
        let orchestrator = build_orchestrator();
        let response = orchestrator
            .create_agent(CreateAgentRequest {
                name: "new-agent".into(),
                taxonomy_node_ids: Vec::new(),
                taxonomy_version: "v1".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.coverage.overall, 100.0);
    }
}
