use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use quorum_cache::ResultCache;
use quorum_models::config::{CacheConfig, OrchestratorConfig};
use quorum_models::{
    AgentType, AnalysisResult, MarketContext, OrchestrationResult, TaskId, TaskStatus,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agent::AnalysisAgent;
use crate::assessment::{assess_risk, execution_priority, synthesize_reasoning};
use crate::consensus::ConsensusEngine;
use crate::error::{AgentError, OrchestratorError};
use crate::provider::{MarketContextProvider, NewsProvider};
use crate::queue::TaskQueue;

const RESULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle of a single analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Running,
    Aggregating,
    Cached,
    Returned,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Pending => "pending",
            RequestState::Running => "running",
            RequestState::Aggregating => "aggregating",
            RequestState::Cached => "cached",
            RequestState::Returned => "returned",
        };
        f.write_str(s)
    }
}

#[derive(Clone)]
pub struct RegisteredAgent {
    pub agent: Arc<dyn AnalysisAgent>,
    pub timeout: Duration,
}

/// Builder for an [`Orchestrator`]. Agents are registered explicitly by type.
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    context_provider: Arc<dyn MarketContextProvider>,
    news_provider: Option<Arc<dyn NewsProvider>>,
    cache: Option<Arc<ResultCache>>,
    agents: BTreeMap<AgentType, RegisteredAgent>,
}

impl OrchestratorBuilder {
    /// Register an agent with the configured default timeout.
    pub fn register(self, agent_type: AgentType, agent: Arc<dyn AnalysisAgent>) -> Self {
        let timeout = Duration::from_millis(self.config.agent_timeout_ms);
        self.register_with_timeout(agent_type, agent, timeout)
    }

    pub fn register_with_timeout(
        mut self,
        agent_type: AgentType,
        agent: Arc<dyn AnalysisAgent>,
        timeout: Duration,
    ) -> Self {
        if let Some(previous) = self
            .agents
            .insert(agent_type, RegisteredAgent { agent, timeout })
        {
            warn!(
                agent_type = %agent_type,
                replaced = %previous.agent.name(),
                "Agent type registered twice; keeping the latest"
            );
        }
        self
    }

    pub fn news_provider(mut self, provider: Arc<dyn NewsProvider>) -> Self {
        self.news_provider = Some(provider);
        self
    }

    /// Use a shared cache instead of one built from `CacheConfig::default()`.
    pub fn cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Orchestrator {
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(ResultCache::from_config(&CacheConfig::default())));
        let queue = Arc::new(TaskQueue::new(
            self.config.task_queue_capacity,
            self.config.max_completed_results,
        ));
        let consensus =
            ConsensusEngine::new(self.config.strategy, self.config.agent_weights.clone());

        Orchestrator {
            pipeline: Arc::new(Pipeline {
                agents: self.agents,
                context_provider: self.context_provider,
                news_provider: self.news_provider,
                consensus,
                cache,
                queue,
                config: self.config,
            }),
            shutdown: Mutex::new(CancellationToken::new()),
            workers: Mutex::new(None),
        }
    }
}

/// Everything a request needs, shared between the caller path and the workers.
struct Pipeline {
    agents: BTreeMap<AgentType, RegisteredAgent>,
    context_provider: Arc<dyn MarketContextProvider>,
    news_provider: Option<Arc<dyn NewsProvider>>,
    consensus: ConsensusEngine,
    cache: Arc<ResultCache>,
    queue: Arc<TaskQueue>,
    config: OrchestratorConfig,
}

impl Pipeline {
    /// Cached result if fresh, otherwise a new analysis. `None` when shutdown
    /// interrupted the analysis.
    async fn resolve(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Option<Arc<OrchestrationResult>> {
        if let Some(cached) = self.cache.get(symbol).await {
            debug!(symbol, state = %RequestState::Returned, "Served from cache");
            return Some(cached);
        }
        self.analyze(symbol, cancel).await
    }

    async fn analyze(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> Option<Arc<OrchestrationResult>> {
        let start = Instant::now();
        info!(symbol, state = %RequestState::Pending, agents = self.agents.len(), "Starting analysis");

        // 1. Build the shared context
        let context = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(symbol, "Analysis discarded by shutdown");
                return None;
            }
            built = self.build_context(symbol) => built,
        };
        let context = match context {
            Ok(context) => Arc::new(context),
            Err(e) => {
                warn!(symbol, error = %e, "Context unavailable, returning fallback");
                let reason = e.to_string();
                return Some(Arc::new(self.fallback(symbol, &reason, &BTreeMap::new(), start)));
            }
        };

        // 2. Fan-out to agents, each racing its own deadline and shutdown
        debug!(symbol, state = %RequestState::Running, "Fanning out to agents");
        let mut join_set = JoinSet::new();
        for (agent_type, registered) in &self.agents {
            let agent_type = *agent_type;
            let agent = Arc::clone(&registered.agent);
            let timeout = registered.timeout;
            let context = Arc::clone(&context);
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let agent_start = Instant::now();
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(AgentError::Cancelled),
                    result = tokio::time::timeout(timeout, agent.analyze(&context)) => match result {
                        Ok(result) => result,
                        Err(_) => Err(AgentError::Timeout(timeout.as_millis() as u64)),
                    },
                };
                (
                    agent_type,
                    agent.name().to_string(),
                    outcome,
                    agent_start.elapsed(),
                )
            });
        }

        // 3. Collect whatever finished in time (graceful degradation)
        let mut results: BTreeMap<AgentType, AnalysisResult> = BTreeMap::new();
        let mut abstentions: BTreeMap<AgentType, String> = BTreeMap::new();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((agent_type, name, Ok(result), elapsed)) => {
                    if let Err(e) = validate(agent_type, &result) {
                        warn!(agent = %name, agent_type = %agent_type, error = %e, "Agent output rejected");
                        abstentions.insert(agent_type, e.to_string());
                        continue;
                    }
                    info!(
                        agent = %name,
                        agent_type = %agent_type,
                        recommendation = %result.recommendation,
                        confidence = result.confidence,
                        elapsed_ms = elapsed.as_millis(),
                        "Agent succeeded"
                    );
                    results.insert(agent_type, result);
                }
                Ok((agent_type, name, Err(e), elapsed)) => {
                    warn!(agent = %name, agent_type = %agent_type, error = %e, elapsed_ms = elapsed.as_millis(), "Agent abstained");
                    abstentions.insert(agent_type, e.to_string());
                }
                Err(e) => {
                    error!(symbol, error = %e, "Agent task panicked");
                }
            }
        }

        if cancel.is_cancelled() {
            info!(symbol, "Analysis discarded by shutdown");
            return None;
        }

        for agent_type in self.agents.keys() {
            if !results.contains_key(agent_type) && !abstentions.contains_key(agent_type) {
                abstentions.insert(*agent_type, AgentError::Panicked.to_string());
            }
        }

        if results.is_empty() {
            let reason = if self.agents.is_empty() {
                "no agents registered".to_string()
            } else {
                format!("all {} agents failed or timed out", self.agents.len())
            };
            warn!(symbol, %reason, "No agent results, returning fallback");
            return Some(Arc::new(self.fallback(symbol, &reason, &abstentions, start)));
        }

        // 4. Aggregate
        debug!(symbol, state = %RequestState::Aggregating, participants = results.len(), "Aggregating");
        let strategy = self.consensus.strategy();
        let consensus = self.consensus.decide(&results);
        let risk_assessment = assess_risk(&results);
        let reasoning = synthesize_reasoning(&results, &abstentions, &consensus, strategy);
        let execution_priority = execution_priority(&consensus, &risk_assessment);

        let result = Arc::new(OrchestrationResult {
            symbol: symbol.to_string(),
            decision: consensus.decision,
            confidence: consensus.confidence,
            reasoning,
            agent_results: results,
            consensus_score: consensus.consensus_score,
            risk_assessment,
            execution_priority,
            strategy,
            degraded: false,
            processing_time_ms: start.elapsed().as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });

        self.cache.put(symbol, Arc::clone(&result)).await;

        info!(
            symbol,
            state = %RequestState::Cached,
            decision = %result.decision,
            confidence = result.confidence,
            consensus = result.consensus_score,
            priority = result.execution_priority,
            elapsed_ms = start.elapsed().as_millis(),
            "Analysis complete"
        );

        Some(result)
    }

    async fn build_context(&self, symbol: &str) -> Result<MarketContext, OrchestratorError> {
        let mut context = self.context_provider.build_context(symbol).await?;

        if let Some(news) = &self.news_provider {
            match news.fetch_news(symbol).await {
                Ok(payload) => payload.merge_into(&mut context),
                Err(e) => warn!(symbol, error = %e, "News unavailable, continuing without it"),
            }
        }

        Ok(context)
    }

    /// Degraded result for a request that produced no agent input. Never cached.
    fn fallback(
        &self,
        symbol: &str,
        reason: &str,
        abstentions: &BTreeMap<AgentType, String>,
        start: Instant,
    ) -> OrchestrationResult {
        let mut result = OrchestrationResult::fallback(
            symbol,
            self.consensus.strategy(),
            reason,
            start.elapsed().as_millis() as u64,
        );
        for (agent_type, why) in abstentions {
            result
                .reasoning
                .push_str(&format!("\n{agent_type}: abstained ({why})"));
        }
        result
    }
}

fn validate(expected: AgentType, result: &AnalysisResult) -> Result<(), AgentError> {
    if result.agent_type != expected {
        return Err(AgentError::InvalidOutput(format!(
            "registered as {expected} but reported {}",
            result.agent_type
        )));
    }
    if !result.is_valid() {
        return Err(AgentError::InvalidOutput(format!(
            "confidence {} outside 0..=1",
            result.confidence
        )));
    }
    Ok(())
}

async fn worker_loop(worker_id: usize, pipeline: Arc<Pipeline>, cancel: CancellationToken) {
    info!(worker = worker_id, "Worker started");
    let poll = Duration::from_millis(pipeline.config.dequeue_timeout_ms);

    while !cancel.is_cancelled() {
        let Some(task) = pipeline.queue.dequeue(poll, &cancel).await else {
            continue;
        };
        debug!(worker = worker_id, task_id = %task.id, symbol = %task.symbol, "Task dequeued");

        match pipeline.resolve(&task.symbol, &cancel).await {
            Some(result) => pipeline.queue.complete(task.id, result),
            None => pipeline.queue.abandon(task.id),
        }
    }

    info!(worker = worker_id, "Worker stopped");
}

/// Coordinates registered agents, the task queue and the result cache.
///
/// Requests can be served inline with [`Orchestrator::request_sync`] or queued
/// with [`Orchestrator::request_async`] for the worker pool started by
/// [`Orchestrator::start`].
pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    /// Cancelled by `stop`; replaced by the next `start`.
    shutdown: Mutex<CancellationToken>,
    workers: Mutex<Option<JoinSet<()>>>,
}

impl Orchestrator {
    pub fn builder(
        config: OrchestratorConfig,
        context_provider: Arc<dyn MarketContextProvider>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            context_provider,
            news_provider: None,
            cache: None,
            agents: BTreeMap::new(),
        }
    }

    fn shutdown_token(&self) -> MutexGuard<'_, CancellationToken> {
        self.shutdown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn worker_set(&self) -> MutexGuard<'_, Option<JoinSet<()>>> {
        self.workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn `worker_count` workers. Must be called from within a tokio runtime.
    pub fn start(&self, worker_count: usize) -> Result<(), OrchestratorError> {
        let mut workers = self.worker_set();
        if workers.is_some() {
            return Err(OrchestratorError::AlreadyRunning);
        }

        let cancel = {
            let mut token = self.shutdown_token();
            if token.is_cancelled() {
                *token = CancellationToken::new();
            }
            token.clone()
        };

        let mut join_set = JoinSet::new();
        for worker_id in 0..worker_count {
            join_set.spawn(worker_loop(
                worker_id,
                Arc::clone(&self.pipeline),
                cancel.clone(),
            ));
        }
        *workers = Some(join_set);

        info!(workers = worker_count, "Worker pool started");
        Ok(())
    }

    /// Start the pool with `worker_count` from the configuration.
    pub fn start_default(&self) -> Result<(), OrchestratorError> {
        self.start(self.pipeline.config.worker_count)
    }

    /// Cancel running agent calls and blocked dequeues, then wait for workers
    /// to exit. Workers still running after the grace period are aborted.
    pub async fn stop(&self) {
        self.shutdown_token().cancel();

        let workers = self.worker_set().take();
        let Some(mut join_set) = workers else {
            return;
        };

        let grace = Duration::from_millis(self.pipeline.config.shutdown_grace_ms);
        let drained = tokio::time::timeout(grace, async {
            while join_set.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = join_set.len(),
                "Workers did not exit within grace period, aborting"
            );
            join_set.abort_all();
            while join_set.join_next().await.is_some() {}
        }

        info!("Worker pool stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker_set().is_some()
    }

    /// Queue an analysis for the worker pool.
    ///
    /// A fresh cached result yields an already-completed task. Fails with
    /// `QueueFull` when the queue is at capacity.
    pub async fn request_async(
        &self,
        symbol: &str,
        priority: i32,
    ) -> Result<TaskId, OrchestratorError> {
        if let Some(cached) = self.pipeline.cache.get(symbol).await {
            let id = self.pipeline.queue.complete_immediately(cached);
            debug!(symbol, task_id = %id, "Cache hit, task pre-resolved");
            return Ok(id);
        }

        self.pipeline.queue.enqueue(symbol, priority)
    }

    /// Analyze inline on the caller's task, sharing the pool's cache.
    ///
    /// Always returns a result; failures surface as a degraded fallback.
    pub async fn request_sync(&self, symbol: &str) -> Arc<OrchestrationResult> {
        let cancel = self.shutdown_token().clone();
        match self.pipeline.resolve(symbol, &cancel).await {
            Some(result) => result,
            None => Arc::new(self.pipeline.fallback(
                symbol,
                "orchestrator shutting down",
                &BTreeMap::new(),
                Instant::now(),
            )),
        }
    }

    pub fn get_result(&self, task_id: TaskId) -> Option<Arc<OrchestrationResult>> {
        self.pipeline.queue.get_result(task_id)
    }

    /// Remove a completed result. Subsequent lookups for the task return `None`.
    pub fn take_result(&self, task_id: TaskId) -> Option<Arc<OrchestrationResult>> {
        self.pipeline.queue.take_result(task_id)
    }

    pub fn task_status(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.pipeline.queue.status(task_id)
    }

    /// Poll for a task's result until it completes, disappears, or `timeout` passes.
    pub async fn wait_for_result(
        &self,
        task_id: TaskId,
        timeout: Duration,
    ) -> Option<Arc<OrchestrationResult>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(result) = self.get_result(task_id) {
                return Some(result);
            }
            if self.task_status(task_id).is_none() || Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(RESULT_POLL_INTERVAL).await;
        }
    }

    pub fn registered_agents(&self) -> Vec<AgentType> {
        self.pipeline.agents.keys().copied().collect()
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.pipeline.cache
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.pipeline.queue
    }

    pub fn consensus(&self) -> &ConsensusEngine {
        &self.pipeline.consensus
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.pipeline.config
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        // Dropping the JoinSet aborts the workers; cancel first so in-flight
        // agent calls observe shutdown too.
        self.shutdown_token().cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticContextProvider;
    use crate::test_support::{FailingContextProvider, ScriptedAgent};
    use quorum_models::{Action, ConsensusStrategy, RiskLevel};
    use rust_decimal_macros::dec;

    fn provider() -> Arc<StaticContextProvider> {
        Arc::new(StaticContextProvider::new(vec![
            MarketContext::new("AAPL", dec!(190.00)),
            MarketContext::new("MSFT", dec!(410.00)),
        ]))
    }

    #[test]
    fn validate_rejects_mismatched_type_and_bad_confidence() {
        let ok = AnalysisResult::new(AgentType::Risk, Action::Hold, 0.5, "");
        assert!(validate(AgentType::Risk, &ok).is_ok());
        assert!(matches!(
            validate(AgentType::Technical, &ok),
            Err(AgentError::InvalidOutput(_))
        ));

        let bad = AnalysisResult::new(AgentType::Risk, Action::Hold, 1.5, "");
        assert!(matches!(
            validate(AgentType::Risk, &bad),
            Err(AgentError::InvalidOutput(_))
        ));
    }

    #[tokio::test]
    async fn builder_registers_agents_in_type_order() {
        let orchestrator = Orchestrator::builder(OrchestratorConfig::default(), provider())
            .register(
                AgentType::Risk,
                Arc::new(ScriptedAgent::new(AgentType::Risk, Action::Hold, 0.5)),
            )
            .register(
                AgentType::Technical,
                Arc::new(ScriptedAgent::new(AgentType::Technical, Action::Buy, 0.5)),
            )
            .build();

        assert_eq!(
            orchestrator.registered_agents(),
            vec![AgentType::Technical, AgentType::Risk]
        );
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_latest() {
        let first = Arc::new(ScriptedAgent::new(AgentType::Technical, Action::Sell, 0.9));
        let second = Arc::new(ScriptedAgent::new(AgentType::Technical, Action::Buy, 0.8));
        let orchestrator = Orchestrator::builder(OrchestratorConfig::default(), provider())
            .register(AgentType::Technical, first.clone())
            .register(AgentType::Technical, second.clone())
            .build();

        let result = orchestrator.request_sync("AAPL").await;
        assert_eq!(result.decision, Action::Buy);
        assert_eq!(first.calls(), 0);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn sync_request_aggregates_and_caches() {
        let technical = Arc::new(ScriptedAgent::new(AgentType::Technical, Action::Buy, 0.8));
        let sentiment = Arc::new(ScriptedAgent::new(AgentType::Sentiment, Action::Buy, 0.7));
        let orchestrator = Orchestrator::builder(OrchestratorConfig::default(), provider())
            .register(AgentType::Technical, technical.clone())
            .register(AgentType::Sentiment, sentiment.clone())
            .build();

        let result = orchestrator.request_sync("AAPL").await;
        assert_eq!(result.symbol, "AAPL");
        assert_eq!(result.decision, Action::Buy);
        assert!(!result.degraded);
        assert_eq!(result.agent_results.len(), 2);
        assert_eq!(result.strategy, ConsensusStrategy::WeightedAverage);
        assert!(result.reasoning.contains("technical: BUY (0.80)"));
        assert!((1..=10).contains(&result.execution_priority));

        let again = orchestrator.request_sync("AAPL").await;
        assert!(Arc::ptr_eq(&result, &again));
        assert_eq!(technical.calls(), 1);
        assert_eq!(sentiment.calls(), 1);
    }

    #[tokio::test]
    async fn failed_agent_abstains() {
        let orchestrator = Orchestrator::builder(OrchestratorConfig::default(), provider())
            .register(
                AgentType::Technical,
                Arc::new(ScriptedAgent::new(AgentType::Technical, Action::Sell, 0.9)),
            )
            .register(
                AgentType::Fundamental,
                Arc::new(ScriptedAgent::failing(AgentType::Fundamental)),
            )
            .build();

        let result = orchestrator.request_sync("AAPL").await;
        assert_eq!(result.decision, Action::Sell);
        assert_eq!(result.agent_results.len(), 1);
        assert!(result.reasoning.contains("fundamental: abstained"));
    }

    #[tokio::test]
    async fn invalid_output_is_excluded() {
        let orchestrator = Orchestrator::builder(OrchestratorConfig::default(), provider())
            .register(
                AgentType::Technical,
                Arc::new(ScriptedAgent::new(AgentType::Technical, Action::Buy, 1.4)),
            )
            .register(
                AgentType::Sentiment,
                Arc::new(
                    ScriptedAgent::new(AgentType::Sentiment, Action::Buy, 0.9)
                        .reporting_as(AgentType::Macro),
                ),
            )
            .register(
                AgentType::Risk,
                Arc::new(ScriptedAgent::new(AgentType::Risk, Action::Hold, 0.6)),
            )
            .build();

        let result = orchestrator.request_sync("AAPL").await;
        assert_eq!(
            result.agent_results.keys().copied().collect::<Vec<_>>(),
            vec![AgentType::Risk]
        );
        assert_eq!(result.decision, Action::Hold);
    }

    #[tokio::test]
    async fn context_failure_returns_uncached_fallback() {
        let agent = Arc::new(ScriptedAgent::new(AgentType::Technical, Action::Buy, 0.9));
        let orchestrator = Orchestrator::builder(
            OrchestratorConfig::default(),
            Arc::new(FailingContextProvider),
        )
        .register(AgentType::Technical, agent.clone())
        .build();

        let result = orchestrator.request_sync("AAPL").await;
        assert!(result.degraded);
        assert_eq!(result.decision, Action::Hold);
        assert_eq!(result.confidence, 0.1);
        assert_eq!(result.execution_priority, 1);
        assert_eq!(result.risk_assessment.level, RiskLevel::Unknown);
        assert!(result.reasoning.contains("Market context unavailable"));
        assert_eq!(agent.calls(), 0);
        assert!(orchestrator.cache().get("AAPL").await.is_none());
    }

    #[tokio::test]
    async fn no_registered_agents_returns_fallback() {
        let orchestrator =
            Orchestrator::builder(OrchestratorConfig::default(), provider()).build();
        let result = orchestrator.request_sync("MSFT").await;
        assert!(result.degraded);
        assert!(result.reasoning.contains("no agents registered"));
    }

    #[tokio::test]
    async fn start_twice_is_rejected_and_stop_is_idempotent() {
        let orchestrator =
            Orchestrator::builder(OrchestratorConfig::default(), provider()).build();
        orchestrator.start(2).unwrap();
        assert!(orchestrator.is_running());
        assert_eq!(
            orchestrator.start(2).unwrap_err(),
            OrchestratorError::AlreadyRunning
        );

        orchestrator.stop().await;
        assert!(!orchestrator.is_running());
        orchestrator.stop().await;

        // The pool can be restarted after a stop.
        orchestrator.start(1).unwrap();
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn request_after_stop_returns_shutdown_fallback() {
        let orchestrator = Orchestrator::builder(OrchestratorConfig::default(), provider())
            .register(
                AgentType::Technical,
                Arc::new(ScriptedAgent::new(AgentType::Technical, Action::Buy, 0.9)),
            )
            .build();
        orchestrator.start(1).unwrap();
        orchestrator.stop().await;

        let result = orchestrator.request_sync("AAPL").await;
        assert!(result.degraded);
        assert!(result.reasoning.contains("shutting down"));
    }
}
