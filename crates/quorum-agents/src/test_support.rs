//! Test support: scripted agents and failing providers.
//!
//! `ScriptedAgent` returns a fixed opinion after an optional delay and counts
//! how often it was called and how often a call ran to completion, which lets
//! tests observe cache hits, timeouts and shutdown cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quorum_models::{Action, AgentType, AnalysisResult, MarketContext, NewsPayload};

use crate::agent::AnalysisAgent;
use crate::error::{AgentError, ProviderError};
use crate::provider::{MarketContextProvider, NewsProvider};

enum Script {
    Respond { action: Action, confidence: f64 },
    Fail(String),
}

pub struct ScriptedAgent {
    name: String,
    agent_type: AgentType,
    reported_type: AgentType,
    script: Script,
    delay: Duration,
    data: serde_json::Map<String, serde_json::Value>,
    calls: AtomicUsize,
    finished: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new(agent_type: AgentType, action: Action, confidence: f64) -> Self {
        Self {
            name: format!("scripted_{agent_type}"),
            agent_type,
            reported_type: agent_type,
            script: Script::Respond { action, confidence },
            delay: Duration::ZERO,
            data: serde_json::Map::new(),
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }

    pub fn failing(agent_type: AgentType) -> Self {
        let mut agent = Self::new(agent_type, Action::Hold, 0.0);
        agent.script = Script::Fail(format!("scripted {agent_type} failure"));
        agent
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Tag results with a different agent type than the one registered.
    pub fn reporting_as(mut self, agent_type: AgentType) -> Self {
        self.reported_type = agent_type;
        self
    }

    /// Number of times `analyze` was entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of calls that ran past the delay instead of being dropped.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisAgent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, context: &MarketContext) -> Result<AnalysisResult, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);

        match &self.script {
            Script::Respond { action, confidence } => {
                let mut result = AnalysisResult::new(
                    self.reported_type,
                    *action,
                    *confidence,
                    format!("Scripted {} view on {}", self.agent_type, context.symbol),
                );
                result.analysis_data = self.data.clone();
                Ok(result)
            }
            Script::Fail(message) => Err(AgentError::Failed(message.clone())),
        }
    }
}

/// A context provider whose upstream is always down.
pub struct FailingContextProvider;

#[async_trait]
impl MarketContextProvider for FailingContextProvider {
    async fn build_context(&self, symbol: &str) -> Result<MarketContext, ProviderError> {
        Err(ProviderError::Unavailable(format!(
            "market data feed offline for {symbol}"
        )))
    }
}

/// A news provider returning a fixed payload, or failing when `payload` is `None`.
pub struct StaticNewsProvider {
    pub payload: Option<NewsPayload>,
}

#[async_trait]
impl NewsProvider for StaticNewsProvider {
    async fn fetch_news(&self, symbol: &str) -> Result<NewsPayload, ProviderError> {
        self.payload
            .clone()
            .ok_or_else(|| ProviderError::Unavailable(format!("news feed offline for {symbol}")))
    }
}

/// An agent that echoes whether news reached its context.
pub struct NewsAwareAgent;

#[async_trait]
impl AnalysisAgent for NewsAwareAgent {
    fn name(&self) -> &str {
        "news_aware"
    }

    async fn analyze(&self, context: &MarketContext) -> Result<AnalysisResult, AgentError> {
        let (action, reasoning) = match &context.news {
            Some(news) => (Action::Buy, format!("news: {news}")),
            None => (Action::Hold, "no news".to_string()),
        };
        Ok(AnalysisResult::new(AgentType::Sentiment, action, 0.6, reasoning))
    }
}
