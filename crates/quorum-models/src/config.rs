use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::AgentType;

/// Top-level configuration for Quorum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuorumConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentConfig>,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            cache: CacheConfig::default(),
            agents: default_agents(),
        }
    }
}

/// How agent opinions are combined into one decision.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStrategy {
    ConsensusVoting,
    #[default]
    WeightedAverage,
    RiskAdjusted,
    TechnicalPriority,
    FundamentalPriority,
}

impl ConsensusStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusStrategy::ConsensusVoting => "consensus_voting",
            ConsensusStrategy::WeightedAverage => "weighted_average",
            ConsensusStrategy::RiskAdjusted => "risk_adjusted",
            ConsensusStrategy::TechnicalPriority => "technical_priority",
            ConsensusStrategy::FundamentalPriority => "fundamental_priority",
        }
    }
}

impl fmt::Display for ConsensusStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-agent-type weights for the weighted-average strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AgentWeights(BTreeMap<AgentType, f64>);

impl Default for AgentWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (AgentType::Technical, 0.30),
            (AgentType::Fundamental, 0.25),
            (AgentType::Sentiment, 0.20),
            (AgentType::Risk, 0.15),
            (AgentType::Macro, 0.10),
        ]))
    }
}

impl AgentWeights {
    pub fn new(weights: BTreeMap<AgentType, f64>) -> Self {
        Self(weights)
    }

    /// Raw weight for a type. Unlisted types and negative or non-finite values
    /// count as zero.
    pub fn weight(&self, agent_type: AgentType) -> f64 {
        match self.0.get(&agent_type) {
            Some(w) if w.is_finite() && *w > 0.0 => *w,
            _ => 0.0,
        }
    }

    /// Weights normalized across the given agent types so they sum to 1.0.
    ///
    /// When every present weight is zero the types share equally. An empty
    /// input yields an empty map.
    pub fn normalized_over<I>(&self, types: I) -> BTreeMap<AgentType, f64>
    where
        I: IntoIterator<Item = AgentType>,
    {
        let raw: BTreeMap<AgentType, f64> =
            types.into_iter().map(|t| (t, self.weight(t))).collect();
        if raw.is_empty() {
            return raw;
        }

        let total: f64 = raw.values().sum();
        if total <= 0.0 {
            let equal = 1.0 / raw.len() as f64;
            return raw.into_keys().map(|t| (t, equal)).collect();
        }

        raw.into_iter().map(|(t, w)| (t, w / total)).collect()
    }
}

/// Configuration for the orchestrator and its worker pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Number of workers started by `start_default`.
    pub worker_count: usize,
    /// Default per-agent timeout in milliseconds.
    pub agent_timeout_ms: u64,
    /// Maximum number of queued (not yet dequeued) tasks.
    pub task_queue_capacity: usize,
    /// Maximum number of completed task results kept for polling.
    pub max_completed_results: usize,
    /// How long an idle worker waits on the queue before re-checking shutdown.
    pub dequeue_timeout_ms: u64,
    /// How long `stop` waits for workers before aborting them.
    pub shutdown_grace_ms: u64,
    pub strategy: ConsensusStrategy,
    pub agent_weights: AgentWeights,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            agent_timeout_ms: 300_000,
            task_queue_capacity: 100,
            max_completed_results: 1_000,
            dequeue_timeout_ms: 1_000,
            shutdown_grace_ms: 5_000,
            strategy: ConsensusStrategy::default(),
            agent_weights: AgentWeights::default(),
        }
    }
}

/// Configuration for the result cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a computed result stays fresh.
    pub ttl_seconds: u64,
    /// Maximum number of cached subjects.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 600,
            max_capacity: 10_000,
        }
    }
}

/// Configuration for a single registered agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub agent_type: AgentType,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Override for `OrchestratorConfig::agent_timeout_ms`.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_agents() -> Vec<AgentConfig> {
    [
        AgentType::Technical,
        AgentType::Fundamental,
        AgentType::Sentiment,
        AgentType::Risk,
    ]
    .into_iter()
    .map(|agent_type| AgentConfig {
        agent_type,
        enabled: true,
        timeout_ms: None,
    })
    .collect()
}
