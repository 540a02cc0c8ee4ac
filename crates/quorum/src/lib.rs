//! Quorum - multi-agent analysis orchestrator
//!
//! Fans a symbol out to independent analysis agents, combines their opinions
//! with a configurable consensus strategy and caches the outcome. Requests are
//! served inline or through a bounded queue drained by a worker pool.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use quorum::models::{AgentType, MarketContext, QuorumConfig};
//! use quorum::agents::{Orchestrator, SignalAgent, StaticContextProvider};
//! use quorum::cache::ResultCache;
//! ```

pub use quorum_agents as agents;
pub use quorum_cache as cache;
pub use quorum_models as models;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use quorum_agents::{MarketContextProvider, Orchestrator, SignalAgent};
use quorum_cache::ResultCache;
use quorum_models::{MarketContext, QuorumConfig};

/// Build an Orchestrator from configuration, with a `SignalAgent` for every
/// enabled agent entry.
pub fn build_orchestrator(
    config: &QuorumConfig,
    provider: Arc<dyn MarketContextProvider>,
) -> Orchestrator {
    let cache = Arc::new(ResultCache::from_config(&config.cache));
    let default_timeout = config.orchestrator.agent_timeout_ms;

    let mut builder =
        Orchestrator::builder(config.orchestrator.clone(), provider).cache(cache);
    for agent in config.agents.iter().filter(|a| a.enabled) {
        let timeout = Duration::from_millis(agent.timeout_ms.unwrap_or(default_timeout));
        builder = builder.register_with_timeout(
            agent.agent_type,
            Arc::new(SignalAgent::new(agent.agent_type)),
            timeout,
        );
    }

    builder.build()
}

/// Read and parse a TOML configuration file.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<QuorumConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Read a JSON array of market context snapshots.
pub fn load_contexts(path: impl AsRef<Path>) -> anyhow::Result<Vec<MarketContext>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read contexts: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse contexts: {}", path.display()))
}
