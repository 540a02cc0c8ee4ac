use async_trait::async_trait;
use quorum_models::{AnalysisResult, MarketContext};

use crate::error::AgentError;

/// A pluggable analysis agent. Mockable for testing.
///
/// Implementations must return promptly: the orchestrator drops the call once
/// its deadline passes or shutdown begins, so an agent holding resources across
/// `.await` points should release them on drop.
#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, context: &MarketContext) -> Result<AnalysisResult, AgentError>;
}
