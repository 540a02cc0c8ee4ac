pub mod analysis;
pub mod config;
pub mod market_context;
pub mod orchestration;
pub mod task;

pub use analysis::{Action, ActionScores, AgentType, AnalysisResult};
pub use config::{
    AgentConfig, AgentWeights, CacheConfig, ConsensusStrategy, OrchestratorConfig, QuorumConfig,
};
pub use market_context::{MarketContext, NewsPayload};
pub use orchestration::{OrchestrationResult, RiskAssessment, RiskLevel};
pub use task::{Task, TaskId, TaskStatus};
