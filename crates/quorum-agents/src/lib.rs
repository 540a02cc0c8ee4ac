pub mod agent;
pub mod assessment;
pub mod consensus;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod queue;
pub mod reference;

pub mod test_support;

pub use agent::AnalysisAgent;
pub use consensus::{Consensus, ConsensusEngine};
pub use error::{AgentError, OrchestratorError, ProviderError};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, RequestState};
pub use provider::{MarketContextProvider, NewsProvider, StaticContextProvider};
pub use queue::TaskQueue;
pub use reference::SignalAgent;
