use thiserror::Error;

/// Why an agent abstained from a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Agent failed: {0}")]
    Failed(String),

    #[error("Agent timed out after {0} ms")]
    Timeout(u64),

    #[error("Agent returned invalid output: {0}")]
    InvalidOutput(String),

    #[error("Agent call cancelled by shutdown")]
    Cancelled,

    #[error("Agent task panicked")]
    Panicked,
}

/// Failure of an external data collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("No data for symbol: {0}")]
    NotFound(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("Task queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Worker pool is already running")]
    AlreadyRunning,

    #[error("Market context unavailable: {0}")]
    ContextUnavailable(#[from] ProviderError),
}
