use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{Action, AgentType, AnalysisResult};
use crate::config::ConsensusStrategy;

/// Coarse risk bucket derived from the risk agent's output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// 0.0 (benign) to 1.0 (severe).
    pub score: f64,
    pub factors: Vec<String>,
}

impl RiskAssessment {
    pub fn unknown(factors: Vec<String>) -> Self {
        Self {
            level: RiskLevel::Unknown,
            score: 0.5,
            factors,
        }
    }
}

/// The combined outcome of one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestrationResult {
    pub symbol: String,
    pub decision: Action,
    pub confidence: f64,
    pub reasoning: String,
    /// Results of every agent that answered in time, keyed by type.
    pub agent_results: BTreeMap<AgentType, AnalysisResult>,
    /// 0.0 to 1.0 agreement on the winning decision.
    pub consensus_score: f64,
    pub risk_assessment: RiskAssessment,
    /// 1 (least urgent) to 10 (most urgent).
    pub execution_priority: u8,
    pub strategy: ConsensusStrategy,
    /// Set when the result is a fallback produced without any agent input.
    #[serde(default)]
    pub degraded: bool,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

pub const FALLBACK_CONFIDENCE: f64 = 0.1;
pub const FALLBACK_PRIORITY: u8 = 1;

impl OrchestrationResult {
    /// A well-formed result for a request that produced no usable agent input.
    pub fn fallback(
        symbol: impl Into<String>,
        strategy: ConsensusStrategy,
        reason: &str,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            decision: Action::Hold,
            confidence: FALLBACK_CONFIDENCE,
            reasoning: format!("Analysis unavailable: {reason}"),
            agent_results: BTreeMap::new(),
            consensus_score: 0.0,
            risk_assessment: RiskAssessment::unknown(vec![reason.to_string()]),
            execution_priority: FALLBACK_PRIORITY,
            strategy,
            degraded: true,
            processing_time_ms,
            timestamp: Utc::now(),
        }
    }
}
