use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of analysis an agent performs. Ordering follows declaration order,
/// so per-agent maps always iterate the same way.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Technical,
    Fundamental,
    Sentiment,
    Risk,
    Macro,
}

impl AgentType {
    pub const ALL: [AgentType; 5] = [
        AgentType::Technical,
        AgentType::Fundamental,
        AgentType::Sentiment,
        AgentType::Risk,
        AgentType::Macro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Technical => "technical",
            AgentType::Fundamental => "fundamental",
            AgentType::Sentiment => "sentiment",
            AgentType::Risk => "risk",
            AgentType::Macro => "macro",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recommended trading action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// Enumeration order. Also the tie-break order when two actions score equally.
    pub const ALL: [Action; 3] = [Action::Buy, Action::Sell, Action::Hold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }

    fn index(&self) -> usize {
        match self {
            Action::Buy => 0,
            Action::Sell => 1,
            Action::Hold => 2,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-size per-action accumulator, indexed in `Action::ALL` order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionScores([f64; 3]);

impl ActionScores {
    pub fn add(&mut self, action: Action, value: f64) {
        self.0[action.index()] += value;
    }

    pub fn get(&self, action: Action) -> f64 {
        self.0[action.index()]
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Highest-scoring action. Equal scores resolve to the earliest action in
    /// `Action::ALL`.
    pub fn best(&self) -> (Action, f64) {
        let mut best = (Action::Buy, self.get(Action::Buy));
        for action in &Action::ALL[1..] {
            let score = self.get(*action);
            if score > best.1 {
                best = (*action, score);
            }
        }
        best
    }
}

/// One agent's opinion for one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub agent_type: AgentType,
    pub recommendation: Action,
    /// 0.0 to 1.0 confidence in the recommendation.
    pub confidence: f64,
    pub reasoning: String,
    /// Agent-specific structured analysis data.
    #[serde(default)]
    pub analysis_data: serde_json::Map<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(
        agent_type: AgentType,
        recommendation: Action,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            agent_type,
            recommendation,
            confidence,
            reasoning: reasoning.into(),
            analysis_data: serde_json::Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.analysis_data.insert(key.into(), value);
        self
    }

    /// Numeric entry from `analysis_data`, if present.
    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.analysis_data.get(key).and_then(|v| v.as_f64())
    }

    /// Whether the confidence satisfies the `0.0..=1.0` invariant.
    pub fn is_valid(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}
