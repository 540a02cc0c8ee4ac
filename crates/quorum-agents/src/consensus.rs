use std::collections::BTreeMap;

use quorum_models::{
    Action, ActionScores, AgentType, AgentWeights, AnalysisResult, ConsensusStrategy,
};

const EPSILON: f64 = 1e-9;
const PRIORITY_AGENT_THRESHOLD: f64 = 0.6;
const RISK_HOLD_THRESHOLD: f64 = 0.7;
const RISK_HOLD_CONSENSUS: f64 = 0.8;
const NO_MAJORITY_CONSENSUS: f64 = 0.5;

/// The aggregate decision for one set of agent results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consensus {
    pub decision: Action,
    pub confidence: f64,
    pub consensus_score: f64,
}

impl Consensus {
    fn new(decision: Action, confidence: f64, consensus_score: f64) -> Self {
        Self {
            decision,
            confidence: clamp_unit(confidence),
            consensus_score: clamp_unit(consensus_score),
        }
    }

    fn empty() -> Self {
        Self::new(Action::Hold, 0.0, 0.0)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Combines agent results into one decision under a fixed strategy.
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    strategy: ConsensusStrategy,
    weights: AgentWeights,
}

impl ConsensusEngine {
    pub fn new(strategy: ConsensusStrategy, weights: AgentWeights) -> Self {
        Self { strategy, weights }
    }

    pub fn strategy(&self) -> ConsensusStrategy {
        self.strategy
    }

    pub fn decide(&self, results: &BTreeMap<AgentType, AnalysisResult>) -> Consensus {
        if results.is_empty() {
            return Consensus::empty();
        }

        match self.strategy {
            ConsensusStrategy::ConsensusVoting => voting(results),
            ConsensusStrategy::WeightedAverage => self.weighted_average(results.values()),
            ConsensusStrategy::RiskAdjusted => self.risk_adjusted(results),
            ConsensusStrategy::TechnicalPriority => self.prioritize(AgentType::Technical, results),
            ConsensusStrategy::FundamentalPriority => {
                self.prioritize(AgentType::Fundamental, results)
            }
        }
    }

    fn weighted_average<'a, I>(&self, results: I) -> Consensus
    where
        I: IntoIterator<Item = &'a AnalysisResult> + Clone,
    {
        let weights = self
            .weights
            .normalized_over(results.clone().into_iter().map(|r| r.agent_type));
        if weights.is_empty() {
            return Consensus::empty();
        }

        let mut scores = ActionScores::default();
        let mut confidence = 0.0;
        for result in results {
            let weight = weights.get(&result.agent_type).copied().unwrap_or(0.0);
            scores.add(result.recommendation, result.confidence * weight);
            confidence += result.confidence * weight;
        }

        let total = scores.total();
        if total <= EPSILON {
            return Consensus::new(Action::Hold, confidence, 0.0);
        }

        let (decision, best) = scores.best();
        Consensus::new(decision, confidence, best / total.max(EPSILON))
    }

    fn risk_adjusted(&self, results: &BTreeMap<AgentType, AnalysisResult>) -> Consensus {
        if let Some(risk) = results.get(&AgentType::Risk) {
            match risk.recommendation {
                Action::Sell => return Consensus::new(Action::Sell, risk.confidence, 1.0),
                Action::Hold if risk.confidence > RISK_HOLD_THRESHOLD => {
                    return Consensus::new(Action::Hold, risk.confidence, RISK_HOLD_CONSENSUS)
                }
                _ => {}
            }
        }

        let others: Vec<&AnalysisResult> = results
            .values()
            .filter(|r| r.agent_type != AgentType::Risk)
            .collect();
        if others.is_empty() {
            self.weighted_average(results.values())
        } else {
            self.weighted_average(others.iter().copied())
        }
    }

    fn prioritize(
        &self,
        agent_type: AgentType,
        results: &BTreeMap<AgentType, AnalysisResult>,
    ) -> Consensus {
        match results.get(&agent_type) {
            Some(lead) if lead.confidence > PRIORITY_AGENT_THRESHOLD => {
                Consensus::new(lead.recommendation, lead.confidence, 1.0)
            }
            _ => self.weighted_average(results.values()),
        }
    }
}

fn voting(results: &BTreeMap<AgentType, AnalysisResult>) -> Consensus {
    let total = results.len() as f64;
    let mut votes = ActionScores::default();
    let mut confidence = ActionScores::default();
    for result in results.values() {
        votes.add(result.recommendation, 1.0);
        confidence.add(result.recommendation, result.confidence);
    }

    // At most one action can hold a strict majority.
    for action in Action::ALL {
        let count = votes.get(action);
        if count * 2.0 > total {
            return Consensus::new(action, confidence.get(action) / count, count / total);
        }
    }

    Consensus::new(
        Action::Hold,
        confidence.total() / total,
        NO_MAJORITY_CONSENSUS,
    )
}
