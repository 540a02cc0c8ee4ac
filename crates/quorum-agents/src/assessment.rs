//! Post-consensus helpers: risk extraction, execution priority and the
//! human-readable reasoning attached to every result.

use std::collections::BTreeMap;

use quorum_models::{
    Action, AgentType, AnalysisResult, ConsensusStrategy, RiskAssessment, RiskLevel,
};

use crate::consensus::Consensus;

const HIGH_VAR_THRESHOLD: f64 = 0.05;
const LOW_VAR_THRESHOLD: f64 = 0.02;
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.3;
const URGENT_RISK_SCORE: f64 = 0.7;
const REASONING_SNIPPET_CHARS: usize = 100;

/// Derive the risk summary from the risk agent's data and overall agent confidence.
pub fn assess_risk(results: &BTreeMap<AgentType, AnalysisResult>) -> RiskAssessment {
    let mut factors = Vec::new();

    let (level, default_score) = match results.get(&AgentType::Risk) {
        Some(risk) => {
            let var = risk
                .data_f64("var_95")
                .or_else(|| risk.data_f64("value_at_risk"));
            let level = match var {
                Some(v) if v > HIGH_VAR_THRESHOLD => {
                    factors.push(format!("high value at risk ({:.2}%)", v * 100.0));
                    RiskLevel::High
                }
                Some(v) if v < LOW_VAR_THRESHOLD => RiskLevel::Low,
                _ => RiskLevel::Medium,
            };

            if let Some(listed) = risk
                .analysis_data
                .get("risk_factors")
                .and_then(|v| v.as_array())
            {
                factors.extend(listed.iter().filter_map(|f| f.as_str()).map(str::to_string));
            }

            let score = match level {
                RiskLevel::High => 0.8,
                RiskLevel::Low => 0.2,
                _ => 0.5,
            };
            (level, score)
        }
        None => (RiskLevel::Unknown, 0.5),
    };

    let score = results
        .get(&AgentType::Risk)
        .and_then(|r| r.data_f64("risk_score"))
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, 1.0))
        .unwrap_or(default_score);

    for result in results.values() {
        if result.confidence < LOW_CONFIDENCE_THRESHOLD {
            factors.push(format!(
                "{} confidence low ({:.2})",
                result.agent_type, result.confidence
            ));
        }
    }

    RiskAssessment {
        level,
        score,
        factors,
    }
}

/// How urgently the decision should be acted on, from 1 to 10.
pub fn execution_priority(consensus: &Consensus, risk: &RiskAssessment) -> u8 {
    let mut priority: i32 = 5;

    priority += match consensus.decision {
        Action::Sell => 2,
        Action::Buy => 1,
        Action::Hold => 0,
    };
    priority += scaled_adjustment(consensus.confidence, 4.0, 2);
    priority += scaled_adjustment(consensus.consensus_score, 2.0, 1);
    if risk.score > URGENT_RISK_SCORE {
        priority += 2;
    }

    priority.clamp(1, 10) as u8
}

/// round((value - 0.5) * factor), limited to ±bound. Halves round away from zero.
fn scaled_adjustment(value: f64, factor: f64, bound: i32) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let adjustment = ((value - 0.5) * factor).round() as i32;
    adjustment.clamp(-bound, bound)
}

/// One line per participating agent, one per abstention, then the final call.
pub fn synthesize_reasoning(
    results: &BTreeMap<AgentType, AnalysisResult>,
    abstentions: &BTreeMap<AgentType, String>,
    consensus: &Consensus,
    strategy: ConsensusStrategy,
) -> String {
    let mut lines: Vec<String> = results
        .iter()
        .map(|(agent_type, result)| {
            format!(
                "{agent_type}: {} ({:.2}) - {}",
                result.recommendation,
                result.confidence,
                snippet(&result.reasoning)
            )
        })
        .collect();

    lines.extend(
        abstentions
            .iter()
            .map(|(agent_type, reason)| format!("{agent_type}: abstained ({reason})")),
    );

    lines.push(format!(
        "Final decision: {} (confidence {:.2}, consensus {:.2}, strategy {strategy})",
        consensus.decision, consensus.confidence, consensus.consensus_score
    ));

    lines.join("\n")
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(REASONING_SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
