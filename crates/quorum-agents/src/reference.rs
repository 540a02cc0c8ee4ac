use async_trait::async_trait;
use quorum_models::{Action, AgentType, AnalysisResult, MarketContext};

use crate::agent::AnalysisAgent;
use crate::error::AgentError;

const SIGNAL_THRESHOLD: f64 = 0.2;
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Generic agent driven by precomputed indicators on the context.
///
/// Reads `"{type}_signal"` in -1..=1 and an optional `"{type}_confidence"`.
/// The risk variant also forwards `var_95` and `risk_score` into its analysis
/// data so the risk summary can pick them up.
pub struct SignalAgent {
    agent_type: AgentType,
    name: String,
}

impl SignalAgent {
    pub fn new(agent_type: AgentType) -> Self {
        Self {
            agent_type,
            name: format!("{agent_type}_signal"),
        }
    }
}

#[async_trait]
impl AnalysisAgent for SignalAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, context: &MarketContext) -> Result<AnalysisResult, AgentError> {
        let signal_key = format!("{}_signal", self.agent_type);
        let signal = context.indicator(&signal_key).ok_or_else(|| {
            AgentError::Failed(format!("missing indicator {signal_key} for {}", context.symbol))
        })?;

        let recommendation = if signal > SIGNAL_THRESHOLD {
            Action::Buy
        } else if signal < -SIGNAL_THRESHOLD {
            Action::Sell
        } else {
            Action::Hold
        };

        let confidence = context
            .indicator(&format!("{}_confidence", self.agent_type))
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE);

        let mut result = AnalysisResult::new(
            self.agent_type,
            recommendation,
            confidence,
            format!("{signal_key} at {signal:.2} for {}", context.symbol),
        )
        .with_data("signal", serde_json::json!(signal));

        if self.agent_type == AgentType::Risk {
            for key in ["var_95", "risk_score"] {
                if let Some(value) = context.indicator(key) {
                    result = result.with_data(key, serde_json::json!(value));
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn context() -> MarketContext {
        MarketContext::new("AAPL", dec!(190))
            .with_indicator("technical_signal", 0.45)
            .with_indicator("technical_confidence", 0.72)
            .with_indicator("sentiment_signal", -0.6)
            .with_indicator("risk_signal", 0.1)
            .with_indicator("var_95", 0.064)
    }

    #[tokio::test]
    async fn positive_signal_buys() {
        let result = SignalAgent::new(AgentType::Technical)
            .analyze(&context())
            .await
            .unwrap();
        assert_eq!(result.recommendation, Action::Buy);
        assert_eq!(result.confidence, 0.72);
        assert_eq!(result.agent_type, AgentType::Technical);
    }

    #[tokio::test]
    async fn negative_signal_sells_with_default_confidence() {
        let result = SignalAgent::new(AgentType::Sentiment)
            .analyze(&context())
            .await
            .unwrap();
        assert_eq!(result.recommendation, Action::Sell);
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    }

    #[tokio::test]
    async fn risk_agent_forwards_var() {
        let result = SignalAgent::new(AgentType::Risk)
            .analyze(&context())
            .await
            .unwrap();
        assert_eq!(result.recommendation, Action::Hold);
        assert_eq!(result.data_f64("var_95"), Some(0.064));
        assert_eq!(result.data_f64("risk_score"), None);
    }

    #[tokio::test]
    async fn missing_signal_fails() {
        let result = SignalAgent::new(AgentType::Macro).analyze(&context()).await;
        assert!(matches!(result, Err(AgentError::Failed(_))));
    }
}
