use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Input snapshot shared by every agent for one request.
///
/// Built once by a `MarketContextProvider` and handed to agents behind an `Arc`;
/// nothing mutates it after the news merge that precedes fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketContext {
    pub symbol: String,
    pub current_price: Decimal,
    /// Oldest first.
    #[serde(default)]
    pub price_history: Vec<Decimal>,
    #[serde(default)]
    pub volume: Vec<u64>,
    /// Named indicator values (e.g. "rsi_14", "technical_signal").
    #[serde(default)]
    pub indicators: BTreeMap<String, f64>,
    #[serde(default)]
    pub news: Option<serde_json::Value>,
    #[serde(default)]
    pub social: Option<serde_json::Value>,
    #[serde(default)]
    pub fundamentals: Option<serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl MarketContext {
    pub fn new(symbol: impl Into<String>, current_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            current_price,
            price_history: Vec::new(),
            volume: Vec::new(),
            indicators: BTreeMap::new(),
            news: None,
            social: None,
            fundamentals: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_price_history(mut self, history: Vec<Decimal>) -> Self {
        self.price_history = history;
        self
    }

    pub fn with_volume(mut self, volume: Vec<u64>) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_indicator(mut self, name: impl Into<String>, value: f64) -> Self {
        self.indicators.insert(name.into(), value);
        self
    }

    pub fn with_fundamentals(mut self, fundamentals: serde_json::Value) -> Self {
        self.fundamentals = Some(fundamentals);
        self
    }

    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }
}

/// News and social payloads fetched separately from the market snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewsPayload {
    pub news: Option<serde_json::Value>,
    pub social: Option<serde_json::Value>,
}

impl NewsPayload {
    /// Merge into a context. Payloads already present on the context are only
    /// replaced when this payload carries a value.
    pub fn merge_into(self, context: &mut MarketContext) {
        if self.news.is_some() {
            context.news = self.news;
        }
        if self.social.is_some() {
            context.social = self.social;
        }
    }
}
