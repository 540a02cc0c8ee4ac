use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use quorum_models::{MarketContext, NewsPayload};

use crate::error::ProviderError;

/// Builds the market snapshot a request's agents analyze.
#[async_trait]
pub trait MarketContextProvider: Send + Sync {
    async fn build_context(&self, symbol: &str) -> Result<MarketContext, ProviderError>;
}

/// Optional source of news and social payloads merged into the context.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_news(&self, symbol: &str) -> Result<NewsPayload, ProviderError>;
}

/// Serves pre-built snapshots from memory.
///
/// Each request gets a copy of the stored snapshot with a fresh timestamp.
#[derive(Default)]
pub struct StaticContextProvider {
    snapshots: RwLock<HashMap<String, MarketContext>>,
}

impl StaticContextProvider {
    pub fn new(snapshots: Vec<MarketContext>) -> Self {
        let provider = Self::default();
        for snapshot in snapshots {
            provider.insert(snapshot);
        }
        provider
    }

    /// Add or replace the snapshot for the context's symbol.
    pub fn insert(&self, context: MarketContext) {
        match self.snapshots.write() {
            Ok(mut map) => {
                map.insert(context.symbol.clone(), context);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(context.symbol.clone(), context);
            }
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        let map = match self.snapshots.read() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut symbols: Vec<String> = map.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

#[async_trait]
impl MarketContextProvider for StaticContextProvider {
    async fn build_context(&self, symbol: &str) -> Result<MarketContext, ProviderError> {
        let map = self
            .snapshots
            .read()
            .map_err(|e| ProviderError::Unavailable(format!("snapshot lock poisoned: {e}")))?;
        let mut context = map
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;
        context.timestamp = chrono::Utc::now();
        Ok(context)
    }
}
