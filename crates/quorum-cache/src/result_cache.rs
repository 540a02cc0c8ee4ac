use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use quorum_models::config::CacheConfig;
use quorum_models::orchestration::OrchestrationResult;
use tracing::debug;

/// A cached result and the instant it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: Arc<OrchestrationResult>,
    pub created_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

/// Hit/miss counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// TTL-keyed store of the last orchestration result per symbol, backed by moka.
///
/// Freshness is checked against the entry's own creation instant on every read,
/// so a stale entry is a miss even before moka evicts it. Stale entries are
/// replaced by the next `put` for the same symbol.
pub struct ResultCache {
    inner: Cache<String, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_capacity, Duration::from_secs(config.ttl_seconds))
    }

    /// Fresh result for `symbol`, if any.
    pub async fn get(&self, symbol: &str) -> Option<Arc<OrchestrationResult>> {
        match self.inner.get(symbol).await {
            Some(entry) if entry.is_fresh(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(symbol, "Result cache hit");
                Some(entry.result)
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(symbol, "Result cache entry expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(symbol, "Result cache miss");
                None
            }
        }
    }

    pub async fn put(&self, symbol: &str, result: Arc<OrchestrationResult>) {
        let entry = CacheEntry {
            result,
            created_at: Instant::now(),
        };
        self.inner.insert(symbol.to_string(), entry).await;
    }

    pub async fn invalidate(&self, symbol: &str) {
        self.inner.invalidate(symbol).await;
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Approximate number of stored entries, fresh or not.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
