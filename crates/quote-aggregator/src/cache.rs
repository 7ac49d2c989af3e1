//! Time-to-live cache for aggregated quote tables

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use heatmap_core::{Period, QuoteTable};
use std::sync::Arc;

use crate::report::BatchReport;

pub const DEFAULT_TTL_SECS: i64 = 300;

/// Cache key: the de-duplicated, sorted symbol set plus the lookback period.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    symbols: Vec<String>,
    period: Period,
}

impl CacheKey {
    pub fn new(symbols: &[String], period: Period) -> Self {
        let mut symbols: Vec<String> = symbols.iter().map(|s| s.trim().to_uppercase()).collect();
        symbols.sort();
        symbols.dedup();
        Self { symbols, period }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn period(&self) -> Period {
        self.period
    }
}

/// Cache entry with timestamp
#[derive(Debug, Clone)]
pub struct CachedQuotes {
    pub table: Arc<QuoteTable>,
    pub report: Arc<BatchReport>,
    pub cached_at: DateTime<Utc>,
}

pub struct QuoteCache {
    entries: DashMap<CacheKey, CachedQuotes>,
    ttl: Duration,
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CachedQuotes, now: DateTime<Utc>) -> bool {
        now - entry.cached_at < self.ttl
    }

    /// Fresh entry for `key` as of `now`. Stale entries are evicted.
    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CachedQuotes> {
        if let Some(entry) = self.entries.get(key) {
            if self.is_fresh(&entry, now) {
                return Some(entry.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| !self.is_fresh(entry, now));
        None
    }

    pub fn insert(&self, key: CacheKey, table: Arc<QuoteTable>, report: Arc<BatchReport>, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            CachedQuotes {
                table,
                report,
                cached_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
