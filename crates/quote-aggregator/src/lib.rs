use chrono::{DateTime, Duration, Utc};
use heatmap_core::{percent_change, round_2dp, Bar, MarketDataProvider, Period, QuoteRow, QuoteTable};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

pub mod cache;
pub mod holdings;
pub mod report;

pub use cache::{CacheKey, QuoteCache, DEFAULT_TTL_SECS};
pub use holdings::{holdings_of, DEFAULT_HOLDINGS_LIMIT};
pub use report::{BatchReport, SkipReason, SkippedSymbol};

/// Market cap used for rows whose fundamentals snapshot has no figure
pub const PLACEHOLDER_MARKET_CAP: f64 = 1.0;

/// What to do with a symbol whose market cap is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMarketCapPolicy {
    /// Keep the row with [`PLACEHOLDER_MARKET_CAP`] and flag it
    #[default]
    DefaultToOne,
    /// Drop the row
    Exclude,
}

impl FromStr for MissingMarketCapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "default_to_one" => Ok(MissingMarketCapPolicy::DefaultToOne),
            "exclude" => Ok(MissingMarketCapPolicy::Exclude),
            other => Err(format!("unknown market cap policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub cache_ttl: Duration,
    pub holdings_limit: usize,
    pub missing_market_cap: MissingMarketCapPolicy,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::seconds(DEFAULT_TTL_SECS),
            holdings_limit: DEFAULT_HOLDINGS_LIMIT,
            missing_market_cap: MissingMarketCapPolicy::default(),
        }
    }
}

/// Result of one `load_quotes` call
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub table: Arc<QuoteTable>,
    pub report: Arc<BatchReport>,
    pub cache_hit: bool,
}

/// Fetches per-symbol history and fundamentals and memoizes the resulting
/// table per (symbol set, period).
pub struct QuoteAggregator {
    provider: Arc<dyn MarketDataProvider>,
    cache: QuoteCache,
    holdings_limit: usize,
    missing_market_cap: MissingMarketCapPolicy,
}

impl QuoteAggregator {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: AggregatorConfig) -> Self {
        Self {
            provider,
            cache: QuoteCache::new(config.cache_ttl),
            holdings_limit: config.holdings_limit,
            missing_market_cap: config.missing_market_cap,
        }
    }

    pub fn provider(&self) -> &dyn MarketDataProvider {
        self.provider.as_ref()
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    /// Top holdings of a fund, empty on any failure
    pub async fn resolve_holdings(&self, etf: &str) -> Vec<String> {
        holdings_of(self.provider.as_ref(), etf, self.holdings_limit).await
    }

    pub async fn load_quotes(&self, symbols: &[String], period: Period) -> LoadOutcome {
        self.load_quotes_at(symbols, period, Utc::now()).await
    }

    /// Same as [`load_quotes`](Self::load_quotes) with an explicit clock.
    pub async fn load_quotes_at(&self, symbols: &[String], period: Period, now: DateTime<Utc>) -> LoadOutcome {
        let symbols = normalize_symbols(symbols);
        let key = CacheKey::new(&symbols, period);
        if let Some(entry) = self.cache.get(&key, now) {
            tracing::debug!(
                "Quote cache hit for {} symbols ({}), age {}s",
                key.symbols().len(),
                period,
                (now - entry.cached_at).num_seconds()
            );
            return LoadOutcome {
                table: entry.table,
                report: entry.report,
                cache_hit: true,
            };
        }

        let (table, report) = self.fetch_table(&symbols, period, now).await;
        let table = Arc::new(table);
        let report = Arc::new(report);
        self.cache.insert(key, table.clone(), report.clone(), now);

        LoadOutcome {
            table,
            report,
            cache_hit: false,
        }
    }

    /// Fetch every symbol one after another. Failures only cost the row.
    async fn fetch_table(&self, symbols: &[String], period: Period, now: DateTime<Utc>) -> (QuoteTable, BatchReport) {
        let mut report = BatchReport::new(symbols.len());
        let mut table = QuoteTable::empty(period, now);

        for symbol in symbols {
            match self.load_row(symbol, period, &mut report).await {
                Ok(row) => {
                    if row.market_cap_defaulted {
                        report.defaulted_market_caps += 1;
                    }
                    table.rows.push(row);
                }
                Err(reason) => report.skip(symbol, reason),
            }
        }

        report.loaded = table.rows.len();
        tracing::info!(
            "Loaded {}/{} quotes for period {} ({} skipped)",
            report.loaded,
            report.requested,
            period,
            report.skipped.len()
        );
        (table, report)
    }

    async fn load_row(&self, symbol: &str, period: Period, report: &mut BatchReport) -> Result<QuoteRow, SkipReason> {
        let bars = self
            .provider
            .history(symbol, period)
            .await
            .map_err(|e| SkipReason::FetchFailed(e.to_string()))?;
        let (price, change) = price_and_change(&bars)?;

        // A failed fundamentals lookup is an unavailable market cap; the policy decides
        let market_cap = match self.provider.market_cap(symbol).await {
            Ok(cap) => cap,
            Err(e) => {
                tracing::debug!("Market cap lookup failed for {}: {}", symbol, e);
                report.market_cap_errors += 1;
                None
            }
        };

        build_row(symbol, price, change, market_cap, self.missing_market_cap)
    }
}

/// Trimmed, uppercased symbols in first-seen order, blanks and repeats dropped.
pub fn normalize_symbols(symbols: &[String]) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let symbol = symbol.to_uppercase();
        if !distinct.contains(&symbol) {
            distinct.push(symbol);
        }
    }
    distinct
}

/// Last close and percent change across the window.
pub fn price_and_change(bars: &[Bar]) -> Result<(f64, f64), SkipReason> {
    let (first, last) = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) if bars.len() >= 2 => (first, last),
        _ if bars.is_empty() => return Err(SkipReason::NoHistory),
        _ => return Err(SkipReason::InsufficientHistory(bars.len())),
    };
    let change = percent_change(first.close, last.close).ok_or(SkipReason::InvalidPrice)?;
    Ok((last.close, change))
}

fn build_row(
    symbol: &str,
    price: f64,
    change: f64,
    market_cap: Option<f64>,
    policy: MissingMarketCapPolicy,
) -> Result<QuoteRow, SkipReason> {
    let price = round_2dp(price).ok_or(SkipReason::InvalidPrice)?;
    let change_pct = round_2dp(change).ok_or(SkipReason::InvalidPrice)?;

    let (market_cap, market_cap_defaulted) = match (market_cap.filter(|c| c.is_finite() && *c >= 0.0), policy) {
        (Some(cap), _) => (cap, false),
        (None, MissingMarketCapPolicy::DefaultToOne) => (PLACEHOLDER_MARKET_CAP, true),
        (None, MissingMarketCapPolicy::Exclude) => return Err(SkipReason::MissingMarketCap),
    };

    Ok(QuoteRow {
        symbol: symbol.to_string(),
        price,
        change_pct,
        market_cap,
        sector: symbol_catalog::sector_of(symbol).to_string(),
        market_cap_defaulted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use heatmap_core::testing::{bars_from_closes, StaticProvider};
    use rust_decimal_macros::dec;

    fn syms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()
    }

    fn aggregator(provider: Arc<StaticProvider>) -> QuoteAggregator {
        QuoteAggregator::new(provider, AggregatorConfig::default())
    }

    #[tokio::test]
    async fn test_aapl_msft_example() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_closes("AAPL", &[150.0, 152.0, 151.0, 155.0, 160.0])
                .with_market_cap("AAPL", 2.5e12)
                .with_closes("MSFT", &[410.0])
                .with_market_cap("MSFT", 3.0e12),
        );
        let agg = aggregator(provider.clone());

        let outcome = agg.load_quotes_at(&syms(&["AAPL", "MSFT"]), Period::FiveDays, t0()).await;
        let rows = &outcome.table.rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[0].price, dec!(160.00));
        assert_eq!(rows[0].change_pct, dec!(6.67));
        assert_eq!(rows[0].sector, "Technology");

        assert_eq!(outcome.report.requested, 2);
        assert_eq!(outcome.report.loaded, 1);
        assert_eq!(outcome.report.skipped[0].symbol, "MSFT");
        assert_eq!(outcome.report.skipped[0].reason, SkipReason::InsufficientHistory(1));
        // MSFT never reached the fundamentals call
        assert_eq!(provider.market_cap_calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_only_that_symbol() {
        let provider = Arc::new(
            StaticProvider::new()
                .failing("NVDA")
                .with_closes("AMD", &[100.0, 90.0])
                .with_market_cap("AMD", 2.0e11),
        );
        let agg = aggregator(provider);

        let outcome = agg.load_quotes_at(&syms(&["NVDA", "AMD", "META"]), Period::OneMonth, t0()).await;
        let symbols: Vec<&str> = outcome.table.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AMD"]);
        assert_eq!(outcome.table.rows[0].change_pct, dec!(-10.00));

        let kinds = outcome.report.skipped_by_kind();
        assert_eq!(kinds.get("fetch_failed"), Some(&1));
        assert_eq!(kinds.get("no_history"), Some(&1));
    }

    #[tokio::test]
    async fn test_cache_hit_within_ttl_and_refetch_after() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_closes("JPM", &[190.0, 195.0])
                .with_market_cap("JPM", 5.5e11),
        );
        let agg = aggregator(provider.clone());
        let symbols = syms(&["JPM"]);

        let first = agg.load_quotes_at(&symbols, Period::FiveDays, t0()).await;
        assert!(!first.cache_hit);
        assert_eq!(provider.history_calls(), 1);

        let second = agg
            .load_quotes_at(&symbols, Period::FiveDays, t0() + Duration::seconds(299))
            .await;
        assert!(second.cache_hit);
        assert!(Arc::ptr_eq(&first.table, &second.table));
        assert_eq!(provider.history_calls(), 1);

        let third = agg
            .load_quotes_at(&symbols, Period::FiveDays, t0() + Duration::seconds(300))
            .await;
        assert!(!third.cache_hit);
        assert_eq!(provider.history_calls(), 2);
        assert_eq!(third.table.rows, first.table.rows);
    }

    #[tokio::test]
    async fn test_period_is_part_of_the_key() {
        let provider = Arc::new(StaticProvider::new().with_closes("V", &[270.0, 280.0]));
        let agg = aggregator(provider.clone());
        agg.load_quotes_at(&syms(&["V"]), Period::FiveDays, t0()).await;
        agg.load_quotes_at(&syms(&["V"]), Period::OneMonth, t0()).await;
        assert_eq!(provider.history_calls(), 2);
        assert_eq!(agg.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_symbol_list() {
        let provider = Arc::new(StaticProvider::new());
        let agg = aggregator(provider.clone());
        let outcome = agg.load_quotes_at(&[], Period::OneDay, t0()).await;
        assert!(outcome.table.is_empty());
        assert_eq!(outcome.report.requested, 0);
        assert_eq!(provider.history_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_market_cap_policies() {
        let provider = Arc::new(StaticProvider::new().with_closes("SOXL", &[30.0, 33.0]));

        let agg = aggregator(provider.clone());
        let outcome = agg.load_quotes_at(&syms(&["SOXL"]), Period::FiveDays, t0()).await;
        let row = &outcome.table.rows[0];
        assert_eq!(row.market_cap, PLACEHOLDER_MARKET_CAP);
        assert!(row.market_cap_defaulted);
        assert_eq!(row.sector, "ETF");
        assert_eq!(outcome.report.defaulted_market_caps, 1);

        let strict = QuoteAggregator::new(
            provider,
            AggregatorConfig {
                missing_market_cap: MissingMarketCapPolicy::Exclude,
                ..AggregatorConfig::default()
            },
        );
        let outcome = strict.load_quotes_at(&syms(&["SOXL"]), Period::FiveDays, t0()).await;
        assert!(outcome.table.is_empty());
        assert_eq!(outcome.report.skipped[0].reason, SkipReason::MissingMarketCap);
    }

    #[tokio::test]
    async fn test_duplicate_symbols_fetched_once() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_closes("AAPL", &[1.0, 2.0])
                .with_market_cap("AAPL", 10.0),
        );
        let agg = aggregator(provider.clone());
        let outcome = agg.load_quotes_at(&syms(&["AAPL", "AAPL"]), Period::FiveDays, t0()).await;
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(provider.history_calls(), 1);
    }

    #[tokio::test]
    async fn test_market_cap_error_falls_back_to_policy() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_closes("QQQ", &[400.0, 404.0])
                .failing_market_cap("QQQ")
                .with_closes("MSFT", &[400.0, 410.0])
                .with_market_cap("MSFT", 3.0e12),
        );

        let agg = aggregator(provider.clone());
        let outcome = agg.load_quotes_at(&syms(&["QQQ", "MSFT"]), Period::FiveDays, t0()).await;
        assert_eq!(outcome.table.len(), 2);
        let qqq = &outcome.table.rows[0];
        assert_eq!(qqq.symbol, "QQQ");
        assert_eq!(qqq.change_pct, dec!(1.00));
        assert_eq!(qqq.market_cap, PLACEHOLDER_MARKET_CAP);
        assert!(qqq.market_cap_defaulted);
        assert!(outcome.report.is_complete());
        assert_eq!(outcome.report.market_cap_errors, 1);
        assert_eq!(outcome.report.defaulted_market_caps, 1);

        let strict = QuoteAggregator::new(
            provider,
            AggregatorConfig {
                missing_market_cap: MissingMarketCapPolicy::Exclude,
                ..AggregatorConfig::default()
            },
        );
        let outcome = strict.load_quotes_at(&syms(&["QQQ", "MSFT"]), Period::FiveDays, t0()).await;
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.report.skipped[0].symbol, "QQQ");
        assert_eq!(outcome.report.skipped[0].reason, SkipReason::MissingMarketCap);
        assert_eq!(outcome.report.market_cap_errors, 1);
    }

    #[tokio::test]
    async fn test_symbols_normalized_before_key_and_fetch() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_closes("AAPL", &[150.0, 160.0])
                .with_market_cap("AAPL", 2.5e12),
        );
        let agg = aggregator(provider.clone());

        let first = agg
            .load_quotes_at(&syms(&["aapl", " AAPL ", ""]), Period::FiveDays, t0())
            .await;
        assert_eq!(first.report.requested, 1);
        assert_eq!(first.table.rows[0].symbol, "AAPL");
        assert_eq!(first.table.rows[0].price, rust_decimal::Decimal::from(160));
        assert_eq!(provider.history_calls(), 1);

        let second = agg.load_quotes_at(&syms(&["AAPL"]), Period::FiveDays, t0()).await;
        assert!(second.cache_hit);
        assert!(Arc::ptr_eq(&first.table, &second.table));
        assert_eq!(provider.history_calls(), 1);
    }

    #[test]
    fn test_normalize_symbols() {
        assert_eq!(
            normalize_symbols(&syms(&[" msft", "", "005930.ks", "MSFT", "aapl"])),
            syms(&["MSFT", "005930.KS", "AAPL"])
        );
    }

    #[test]
    fn test_price_and_change_edge_cases() {
        assert_eq!(price_and_change(&[]), Err(SkipReason::NoHistory));
        assert_eq!(
            price_and_change(&bars_from_closes(&[10.0])),
            Err(SkipReason::InsufficientHistory(1))
        );
        assert_eq!(
            price_and_change(&bars_from_closes(&[0.0, 10.0])),
            Err(SkipReason::InvalidPrice)
        );
        let (price, change) = price_and_change(&bars_from_closes(&[200.0, 150.0])).unwrap();
        assert_eq!(price, 150.0);
        assert_eq!(change, -25.0);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("default".parse(), Ok(MissingMarketCapPolicy::DefaultToOne));
        assert_eq!("EXCLUDE".parse(), Ok(MissingMarketCapPolicy::Exclude));
        assert!("drop".parse::<MissingMarketCapPolicy>().is_err());
    }
}
