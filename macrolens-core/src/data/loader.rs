//! Data resolution with an explicit fallback policy.
//!
//! Macro panel, per indicator:
//! 1. fresh cache entry -> use it
//! 2. provider available and not offline -> fetch, cache, use it
//! 3. stale cache entry -> use it, tagged `Fallback` with its age
//! 4. `--synthetic` -> deterministic synthetic series, tagged
//! 5. otherwise -> fail with a clear error
//!
//! Fundamentals: fresh cache -> provider -> error.
//! Policy rate: provider -> configured constant, tagged `Fallback`.
//!
//! Every degraded answer is logged at `warn` and carries its `DataSource`,
//! so it never looks like fetched data.

use std::collections::BTreeMap;

use thiserror::Error;

use super::cache::ResponseCache;
use super::provider::{
    DataError, DataSource, DownloadProgress, FundamentalsProvider, MacroProvider, RateProvider,
    Sourced,
};
use super::synthetic;
use crate::config::{DataConfig, RatesConfig, ValuationConfig};
use crate::domain::{Fundamentals, Indicator};
use crate::table::{LongTable, TableError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for {what} and no network access (use --synthetic for synthetic data)")]
    NoCachedDataOffline { what: String },

    #[error("no data for {what}: {reason}")]
    FetchFailed { what: String, reason: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start_year: i32,
    pub end_year: i32,
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic series when real data is unavailable.
    pub synthetic: bool,
    /// Ignore fresh cache entries and refetch.
    pub force: bool,
}

impl LoadOptions {
    pub fn from_config(data: &DataConfig) -> Self {
        Self {
            start_year: data.start_year,
            end_year: data.resolved_end_year(),
            offline: false,
            synthetic: false,
            force: false,
        }
    }
}

/// Long table for a set of indicators plus per-indicator provenance.
#[derive(Debug, Clone, Default)]
pub struct MacroPanel {
    pub table: LongTable,
    /// Row count and source per indicator.
    pub sources: BTreeMap<Indicator, Sourced<usize>>,
    /// Indicators the provider has no data for in this window.
    pub missing: Vec<Indicator>,
}

impl MacroPanel {
    pub fn has_synthetic(&self) -> bool {
        self.sources
            .values()
            .any(|s| s.source == DataSource::Synthetic)
    }

    pub fn is_degraded(&self) -> bool {
        self.sources
            .values()
            .any(|s| s.source.is_degraded() || s.note.is_some())
    }

    pub fn source_of(&self, indicator: Indicator) -> Option<DataSource> {
        self.sources.get(&indicator).map(|s| s.source)
    }
}

fn describe(indicator: Indicator, countries: &[&str]) -> String {
    format!("{} [{}]", indicator.code(), countries.join(","))
}

/// Resolve every indicator for `countries` into one long table.
pub fn load_macro_panel(
    indicators: &[Indicator],
    countries: &[&str],
    cache: &ResponseCache,
    provider: Option<&dyn MacroProvider>,
    progress: Option<&dyn DownloadProgress>,
    opts: &LoadOptions,
) -> Result<MacroPanel, LoadError> {
    let provider_name = provider.map(|p| p.name()).unwrap_or("world_bank");
    let total = indicators.len();
    let mut tables = Vec::with_capacity(total);
    let mut panel = MacroPanel::default();
    let mut succeeded = 0;

    for (i, &indicator) in indicators.iter().enumerate() {
        let what = describe(indicator, countries);
        let key = ResponseCache::macro_key(
            provider_name,
            indicator,
            countries,
            opts.start_year,
            opts.end_year,
        );
        if let Some(p) = progress {
            p.on_start(indicator.code(), i, total);
        }

        // Step 1: fresh cache
        if !opts.force {
            if let Some(table) = cache.get_macro(&key) {
                if let Some(p) = progress {
                    p.on_complete(indicator.code(), i, total, &Ok(()));
                }
                panel
                    .sources
                    .insert(indicator, Sourced::fetched(table.len(), DataSource::Cache));
                tables.push(table);
                succeeded += 1;
                continue;
            }
        }

        // Step 2: provider
        let mut failure: Option<String> = None;
        if !opts.offline {
            if let Some(prov) = provider.filter(|p| p.is_available()) {
                let fetched = prov.fetch_indicator(
                    indicator,
                    countries,
                    opts.start_year,
                    opts.end_year,
                );
                match fetched {
                    Ok(observations) => {
                        let table = LongTable::from_observations(&observations)?;
                        let source = prov.source();
                        if let Err(e) = cache.put_macro(&key, &what, &table, source) {
                            tracing::warn!(what = %what, error = %e, "failed to cache response");
                        }
                        if let Some(p) = progress {
                            p.on_complete(indicator.code(), i, total, &Ok(()));
                        }
                        panel
                            .sources
                            .insert(indicator, Sourced::fetched(table.len(), source));
                        tables.push(table);
                        succeeded += 1;
                        continue;
                    }
                    Err(DataError::NoData { what }) => {
                        tracing::info!(what = %what, "provider has no data");
                        if let Some(p) = progress {
                            p.on_complete(
                                indicator.code(),
                                i,
                                total,
                                &Err(DataError::NoData { what }),
                            );
                        }
                        panel.missing.push(indicator);
                        continue;
                    }
                    Err(e) => {
                        failure = Some(e.to_string());
                        if let Some(p) = progress {
                            p.on_complete(indicator.code(), i, total, &Err(e));
                        }
                    }
                }
            } else if provider.is_some() {
                failure = Some(format!("{provider_name} unavailable (circuit breaker open)"));
            }
        }

        // Step 3: stale cache beats nothing
        if let Some((table, meta)) = cache.get_macro_any(&key) {
            let note = format!("stale cache from {}", meta.cached_at.format("%Y-%m-%d %H:%M"));
            tracing::warn!(what = %what, note = %note, "using stale cache entry");
            panel
                .sources
                .insert(indicator, Sourced::fallback(table.len(), note));
            tables.push(table);
            succeeded += 1;
            continue;
        }

        // Step 4: synthetic
        if opts.synthetic {
            tracing::warn!(what = %what, "generating synthetic data; results are tagged synthetic");
            let observations = countries
                .iter()
                .flat_map(|c| synthetic::synthetic_series(c, indicator, opts.start_year, opts.end_year))
                .collect::<Vec<_>>();
            let table = LongTable::from_observations(&observations)?;
            panel.sources.insert(
                indicator,
                Sourced {
                    value: table.len(),
                    source: DataSource::Synthetic,
                    note: failure.clone(),
                },
            );
            tables.push(table);
            succeeded += 1;
            continue;
        }

        // Step 5: fail
        if let Some(p) = progress {
            p.on_batch_complete(succeeded, total - succeeded, total);
        }
        if opts.offline || provider.is_none() {
            return Err(LoadError::NoCachedDataOffline { what });
        }
        return Err(LoadError::FetchFailed {
            what,
            reason: failure.unwrap_or_else(|| "download failed".into()),
        });
    }

    if let Some(p) = progress {
        p.on_batch_complete(succeeded, total - succeeded, total);
    }

    panel.table = LongTable::concat(tables.iter())?;
    Ok(panel)
}

/// Fundamentals for one ticker: fresh cache, then provider.
pub fn load_fundamentals(
    symbol: &str,
    cache: &ResponseCache,
    provider: Option<&dyn FundamentalsProvider>,
    opts: &LoadOptions,
) -> Result<Sourced<Fundamentals>, LoadError> {
    if !opts.force {
        if let Some(f) = cache.get_fundamentals(symbol) {
            tracing::debug!(symbol, "fundamentals cache hit");
            return Ok(Sourced::fetched(f, DataSource::Cache));
        }
    }

    let provider = match provider {
        Some(p) if !opts.offline => p,
        _ => {
            return Err(LoadError::NoCachedDataOffline {
                what: format!("fundamentals {symbol}"),
            })
        }
    };

    let fundamentals = provider.fetch_fundamentals(symbol)?;
    if let Err(e) = cache.put_fundamentals(&fundamentals) {
        tracing::warn!(symbol, error = %e, "failed to cache fundamentals");
    }
    Ok(Sourced::fetched(fundamentals, DataSource::YahooFinance))
}

/// Current policy rate in percent, or the configured constant.
pub fn resolve_policy_rate(
    country: &str,
    provider: Option<&dyn RateProvider>,
    rates: &RatesConfig,
    opts: &LoadOptions,
) -> Sourced<f64> {
    let fallback = |reason: String| {
        tracing::warn!(
            country,
            rate = rates.nominal_fallback,
            reason = %reason,
            "using fallback policy rate"
        );
        Sourced::fallback(rates.nominal_fallback, reason)
    };

    if opts.offline {
        return fallback("offline".into());
    }
    let Some(provider) = provider else {
        return fallback("no rate provider configured".into());
    };

    match provider.latest_rate(country) {
        Ok(Some(point)) => Sourced {
            value: point.rate,
            source: DataSource::CentralBankCsv,
            note: Some(format!("as of {}", point.date)),
        },
        Ok(None) => fallback(format!("no policy-rate series configured for {country}")),
        Err(e) => fallback(e.to_string()),
    }
}

/// Risk-free rate as a fraction: the policy rate when fetched, otherwise
/// `valuation.risk_free_fallback`.
pub fn resolve_risk_free(
    country: &str,
    provider: Option<&dyn RateProvider>,
    rates: &RatesConfig,
    valuation: &ValuationConfig,
    opts: &LoadOptions,
) -> Sourced<f64> {
    let policy = resolve_policy_rate(country, provider, rates, opts);
    risk_free_from_policy(policy, valuation)
}

/// Convert an already-resolved policy rate (percent) into a risk-free fraction.
pub fn risk_free_from_policy(policy: Sourced<f64>, valuation: &ValuationConfig) -> Sourced<f64> {
    if policy.source == DataSource::Fallback {
        Sourced {
            value: valuation.risk_free_fallback,
            source: DataSource::Fallback,
            note: policy.note,
        }
    } else {
        policy.map(|pct| pct / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::RatePoint;
    use crate::domain::Observation;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_cache_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir =
            std::env::temp_dir().join(format!("macrolens_loader_{}_{id}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn opts() -> LoadOptions {
        LoadOptions {
            start_year: 2020,
            end_year: 2022,
            offline: false,
            synthetic: false,
            force: false,
        }
    }

    struct FakeMacro {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeMacro {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl MacroProvider for FakeMacro {
        fn name(&self) -> &str {
            "fake"
        }

        fn source(&self) -> DataSource {
            DataSource::WorldBank
        }

        fn fetch_indicator(
            &self,
            indicator: Indicator,
            countries: &[&str],
            start_year: i32,
            end_year: i32,
        ) -> Result<Vec<Observation>, DataError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                return Err(DataError::NetworkUnreachable("down".into()));
            }
            if indicator == Indicator::GovernmentDebt {
                return Err(DataError::NoData {
                    what: indicator.code().into(),
                });
            }
            Ok(countries
                .iter()
                .flat_map(|c| {
                    (start_year..=end_year).map(move |y| Observation::new(*c, indicator.code(), y, 1.0))
                })
                .collect())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn fetches_then_serves_from_cache() {
        let dir = temp_cache_dir();
        let cache = ResponseCache::new(&dir);
        let provider = FakeMacro {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let indicators = [Indicator::GdpGrowth, Indicator::Inflation];

        let first =
            load_macro_panel(&indicators, &["USA", "DEU"], &cache, Some(&provider), None, &opts())
                .unwrap();
        assert_eq!(first.table.len(), 2 * 2 * 3);
        assert_eq!(first.source_of(Indicator::GdpGrowth), Some(DataSource::WorldBank));

        let second =
            load_macro_panel(&indicators, &["DEU", "USA"], &cache, Some(&provider), None, &opts())
                .unwrap();
        assert_eq!(second.source_of(Indicator::Inflation), Some(DataSource::Cache));
        assert_eq!(provider.calls.load(Ordering::Relaxed), 2);
        assert!(!second.is_degraded());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn no_data_is_reported_as_missing() {
        let dir = temp_cache_dir();
        let cache = ResponseCache::new(&dir);
        let provider = FakeMacro {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let panel = load_macro_panel(
            &[Indicator::GdpGrowth, Indicator::GovernmentDebt],
            &["USA"],
            &cache,
            Some(&provider),
            None,
            &opts(),
        )
        .unwrap();
        assert_eq!(panel.missing, vec![Indicator::GovernmentDebt]);
        assert_eq!(panel.table.len(), 3);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failure_falls_back_to_synthetic_only_when_enabled() {
        let dir = temp_cache_dir();
        let cache = ResponseCache::new(&dir);
        let provider = FakeMacro {
            calls: AtomicUsize::new(0),
            fail: true,
        };

        let err = load_macro_panel(&[Indicator::Inflation], &["USA"], &cache, Some(&provider), None, &opts())
            .unwrap_err();
        assert!(matches!(err, LoadError::FetchFailed { .. }));

        let mut synthetic = opts();
        synthetic.synthetic = true;
        let panel =
            load_macro_panel(&[Indicator::Inflation], &["USA"], &cache, Some(&provider), None, &synthetic)
                .unwrap();
        assert!(panel.has_synthetic());
        assert!(panel.is_degraded());
        let src = &panel.sources[&Indicator::Inflation];
        assert!(src.note.as_deref().unwrap().contains("down"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn stale_entry_is_tagged_as_fallback() {
        let dir = temp_cache_dir();
        let fresh_cache = ResponseCache::new(&dir);
        let indicators = [Indicator::GdpGrowth];
        load_macro_panel(&indicators, &["USA"], &fresh_cache, Some(&FakeMacro::new(false)), None, &opts())
            .unwrap();

        // Same files, but every entry is now past its TTL and the provider is down.
        let expired = ResponseCache::new(&dir).with_ttl(chrono::Duration::zero());
        let panel =
            load_macro_panel(&indicators, &["USA"], &expired, Some(&FakeMacro::new(true)), None, &opts())
                .unwrap();
        let src = &panel.sources[&Indicator::GdpGrowth];
        assert_eq!(src.source, DataSource::Fallback);
        assert!(src.note.as_deref().unwrap().starts_with("stale cache from"));
        assert!(src.source.is_degraded());
        assert!(panel.is_degraded());
        assert!(!panel.has_synthetic());
        assert_eq!(panel.table.len(), 3);
        let _ = std::fs::remove_dir_all(&dir);
    }

    /// Tags tables with whatever source it was built with.
    struct TaggedMacro(DataSource);

    impl MacroProvider for TaggedMacro {
        fn name(&self) -> &str {
            "tagged"
        }

        fn source(&self) -> DataSource {
            self.0
        }

        fn fetch_indicator(
            &self,
            indicator: Indicator,
            countries: &[&str],
            start_year: i32,
            _end_year: i32,
        ) -> Result<Vec<Observation>, DataError> {
            Ok(countries
                .iter()
                .map(|c| Observation::new(*c, indicator.code(), start_year, 2.0))
                .collect())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn fetched_tables_carry_the_provider_tag() {
        let dir = temp_cache_dir();
        let cache = ResponseCache::new(&dir);
        let provider = TaggedMacro(DataSource::Synthetic);
        let panel =
            load_macro_panel(&[Indicator::Inflation], &["USA"], &cache, Some(&provider), None, &opts())
                .unwrap();
        assert_eq!(panel.source_of(Indicator::Inflation), Some(DataSource::Synthetic));
        assert!(panel.has_synthetic());

        let entries = cache.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].meta.source, DataSource::Synthetic);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn offline_without_cache_is_an_error() {
        let dir = temp_cache_dir();
        let cache = ResponseCache::new(&dir);
        let mut offline = opts();
        offline.offline = true;
        let err = load_macro_panel(&[Indicator::GdpGrowth], &["USA"], &cache, None, None, &offline)
            .unwrap_err();
        assert!(matches!(err, LoadError::NoCachedDataOffline { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    struct FakeRates(Result<Option<f64>, ()>);

    impl RateProvider for FakeRates {
        fn name(&self) -> &str {
            "fake_rates"
        }

        fn latest_rate(&self, _country: &str) -> Result<Option<RatePoint>, DataError> {
            match self.0 {
                Ok(Some(rate)) => Ok(Some(RatePoint {
                    date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
                    rate,
                })),
                Ok(None) => Ok(None),
                Err(()) => Err(DataError::NetworkUnreachable("timeout".into())),
            }
        }
    }

    #[test]
    fn policy_rate_fallbacks_are_tagged() {
        let rates = RatesConfig::default();
        let fetched = resolve_policy_rate("USA", Some(&FakeRates(Ok(Some(4.33)))), &rates, &opts());
        assert_eq!(fetched.value, 4.33);
        assert_eq!(fetched.source, DataSource::CentralBankCsv);

        let failed = resolve_policy_rate("USA", Some(&FakeRates(Err(()))), &rates, &opts());
        assert_eq!(failed.value, rates.nominal_fallback);
        assert_eq!(failed.source, DataSource::Fallback);
        assert!(failed.note.unwrap().contains("timeout"));

        let unknown = resolve_policy_rate("BRA", Some(&FakeRates(Ok(None))), &rates, &opts());
        assert_eq!(unknown.source, DataSource::Fallback);
    }

    #[test]
    fn risk_free_is_a_fraction() {
        let rates = RatesConfig::default();
        let valuation = ValuationConfig::default();
        let rf = resolve_risk_free("USA", Some(&FakeRates(Ok(Some(4.0)))), &rates, &valuation, &opts());
        assert!((rf.value - 0.04).abs() < 1e-12);

        let fb = resolve_risk_free("USA", None, &rates, &valuation, &opts());
        assert_eq!(fb.value, valuation.risk_free_fallback);
        assert!(fb.source.is_degraded());
    }
}
