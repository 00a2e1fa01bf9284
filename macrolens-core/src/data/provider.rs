//! Provider traits, provenance tags and structured error types.
//!
//! Each upstream (macro statistics, quotes, central-bank CSV) sits behind a
//! trait so the loader can swap implementations and tests can mock them. The
//! response cache sits above these traits; providers don't know about it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Fundamentals, Indicator, Observation};

/// Structured error types for data operations.
///
/// These are designed to be displayable in both CLI and TUI contexts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no data available for {what}")]
    NoData { what: String },

    #[error("hard stop: {provider} has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped { provider: String },

    #[error("{provider} rejected the request as unauthorized (HTTP 401)")]
    Unauthorized { provider: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("csv error: {0}")]
    CsvError(String),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// True for errors where falling back to a default is reasonable.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::RateLimited { .. }
                | DataError::CircuitBreakerTripped { .. }
        )
    }
}

/// Where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    WorldBank,
    YahooFinance,
    CentralBankCsv,
    Cache,
    Synthetic,
    /// A configured constant stood in for a failed fetch.
    Fallback,
}

impl DataSource {
    pub fn label(self) -> &'static str {
        match self {
            DataSource::WorldBank => "World Bank",
            DataSource::YahooFinance => "Yahoo Finance",
            DataSource::CentralBankCsv => "central bank CSV",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
            DataSource::Fallback => "fallback",
        }
    }

    /// Degraded sources must be shown as such.
    pub fn is_degraded(self) -> bool {
        matches!(self, DataSource::Synthetic | DataSource::Fallback)
    }
}

/// A value tagged with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: DataSource,
    /// Why a fallback or synthetic value was used.
    pub note: Option<String>,
}

impl<T> Sourced<T> {
    pub fn fetched(value: T, source: DataSource) -> Self {
        Self {
            value,
            source,
            note: None,
        }
    }

    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            source: DataSource::Fallback,
            note: Some(reason.into()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced {
            value: f(self.value),
            source: self.source,
            note: self.note,
        }
    }
}

/// A single policy-rate reading, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub rate: f64,
}

/// Macro statistics source (World Bank and friends).
pub trait MacroProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Provenance tag for tables this provider returns.
    fn source(&self) -> DataSource;

    /// Fetch one indicator for a set of countries over an inclusive year range.
    fn fetch_indicator(
        &self,
        indicator: Indicator,
        countries: &[&str],
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<Observation>, DataError>;

    /// False while rate-limited or blocked.
    fn is_available(&self) -> bool;
}

/// Market-data source for company fundamentals.
pub trait FundamentalsProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, DataError>;

    fn is_available(&self) -> bool;
}

/// Policy-rate source. `Ok(None)` means the country has no configured series.
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;

    fn latest_rate(&self, country: &str) -> Result<Option<RatePoint>, DataError>;
}

/// Progress callback for multi-item operations.
pub trait DownloadProgress: Send {
    /// Called when starting to fetch an item.
    fn on_start(&self, item: &str, index: usize, total: usize);

    /// Called when an item completes.
    fn on_complete(&self, item: &str, index: usize, total: usize, result: &Result<(), DataError>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl DownloadProgress for StdoutProgress {
    fn on_start(&self, item: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {item}...", index + 1, total);
    }

    fn on_complete(&self, item: &str, _index: usize, _total: usize, result: &Result<(), DataError>) {
        match result {
            Ok(()) => println!("  OK: {item}"),
            Err(e) => println!("  FAIL: {item}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nFetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that does nothing.
pub struct SilentProgress;

impl DownloadProgress for SilentProgress {
    fn on_start(&self, _item: &str, _index: usize, _total: usize) {}
    fn on_complete(&self, _item: &str, _index: usize, _total: usize, _result: &Result<(), DataError>) {}
    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_tagged_and_degraded() {
        let rate = Sourced::fallback(5.25, "FRED unreachable");
        assert_eq!(rate.source, DataSource::Fallback);
        assert!(rate.source.is_degraded());
        assert_eq!(rate.note.as_deref(), Some("FRED unreachable"));
    }

    #[test]
    fn map_keeps_provenance() {
        let pct = Sourced::fetched(4.0, DataSource::CentralBankCsv).map(|r| r / 100.0);
        assert_eq!(pct.value, 0.04);
        assert_eq!(pct.source, DataSource::CentralBankCsv);
        assert!(!pct.source.is_degraded());
    }

    #[test]
    fn transient_errors() {
        assert!(DataError::NetworkUnreachable("x".into()).is_transient());
        assert!(DataError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(!DataError::NoData { what: "x".into() }.is_transient());
    }
}
