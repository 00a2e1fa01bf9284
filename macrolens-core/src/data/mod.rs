//! Data layer: providers, circuit breaker, response cache and the loader
//! that applies the fallback policy.

pub mod cache;
pub mod central_bank;
pub mod circuit_breaker;
#[cfg(test)]
pub(crate) mod fixture_server;
pub mod http;
pub mod loader;
pub mod provider;
pub mod synthetic;
pub mod worldbank;
pub mod yahoo;

pub use cache::{CacheEntry, CacheKind, CacheMeta, CleanReport, ResponseCache};
pub use central_bank::CentralBankCsvProvider;
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use loader::{
    load_fundamentals, load_macro_panel, resolve_policy_rate, resolve_risk_free,
    risk_free_from_policy, LoadError, LoadOptions, MacroPanel,
};
pub use provider::{
    DataError, DataSource, DownloadProgress, FundamentalsProvider, MacroProvider, RatePoint,
    RateProvider, SilentProgress, Sourced, StdoutProgress,
};
pub use worldbank::WorldBankProvider;
pub use yahoo::YahooProvider;
