//! MacroLens Core: macro indicators, equity fundamentals, reshaping,
//! analytics and valuation.
//!
//! This crate holds everything the dashboard front ends share:
//! - Domain types (indicators, countries, observations, fundamentals)
//! - TOML configuration
//! - Providers for the World Bank API, Yahoo quoteSummary and FRED CSV,
//!   behind a circuit breaker and an on-disk response cache
//! - Long/wide reshaping on Polars
//! - Health score, recession alerts and real-rate projection
//! - Gordon growth, two-stage DCF, checklist, sensitivity grid, scorecard

pub mod analytics;
pub mod config;
pub mod data;
pub mod domain;
pub mod table;
pub mod valuation;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed to the TUI worker thread and the
    /// rayon screen pool are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Fundamentals>();
        require_sync::<domain::Fundamentals>();
        require_send::<domain::CountrySet>();
        require_sync::<domain::CountrySet>();

        require_send::<config::DashboardConfig>();
        require_sync::<config::DashboardConfig>();

        require_send::<table::LongTable>();
        require_sync::<table::LongTable>();

        require_send::<data::MacroPanel>();
        require_sync::<data::MacroPanel>();
        require_send::<data::ResponseCache>();
        require_sync::<data::ResponseCache>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::WorldBankProvider>();
        require_sync::<data::WorldBankProvider>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CentralBankCsvProvider>();
        require_sync::<data::CentralBankCsvProvider>();
        require_send::<data::DataError>();

        require_send::<analytics::HealthScore>();
        require_send::<analytics::Alert>();
        require_send::<analytics::RealRateProjection>();

        require_send::<valuation::Scorecard>();
        require_sync::<valuation::Scorecard>();
    }

    /// Providers are usable as trait objects so the loader can take
    /// `Option<&dyn _>` and tests can substitute fakes.
    #[test]
    fn providers_are_object_safe() {
        fn _macro(p: &dyn data::MacroProvider) -> &str {
            p.name()
        }
        fn _fundamentals(p: &dyn data::FundamentalsProvider) -> &str {
            p.name()
        }
        fn _rates(p: &dyn data::RateProvider) -> &str {
            p.name()
        }
    }
}
