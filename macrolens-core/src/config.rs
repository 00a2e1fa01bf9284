//! Dashboard configuration, loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! usable configuration. Values that the valuation and projection code would
//! otherwise reject are caught up front by [`DashboardConfig::validate`].

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::CountrySet;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataConfig,
    pub countries: CountrySet,
    pub valuation: ValuationConfig,
    pub rates: RatesConfig,
}

/// Fetch window and response cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub cache_dir: PathBuf,
    /// Cached responses older than this are refetched.
    pub ttl_hours: u64,
    pub start_year: i32,
    /// Defaults to last calendar year.
    pub end_year: Option<i32>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data"),
            ttl_hours: 24,
            start_year: 2000,
            end_year: None,
        }
    }
}

impl DataConfig {
    pub fn resolved_end_year(&self) -> i32 {
        self.end_year
            .unwrap_or_else(|| chrono::Local::now().year() - 1)
    }
}

/// Inputs to the DCF, Gordon growth and scorecard.
///
/// Rates and growths are fractions (0.04 = 4%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Used when the policy-rate download fails.
    pub risk_free_fallback: f64,
    pub equity_risk_premium: f64,
    /// Used when the quote has no beta.
    pub default_beta: f64,
    pub stage_one_years: u32,
    pub stage_one_growth: f64,
    pub terminal_growth: f64,
    pub sensitivity_rate_step: f64,
    pub sensitivity_growth_step: f64,
    /// Upside needed before a stock is called undervalued.
    pub margin_of_safety: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            risk_free_fallback: 0.04,
            equity_risk_premium: 0.055,
            default_beta: 1.0,
            stage_one_years: 5,
            stage_one_growth: 0.05,
            terminal_growth: 0.025,
            sensitivity_rate_step: 0.01,
            sensitivity_growth_step: 0.005,
            margin_of_safety: 0.15,
        }
    }
}

/// Policy-rate sources and real-rate projection defaults.
///
/// Rates here are percentages (5.25 = 5.25%) to match the CSV feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub nominal_fallback: f64,
    /// FRED series id per ISO3 country code.
    pub fred_series: BTreeMap<String, String>,
    pub horizon_months: u32,
}

impl Default for RatesConfig {
    fn default() -> Self {
        let mut fred_series = BTreeMap::new();
        fred_series.insert("USA".to_string(), "FEDFUNDS".to_string());
        fred_series.insert("GBR".to_string(), "IUDSOIA".to_string());
        fred_series.insert("JPN".to_string(), "IRSTCI01JPM156N".to_string());
        fred_series.insert("CAN".to_string(), "IRSTCI01CAM156N".to_string());
        fred_series.insert("DEU".to_string(), "ECBDFR".to_string());
        fred_series.insert("FRA".to_string(), "ECBDFR".to_string());
        fred_series.insert("ITA".to_string(), "ECBDFR".to_string());
        fred_series.insert("ESP".to_string(), "ECBDFR".to_string());
        Self {
            nominal_fallback: 5.25,
            fred_series,
            horizon_months: 12,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise `macrolens.toml` in the working
    /// directory if present, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let local = Path::new("macrolens.toml");
                if local.exists() {
                    Self::from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.data.ttl_hours == 0 {
            return invalid("data.ttl_hours must be at least 1".into());
        }
        let end = self.data.resolved_end_year();
        if self.data.start_year > end {
            return invalid(format!(
                "data.start_year ({}) is after end year ({end})",
                self.data.start_year
            ));
        }

        let v = &self.valuation;
        if v.stage_one_years == 0 {
            return invalid("valuation.stage_one_years must be at least 1".into());
        }
        if v.sensitivity_rate_step <= 0.0 || v.sensitivity_growth_step <= 0.0 {
            return invalid("valuation sensitivity steps must be positive".into());
        }
        if v.margin_of_safety < 0.0 {
            return invalid("valuation.margin_of_safety must not be negative".into());
        }
        let baseline_rate = v.risk_free_fallback + v.default_beta * v.equity_risk_premium;
        if v.terminal_growth >= baseline_rate {
            return invalid(format!(
                "valuation.terminal_growth ({:.4}) must be below the baseline discount rate ({baseline_rate:.4})",
                v.terminal_growth
            ));
        }

        if !(1..=24).contains(&self.rates.horizon_months) {
            return invalid("rates.horizon_months must be between 1 and 24".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = DashboardConfig::from_toml("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.valuation.stage_one_years, 5);
        assert_eq!(config.rates.fred_series.get("USA").unwrap(), "FEDFUNDS");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = DashboardConfig::from_toml(
            r#"
[data]
ttl_hours = 6
start_year = 2010
end_year = 2020

[valuation]
terminal_growth = 0.02
"#,
        )
        .unwrap();
        assert_eq!(config.data.ttl_hours, 6);
        assert_eq!(config.data.resolved_end_year(), 2020);
        assert_eq!(config.valuation.terminal_growth, 0.02);
        assert_eq!(config.valuation.equity_risk_premium, 0.055);
    }

    #[test]
    fn custom_countries_replace_default_world() {
        let config = DashboardConfig::from_toml(
            r#"
[countries.regions]
Nordics = [
    { code = "SWE", name = "Sweden" },
    { code = "NOR", name = "Norway" },
]
"#,
        )
        .unwrap();
        assert_eq!(config.countries.region_names(), vec!["Nordics"]);
        assert_eq!(config.countries.country_count(), 2);
    }

    #[test]
    fn rejects_terminal_growth_above_discount_rate() {
        let err = DashboardConfig::from_toml(
            r#"
[valuation]
terminal_growth = 0.2
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_inverted_year_range() {
        let err = DashboardConfig::from_toml(
            r#"
[data]
start_year = 2020
end_year = 2010
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("start_year"));
    }

    #[test]
    fn rejects_horizon_outside_range() {
        let err = DashboardConfig::from_toml("[rates]\nhorizon_months = 36\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = DashboardConfig::from_toml("[data\nttl_hours = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
