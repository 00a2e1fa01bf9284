//! Policy rates from a central-bank statistics CSV download (FRED graph CSV).
//!
//! The file is `date,value` with a header row. Missing observations are `.`
//! or empty; the latest valid row is the current rate.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::blocking::Client;

use super::circuit_breaker::CircuitBreaker;
use super::http::{self, RetryPolicy};
use super::provider::{DataError, RatePoint, RateProvider};

const DEFAULT_BASE_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";

pub struct CentralBankCsvProvider {
    client: Client,
    circuit_breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    base_url: String,
    /// ISO3 country code to series id.
    series: BTreeMap<String, String>,
}

impl CentralBankCsvProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        series: BTreeMap<String, String>,
    ) -> Result<Self, DataError> {
        Ok(Self {
            client: http::build_client()?,
            circuit_breaker,
            retry: RetryPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            series,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn series_for(&self, country: &str) -> Option<&str> {
        self.series
            .get(&country.to_uppercase())
            .map(|s| s.as_str())
    }

    /// Parse a `date,value` CSV body into rate points, oldest first.
    pub fn parse_csv(body: &str) -> Result<Vec<RatePoint>, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());

        let mut points = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| DataError::CsvError(format!("row {}: {e}", i + 1)))?;
            let (Some(date), Some(value)) = (record.get(0), record.get(1)) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() || value == "." {
                continue;
            }
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .map_err(|e| DataError::CsvError(format!("row {}: bad date '{date}': {e}", i + 1)))?;
            let rate: f64 = value
                .parse()
                .map_err(|e| DataError::CsvError(format!("row {}: bad value '{value}': {e}", i + 1)))?;
            points.push(RatePoint { date, rate });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

impl RateProvider for CentralBankCsvProvider {
    fn name(&self) -> &str {
        "central_bank_csv"
    }

    fn latest_rate(&self, country: &str) -> Result<Option<RatePoint>, DataError> {
        let Some(series) = self.series_for(country) else {
            return Ok(None);
        };
        let url = format!("{}?id={series}", self.base_url);
        let resp = http::get_with_retry(
            &self.client,
            &url,
            &self.circuit_breaker,
            self.retry,
            || DataError::SymbolNotFound {
                symbol: series.to_string(),
            },
        )?;
        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(format!("reading body: {e}")))?;

        let points = Self::parse_csv(&body)?;
        match points.last() {
            Some(p) => {
                tracing::debug!(country, series, rate = p.rate, date = %p.date, "policy rate");
                Ok(Some(*p))
            }
            None => Err(DataError::NoData {
                what: format!("policy rate series {series}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_skips_missing_cells() {
        let body = "observation_date,FEDFUNDS\n2024-01-01,5.33\n2024-02-01,.\n2024-03-01,5.33\n2024-04-01,\n";
        let points = CentralBankCsvProvider::parse_csv(body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn sorts_out_of_order_rows() {
        let body = "DATE,ECBDFR\n2024-06-12,3.75\n2023-09-20,4.00\n";
        let points = CentralBankCsvProvider::parse_csv(body).unwrap();
        assert_eq!(points.last().unwrap().rate, 3.75);
    }

    #[test]
    fn rejects_garbage_values() {
        let body = "DATE,X\n2024-01-01,abc\n";
        let err = CentralBankCsvProvider::parse_csv(body).unwrap_err();
        assert!(matches!(err, DataError::CsvError(_)));
    }

    #[test]
    fn unknown_country_has_no_series() {
        let cb = Arc::new(CircuitBreaker::default_provider("central_bank_csv"));
        let mut series = BTreeMap::new();
        series.insert("USA".to_string(), "FEDFUNDS".to_string());
        let provider = CentralBankCsvProvider::new(cb, series).unwrap();
        assert_eq!(provider.series_for("usa"), Some("FEDFUNDS"));
        assert_eq!(provider.latest_rate("BRA").unwrap(), None);
    }
}
