//! World Bank indicators API (v2, JSON).
//!
//! Responses are a two-element array `[page_meta, rows]`. Errors come back as
//! a one-element array holding a `message` list, usually with HTTP 200.
//! Rows with a `null` value are gaps in the series and are dropped here.

use std::sync::Arc;

use reqwest::blocking::Client;
use serde::Deserialize;

use super::circuit_breaker::CircuitBreaker;
use super::http::{self, RetryPolicy};
use super::provider::{DataError, DataSource, MacroProvider};
use crate::domain::{Indicator, Observation};

const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";
const PER_PAGE: u32 = 1000;

#[derive(Debug, Deserialize)]
struct PageMeta {
    page: u32,
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct IdValue {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Row {
    indicator: IdValue,
    country: IdValue,
    #[serde(default)]
    countryiso3code: String,
    date: String,
    value: Option<f64>,
}

/// One parsed page of results.
#[derive(Debug)]
pub(crate) struct Page {
    pub page: u32,
    pub pages: u32,
    pub observations: Vec<Observation>,
}

pub struct WorldBankProvider {
    client: Client,
    circuit_breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    base_url: String,
}

impl WorldBankProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            client: http::build_client()?,
            circuit_breaker,
            retry: RetryPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point at a different host (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn indicator_url(
        &self,
        indicator: Indicator,
        countries: &[&str],
        start_year: i32,
        end_year: i32,
        page: u32,
    ) -> String {
        format!(
            "{}/country/{}/indicator/{}?format=json&date={start_year}:{end_year}&per_page={PER_PAGE}&page={page}",
            self.base_url,
            countries.join(";"),
            indicator.code(),
        )
    }

    /// Parse one response body into a page of observations.
    pub(crate) fn parse_page(body: &str) -> Result<Page, DataError> {
        let parts: Vec<serde_json::Value> = serde_json::from_str(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("expected a JSON array: {e}"))
        })?;

        let mut parts = parts.into_iter();
        let head = parts
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("empty response array".into()))?;

        if head.get("message").is_some() {
            let envelope: ErrorEnvelope = serde_json::from_value(head).map_err(|e| {
                DataError::ResponseFormatChanged(format!("unreadable error payload: {e}"))
            })?;
            let detail = envelope
                .message
                .iter()
                .map(|m| format!("{}: {}", m.id, m.value.trim()))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DataError::ResponseFormatChanged(format!(
                "World Bank API error: {detail}"
            )));
        }

        let meta: PageMeta = serde_json::from_value(head)
            .map_err(|e| DataError::ResponseFormatChanged(format!("page metadata: {e}")))?;

        let rows: Vec<Row> = match parts.next() {
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(v) => serde_json::from_value(v)
                .map_err(|e| DataError::ResponseFormatChanged(format!("rows: {e}")))?,
        };

        let mut observations = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(value) = row.value else { continue };
            let year: i32 = row.date.trim().parse().map_err(|_| {
                DataError::ResponseFormatChanged(format!("non-annual date '{}'", row.date))
            })?;
            let country = if row.countryiso3code.is_empty() {
                row.country.id
            } else {
                row.countryiso3code
            };
            observations.push(Observation::new(country, row.indicator.id, year, value));
        }

        Ok(Page {
            page: meta.page,
            pages: meta.pages,
            observations,
        })
    }
}

impl MacroProvider for WorldBankProvider {
    fn name(&self) -> &str {
        "world_bank"
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
        if countries.is_empty() {
            return Ok(Vec::new());
        }

        let what = format!("{} for {}", indicator.code(), countries.join(","));
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let url = self.indicator_url(indicator, countries, start_year, end_year, page);
            let resp = http::get_with_retry(
                &self.client,
                &url,
                &self.circuit_breaker,
                self.retry,
                || DataError::NoData { what: what.clone() },
            )?;
            let body = resp
                .text()
                .map_err(|e| DataError::NetworkUnreachable(format!("reading body: {e}")))?;

            let parsed = Self::parse_page(&body)?;
            all.extend(parsed.observations);

            if parsed.page >= parsed.pages {
                break;
            }
            page += 1;
        }

        tracing::debug!(indicator = indicator.code(), rows = all.len(), "world bank fetch done");

        if all.is_empty() {
            return Err(DataError::NoData { what });
        }
        Ok(all)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
