//! Yahoo Finance fundamentals provider.
//!
//! Reads the v10 quoteSummary endpoint (`price`, `summaryDetail`,
//! `defaultKeyStatistics`, `financialData` modules). Numeric fields arrive as
//! `{"raw": 1.23, "fmt": "1.23"}`, or as `{}` when Yahoo has no value.
//!
//! quoteSummary needs a session cookie plus a matching crumb: hit the cookie
//! host once, read the crumb from `v1/test/getcrumb`, and pass it as a query
//! parameter. A 401 means the crumb went stale; it is refreshed once.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; anything required that goes missing is `ResponseFormatChanged`.

use std::sync::{Arc, Mutex};

use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;

use super::circuit_breaker::CircuitBreaker;
use super::http::{self, RetryPolicy};
use super::provider::{DataError, FundamentalsProvider};
use crate::domain::Fundamentals;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData";

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryData>>,
    error: Option<SummaryError>,
}

#[derive(Debug, Deserialize)]
struct SummaryError {
    code: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SummaryData {
    price: PriceModule,
    summary_detail: SummaryDetail,
    default_key_statistics: KeyStatistics,
    financial_data: FinancialData,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct Raw {
    raw: Option<f64>,
}

fn raw(v: Option<Raw>) -> Option<f64> {
    v.and_then(|r| r.raw).filter(|x| x.is_finite())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PriceModule {
    regular_market_price: Option<Raw>,
    currency: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<Raw>,
    dividend_rate: Option<Raw>,
    beta: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct KeyStatistics {
    shares_outstanding: Option<Raw>,
    net_income_to_common: Option<Raw>,
    beta: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FinancialData {
    current_price: Option<Raw>,
    free_cashflow: Option<Raw>,
    operating_cashflow: Option<Raw>,
    total_debt: Option<Raw>,
    total_cash: Option<Raw>,
    return_on_assets: Option<Raw>,
    current_ratio: Option<Raw>,
    debt_to_equity: Option<Raw>,
    gross_margins: Option<Raw>,
    revenue_growth: Option<Raw>,
    earnings_growth: Option<Raw>,
}

pub struct YahooProvider {
    client: Client,
    circuit_breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    base_url: String,
    cookie_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            client: http::build_client()?,
            circuit_breaker,
            retry: RetryPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_url: COOKIE_URL.to_string(),
            crumb: Mutex::new(None),
        })
    }

    /// Serve both the API and the cookie handshake from one host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self.cookie_url = format!("{}/", self.base_url);
        self
    }

    fn summary_url(&self, symbol: &str, crumb: &str) -> Result<Url, DataError> {
        let mut url = Url::parse(&format!("{}/v10/finance/quoteSummary/{symbol}", self.base_url))
            .map_err(|e| DataError::Other(format!("bad quote URL for {symbol}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("modules", MODULES)
            .append_pair("crumb", crumb);
        Ok(url)
    }

    /// Cached crumb, running the cookie handshake on first use.
    fn crumb(&self) -> Result<String, DataError> {
        // Held across the handshake so parallel callers share one crumb.
        let mut cached = self.crumb.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie header matters; this host answers 404.
        self.client
            .get(&self.cookie_url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(format!("cookie handshake: {e}")))?;

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let resp = http::get_with_retry(
            &self.client,
            &url,
            &self.circuit_breaker,
            self.retry,
            || DataError::ResponseFormatChanged("crumb endpoint not found".into()),
        )?;
        let crumb = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(format!("reading crumb: {e}")))?
            .trim()
            .to_string();
        if crumb.is_empty() || crumb.contains(char::is_whitespace) || crumb.contains('<') {
            return Err(DataError::ResponseFormatChanged(
                "unexpected crumb response".into(),
            ));
        }

        tracing::debug!("yahoo crumb acquired");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    fn forget_crumb(&self) {
        *self.crumb.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn fetch_summary(&self, symbol: &str, crumb: &str) -> Result<Fundamentals, DataError> {
        let url = self.summary_url(symbol, crumb)?;
        let resp = http::get_with_retry(
            &self.client,
            url.as_str(),
            &self.circuit_breaker,
            self.retry,
            || DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
        )?;
        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(format!("reading body: {e}")))?;
        Self::parse_summary(symbol, &body)
    }

    pub(crate) fn parse_summary(symbol: &str, body: &str) -> Result<Fundamentals, DataError> {
        let resp: SummaryResponse = serde_json::from_str(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let data = match resp.quote_summary.result {
            Some(results) => results.into_iter().next(),
            None => None,
        };
        let Some(data) = data else {
            return Err(match resp.quote_summary.error {
                Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                },
                Some(err) => DataError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                )),
                None => DataError::ResponseFormatChanged("empty result with no error".into()),
            });
        };

        let fin = &data.financial_data;
        let price = raw(fin.current_price)
            .or_else(|| raw(data.price.regular_market_price))
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("no price for {symbol}")))?;
        let shares = raw(data.default_key_statistics.shares_outstanding).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("no shares outstanding for {symbol}"))
        })?;

        Ok(Fundamentals {
            symbol: symbol.to_uppercase(),
            name: data.price.long_name.or(data.price.short_name),
            currency: data.price.currency,
            price,
            trailing_pe: raw(data.summary_detail.trailing_pe),
            free_cash_flow: raw(fin.free_cashflow),
            total_debt: raw(fin.total_debt).unwrap_or(0.0),
            total_cash: raw(fin.total_cash).unwrap_or(0.0),
            shares_outstanding: shares,
            dividend_rate: raw(data.summary_detail.dividend_rate),
            beta: raw(data.summary_detail.beta).or_else(|| raw(data.default_key_statistics.beta)),
            net_income: raw(data.default_key_statistics.net_income_to_common),
            operating_cash_flow: raw(fin.operating_cashflow),
            return_on_assets: raw(fin.return_on_assets),
            current_ratio: raw(fin.current_ratio),
            // Yahoo reports debt/equity in percent.
            debt_to_equity: raw(fin.debt_to_equity).map(|d| d / 100.0),
            gross_margin: raw(fin.gross_margins),
            revenue_growth: raw(fin.revenue_growth),
            earnings_growth: raw(fin.earnings_growth),
        })
    }
}

impl FundamentalsProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, DataError> {
        let crumb = self.crumb()?;
        match self.fetch_summary(symbol, &crumb) {
            Err(DataError::Unauthorized { .. }) => {
                tracing::debug!(symbol, "crumb rejected, refreshing session");
                self.forget_crumb();
                let crumb = self.crumb()?;
                self.fetch_summary(symbol, &crumb)
            }
            other => other,
        }
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
