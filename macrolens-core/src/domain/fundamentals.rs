//! Company fundamentals, fetched fresh per ticker.

use serde::{Deserialize, Serialize};

/// Flat record of the fundamentals the scorecard needs.
///
/// Monetary fields are in the quote currency; ratios are fractions
/// (0.12 = 12%) except `trailing_pe` and `current_ratio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,
    pub name: Option<String>,
    pub currency: Option<String>,
    pub price: f64,
    pub trailing_pe: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub total_debt: f64,
    pub total_cash: f64,
    pub shares_outstanding: f64,

    // Checklist inputs
    pub dividend_rate: Option<f64>,
    pub beta: Option<f64>,
    pub net_income: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub current_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub gross_margin: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
}

impl Fundamentals {
    /// Minimal record with every optional field unset.
    pub fn new(symbol: impl Into<String>, price: f64, shares_outstanding: f64) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            currency: None,
            price,
            trailing_pe: None,
            free_cash_flow: None,
            total_debt: 0.0,
            total_cash: 0.0,
            shares_outstanding,
            dividend_rate: None,
            beta: None,
            net_income: None,
            operating_cash_flow: None,
            return_on_assets: None,
            current_ratio: None,
            debt_to_equity: None,
            gross_margin: None,
            revenue_growth: None,
            earnings_growth: None,
        }
    }

    pub fn market_cap(&self) -> f64 {
        self.price * self.shares_outstanding
    }

    pub fn net_debt(&self) -> f64 {
        self.total_debt - self.total_cash
    }

    pub fn fcf_per_share(&self) -> Option<f64> {
        if self.shares_outstanding <= 0.0 {
            return None;
        }
        self.free_cash_flow.map(|fcf| fcf / self.shares_outstanding)
    }

    /// FCF divided by market cap.
    pub fn fcf_yield(&self) -> Option<f64> {
        let cap = self.market_cap();
        if cap <= 0.0 {
            return None;
        }
        self.free_cash_flow.map(|fcf| fcf / cap)
    }
}
