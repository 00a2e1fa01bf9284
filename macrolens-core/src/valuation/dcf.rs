//! Two-stage discounted cash flow.
//!
//! Stage one grows free cash flow at `growth` for `years` years. Stage two is
//! a Gordon terminal value at year `years`, `FCF_n (1 + gt) / (r - gt)`.
//! Everything is discounted at `discount_rate`.

use serde::{Deserialize, Serialize};

use super::ValuationError;
use crate::domain::Fundamentals;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfInputs {
    /// Trailing free cash flow (year 0).
    pub base_fcf: f64,
    pub growth: f64,
    pub years: u32,
    pub terminal_growth: f64,
    pub discount_rate: f64,
    pub total_debt: f64,
    pub total_cash: f64,
    pub shares_outstanding: f64,
}

impl DcfInputs {
    pub fn from_fundamentals(
        fundamentals: &Fundamentals,
        discount_rate: f64,
        growth: f64,
        terminal_growth: f64,
        years: u32,
    ) -> Result<Self, ValuationError> {
        let base_fcf = fundamentals
            .free_cash_flow
            .ok_or(ValuationError::MissingInput("free cash flow"))?;
        Ok(Self {
            base_fcf,
            growth,
            years,
            terminal_growth,
            discount_rate,
            total_debt: fundamentals.total_debt,
            total_cash: fundamentals.total_cash,
            shares_outstanding: fundamentals.shares_outstanding,
        })
    }

    pub fn with_rates(mut self, discount_rate: f64, terminal_growth: f64) -> Self {
        self.discount_rate = discount_rate;
        self.terminal_growth = terminal_growth;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfYear {
    pub year: u32,
    pub fcf: f64,
    pub discounted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfResult {
    pub years: Vec<DcfYear>,
    pub pv_stage_one: f64,
    pub terminal_value: f64,
    pub pv_terminal: f64,
    pub enterprise_value: f64,
    pub equity_value: f64,
    pub per_share: f64,
}

impl DcfResult {
    /// Share of enterprise value coming from the terminal value.
    pub fn terminal_weight(&self) -> Option<f64> {
        (self.enterprise_value != 0.0).then(|| self.pv_terminal / self.enterprise_value)
    }
}

pub fn two_stage_dcf(inputs: &DcfInputs) -> Result<DcfResult, ValuationError> {
    let DcfInputs {
        base_fcf,
        growth,
        years,
        terminal_growth,
        discount_rate,
        total_debt,
        total_cash,
        shares_outstanding,
    } = *inputs;

    let all_finite = [
        base_fcf,
        growth,
        terminal_growth,
        discount_rate,
        total_debt,
        total_cash,
        shares_outstanding,
    ]
    .iter()
    .all(|v| v.is_finite());
    if !all_finite {
        return Err(ValuationError::InvalidInput("non-finite DCF input".into()));
    }
    if years == 0 {
        return Err(ValuationError::ZeroYears);
    }
    if shares_outstanding <= 0.0 {
        return Err(ValuationError::NonPositiveShares);
    }
    if discount_rate <= terminal_growth {
        return Err(ValuationError::RateNotAboveGrowth {
            rate: discount_rate,
            growth: terminal_growth,
        });
    }
    if discount_rate <= -1.0 {
        return Err(ValuationError::InvalidInput(format!(
            "discount rate {discount_rate} is below -100%"
        )));
    }

    let mut projected = Vec::with_capacity(years as usize);
    let mut fcf = base_fcf;
    let mut factor = 1.0;
    for year in 1..=years {
        fcf *= 1.0 + growth;
        factor *= 1.0 + discount_rate;
        projected.push(DcfYear {
            year,
            fcf,
            discounted: fcf / factor,
        });
    }

    let pv_stage_one: f64 = projected.iter().map(|y| y.discounted).sum();
    let terminal_value = fcf * (1.0 + terminal_growth) / (discount_rate - terminal_growth);
    let pv_terminal = terminal_value / factor;
    let enterprise_value = pv_stage_one + pv_terminal;
    let equity_value = enterprise_value - total_debt + total_cash;

    Ok(DcfResult {
        years: projected,
        pv_stage_one,
        terminal_value,
        pv_terminal,
        enterprise_value,
        equity_value,
        per_share: equity_value / shares_outstanding,
    })
}
