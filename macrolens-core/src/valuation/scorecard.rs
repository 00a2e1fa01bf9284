//! Per-ticker valuation scorecard.

use serde::Serialize;

use super::dcf::{two_stage_dcf, DcfInputs, DcfResult};
use super::gordon::{capm_discount_rate, gordon_growth};
use super::piotroski::{piotroski_checklist, Checklist};
use super::sensitivity::{sensitivity_matrix, SensitivityMatrix};
use super::ValuationError;
use crate::config::ValuationConfig;
use crate::data::Sourced;
use crate::domain::Fundamentals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Undervalued,
    FairlyValued,
    Overvalued,
}

impl Verdict {
    /// Classify upside (fraction) against a margin of safety.
    pub fn from_upside(upside: f64, margin: f64) -> Self {
        if upside >= margin {
            Verdict::Undervalued
        } else if upside <= -margin {
            Verdict::Overvalued
        } else {
            Verdict::FairlyValued
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Undervalued => "Undervalued",
            Verdict::FairlyValued => "Fairly valued",
            Verdict::Overvalued => "Overvalued",
        }
    }
}

/// Per-run overrides of the configured valuation defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValuationOverrides {
    pub growth: Option<f64>,
    pub terminal_growth: Option<f64>,
    pub discount_rate: Option<f64>,
    pub years: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scorecard {
    pub symbol: String,
    pub name: Option<String>,
    pub price: f64,
    pub discount_rate: f64,
    /// How the discount rate was obtained.
    pub discount_basis: String,
    pub risk_free: Sourced<f64>,
    pub beta: f64,
    pub dcf: DcfResult,
    pub gordon_value: Option<f64>,
    /// `dcf.per_share / price - 1`
    pub upside: f64,
    pub verdict: Verdict,
    pub trailing_pe: Option<f64>,
    pub fcf_yield: Option<f64>,
    pub checklist: Checklist,
    pub sensitivity: SensitivityMatrix,
}

impl Scorecard {
    pub fn build(
        fundamentals: &Fundamentals,
        risk_free: &Sourced<f64>,
        config: &ValuationConfig,
        overrides: &ValuationOverrides,
    ) -> Result<Self, ValuationError> {
        if fundamentals.price <= 0.0 || !fundamentals.price.is_finite() {
            return Err(ValuationError::InvalidInput(format!(
                "price must be positive, got {}",
                fundamentals.price
            )));
        }

        let beta = fundamentals.beta.unwrap_or(config.default_beta);
        let (discount_rate, discount_basis) = match overrides.discount_rate {
            Some(r) => (r, "override".to_string()),
            None => {
                let r = capm_discount_rate(risk_free.value, beta, config.equity_risk_premium);
                let beta_note = if fundamentals.beta.is_some() {
                    "beta"
                } else {
                    "default beta"
                };
                (
                    r,
                    format!(
                        "CAPM: rf {:.2}% ({}) + {beta_note} {beta:.2} x ERP {:.2}%",
                        risk_free.value * 100.0,
                        risk_free.source.label(),
                        config.equity_risk_premium * 100.0
                    ),
                )
            }
        };
        let growth = overrides.growth.unwrap_or(config.stage_one_growth);
        let terminal_growth = overrides.terminal_growth.unwrap_or(config.terminal_growth);
        let years = overrides.years.unwrap_or(config.stage_one_years);

        let inputs = DcfInputs::from_fundamentals(
            fundamentals,
            discount_rate,
            growth,
            terminal_growth,
            years,
        )?;
        let dcf = two_stage_dcf(&inputs)?;
        let sensitivity = sensitivity_matrix(
            &inputs,
            config.sensitivity_rate_step,
            config.sensitivity_growth_step,
        )?;

        let gordon_value = fundamentals
            .dividend_rate
            .filter(|d| *d > 0.0)
            .and_then(|d| gordon_growth(d, discount_rate, terminal_growth).ok());

        let upside = dcf.per_share / fundamentals.price - 1.0;

        Ok(Self {
            symbol: fundamentals.symbol.clone(),
            name: fundamentals.name.clone(),
            price: fundamentals.price,
            discount_rate,
            discount_basis,
            risk_free: risk_free.clone(),
            beta,
            gordon_value,
            upside,
            verdict: Verdict::from_upside(upside, config.margin_of_safety),
            trailing_pe: fundamentals.trailing_pe,
            fcf_yield: fundamentals.fcf_yield(),
            checklist: piotroski_checklist(fundamentals),
            sensitivity,
            dcf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataSource;

    fn fundamentals() -> Fundamentals {
        let mut f = Fundamentals::new("ACME", 50.0, 1_000.0);
        f.free_cash_flow = Some(4_000.0);
        f.total_debt = 2_000.0;
        f.total_cash = 1_000.0;
        f.beta = Some(1.2);
        f.dividend_rate = Some(1.0);
        f.trailing_pe = Some(18.0);
        f
    }

    #[test]
    fn verdict_thresholds() {
        assert_eq!(Verdict::from_upside(0.15, 0.15), Verdict::Undervalued);
        assert_eq!(Verdict::from_upside(0.10, 0.15), Verdict::FairlyValued);
        assert_eq!(Verdict::from_upside(-0.15, 0.15), Verdict::Overvalued);
    }

    #[test]
    fn capm_rate_from_beta() {
        let rf = Sourced::fetched(0.04, DataSource::CentralBankCsv);
        let card = Scorecard::build(
            &fundamentals(),
            &rf,
            &ValuationConfig::default(),
            &ValuationOverrides::default(),
        )
        .unwrap();
        assert!((card.discount_rate - (0.04 + 1.2 * 0.055)).abs() < 1e-12);
        assert!(card.discount_basis.starts_with("CAPM"));
        assert_eq!(card.sensitivity.center(), Some(card.dcf.per_share));
        assert!(card.gordon_value.is_some());
        assert_eq!(card.fcf_yield, Some(0.08));
        assert!((card.upside - (card.dcf.per_share / 50.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn overrides_win() {
        let rf = Sourced::fallback(0.04, "offline");
        let overrides = ValuationOverrides {
            discount_rate: Some(0.12),
            years: Some(3),
            ..Default::default()
        };
        let card =
            Scorecard::build(&fundamentals(), &rf, &ValuationConfig::default(), &overrides).unwrap();
        assert_eq!(card.discount_rate, 0.12);
        assert_eq!(card.discount_basis, "override");
        assert_eq!(card.dcf.years.len(), 3);
    }

    #[test]
    fn missing_fcf_is_an_error() {
        let mut f = fundamentals();
        f.free_cash_flow = None;
        let rf = Sourced::fetched(0.04, DataSource::Cache);
        let err = Scorecard::build(&f, &rf, &ValuationConfig::default(), &ValuationOverrides::default())
            .unwrap_err();
        assert_eq!(err, ValuationError::MissingInput("free cash flow"));
    }
}
