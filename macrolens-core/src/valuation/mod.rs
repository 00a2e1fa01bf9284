//! Equity valuation: Gordon growth, two-stage DCF, a Piotroski-style
//! checklist, a 3x3 sensitivity grid and the scorecard that ties them
//! together.
//!
//! Rates and growths are fractions (0.08 = 8%).

pub mod dcf;
pub mod gordon;
pub mod piotroski;
pub mod scorecard;
pub mod sensitivity;

use thiserror::Error;

pub use dcf::{two_stage_dcf, DcfInputs, DcfResult, DcfYear};
pub use gordon::{capm_discount_rate, gordon_growth};
pub use piotroski::{piotroski_checklist, Check, CheckStatus, Checklist};
pub use scorecard::{Scorecard, ValuationOverrides, Verdict};
pub use sensitivity::{sensitivity_matrix, SensitivityMatrix};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    #[error("discount rate {rate:.4} must exceed growth {growth:.4}")]
    RateNotAboveGrowth { rate: f64, growth: f64 },

    #[error("shares outstanding must be positive")]
    NonPositiveShares,

    #[error("projection needs at least one year")]
    ZeroYears,

    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
