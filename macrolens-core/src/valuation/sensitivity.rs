//! 3x3 per-share value grid around the base discount rate and terminal
//! growth.

use serde::{Deserialize, Serialize};

use super::dcf::{two_stage_dcf, DcfInputs};
use super::ValuationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMatrix {
    /// Row headers: `r - step, r, r + step`.
    pub discount_rates: [f64; 3],
    /// Column headers: `gt - step, gt, gt + step`.
    pub terminal_growths: [f64; 3],
    /// `None` where the DCF is undefined (`r <= gt`).
    pub values: [[Option<f64>; 3]; 3],
}

impl SensitivityMatrix {
    pub fn center(&self) -> Option<f64> {
        self.values[1][1]
    }

    /// Lowest and highest defined cell.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .flatten()
            .flatten()
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

pub fn sensitivity_matrix(
    inputs: &DcfInputs,
    rate_step: f64,
    growth_step: f64,
) -> Result<SensitivityMatrix, ValuationError> {
    if !(rate_step > 0.0 && growth_step > 0.0) {
        return Err(ValuationError::InvalidInput(
            "sensitivity steps must be positive".into(),
        ));
    }
    let r = inputs.discount_rate;
    let g = inputs.terminal_growth;
    let discount_rates = [r - rate_step, r, r + rate_step];
    let terminal_growths = [g - growth_step, g, g + growth_step];

    let mut values = [[None; 3]; 3];
    for (row, &rate) in discount_rates.iter().enumerate() {
        for (col, &growth) in terminal_growths.iter().enumerate() {
            values[row][col] = two_stage_dcf(&inputs.with_rates(rate, growth))
                .ok()
                .map(|res| res.per_share);
        }
    }

    Ok(SensitivityMatrix {
        discount_rates,
        terminal_growths,
        values,
    })
}
