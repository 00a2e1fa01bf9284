//! Real-rate spread projection.
//!
//! Inflation is assumed to move in a straight line from today's reading to
//! the expected level over the horizon; the policy rate is held flat. The
//! spread at each month is `nominal - inflation`, all in percent.

use serde::{Deserialize, Serialize};

use super::AnalyticsError;

pub const MIN_EXPECTED_INFLATION: f64 = -2.0;
pub const MAX_EXPECTED_INFLATION: f64 = 20.0;
pub const MAX_HORIZON_MONTHS: u32 = 24;

/// `n` evenly spaced points from `start` to `end` inclusive.
///
/// `n == 0` is empty and `n == 1` is `[start]`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateScenario {
    /// Policy rate, percent.
    pub nominal: f64,
    /// Latest annual inflation, percent.
    pub current_inflation: f64,
    /// Inflation expected at the end of the horizon, percent.
    pub expected_inflation: f64,
    pub months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateVerdict {
    /// Positive real rate: the currency tends to strengthen.
    Strengthening,
    /// Rates do not compensate inflation.
    CapitalFlightRisk,
}

impl RateVerdict {
    pub fn message(self) -> &'static str {
        match self {
            RateVerdict::Strengthening => {
                "positive real rate: the currency tends to strengthen"
            }
            RateVerdict::CapitalFlightRisk => {
                "rates do not compensate inflation: risk of capital flight"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealRateProjection {
    pub nominal: f64,
    /// Expected inflation after clamping.
    pub expected_inflation: f64,
    /// `0..=months`
    pub months: Vec<u32>,
    pub inflation: Vec<f64>,
    pub spread: Vec<f64>,
}

impl RealRateProjection {
    pub fn final_spread(&self) -> f64 {
        self.spread.last().copied().unwrap_or(self.nominal)
    }

    pub fn verdict(&self) -> RateVerdict {
        if self.final_spread() > 0.0 {
            RateVerdict::Strengthening
        } else {
            RateVerdict::CapitalFlightRisk
        }
    }
}

/// Project the real-rate spread month by month.
pub fn project(scenario: &RateScenario) -> Result<RealRateProjection, AnalyticsError> {
    let RateScenario {
        nominal,
        current_inflation,
        expected_inflation,
        months,
    } = *scenario;

    if !(1..=MAX_HORIZON_MONTHS).contains(&months) {
        return Err(AnalyticsError::InvalidInput(format!(
            "horizon must be 1..={MAX_HORIZON_MONTHS} months, got {months}"
        )));
    }
    if ![nominal, current_inflation, expected_inflation]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(AnalyticsError::InvalidInput(
            "rates must be finite numbers".into(),
        ));
    }

    let expected = expected_inflation.clamp(MIN_EXPECTED_INFLATION, MAX_EXPECTED_INFLATION);
    let inflation = linspace(current_inflation, expected, months as usize + 1);
    let spread = inflation.iter().map(|i| nominal - i).collect();

    Ok(RealRateProjection {
        nominal,
        expected_inflation: expected,
        months: (0..=months).collect(),
        inflation,
        spread,
    })
}
