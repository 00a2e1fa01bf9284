//! Macro health score.
//!
//! Five components each score 0..=20 from the latest value of their series.
//! The total is rescaled to 0..=100 over the components actually present, so
//! a country missing its debt series is not punished for the gap.

use serde::{Deserialize, Serialize};

use super::AnalyticsError;
use crate::domain::Indicator;
use crate::table::LongTable;

const MAX_POINTS: f64 = 20.0;
const INFLATION_TARGET: f64 = 2.0;
const INFLATION_PENALTY_PER_PP: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthRating {
    Strong,
    Moderate,
    Weak,
}

impl HealthRating {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            HealthRating::Strong
        } else if score >= 45.0 {
            HealthRating::Moderate
        } else {
            HealthRating::Weak
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthRating::Strong => "Strong",
            HealthRating::Moderate => "Moderate",
            HealthRating::Weak => "Weak",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthComponent {
    pub indicator: Indicator,
    pub year: i32,
    pub value: f64,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub country: String,
    /// 0..=100
    pub score: f64,
    pub rating: HealthRating,
    pub components: Vec<HealthComponent>,
    pub missing: Vec<Indicator>,
}

/// Linear ramp: `zero_at` scores 0, `full_at` scores 20, clamped outside.
fn ramp(value: f64, zero_at: f64, full_at: f64) -> f64 {
    let t = (value - zero_at) / (full_at - zero_at);
    (t * MAX_POINTS).clamp(0.0, MAX_POINTS)
}

/// Points for one component value, or `None` if the indicator isn't scored.
pub fn component_points(indicator: Indicator, value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let points = match indicator {
        Indicator::GdpGrowth => ramp(value, -2.0, 3.0),
        Indicator::Inflation => (MAX_POINTS
            - INFLATION_PENALTY_PER_PP * (value - INFLATION_TARGET).abs())
        .clamp(0.0, MAX_POINTS),
        Indicator::Unemployment => ramp(value, 12.0, 4.0),
        Indicator::CurrentAccount => ramp(value, -6.0, 0.0),
        Indicator::GovernmentDebt => ramp(value, 120.0, 60.0),
        _ => return None,
    };
    Some(points)
}

/// Score one country from the latest value of each component series.
///
/// Returns `Ok(None)` when none of the components has data.
pub fn health_score(table: &LongTable, country: &str) -> Result<Option<HealthScore>, AnalyticsError> {
    let mut components = Vec::new();
    let mut missing = Vec::new();

    for indicator in Indicator::health_inputs() {
        match table.latest(country, indicator.code())? {
            Some((year, value)) => {
                if let Some(points) = component_points(indicator, value) {
                    components.push(HealthComponent {
                        indicator,
                        year,
                        value,
                        points,
                    });
                }
            }
            None => missing.push(indicator),
        }
    }

    if components.is_empty() {
        return Ok(None);
    }

    let earned: f64 = components.iter().map(|c| c.points).sum();
    let score = earned / (MAX_POINTS * components.len() as f64) * 100.0;

    Ok(Some(HealthScore {
        country: country.to_string(),
        score,
        rating: HealthRating::from_score(score),
        components,
        missing,
    }))
}

/// Scores for every country that has data, best first.
pub fn health_scores(table: &LongTable, countries: &[&str]) -> Result<Vec<HealthScore>, AnalyticsError> {
    let mut out = Vec::new();
    for country in countries {
        if let Some(score) = health_score(table, country)? {
            out.push(score);
        }
    }
    out.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.country.cmp(&b.country))
    });
    Ok(out)
}
