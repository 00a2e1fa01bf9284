use serde::{Deserialize, Serialize};

/// One long-format row: a single value of a series for a country and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// ISO3 country code.
    pub country: String,
    /// Series code (World Bank code for macro indicators).
    pub series: String,
    pub year: i32,
    pub value: f64,
}

impl Observation {
    pub fn new(country: impl Into<String>, series: impl Into<String>, year: i32, value: f64) -> Self {
        Self {
            country: country.into(),
            series: series.into(),
            year,
            value,
        }
    }
}
