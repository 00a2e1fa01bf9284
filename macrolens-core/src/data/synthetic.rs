//! Deterministic synthetic macro series for offline and demo use.
//!
//! Each `(country, indicator)` pair gets its own RNG seeded from a BLAKE3
//! hash, so the same request always produces the same numbers. Values follow
//! a mean-reverting walk around a per-country anchor and are clamped to a
//! plausible band for the indicator. They are clearly fake and always tagged
//! `DataSource::Synthetic` by the loader.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Indicator, Observation};

/// `(anchor low, anchor high, step sigma, clamp low, clamp high)`
fn profile(indicator: Indicator) -> (f64, f64, f64, f64, f64) {
    match indicator {
        Indicator::GdpGrowth => (0.5, 4.0, 1.5, -8.0, 12.0),
        Indicator::GdpCurrentUsd => (1.0e11, 5.0e12, 0.0, 1.0e9, 5.0e13),
        Indicator::IndustryGrowth => (0.0, 4.0, 2.5, -15.0, 15.0),
        Indicator::Unemployment => (3.0, 12.0, 0.6, 1.0, 30.0),
        Indicator::LabourParticipation => (55.0, 70.0, 0.5, 40.0, 80.0),
        Indicator::Inflation => (1.0, 6.0, 1.5, -2.0, 25.0),
        Indicator::CurrentAccount => (-5.0, 5.0, 1.0, -15.0, 15.0),
        Indicator::GovernmentDebt => (30.0, 120.0, 3.0, 5.0, 250.0),
        Indicator::LendingRate => (3.0, 10.0, 0.7, 0.5, 30.0),
        Indicator::RealInterestRate => (0.0, 5.0, 1.0, -10.0, 15.0),
    }
}

fn rng_for(country: &str, indicator: Indicator) -> StdRng {
    let key = format!("{}|{}", country.to_uppercase(), indicator.code());
    StdRng::from_seed(*blake3::hash(key.as_bytes()).as_bytes())
}

/// One synthetic series over `start_year..=end_year`.
pub fn synthetic_series(
    country: &str,
    indicator: Indicator,
    start_year: i32,
    end_year: i32,
) -> Vec<Observation> {
    if end_year < start_year {
        return Vec::new();
    }
    let (lo, hi, sigma, floor, ceil) = profile(indicator);
    let mut rng = rng_for(country, indicator);
    let anchor = rng.gen_range(lo..hi);
    let country = country.to_uppercase();

    let mut out = Vec::with_capacity((end_year - start_year + 1) as usize);
    let mut value = anchor;

    for year in start_year..=end_year {
        if indicator == Indicator::GdpCurrentUsd {
            // nominal GDP level compounds instead of mean-reverting
            if year > start_year {
                value *= 1.0 + rng.gen_range(-0.02..0.07);
            }
        } else {
            let shock: f64 = rng.gen_range(-1.0..1.0) * sigma;
            value += 0.3 * (anchor - value) + shock;
        }
        value = value.clamp(floor, ceil);
        out.push(Observation::new(country.as_str(), indicator.code(), year, value));
    }
    out
}

/// Every `(country, indicator)` combination, concatenated.
pub fn synthetic_panel(
    indicators: &[Indicator],
    countries: &[&str],
    start_year: i32,
    end_year: i32,
) -> Vec<Observation> {
    let mut out = Vec::new();
    for &indicator in indicators {
        for country in countries {
            out.extend(synthetic_series(country, indicator, start_year, end_year));
        }
    }
    out
}
