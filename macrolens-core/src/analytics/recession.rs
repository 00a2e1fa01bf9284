//! Rule-based recession and stress alerts on annual data.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::AnalyticsError;
use crate::domain::Indicator;
use crate::table::LongTable;

const GROWTH_DROP_PP: f64 = 2.0;
const UNEMPLOYMENT_RISE_PP: f64 = 0.5;
const UNEMPLOYMENT_LOOKBACK_YEARS: i32 = 3;
const INFLATION_WARNING: f64 = 5.0;
const INFLATION_CRITICAL: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Critical => "CRIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Contraction,
    ConsecutiveContraction,
    GrowthSlump,
    UnemploymentRise,
    HighInflation,
    NegativeRealRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub country: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub year: i32,
    pub message: String,
}

/// Alerts for one country, in rule order.
pub fn alerts_for(table: &LongTable, country: &str) -> Result<Vec<Alert>, AnalyticsError> {
    let mut alerts = Vec::new();
    let mut push = |kind, severity, year, message: String| {
        alerts.push(Alert {
            country: country.to_string(),
            kind,
            severity,
            year,
            message,
        })
    };

    let growth = table.series_for(country, Indicator::GdpGrowth.code())?;
    if let Some(&(year, latest)) = growth.last() {
        // Only the immediately preceding year counts for year-on-year rules.
        let previous = growth
            .len()
            .checked_sub(2)
            .map(|i| growth[i])
            .filter(|&(py, _)| py == year - 1);
        let consecutive = matches!(previous, Some((_, pv)) if pv < 0.0);

        if latest < 0.0 && consecutive {
            push(
                AlertKind::ConsecutiveContraction,
                Severity::Critical,
                year,
                format!("two consecutive years of contraction ({latest:.1}% in {year})"),
            );
        } else if latest < 0.0 {
            push(
                AlertKind::Contraction,
                Severity::Critical,
                year,
                format!("GDP contracted {latest:.1}% in {year}"),
            );
        }

        if let Some((_, prev)) = previous {
            let drop = prev - latest;
            if drop > GROWTH_DROP_PP {
                push(
                    AlertKind::GrowthSlump,
                    Severity::Warning,
                    year,
                    format!("growth fell {drop:.1} pp to {latest:.1}%"),
                );
            }
        }
    }

    let unemployment = table.series_for(country, Indicator::Unemployment.code())?;
    if let Some(&(year, latest)) = unemployment.last() {
        let prior_min = unemployment
            .iter()
            .filter(|(y, _)| *y < year && *y >= year - UNEMPLOYMENT_LOOKBACK_YEARS)
            .map(|(_, v)| *v)
            .reduce(f64::min);
        if let Some(low) = prior_min {
            let rise = latest - low;
            if rise >= UNEMPLOYMENT_RISE_PP {
                push(
                    AlertKind::UnemploymentRise,
                    Severity::Warning,
                    year,
                    format!("unemployment {rise:.1} pp above its 3-year low ({latest:.1}%)"),
                );
            }
        }
    }

    let inflation = table.series_for(country, Indicator::Inflation.code())?;
    if let Some(&(year, latest)) = inflation.last() {
        let severity = if latest >= INFLATION_CRITICAL {
            Some(Severity::Critical)
        } else if latest >= INFLATION_WARNING {
            Some(Severity::Warning)
        } else {
            None
        };
        if let Some(severity) = severity {
            push(
                AlertKind::HighInflation,
                severity,
                year,
                format!("inflation at {latest:.1}%"),
            );
        }
    }

    // Real rate: latest year where both lending rate and inflation exist.
    let lending = table.series_for(country, Indicator::LendingRate.code())?;
    let matched = lending.iter().rev().find_map(|&(y, rate)| {
        inflation
            .iter()
            .find(|(iy, _)| *iy == y)
            .map(|&(_, infl)| (y, rate - infl))
    });
    if let Some((year, real)) = matched {
        if real < 0.0 {
            push(
                AlertKind::NegativeRealRate,
                Severity::Info,
                year,
                format!("negative real lending rate ({real:.1}%)"),
            );
        }
    }

    Ok(alerts)
}

/// Alerts across countries, Critical first, then by country.
pub fn scan_alerts(table: &LongTable, countries: &[&str]) -> Result<Vec<Alert>, AnalyticsError> {
    let mut all = Vec::new();
    for country in countries {
        all.extend(alerts_for(table, country)?);
    }
    all.sort_by(|a, b| {
        Reverse(a.severity)
            .cmp(&Reverse(b.severity))
            .then_with(|| a.country.cmp(&b.country))
    });
    Ok(all)
}
