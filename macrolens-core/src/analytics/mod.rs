//! Macro analytics over the long table: health score, recession alerts and
//! the real-rate spread projection.

pub mod health;
pub mod real_rate;
pub mod recession;

use thiserror::Error;

use crate::table::TableError;

pub use health::{component_points, health_score, health_scores, HealthComponent, HealthRating, HealthScore};
pub use real_rate::{linspace, project, RateScenario, RateVerdict, RealRateProjection};
pub use recession::{alerts_for, scan_alerts, Alert, AlertKind, Severity};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("table error: {0}")]
    Table(#[from] TableError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
