//! Nine-point quality checklist in the spirit of the Piotroski F-score.
//!
//! The quote API only exposes trailing figures, so each check is a level
//! test rather than a year-over-year comparison. A check whose input is
//! missing is `Unavailable` and neither passes nor fails.

use serde::{Deserialize, Serialize};

use crate::domain::Fundamentals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Pass,
    Fail,
    Unavailable,
}

impl CheckStatus {
    fn from_test(test: Option<bool>) -> Self {
        match test {
            Some(true) => CheckStatus::Pass,
            Some(false) => CheckStatus::Fail,
            None => CheckStatus::Unavailable,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CheckStatus::Pass => "+",
            CheckStatus::Fail => "-",
            CheckStatus::Unavailable => "?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub status: CheckStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checklist {
    pub checks: Vec<Check>,
}

impl Checklist {
    pub fn score(&self) -> usize {
        self.count(CheckStatus::Pass)
    }

    /// Checks that could be evaluated.
    pub fn available(&self) -> usize {
        self.checks.len() - self.count(CheckStatus::Unavailable)
    }

    pub fn max(&self) -> usize {
        self.checks.len()
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }
}

pub fn piotroski_checklist(f: &Fundamentals) -> Checklist {
    let positive = |v: Option<f64>| v.map(|x| x > 0.0);

    let ocf_above_income = match (f.operating_cash_flow, f.net_income) {
        (Some(ocf), Some(ni)) => Some(ocf > ni),
        _ => None,
    };

    let tests: [(&'static str, Option<bool>); 9] = [
        ("Return on assets > 0", positive(f.return_on_assets)),
        ("Operating cash flow > 0", positive(f.operating_cash_flow)),
        ("Cash flow exceeds net income", ocf_above_income),
        ("Earnings growth > 0", positive(f.earnings_growth)),
        ("Debt/equity < 1", f.debt_to_equity.map(|d| d < 1.0)),
        ("Current ratio > 1", f.current_ratio.map(|c| c > 1.0)),
        ("Revenue growth > 0", positive(f.revenue_growth)),
        ("Gross margin > 0", positive(f.gross_margin)),
        ("Free cash flow > 0", positive(f.free_cash_flow)),
    ];

    Checklist {
        checks: tests
            .into_iter()
            .map(|(name, test)| Check {
                name,
                status: CheckStatus::from_test(test),
            })
            .collect(),
    }
}
