//! Supported macro series and their World Bank codes.

use serde::{Deserialize, Serialize};

/// Dashboard grouping of indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Production,
    Labour,
    Finance,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Production => "Production",
            Category::Labour => "Labour",
            Category::Finance => "Finance",
        }
    }

    pub fn all() -> [Category; 3] {
        [Category::Production, Category::Labour, Category::Finance]
    }
}

/// A macro series the dashboard knows how to fetch and label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    GdpGrowth,
    GdpCurrentUsd,
    IndustryGrowth,
    Unemployment,
    LabourParticipation,
    Inflation,
    CurrentAccount,
    GovernmentDebt,
    LendingRate,
    RealInterestRate,
}

impl Indicator {
    const ALL: [Indicator; 10] = [
        Indicator::GdpGrowth,
        Indicator::GdpCurrentUsd,
        Indicator::IndustryGrowth,
        Indicator::Unemployment,
        Indicator::LabourParticipation,
        Indicator::Inflation,
        Indicator::CurrentAccount,
        Indicator::GovernmentDebt,
        Indicator::LendingRate,
        Indicator::RealInterestRate,
    ];

    pub fn all() -> &'static [Indicator] {
        &Self::ALL
    }

    /// World Bank series code.
    pub fn code(self) -> &'static str {
        match self {
            Indicator::GdpGrowth => "NY.GDP.MKTP.KD.ZG",
            Indicator::GdpCurrentUsd => "NY.GDP.MKTP.CD",
            Indicator::IndustryGrowth => "NV.IND.TOTL.KD.ZG",
            Indicator::Unemployment => "SL.UEM.TOTL.ZS",
            Indicator::LabourParticipation => "SL.TLF.CACT.ZS",
            Indicator::Inflation => "FP.CPI.TOTL.ZG",
            Indicator::CurrentAccount => "BN.CAB.XOKA.GD.ZS",
            Indicator::GovernmentDebt => "GC.DOD.TOTL.GD.ZS",
            Indicator::LendingRate => "FR.INR.LEND",
            Indicator::RealInterestRate => "FR.INR.RINR",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Indicator::GdpGrowth => "GDP growth",
            Indicator::GdpCurrentUsd => "GDP (current US$)",
            Indicator::IndustryGrowth => "Industry value added growth",
            Indicator::Unemployment => "Unemployment",
            Indicator::LabourParticipation => "Labour force participation",
            Indicator::Inflation => "Inflation (CPI)",
            Indicator::CurrentAccount => "Current account balance",
            Indicator::GovernmentDebt => "Central government debt",
            Indicator::LendingRate => "Lending interest rate",
            Indicator::RealInterestRate => "Real interest rate",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Indicator::GdpCurrentUsd => "US$",
            Indicator::CurrentAccount | Indicator::GovernmentDebt => "% of GDP",
            Indicator::Unemployment | Indicator::LabourParticipation => "% of labour force",
            _ => "%",
        }
    }

    pub fn category(self) -> Category {
        match self {
            Indicator::GdpGrowth | Indicator::GdpCurrentUsd | Indicator::IndustryGrowth => {
                Category::Production
            }
            Indicator::Unemployment | Indicator::LabourParticipation => Category::Labour,
            Indicator::Inflation
            | Indicator::CurrentAccount
            | Indicator::GovernmentDebt
            | Indicator::LendingRate
            | Indicator::RealInterestRate => Category::Finance,
        }
    }

    /// Look up an indicator by World Bank code (case-insensitive) or snake_case name.
    pub fn from_code(code: &str) -> Option<Indicator> {
        let needle = code.trim();
        Self::ALL.iter().copied().find(|i| {
            i.code().eq_ignore_ascii_case(needle) || i.slug().eq_ignore_ascii_case(needle)
        })
    }

    pub fn in_category(category: Category) -> Vec<Indicator> {
        Self::ALL
            .iter()
            .copied()
            .filter(|i| i.category() == category)
            .collect()
    }

    /// The five series the health score reads.
    pub fn health_inputs() -> [Indicator; 5] {
        [
            Indicator::GdpGrowth,
            Indicator::Inflation,
            Indicator::Unemployment,
            Indicator::CurrentAccount,
            Indicator::GovernmentDebt,
        ]
    }

    /// The series the recession and stress alerts read.
    pub fn alert_inputs() -> [Indicator; 4] {
        [
            Indicator::GdpGrowth,
            Indicator::Unemployment,
            Indicator::Inflation,
            Indicator::LendingRate,
        ]
    }

    fn slug(self) -> &'static str {
        match self {
            Indicator::GdpGrowth => "gdp_growth",
            Indicator::GdpCurrentUsd => "gdp_current_usd",
            Indicator::IndustryGrowth => "industry_growth",
            Indicator::Unemployment => "unemployment",
            Indicator::LabourParticipation => "labour_participation",
            Indicator::Inflation => "inflation",
            Indicator::CurrentAccount => "current_account",
            Indicator::GovernmentDebt => "government_debt",
            Indicator::LendingRate => "lending_rate",
            Indicator::RealInterestRate => "real_interest_rate",
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
