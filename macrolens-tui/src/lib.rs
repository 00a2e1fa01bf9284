//! MacroLens TUI: eight-panel terminal dashboard with vim-style navigation.
//!
//! Panels:
//! 1. Countries: region/country tree, selection, health score per country
//! 2. Production: GDP and industry charts for the selected countries
//! 3. Labour: unemployment and participation charts
//! 4. Finance: inflation, external balance, debt and rate charts
//! 5. Alerts: recession and overheating alerts, most severe first
//! 6. Rates: real-rate spread projection for the focus country
//! 7. Valuation: watchlist scorecards with DCF, checklist and sensitivity grid
//! 8. Help: keyboard shortcuts and error history

pub mod app;
pub mod input;
pub mod persistence;
pub mod theme;
pub mod ui;
pub mod worker;
