//! Application state: single-owner, main-thread only.
//!
//! All TUI state lives here. The worker thread communicates via channels.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use macrolens_core::analytics::real_rate::{
    MAX_EXPECTED_INFLATION, MAX_HORIZON_MONTHS, MIN_EXPECTED_INFLATION,
};
use macrolens_core::analytics::{
    project, Alert, AnalyticsError, HealthScore, RateScenario, RealRateProjection, Severity,
};
use macrolens_core::config::{DashboardConfig, RatesConfig, ValuationConfig};
use macrolens_core::data::{MacroPanel, Sourced};
use macrolens_core::domain::{Category, CountrySet, Fundamentals, Indicator};
use macrolens_core::table::TableError;
use macrolens_core::valuation::{Scorecard, ValuationOverrides};

use crate::worker::{WorkerCommand, WorkerResponse};

pub const ERROR_HISTORY_CAP: usize = 50;

/// Which panel is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Panel {
    Countries,
    Production,
    Labour,
    Finance,
    Alerts,
    Rates,
    Valuation,
    Help,
}

impl Panel {
    pub const ALL: [Panel; 8] = [
        Panel::Countries,
        Panel::Production,
        Panel::Labour,
        Panel::Finance,
        Panel::Alerts,
        Panel::Rates,
        Panel::Valuation,
        Panel::Help,
    ];

    pub fn index(self) -> usize {
        match self {
            Panel::Countries => 0,
            Panel::Production => 1,
            Panel::Labour => 2,
            Panel::Finance => 3,
            Panel::Alerts => 4,
            Panel::Rates => 5,
            Panel::Valuation => 6,
            Panel::Help => 7,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Panel::Countries => "Countries",
            Panel::Production => "Production",
            Panel::Labour => "Labour",
            Panel::Finance => "Finance",
            Panel::Alerts => "Alerts",
            Panel::Rates => "Rates",
            Panel::Valuation => "Valuation",
            Panel::Help => "Help",
        }
    }

    pub fn next(self) -> Panel {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Panel {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// The indicator category a chart panel shows.
    pub fn category(self) -> Option<Category> {
        match self {
            Panel::Production => Some(Category::Production),
            Panel::Labour => Some(Category::Labour),
            Panel::Finance => Some(Category::Finance),
            _ => None,
        }
    }
}

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Analytics,
    Valuation,
    Other,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Network => "NET",
            ErrorCategory::Data => "DATA",
            ErrorCategory::Analytics => "CALC",
            ErrorCategory::Valuation => "VAL",
            ErrorCategory::Other => "ERR",
        }
    }
}

// ── Countries ────────────────────────────────────────────────────────

/// An item in the region/country tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItem {
    Region(String),
    /// (region, ISO3 code)
    Country(String, String),
}

#[derive(Debug)]
pub struct CountriesPanelState {
    pub countries: CountrySet,
    pub selected: BTreeSet<String>,
    pub expanded_regions: BTreeSet<String>,
    /// Flat index into the visible tree rows.
    pub cursor: usize,
}

impl CountriesPanelState {
    pub fn new(countries: CountrySet) -> Self {
        let expanded_regions = countries
            .region_names()
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            countries,
            selected: BTreeSet::new(),
            expanded_regions,
            cursor: 0,
        }
    }

    /// Region rows plus the country rows of expanded regions.
    pub fn visible_row_count(&self) -> usize {
        self.countries
            .region_names()
            .into_iter()
            .map(|region| {
                let children = if self.expanded_regions.contains(region) {
                    self.countries
                        .region_countries(region)
                        .map(|c| c.len())
                        .unwrap_or(0)
                } else {
                    0
                };
                1 + children
            })
            .sum()
    }

    pub fn cursor_item(&self) -> Option<TreeItem> {
        let mut row = 0;
        for region in self.countries.region_names() {
            if row == self.cursor {
                return Some(TreeItem::Region(region.to_string()));
            }
            row += 1;
            if !self.expanded_regions.contains(region) {
                continue;
            }
            for country in self.countries.region_countries(region).unwrap_or(&[]) {
                if row == self.cursor {
                    return Some(TreeItem::Country(region.to_string(), country.code.clone()));
                }
                row += 1;
            }
        }
        None
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let rows = self.visible_row_count();
        if rows == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, rows as isize - 1) as usize;
    }

    /// Space on a region selects all of it, or clears it if already fully selected.
    pub fn toggle_current(&mut self) {
        match self.cursor_item() {
            Some(TreeItem::Region(region)) => {
                let codes: Vec<String> = self
                    .countries
                    .region_codes(&region)
                    .unwrap_or_default()
                    .into_iter()
                    .map(String::from)
                    .collect();
                let all_selected = codes.iter().all(|c| self.selected.contains(c));
                for code in codes {
                    if all_selected {
                        self.selected.remove(&code);
                    } else {
                        self.selected.insert(code);
                    }
                }
            }
            Some(TreeItem::Country(_, code)) => {
                if !self.selected.remove(&code) {
                    self.selected.insert(code);
                }
            }
            None => {}
        }
    }

    pub fn set_expanded(&mut self, expanded: bool) {
        if let Some(TreeItem::Region(region)) = self.cursor_item() {
            if expanded {
                self.expanded_regions.insert(region);
            } else {
                self.expanded_regions.remove(&region);
            }
        }
        self.move_cursor(0);
    }

    pub fn select_all(&mut self) {
        for code in self.countries.all_codes() {
            self.selected.insert(code.to_string());
        }
    }

    pub fn selected_codes(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }
}

// ── Macro data ───────────────────────────────────────────────────────

/// Points for one (series, country) pair, year as x.
pub type SeriesPoints = Vec<(f64, f64)>;

#[derive(Debug)]
pub struct MacroState {
    pub panel: Option<MacroPanel>,
    /// series code -> country -> points, oldest first.
    pub series: BTreeMap<String, BTreeMap<String, SeriesPoints>>,
    pub health: Vec<HealthScore>,
    pub alerts: Vec<Alert>,
    pub loading: bool,
    pub current_item: Option<String>,
    pub done: usize,
    pub total: usize,
    pub start_year: i32,
    pub end_year: i32,
    pub offline: bool,
    pub synthetic: bool,
    pub loaded_at: Option<NaiveDateTime>,
    /// The last load was cancelled before every indicator arrived.
    pub partial: bool,
}

impl MacroState {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            panel: None,
            series: BTreeMap::new(),
            health: Vec::new(),
            alerts: Vec::new(),
            loading: false,
            current_item: None,
            done: 0,
            total: 0,
            start_year,
            end_year,
            offline: false,
            synthetic: false,
            loaded_at: None,
            partial: false,
        }
    }

    /// Replace the loaded panel and index its series for charting.
    pub fn ingest(
        &mut self,
        panel: MacroPanel,
        health: Vec<HealthScore>,
        alerts: Vec<Alert>,
    ) -> Result<(), TableError> {
        let mut series: BTreeMap<String, BTreeMap<String, SeriesPoints>> = BTreeMap::new();
        for obs in panel.table.observations()? {
            series
                .entry(obs.series)
                .or_default()
                .entry(obs.country)
                .or_default()
                .push((f64::from(obs.year), obs.value));
        }
        for by_country in series.values_mut() {
            for points in by_country.values_mut() {
                points.sort_by(|a, b| a.0.total_cmp(&b.0));
            }
        }
        self.series = series;
        self.panel = Some(panel);
        self.health = health;
        self.alerts = alerts;
        self.loaded_at = Some(chrono::Local::now().naive_local());
        Ok(())
    }

    pub fn points(&self, indicator: Indicator, country: &str) -> Option<&[(f64, f64)]> {
        self.series
            .get(indicator.code())
            .and_then(|m| m.get(country))
            .map(|v| v.as_slice())
    }

    pub fn latest(&self, indicator: Indicator, country: &str) -> Option<(i32, f64)> {
        self.points(indicator, country)
            .and_then(|p| p.last())
            .map(|&(year, value)| (year as i32, value))
    }

    pub fn health_of(&self, country: &str) -> Option<&HealthScore> {
        self.health.iter().find(|h| h.country == country)
    }

    pub fn has_synthetic(&self) -> bool {
        self.panel.as_ref().is_some_and(|p| p.has_synthetic())
    }

    /// Synthetic or stale-cache series are present.
    pub fn is_degraded(&self) -> bool {
        self.panel.as_ref().is_some_and(|p| p.is_degraded())
    }
}

/// Which indicator each chart panel shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartState {
    /// Index into `Indicator::in_category`, one slot per category.
    pub selection: [usize; 3],
}

impl ChartState {
    fn slot(category: Category) -> usize {
        Category::all()
            .iter()
            .position(|c| *c == category)
            .unwrap_or(0)
    }

    pub fn indicator_for(&self, category: Category) -> Option<Indicator> {
        let options = Indicator::in_category(category);
        if options.is_empty() {
            return None;
        }
        let idx = self.selection[Self::slot(category)] % options.len();
        Some(options[idx])
    }

    pub fn cycle(&mut self, category: Category, direction: i32) {
        let len = Indicator::in_category(category).len();
        if len == 0 {
            return;
        }
        let slot = &mut self.selection[Self::slot(category)];
        let current = *slot % len;
        *slot = if direction >= 0 {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
    }
}

// ── Alerts ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct AlertsPanelState {
    pub cursor: usize,
    pub min_severity: Severity,
}

impl AlertsPanelState {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            min_severity: Severity::Info,
        }
    }

    pub fn visible<'a>(&self, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts
            .iter()
            .filter(|a| a.severity >= self.min_severity)
            .collect()
    }

    pub fn cycle_severity(&mut self) {
        self.min_severity = match self.min_severity {
            Severity::Info => Severity::Warning,
            Severity::Warning => Severity::Critical,
            Severity::Critical => Severity::Info,
        };
        self.cursor = 0;
    }
}

impl Default for AlertsPanelState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Rates ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatesField {
    Nominal,
    Expected,
    Months,
}

impl RatesField {
    pub const ALL: [RatesField; 3] = [RatesField::Nominal, RatesField::Expected, RatesField::Months];

    pub fn label(self) -> &'static str {
        match self {
            RatesField::Nominal => "Nominal policy rate",
            RatesField::Expected => "Expected inflation",
            RatesField::Months => "Horizon (months)",
        }
    }
}

#[derive(Debug)]
pub struct RatesPanelState {
    /// Focus country (ISO3).
    pub country: String,
    /// Percent.
    pub nominal: f64,
    pub policy_rate: Option<Sourced<f64>>,
    /// Once the user edits the nominal rate, fetched rates no longer replace it.
    pub nominal_edited: bool,
    /// `None` tracks the current inflation reading.
    pub expected: Option<f64>,
    pub months: u32,
    pub field: usize,
    pub loading: bool,
}

impl RatesPanelState {
    pub fn new(rates: &RatesConfig) -> Self {
        Self {
            country: "USA".to_string(),
            nominal: rates.nominal_fallback,
            policy_rate: None,
            nominal_edited: false,
            expected: None,
            months: rates.horizon_months.clamp(1, MAX_HORIZON_MONTHS),
            field: 0,
            loading: false,
        }
    }

    pub fn active_field(&self) -> RatesField {
        RatesField::ALL[self.field.min(RatesField::ALL.len() - 1)]
    }

    pub fn apply_policy_rate(&mut self, rate: Sourced<f64>) {
        if !self.nominal_edited {
            self.nominal = rate.value;
        }
        self.policy_rate = Some(rate);
        self.loading = false;
    }

    /// Switch focus; edits made for the previous country are dropped.
    pub fn set_country(&mut self, country: impl Into<String>) {
        self.country = country.into();
        self.nominal_edited = false;
        self.expected = None;
        self.policy_rate = None;
    }

    pub fn expected_or(&self, current_inflation: f64) -> f64 {
        self.expected
            .unwrap_or(current_inflation)
            .clamp(MIN_EXPECTED_INFLATION, MAX_EXPECTED_INFLATION)
    }

    pub fn adjust(&mut self, direction: i32, current_inflation: Option<f64>) {
        let d = f64::from(direction.signum());
        match self.active_field() {
            RatesField::Nominal => {
                self.nominal = round_to(self.nominal + 0.25 * d, 2).clamp(-5.0, 50.0);
                self.nominal_edited = true;
            }
            RatesField::Expected => {
                let base = self.expected_or(current_inflation.unwrap_or(0.0));
                self.expected = Some(
                    round_to(base + 0.1 * d, 1).clamp(MIN_EXPECTED_INFLATION, MAX_EXPECTED_INFLATION),
                );
            }
            RatesField::Months => {
                let next = self.months as i64 + i64::from(direction.signum());
                self.months = next.clamp(1, i64::from(MAX_HORIZON_MONTHS)) as u32;
            }
        }
    }

    /// `None` until an inflation reading for the focus country is loaded.
    pub fn projection(
        &self,
        current_inflation: Option<f64>,
    ) -> Option<Result<RealRateProjection, AnalyticsError>> {
        let current = current_inflation?;
        Some(project(&RateScenario {
            nominal: self.nominal,
            current_inflation: current,
            expected_inflation: self.expected_or(current),
            months: self.months,
        }))
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

// ── Valuation ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    Growth,
    TerminalGrowth,
    DiscountRate,
    Years,
}

#[derive(Debug)]
pub struct ValuationPanelState {
    pub watchlist: Vec<String>,
    pub cursor: usize,
    pub fundamentals: BTreeMap<String, Sourced<Fundamentals>>,
    /// Build errors are kept per ticker so the panel can explain them.
    pub cards: BTreeMap<String, Result<Scorecard, String>>,
    pub loading: BTreeSet<String>,
    pub risk_free: Option<Sourced<f64>>,
    pub risk_free_country: String,
    pub overrides: ValuationOverrides,
}

impl ValuationPanelState {
    pub fn new() -> Self {
        Self {
            watchlist: Vec::new(),
            cursor: 0,
            fundamentals: BTreeMap::new(),
            cards: BTreeMap::new(),
            loading: BTreeSet::new(),
            risk_free: None,
            risk_free_country: "USA".to_string(),
            overrides: ValuationOverrides::default(),
        }
    }

    /// Returns false for blanks and duplicates.
    pub fn add_ticker(&mut self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() || self.watchlist.contains(&symbol) {
            return false;
        }
        self.watchlist.push(symbol);
        self.cursor = self.watchlist.len() - 1;
        true
    }

    pub fn remove_current(&mut self) -> Option<String> {
        if self.watchlist.is_empty() {
            return None;
        }
        let symbol = self.watchlist.remove(self.cursor.min(self.watchlist.len() - 1));
        self.fundamentals.remove(&symbol);
        self.cards.remove(&symbol);
        self.cursor = self.cursor.min(self.watchlist.len().saturating_sub(1));
        Some(symbol)
    }

    pub fn current_symbol(&self) -> Option<&str> {
        self.watchlist.get(self.cursor).map(|s| s.as_str())
    }

    pub fn current_card(&self) -> Option<&Result<Scorecard, String>> {
        self.current_symbol().and_then(|s| self.cards.get(s))
    }

    pub fn effective_risk_free(&self, config: &ValuationConfig) -> Sourced<f64> {
        self.risk_free.clone().unwrap_or_else(|| {
            Sourced::fallback(config.risk_free_fallback, "policy rate not loaded yet")
        })
    }

    pub fn set_fundamentals(
        &mut self,
        fundamentals: Sourced<Fundamentals>,
        config: &ValuationConfig,
    ) {
        let symbol = fundamentals.value.symbol.clone();
        self.loading.remove(&symbol);
        self.fundamentals.insert(symbol.clone(), fundamentals);
        self.rebuild_one(&symbol, config);
    }

    pub fn rebuild(&mut self, config: &ValuationConfig) {
        let symbols: Vec<String> = self.fundamentals.keys().cloned().collect();
        for symbol in symbols {
            self.rebuild_one(&symbol, config);
        }
    }

    fn rebuild_one(&mut self, symbol: &str, config: &ValuationConfig) {
        let Some(f) = self.fundamentals.get(symbol) else {
            return;
        };
        let rf = self.effective_risk_free(config);
        let card = Scorecard::build(&f.value, &rf, config, &self.overrides).map_err(|e| e.to_string());
        self.cards.insert(symbol.to_string(), card);
    }

    pub fn adjust_override(&mut self, kind: OverrideKind, direction: i32, config: &ValuationConfig) {
        let d = f64::from(direction.signum());
        let current_card_rate = self
            .current_card()
            .and_then(|c| c.as_ref().ok())
            .map(|c| c.discount_rate);
        let o = &mut self.overrides;
        match kind {
            OverrideKind::Growth => {
                let base = o.growth.unwrap_or(config.stage_one_growth);
                o.growth = Some(round_to(base + 0.005 * d, 4).clamp(-0.20, 0.50));
            }
            OverrideKind::TerminalGrowth => {
                let base = o.terminal_growth.unwrap_or(config.terminal_growth);
                o.terminal_growth = Some(round_to(base + 0.0025 * d, 4).clamp(-0.02, 0.06));
            }
            OverrideKind::DiscountRate => {
                let base = o
                    .discount_rate
                    .or(current_card_rate)
                    .unwrap_or(config.risk_free_fallback + config.equity_risk_premium);
                o.discount_rate = Some(round_to(base + 0.0025 * d, 4).clamp(0.01, 0.40));
            }
            OverrideKind::Years => {
                let base = o.years.unwrap_or(config.stage_one_years) as i64;
                o.years = Some((base + i64::from(direction.signum())).clamp(1, 15) as u32);
            }
        }
        self.rebuild(config);
    }

    pub fn reset_overrides(&mut self, config: &ValuationConfig) {
        self.overrides = ValuationOverrides::default();
        self.rebuild(config);
    }
}

impl Default for ValuationPanelState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Top level ────────────────────────────────────────────────────────

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    Welcome,
    ErrorHistory,
    AddTicker,
}

pub struct AppState {
    // Navigation
    pub active_panel: Panel,
    pub running: bool,

    // Panel states
    pub countries: CountriesPanelState,
    pub macro_data: MacroState,
    pub charts: ChartState,
    pub alerts: AlertsPanelState,
    pub rates: RatesPanelState,
    pub valuation: ValuationPanelState,

    // Worker communication
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,
    pub cancel: Arc<AtomicBool>,

    // Cross-cutting
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,
    pub search_input: String,

    pub config: DashboardConfig,
    pub state_path: PathBuf,
}

impl AppState {
    pub fn new(
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
        cancel: Arc<AtomicBool>,
        config: DashboardConfig,
        state_path: PathBuf,
    ) -> Self {
        let macro_data = MacroState::new(config.data.start_year, config.data.resolved_end_year());
        Self {
            active_panel: Panel::Countries,
            running: true,
            countries: CountriesPanelState::new(config.countries.clone()),
            macro_data,
            charts: ChartState::default(),
            alerts: AlertsPanelState::new(),
            rates: RatesPanelState::new(&config.rates),
            valuation: ValuationPanelState::new(),
            worker_tx,
            worker_rx,
            cancel,
            status_message: None,
            error_history: VecDeque::with_capacity(ERROR_HISTORY_CAP),
            error_scroll: 0,
            overlay: Overlay::None,
            search_input: String::new(),
            config,
            state_path,
        }
    }

    /// Push an error to the history, capping at [`ERROR_HISTORY_CAP`].
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        tracing::warn!(category = category.label(), context = %context, "{message}");
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > ERROR_HISTORY_CAP {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }

    /// Title flags for data a panel shows that did not come fresh from a
    /// provider or the cache.
    pub fn degraded_flags(&self, panel: Panel) -> Vec<&'static str> {
        let mut flags = Vec::new();
        let reads_macro = !matches!(panel, Panel::Valuation | Panel::Help);
        if reads_macro {
            if self.macro_data.partial {
                flags.push("PARTIAL");
            }
            if self.macro_data.has_synthetic() {
                flags.push("SYNTHETIC DATA");
            } else if self.macro_data.is_degraded() {
                flags.push("STALE CACHE");
            }
        }
        let fallback_rate = match panel {
            Panel::Rates => self
                .rates
                .policy_rate
                .as_ref()
                .is_some_and(|r| r.source.is_degraded()),
            Panel::Valuation => self
                .valuation
                .effective_risk_free(&self.config.valuation)
                .source
                .is_degraded(),
            _ => false,
        };
        if fallback_rate {
            flags.push("FALLBACK RATE");
        }
        flags
    }

    /// Latest inflation reading for the rates focus country.
    pub fn focus_inflation(&self) -> Option<(i32, f64)> {
        self.macro_data
            .latest(Indicator::Inflation, &self.rates.country)
    }

    fn send(&mut self, cmd: WorkerCommand) -> bool {
        if self.worker_tx.send(cmd).is_err() {
            self.push_error(
                ErrorCategory::Other,
                "background worker is not running".into(),
                String::new(),
            );
            return false;
        }
        true
    }

    /// Load every indicator for the selected countries.
    pub fn request_macro(&mut self, force: bool) {
        if self.macro_data.loading {
            self.set_warning("Macro load already in progress");
            return;
        }
        let countries = self.countries.selected_codes();
        if countries.is_empty() {
            self.set_warning("Select countries in panel 1 first");
            return;
        }
        let cmd = WorkerCommand::LoadMacro {
            countries,
            indicators: Indicator::all().to_vec(),
            start_year: self.macro_data.start_year,
            end_year: self.macro_data.end_year,
            offline: self.macro_data.offline,
            synthetic: self.macro_data.synthetic,
            force,
        };
        if self.send(cmd) {
            self.macro_data.loading = true;
            self.macro_data.done = 0;
            self.macro_data.total = Indicator::all().len();
            self.set_status("Loading macro indicators...");
        }
    }

    pub fn request_policy_rate(&mut self, country: &str) {
        let cmd = WorkerCommand::FetchPolicyRate {
            country: country.to_string(),
            offline: self.macro_data.offline,
        };
        if self.send(cmd) && country == self.rates.country {
            self.rates.loading = true;
        }
    }

    pub fn request_fundamentals(&mut self, symbols: Vec<String>) {
        let symbols: Vec<String> = symbols
            .into_iter()
            .filter(|s| !self.valuation.loading.contains(s))
            .collect();
        if symbols.is_empty() {
            return;
        }
        let count = symbols.len();
        let cmd = WorkerCommand::FetchFundamentals {
            symbols: symbols.clone(),
            offline: self.macro_data.offline,
        };
        if self.send(cmd) {
            self.valuation.loading.extend(symbols);
            self.set_status(format!("Fetching fundamentals for {count} ticker(s)..."));
        }
    }

    /// Ask the worker to stop the running job at its next checkpoint.
    pub fn cancel_running(&mut self) -> bool {
        if self.macro_data.loading || !self.valuation.loading.is_empty() {
            self.cancel.store(true, Ordering::Relaxed);
            self.set_warning("Cancelling...");
            return true;
        }
        false
    }
}

/// Fold one worker message into the state.
pub fn handle_worker_response(app: &mut AppState, resp: WorkerResponse) {
    match resp {
        WorkerResponse::MacroProgress { item, index, total } => {
            app.macro_data.current_item = Some(item);
            app.macro_data.done = index;
            app.macro_data.total = total;
        }
        WorkerResponse::MacroItemDone { item, error } => {
            app.macro_data.done += 1;
            if let Some(err) = error {
                app.push_error(ErrorCategory::Network, format!("Failed to fetch: {err}"), item);
            }
        }
        WorkerResponse::MacroLoaded {
            panel,
            health,
            alerts,
            partial,
        } => {
            app.macro_data.loading = false;
            app.macro_data.current_item = None;
            let rows = panel.table.len();
            let missing: Vec<&str> = panel.missing.iter().map(|i| i.code()).collect();
            let missing = missing.join(", ");
            let degraded = panel.is_degraded();
            let synthetic = panel.has_synthetic();
            let alert_count = alerts.len();
            if let Err(e) = app.macro_data.ingest(*panel, health, alerts) {
                app.push_error(ErrorCategory::Data, e.to_string(), "indexing macro panel".into());
                return;
            }
            app.alerts.cursor = 0;
            app.macro_data.partial = partial;
            if partial {
                let kept = app.macro_data.panel.as_ref().map_or(0, |p| p.sources.len());
                app.set_warning(format!("Kept {kept} indicator(s), {rows} rows, from a cancelled load"));
            } else if synthetic {
                app.set_warning(format!("Loaded {rows} rows (includes SYNTHETIC data)"));
            } else if degraded {
                app.set_warning(format!("Loaded {rows} rows (some from stale cache)"));
            } else if !missing.is_empty() {
                app.set_warning(format!("Loaded {rows} rows; no data for {missing}"));
            } else {
                app.set_status(format!("Loaded {rows} rows, {alert_count} alert(s)"));
            }
        }
        WorkerResponse::MacroFailed { error } => {
            app.macro_data.loading = false;
            app.macro_data.current_item = None;
            app.push_error(ErrorCategory::Data, error, "macro load".into());
        }
        WorkerResponse::FundamentalsLoaded {
            symbol,
            fundamentals,
        } => {
            let fundamentals = *fundamentals;
            let config = app.config.valuation.clone();
            app.valuation.set_fundamentals(fundamentals, &config);
            if let Some(Err(e)) = app.valuation.cards.get(&symbol) {
                let e = e.clone();
                app.push_error(ErrorCategory::Valuation, e, symbol);
            }
        }
        WorkerResponse::FundamentalsFailed { symbol, error } => {
            app.valuation.loading.remove(&symbol);
            app.push_error(ErrorCategory::Network, error, symbol);
        }
        WorkerResponse::FundamentalsBatchDone { succeeded, failed } => {
            app.valuation.loading.clear();
            if failed == 0 {
                app.set_status(format!("Fundamentals: {succeeded} ticker(s) loaded"));
            } else {
                app.set_warning(format!("Fundamentals: {succeeded} ok, {failed} failed"));
            }
        }
        WorkerResponse::PolicyRate {
            country,
            policy,
            risk_free,
        } => {
            let degraded = policy.source.is_degraded();
            if country == app.rates.country {
                app.rates.apply_policy_rate(policy);
            }
            if country == app.valuation.risk_free_country {
                app.valuation.risk_free = Some(risk_free);
                let config = app.config.valuation.clone();
                app.valuation.rebuild(&config);
            }
            if degraded {
                app.set_warning(format!("No published policy rate for {country}; using fallback"));
            }
        }
        WorkerResponse::Cancelled { what } => {
            app.macro_data.loading = false;
            app.macro_data.current_item = None;
            app.valuation.loading.clear();
            if what == "macro load" && app.macro_data.partial {
                let kept = app.macro_data.panel.as_ref().map_or(0, |p| p.sources.len());
                app.set_warning(format!("Cancelled {what}; kept {kept} indicator(s)"));
            } else {
                app.set_warning(format!("Cancelled {what}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrolens_core::data::DataSource;
    use macrolens_core::domain::Observation;
    use macrolens_core::table::LongTable;

    fn app() -> AppState {
        let (tx, _rx) = std::sync::mpsc::channel();
        let (_tx2, rx2) = std::sync::mpsc::channel();
        AppState::new(
            tx,
            rx2,
            Arc::new(AtomicBool::new(false)),
            DashboardConfig::default(),
            PathBuf::from("."),
        )
    }

    #[test]
    fn panel_cycle() {
        assert_eq!(Panel::Countries.next(), Panel::Production);
        assert_eq!(Panel::Help.next(), Panel::Countries);
        assert_eq!(Panel::Countries.prev(), Panel::Help);
        assert_eq!(Panel::Production.prev(), Panel::Countries);
    }

    #[test]
    fn panel_from_index() {
        for i in 0..8 {
            let p = Panel::from_index(i).unwrap();
            assert_eq!(p.index(), i);
        }
        assert!(Panel::from_index(8).is_none());
    }

    #[test]
    fn chart_panels_have_categories() {
        assert_eq!(Panel::Labour.category(), Some(Category::Labour));
        assert_eq!(Panel::Rates.category(), None);
    }

    #[test]
    fn error_history_caps() {
        let mut app = app();
        for i in 0..60 {
            app.push_error(ErrorCategory::Other, format!("error {i}"), String::new());
        }
        assert_eq!(app.error_history.len(), ERROR_HISTORY_CAP);
        assert!(app.error_history[0].message.contains("59"));
    }

    #[test]
    fn country_tree_rows_and_cursor() {
        let mut state = CountriesPanelState::new(CountrySet::default_world());
        let regions = state.countries.region_names().len();
        let total = state.visible_row_count();
        assert_eq!(total, regions + state.countries.country_count());

        state.cursor = 0;
        assert!(matches!(state.cursor_item(), Some(TreeItem::Region(_))));
        state.cursor = 1;
        assert!(matches!(state.cursor_item(), Some(TreeItem::Country(_, _))));

        // Collapsing on a country row is a no-op.
        state.set_expanded(false);
        assert_eq!(state.visible_row_count(), total);

        state.cursor = 0;
        let first = state.countries.region_names()[0].to_string();
        let children = state.countries.region_countries(&first).unwrap().len();
        state.set_expanded(false);
        assert_eq!(state.visible_row_count(), total - children);
        state.set_expanded(true);
        assert_eq!(state.visible_row_count(), total);
    }

    #[test]
    fn region_toggle_selects_then_clears() {
        let mut state = CountriesPanelState::new(CountrySet::default_world());
        state.cursor = 0;
        let Some(TreeItem::Region(region)) = state.cursor_item() else {
            panic!("first row should be a region");
        };
        let n = state.countries.region_codes(&region).unwrap().len();
        state.toggle_current();
        assert_eq!(state.selected.len(), n);
        state.toggle_current();
        assert!(state.selected.is_empty());
    }

    #[test]
    fn cursor_is_clamped() {
        let mut state = CountriesPanelState::new(CountrySet::default_world());
        state.move_cursor(-5);
        assert_eq!(state.cursor, 0);
        state.move_cursor(10_000);
        assert_eq!(state.cursor, state.visible_row_count() - 1);
    }

    #[test]
    fn chart_cycle_wraps() {
        let mut charts = ChartState::default();
        let n = Indicator::in_category(Category::Finance).len();
        let first = charts.indicator_for(Category::Finance);
        for _ in 0..n {
            charts.cycle(Category::Finance, 1);
        }
        assert_eq!(charts.indicator_for(Category::Finance), first);
        charts.cycle(Category::Finance, -1);
        assert_eq!(
            charts.indicator_for(Category::Finance),
            Indicator::in_category(Category::Finance).last().copied()
        );
        // Other categories are untouched.
        assert_eq!(
            charts.indicator_for(Category::Labour),
            Indicator::in_category(Category::Labour).first().copied()
        );
    }

    #[test]
    fn macro_ingest_indexes_series() {
        let obs = vec![
            Observation::new("USA", Indicator::Inflation.code(), 2022, 8.0),
            Observation::new("USA", Indicator::Inflation.code(), 2021, 4.7),
            Observation::new("DEU", Indicator::Inflation.code(), 2022, 6.9),
        ];
        let mut state = MacroState::new(2020, 2022);
        let panel = MacroPanel {
            table: LongTable::from_observations(&obs).unwrap(),
            ..Default::default()
        };
        state.ingest(panel, Vec::new(), Vec::new()).unwrap();
        assert_eq!(
            state.points(Indicator::Inflation, "USA").unwrap(),
            &[(2021.0, 4.7), (2022.0, 8.0)]
        );
        assert_eq!(state.latest(Indicator::Inflation, "DEU"), Some((2022, 6.9)));
        assert!(state.points(Indicator::GdpGrowth, "USA").is_none());
    }

    #[test]
    fn rates_projection_follows_inputs() {
        let mut rates = RatesPanelState::new(&RatesConfig::default());
        assert!(rates.projection(None).is_none());

        let p = rates.projection(Some(3.0)).unwrap().unwrap();
        assert_eq!(p.spread.len(), 13);
        assert!((p.final_spread() - (5.25 - 3.0)).abs() < 1e-9);

        rates.field = 1;
        rates.adjust(1, Some(3.0));
        assert_eq!(rates.expected, Some(3.1));

        rates.field = 2;
        for _ in 0..40 {
            rates.adjust(1, Some(3.0));
        }
        assert_eq!(rates.months, MAX_HORIZON_MONTHS);
    }

    #[test]
    fn fetched_rate_does_not_override_edit() {
        let mut rates = RatesPanelState::new(&RatesConfig::default());
        rates.apply_policy_rate(Sourced::fetched(4.33, DataSource::CentralBankCsv));
        assert_eq!(rates.nominal, 4.33);
        rates.adjust(1, None);
        assert_eq!(rates.nominal, 4.58);
        rates.apply_policy_rate(Sourced::fetched(4.0, DataSource::CentralBankCsv));
        assert_eq!(rates.nominal, 4.58);
    }

    #[test]
    fn watchlist_dedupes_and_removes() {
        let mut v = ValuationPanelState::new();
        assert!(v.add_ticker("aapl"));
        assert!(!v.add_ticker("AAPL "));
        assert!(v.add_ticker("MSFT"));
        assert_eq!(v.current_symbol(), Some("MSFT"));
        assert_eq!(v.remove_current().as_deref(), Some("MSFT"));
        assert_eq!(v.current_symbol(), Some("AAPL"));
        assert!(!v.add_ticker("  "));
    }

    #[test]
    fn overrides_rebuild_cards() {
        let config = ValuationConfig::default();
        let mut v = ValuationPanelState::new();
        v.add_ticker("ACME");
        let mut f = Fundamentals::new("ACME", 40.0, 1_000.0);
        f.free_cash_flow = Some(3_000.0);
        v.set_fundamentals(Sourced::fetched(f, DataSource::YahooFinance), &config);
        let before = v.current_card().unwrap().as_ref().unwrap().dcf.per_share;

        v.adjust_override(OverrideKind::Growth, 1, &config);
        let after = v.current_card().unwrap().as_ref().unwrap().dcf.per_share;
        assert!(after > before);
        assert_eq!(v.overrides.growth, Some(0.055));

        v.reset_overrides(&config);
        let reset = v.current_card().unwrap().as_ref().unwrap().dcf.per_share;
        assert!((reset - before).abs() < 1e-9);
    }

    #[test]
    fn missing_fcf_is_reported_per_ticker() {
        let config = ValuationConfig::default();
        let mut v = ValuationPanelState::new();
        let f = Fundamentals::new("NOFCF", 10.0, 100.0);
        v.set_fundamentals(Sourced::fetched(f, DataSource::Cache), &config);
        assert!(v.cards.get("NOFCF").unwrap().is_err());
    }

    #[test]
    fn alert_filter_cycles() {
        let mut a = AlertsPanelState::new();
        a.cycle_severity();
        assert_eq!(a.min_severity, Severity::Warning);
        a.cycle_severity();
        a.cycle_severity();
        assert_eq!(a.min_severity, Severity::Info);
    }

    #[test]
    fn cancelled_load_keeps_partial_panel() {
        let mut app = app();
        let obs = vec![Observation::new("USA", Indicator::GdpGrowth.code(), 2022, 2.1)];
        let mut panel = MacroPanel {
            table: LongTable::from_observations(&obs).unwrap(),
            ..Default::default()
        };
        panel
            .sources
            .insert(Indicator::GdpGrowth, Sourced::fetched(1, DataSource::WorldBank));
        app.macro_data.loading = true;

        handle_worker_response(
            &mut app,
            WorkerResponse::MacroLoaded {
                panel: Box::new(panel),
                health: Vec::new(),
                alerts: Vec::new(),
                partial: true,
            },
        );
        handle_worker_response(
            &mut app,
            WorkerResponse::Cancelled {
                what: "macro load".into(),
            },
        );

        assert!(!app.macro_data.loading);
        assert_eq!(app.macro_data.latest(Indicator::GdpGrowth, "USA"), Some((2022, 2.1)));
        assert!(app.degraded_flags(Panel::Production).contains(&"PARTIAL"));
        assert!(!app.degraded_flags(Panel::Valuation).contains(&"PARTIAL"));
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert!(msg.contains("kept 1 indicator"), "{msg}");
    }

    #[test]
    fn policy_rate_response_updates_rates_and_risk_free() {
        let mut app = app();
        handle_worker_response(
            &mut app,
            WorkerResponse::PolicyRate {
                country: "USA".into(),
                policy: Sourced::fetched(4.5, DataSource::CentralBankCsv),
                risk_free: Sourced::fetched(0.045, DataSource::CentralBankCsv),
            },
        );
        assert_eq!(app.rates.nominal, 4.5);
        assert_eq!(app.valuation.risk_free.as_ref().map(|r| r.value), Some(0.045));
    }
}
