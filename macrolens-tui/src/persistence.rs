//! Dashboard state persistence: JSON save/load across restarts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use macrolens_core::analytics::Severity;

use crate::app::{AppState, Overlay, Panel};

const APP_DIR: &str = "macrolens";
const STATE_FILE: &str = "tui_state.json";

/// Serializable subset of app state that persists across restarts.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub selected_countries: Vec<String>,
    pub collapsed_regions: Vec<String>,
    pub watchlist: Vec<String>,
    pub active_panel: Panel,
    pub chart_selection: [usize; 3],
    pub alert_min_severity: Severity,
    pub rates_country: String,
    pub expected_inflation: Option<f64>,
    pub horizon_months: Option<u32>,
    pub offline: bool,
    pub synthetic: bool,
    pub welcome_dismissed: bool,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            selected_countries: Vec::new(),
            collapsed_regions: Vec::new(),
            watchlist: Vec::new(),
            active_panel: Panel::Countries,
            chart_selection: [0; 3],
            alert_min_severity: Severity::Info,
            rates_country: "USA".to_string(),
            expected_inflation: None,
            horizon_months: None,
            offline: false,
            synthetic: false,
            welcome_dismissed: false,
        }
    }
}

/// `<config dir>/macrolens/tui_state.json`, or the working directory when
/// the platform has no config dir.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STATE_FILE)
}

/// Load persisted state from disk. Returns defaults if file is missing or corrupt.
pub fn load(path: &Path) -> PersistedState {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt state file");
            PersistedState::default()
        }),
        Err(_) => PersistedState::default(),
    }
}

/// Save persisted state to disk. Creates parent directories if needed.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Extract persisted state from AppState.
pub fn extract(app: &AppState) -> PersistedState {
    let collapsed_regions = app
        .countries
        .countries
        .region_names()
        .into_iter()
        .filter(|r| !app.countries.expanded_regions.contains(*r))
        .map(String::from)
        .collect();
    PersistedState {
        selected_countries: app.countries.selected_codes(),
        collapsed_regions,
        watchlist: app.valuation.watchlist.clone(),
        active_panel: app.active_panel,
        chart_selection: app.charts.selection,
        alert_min_severity: app.alerts.min_severity,
        rates_country: app.rates.country.clone(),
        expected_inflation: app.rates.expected,
        horizon_months: Some(app.rates.months),
        offline: app.macro_data.offline,
        synthetic: app.macro_data.synthetic,
        welcome_dismissed: app.overlay != Overlay::Welcome,
    }
}

/// Apply persisted state to AppState.
///
/// Countries no longer in the configured set are dropped.
pub fn apply(app: &mut AppState, state: PersistedState) {
    let known: Vec<String> = app
        .countries
        .countries
        .all_codes()
        .into_iter()
        .map(String::from)
        .collect();
    for code in state.selected_countries {
        if known.contains(&code) {
            app.countries.selected.insert(code);
        }
    }
    for region in &state.collapsed_regions {
        app.countries.expanded_regions.remove(region);
    }
    for symbol in &state.watchlist {
        app.valuation.add_ticker(symbol);
    }
    app.valuation.cursor = 0;
    app.active_panel = state.active_panel;
    app.charts.selection = state.chart_selection;
    app.alerts.min_severity = state.alert_min_severity;
    if known.contains(&state.rates_country) {
        app.rates.country = state.rates_country;
    }
    app.rates.expected = state.expected_inflation;
    if let Some(months) = state.horizon_months {
        app.rates.months = months.clamp(1, macrolens_core::analytics::real_rate::MAX_HORIZON_MONTHS);
    }
    app.macro_data.offline = state.offline;
    app.macro_data.synthetic = state.synthetic;
    if !state.welcome_dismissed {
        app.overlay = Overlay::Welcome;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrolens_core::config::DashboardConfig;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn app() -> AppState {
        let (tx, _rx) = std::sync::mpsc::channel();
        let (_tx2, rx2) = std::sync::mpsc::channel();
        AppState::new(
            tx,
            rx2,
            Arc::new(AtomicBool::new(false)),
            DashboardConfig::default(),
            PathBuf::from("state.json"),
        )
    }

    #[test]
    fn roundtrip() {
        let dir = std::env::temp_dir().join("macrolens_persist_test");
        let path = dir.join("state.json");

        let state = PersistedState {
            selected_countries: vec!["USA".into(), "DEU".into()],
            watchlist: vec!["AAPL".into()],
            active_panel: Panel::Rates,
            expected_inflation: Some(2.5),
            welcome_dismissed: true,
            ..Default::default()
        };

        save(&path, &state).unwrap();
        let loaded = load(&path);

        assert_eq!(loaded.selected_countries.len(), 2);
        assert_eq!(loaded.watchlist, vec!["AAPL".to_string()]);
        assert_eq!(loaded.active_panel, Panel::Rates);
        assert_eq!(loaded.expected_inflation, Some(2.5));
        assert!(loaded.welcome_dismissed);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_returns_defaults() {
        let loaded = load(Path::new("/nonexistent/path/state.json"));
        assert!(loaded.selected_countries.is_empty());
        assert!(!loaded.welcome_dismissed);
    }

    #[test]
    fn corrupt_file_returns_defaults() {
        let dir = std::env::temp_dir().join("macrolens_persist_corrupt");
        let path = dir.join("state.json");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "not valid json {{{").unwrap();

        let loaded = load(&path);
        assert!(loaded.selected_countries.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = std::env::temp_dir().join("macrolens_persist_partial");
        let path = dir.join("state.json");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, r#"{"watchlist": ["MSFT"]}"#).unwrap();

        let loaded = load(&path);
        assert_eq!(loaded.watchlist, vec!["MSFT".to_string()]);
        assert_eq!(loaded.rates_country, "USA");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn extract_apply_roundtrip() {
        let mut source = app();
        source.countries.selected.insert("JPN".into());
        source.valuation.add_ticker("KO");
        source.active_panel = Panel::Valuation;
        source.alerts.min_severity = Severity::Critical;
        source.rates.months = 18;

        let state = extract(&source);
        let mut target = app();
        apply(&mut target, state);

        assert!(target.countries.selected.contains("JPN"));
        assert_eq!(target.valuation.watchlist, vec!["KO".to_string()]);
        assert_eq!(target.active_panel, Panel::Valuation);
        assert_eq!(target.alerts.min_severity, Severity::Critical);
        assert_eq!(target.rates.months, 18);
        assert_eq!(target.overlay, Overlay::None);
    }

    #[test]
    fn unknown_countries_are_dropped() {
        let mut target = app();
        let state = PersistedState {
            selected_countries: vec!["USA".into(), "XXX".into()],
            rates_country: "XXX".into(),
            ..Default::default()
        };
        apply(&mut target, state);
        assert_eq!(target.countries.selected_codes(), vec!["USA".to_string()]);
        assert_eq!(target.rates.country, "USA");
        assert_eq!(target.overlay, Overlay::Welcome);
    }
}
