use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;

use ratatui::backend::TestBackend;
use ratatui::Terminal;

use macrolens_core::analytics::{health_scores, scan_alerts};
use macrolens_core::config::DashboardConfig;
use macrolens_core::data::synthetic::synthetic_series;
use macrolens_core::data::{DataSource, MacroPanel, Sourced};
use macrolens_core::domain::{Fundamentals, Indicator};
use macrolens_core::table::LongTable;
use macrolens_tui::app::{handle_worker_response, AppState, Overlay, Panel};
use macrolens_tui::ui;
use macrolens_tui::worker::{WorkerCommand, WorkerResponse};

fn app() -> (AppState, mpsc::Receiver<WorkerCommand>) {
    let (tx, rx) = mpsc::channel();
    let (_resp_tx, resp_rx) = mpsc::channel();
    let app = AppState::new(
        tx,
        resp_rx,
        Arc::new(AtomicBool::new(false)),
        DashboardConfig::default(),
        PathBuf::from("state.json"),
    );
    (app, rx)
}

fn loaded_app() -> AppState {
    loaded_app_tagged(|rows| Sourced::fetched(rows, DataSource::Synthetic))
}

/// App with a three-country panel whose per-indicator provenance comes from `tag`.
fn loaded_app_tagged(tag: impl Fn(usize) -> Sourced<usize>) -> AppState {
    let (mut app, _rx) = app();
    let countries = ["USA", "DEU", "BRA"];
    for c in countries {
        app.countries.selected.insert(c.to_string());
    }

    let observations: Vec<_> = countries
        .iter()
        .flat_map(|c| {
            Indicator::all()
                .iter()
                .flat_map(move |&i| synthetic_series(c, i, 2010, 2022))
        })
        .collect();
    let table = LongTable::from_observations(&observations).unwrap();
    let health = health_scores(&table, &countries).unwrap();
    let alerts = scan_alerts(&table, &countries).unwrap();
    let mut panel = MacroPanel {
        table,
        ..Default::default()
    };
    for &i in Indicator::all() {
        panel.sources.insert(i, tag(13 * 3));
    }
    handle_worker_response(
        &mut app,
        WorkerResponse::MacroLoaded {
            panel: Box::new(panel),
            health,
            alerts,
            partial: false,
        },
    );

    let mut f = Fundamentals::new("ACME", 50.0, 1_000_000.0);
    f.name = Some("Acme Corp".into());
    f.free_cash_flow = Some(4_000_000.0);
    f.total_debt = 2_000_000.0;
    f.total_cash = 1_000_000.0;
    f.net_income = Some(3_000_000.0);
    f.operating_cash_flow = Some(4_500_000.0);
    f.return_on_assets = Some(0.08);
    app.valuation.add_ticker("ACME");
    handle_worker_response(
        &mut app,
        WorkerResponse::FundamentalsLoaded {
            symbol: "ACME".into(),
            fundamentals: Box::new(Sourced::fetched(f, DataSource::YahooFinance)),
        },
    );
    app
}

fn render(app: &AppState) -> String {
    let backend = TestBackend::new(140, 45);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|f| ui::draw(f, app)).unwrap();
    terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|c| c.symbol())
        .collect()
}

#[test]
fn every_panel_renders_with_data() {
    let mut app = loaded_app();
    for panel in Panel::ALL {
        app.active_panel = panel;
        let screen = render(&app);
        assert!(
            screen.contains(panel.label()),
            "{} title missing",
            panel.label()
        );
    }
}

#[test]
fn every_panel_renders_empty() {
    let (mut app, _rx) = app();
    for panel in Panel::ALL {
        app.active_panel = panel;
        render(&app);
    }
}

#[test]
fn synthetic_data_is_flagged_in_title() {
    let mut app = loaded_app();
    app.active_panel = Panel::Production;
    assert!(render(&app).contains("SYNTHETIC"));
}

#[test]
fn stale_cache_is_flagged_in_title() {
    let mut app =
        loaded_app_tagged(|rows| Sourced::fallback(rows, "stale cache from 2024-01-02 09:00"));
    for panel in [Panel::Countries, Panel::Labour, Panel::Alerts, Panel::Rates] {
        app.active_panel = panel;
        let screen = render(&app);
        assert!(screen.contains("STALE CACHE"), "{} not flagged", panel.label());
        assert!(!screen.contains("SYNTHETIC"));
    }

    let mut fresh = loaded_app_tagged(|rows| Sourced::fetched(rows, DataSource::WorldBank));
    fresh.active_panel = Panel::Production;
    let screen = render(&fresh);
    assert!(!screen.contains("STALE CACHE"));
    assert!(!screen.contains("SYNTHETIC"));
}

#[test]
fn fallback_rates_are_flagged_in_title() {
    let mut app = loaded_app_tagged(|rows| Sourced::fetched(rows, DataSource::WorldBank));

    app.active_panel = Panel::Rates;
    app.rates
        .apply_policy_rate(Sourced::fallback(5.25, "no policy-rate series for USA"));
    assert!(render(&app).contains("FALLBACK RATE"));

    // Scorecards priced off the configured risk-free constant.
    app.active_panel = Panel::Valuation;
    assert!(render(&app).contains("FALLBACK RATE"));

    app.valuation.risk_free = Some(Sourced::fetched(0.045, DataSource::CentralBankCsv));
    assert!(!render(&app).contains("FALLBACK RATE"));

    app.active_panel = Panel::Production;
    assert!(!render(&app).contains("FALLBACK RATE"));
}

#[test]
fn countries_panel_shows_health_scores() {
    let mut app = loaded_app();
    app.active_panel = Panel::Countries;
    let screen = render(&app);
    assert!(screen.contains("Health score"));
    assert!(screen.contains("Brazil"));
}

#[test]
fn valuation_panel_shows_scorecard() {
    let mut app = loaded_app();
    app.active_panel = Panel::Valuation;
    let screen = render(&app);
    assert!(screen.contains("ACME"));
    assert!(screen.contains("Two-stage DCF"));
    assert!(screen.contains("Sensitivity"));
}

#[test]
fn rates_panel_shows_verdict_once_inflation_is_loaded() {
    let mut app = loaded_app();
    app.active_panel = Panel::Rates;
    let screen = render(&app);
    assert!(screen.contains("OK") || screen.contains("WARNING"));
}

#[test]
fn overlays_render() {
    let mut app = loaded_app();
    for overlay in [Overlay::Welcome, Overlay::ErrorHistory, Overlay::AddTicker] {
        app.overlay = overlay;
        render(&app);
    }
    app.overlay = Overlay::Welcome;
    assert!(render(&app).contains("Welcome to MacroLens"));
}

#[test]
fn tiny_terminal_does_not_panic() {
    let mut app = loaded_app();
    for panel in Panel::ALL {
        app.active_panel = panel;
        let backend = TestBackend::new(20, 6);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui::draw(f, &app)).unwrap();
    }
}
