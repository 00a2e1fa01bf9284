//! MacroLens TUI entry point.
//!
//! Usage: `macrolens-tui [CONFIG.toml]`. Logs go to `<config dir>/macrolens/tui.log`
//! since the terminal is taken over by the UI; `RUST_LOG` overrides the level.

use std::fs::{self, OpenOptions};
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use macrolens_core::config::DashboardConfig;
use macrolens_tui::app::{handle_worker_response, AppState};
use macrolens_tui::worker::{self, WorkerCommand};
use macrolens_tui::{input, persistence, ui};

fn main() -> Result<()> {
    let state_path = persistence::default_path();
    init_tracing(state_path.parent().unwrap_or(Path::new(".")));

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = DashboardConfig::load_or_default(config_path.as_deref())
        .context("failed to load configuration")?;
    tracing::info!(config = ?config_path, "starting macrolens-tui");

    // Leave raw mode before the panic message is printed.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    let persisted = persistence::load(&state_path);

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));

    let worker_handle = worker::spawn_worker(cmd_rx, resp_tx, cancel.clone(), config.clone())
        .context("failed to spawn worker thread")?;

    let mut app = AppState::new(cmd_tx.clone(), resp_rx, cancel, config, state_path.clone());
    persistence::apply(&mut app, persisted);
    request_initial_data(&mut app);

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    // Persist the UI state before tearing down the worker.
    let persisted = persistence::extract(&app);
    if let Err(e) = persistence::save(&state_path, &persisted) {
        tracing::warn!(path = %state_path.display(), error = %e, "failed to save state");
    }

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    while app.running {
        terminal.draw(|f| ui::draw(f, app))?;

        let pending: Vec<_> = app.worker_rx.try_iter().collect();
        for resp in pending {
            handle_worker_response(app, resp);
        }

        // ~20 redraws per second while idle.
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }
    }
    Ok(())
}

/// Restore the previous session: reload the selection (cache first) and the
/// rates needed by the rates and valuation panels.
fn request_initial_data(app: &mut AppState) {
    if !app.countries.selected.is_empty() {
        app.request_macro(false);
    }
    let rates_country = app.rates.country.clone();
    app.request_policy_rate(&rates_country);
    let rf_country = app.valuation.risk_free_country.clone();
    if rf_country != rates_country {
        app.request_policy_rate(&rf_country);
    }
    if !app.valuation.watchlist.is_empty() {
        let symbols = app.valuation.watchlist.clone();
        app.request_fundamentals(symbols);
    }
}

/// Log to a file next to the persisted state. Logging is skipped if the file
/// cannot be opened.
fn init_tracing(dir: &Path) {
    if fs::create_dir_all(dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("tui.log"))
    else {
        return;
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}
