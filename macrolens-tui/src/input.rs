//! Keyboard input dispatch: overlays, then global keys, then panel-specific handlers.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{AppState, OverrideKind, Overlay, Panel, RatesField, TreeItem};

/// Handle a key event.
pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    // 1. Overlays consume input first.
    match &app.overlay {
        Overlay::Welcome => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::AddTicker => {
            handle_add_ticker_overlay(app, key);
            return;
        }
        Overlay::None => {}
    }

    // 2. Global keys (always available).
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char(c @ '1'..='8') => {
            let index = c as usize - '1' as usize;
            if let Some(panel) = Panel::from_index(index) {
                app.active_panel = panel;
            }
            return;
        }
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.active_panel = app.active_panel.prev();
            } else {
                app.active_panel = app.active_panel.next();
            }
            return;
        }
        KeyCode::BackTab => {
            app.active_panel = app.active_panel.prev();
            return;
        }
        KeyCode::Esc => {
            if app.cancel_running() {
                return;
            }
        }
        _ => {}
    }

    // 3. Panel-specific keys.
    match app.active_panel {
        Panel::Countries => handle_countries_key(app, key),
        Panel::Production | Panel::Labour | Panel::Finance => handle_chart_key(app, key),
        Panel::Alerts => handle_alerts_key(app, key),
        Panel::Rates => handle_rates_key(app, key),
        Panel::Valuation => handle_valuation_key(app, key),
        Panel::Help => handle_help_key(app, key),
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        KeyCode::Char('c') => {
            app.error_history.clear();
            app.error_scroll = 0;
        }
        _ => {}
    }
}

fn handle_add_ticker_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.overlay = Overlay::None;
            app.search_input.clear();
        }
        KeyCode::Enter => {
            let symbol = app.search_input.trim().to_uppercase();
            if app.valuation.add_ticker(&symbol) {
                app.set_status(format!("Added {symbol}"));
                app.request_fundamentals(vec![symbol]);
            } else if !symbol.is_empty() {
                app.set_warning(format!("{symbol} is already on the watchlist"));
            }
            app.search_input.clear();
            app.overlay = Overlay::None;
        }
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char(c) if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=') => {
            app.search_input.push(c.to_ascii_uppercase());
        }
        _ => {}
    }
}

fn handle_countries_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.countries.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.countries.move_cursor(-1),
        KeyCode::Char('l') | KeyCode::Right => app.countries.set_expanded(true),
        KeyCode::Char('h') | KeyCode::Left => app.countries.set_expanded(false),
        KeyCode::Char(' ') => app.countries.toggle_current(),
        KeyCode::Char('a') => app.countries.select_all(),
        KeyCode::Char('d') => app.countries.selected.clear(),
        KeyCode::Char('f') => app.request_macro(false),
        KeyCode::Char('F') => app.request_macro(true),
        KeyCode::Char('o') => {
            app.macro_data.offline = !app.macro_data.offline;
            let msg = if app.macro_data.offline {
                "Offline: cache only"
            } else {
                "Online: network enabled"
            };
            app.set_status(msg);
        }
        KeyCode::Char('y') => {
            app.macro_data.synthetic = !app.macro_data.synthetic;
            if app.macro_data.synthetic {
                app.set_warning("Synthetic fallback ON: missing series will be generated");
            } else {
                app.set_status("Synthetic fallback off");
            }
        }
        KeyCode::Enter => match app.countries.cursor_item() {
            Some(TreeItem::Country(_, code)) => focus_country(app, &code),
            Some(TreeItem::Region(region)) => {
                if app.countries.expanded_regions.contains(&region) {
                    app.countries.expanded_regions.remove(&region);
                } else {
                    app.countries.expanded_regions.insert(region);
                }
            }
            None => {}
        },
        _ => {}
    }
}

/// Make `code` the focus country for the rates panel and fetch its policy rate.
fn focus_country(app: &mut AppState, code: &str) {
    let name = app.countries.countries.name_of(code).to_string();
    app.rates.set_country(code);
    app.request_policy_rate(code);
    app.set_status(format!("Focus country: {name}"));
}

fn handle_chart_key(app: &mut AppState, key: KeyEvent) {
    let Some(category) = app.active_panel.category() else {
        return;
    };
    match key.code {
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Char('j') | KeyCode::Down => {
            app.charts.cycle(category, 1)
        }
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('k') | KeyCode::Up => {
            app.charts.cycle(category, -1)
        }
        KeyCode::Char('f') => app.request_macro(false),
        _ => {}
    }
}

fn handle_alerts_key(app: &mut AppState, key: KeyEvent) {
    let visible = app.alerts.visible(&app.macro_data.alerts).len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.alerts.cursor + 1 < visible {
                app.alerts.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.alerts.cursor = app.alerts.cursor.saturating_sub(1);
        }
        KeyCode::Char('s') => app.alerts.cycle_severity(),
        KeyCode::Enter => {
            let country = app
                .alerts
                .visible(&app.macro_data.alerts)
                .get(app.alerts.cursor)
                .map(|a| a.country.clone());
            if let Some(country) = country {
                focus_country(app, &country);
                app.active_panel = Panel::Rates;
            }
        }
        _ => {}
    }
}

fn handle_rates_key(app: &mut AppState, key: KeyEvent) {
    let current = app.focus_inflation().map(|(_, v)| v);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.rates.field + 1 < RatesField::ALL.len() {
                app.rates.field += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.rates.field = app.rates.field.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => app.rates.adjust(1, current),
        KeyCode::Char('h') | KeyCode::Left => app.rates.adjust(-1, current),
        KeyCode::Char('r') => {
            let country = app.rates.country.clone();
            app.request_policy_rate(&country);
            app.set_status(format!("Refreshing policy rate for {country}..."));
        }
        KeyCode::Char('c') => {
            app.rates.expected = None;
            app.rates.nominal_edited = false;
            app.rates.nominal = app
                .rates
                .policy_rate
                .as_ref()
                .map(|r| r.value)
                .unwrap_or(app.config.rates.nominal_fallback);
            app.rates.months = app.config.rates.horizon_months;
            app.set_status("Scenario reset");
        }
        _ => {}
    }
}

fn handle_valuation_key(app: &mut AppState, key: KeyEvent) {
    let config = app.config.valuation.clone();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.valuation.cursor + 1 < app.valuation.watchlist.len() {
                app.valuation.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.valuation.cursor = app.valuation.cursor.saturating_sub(1);
        }
        KeyCode::Char('a') | KeyCode::Char('/') => {
            app.search_input.clear();
            app.overlay = Overlay::AddTicker;
        }
        KeyCode::Char('x') => {
            if let Some(symbol) = app.valuation.remove_current() {
                app.set_status(format!("Removed {symbol}"));
            }
        }
        KeyCode::Char('f') => {
            if app.valuation.watchlist.is_empty() {
                app.set_warning("Watchlist is empty: press 'a' to add a ticker");
                return;
            }
            let symbols = app.valuation.watchlist.clone();
            app.request_fundamentals(symbols);
        }
        KeyCode::Char('F') => {
            if let Some(symbol) = app.valuation.current_symbol().map(String::from) {
                app.request_fundamentals(vec![symbol]);
            }
        }
        KeyCode::Char('p') => {
            let country = app.valuation.risk_free_country.clone();
            app.request_policy_rate(&country);
        }
        KeyCode::Char('g') => app.valuation.adjust_override(OverrideKind::Growth, -1, &config),
        KeyCode::Char('G') => app.valuation.adjust_override(OverrideKind::Growth, 1, &config),
        KeyCode::Char('t') => {
            app.valuation
                .adjust_override(OverrideKind::TerminalGrowth, -1, &config)
        }
        KeyCode::Char('T') => {
            app.valuation
                .adjust_override(OverrideKind::TerminalGrowth, 1, &config)
        }
        KeyCode::Char('r') => {
            app.valuation
                .adjust_override(OverrideKind::DiscountRate, -1, &config)
        }
        KeyCode::Char('R') => {
            app.valuation
                .adjust_override(OverrideKind::DiscountRate, 1, &config)
        }
        KeyCode::Char('y') => app.valuation.adjust_override(OverrideKind::Years, -1, &config),
        KeyCode::Char('Y') => app.valuation.adjust_override(OverrideKind::Years, 1, &config),
        KeyCode::Char('0') => {
            app.valuation.reset_overrides(&config);
            app.set_status("Valuation overrides cleared");
        }
        _ => {}
    }
}

fn handle_help_key(app: &mut AppState, key: KeyEvent) {
    if let KeyCode::Char('e') = key.code {
        app.error_scroll = 0;
        app.overlay = Overlay::ErrorHistory;
    }
}
