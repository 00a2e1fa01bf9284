//! Panel 7: watchlist scorecards with DCF, checklist and sensitivity grid.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use macrolens_core::config::ValuationConfig;
use macrolens_core::valuation::{Scorecard, ValuationOverrides};

use crate::app::AppState;
use crate::theme;
use crate::ui::{fmt_money, fmt_opt};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(30)])
        .split(area);

    render_watchlist(f, cols[0], app);
    render_detail(f, cols[1], app);
}

fn render_watchlist(f: &mut Frame, area: Rect, app: &AppState) {
    let v = &app.valuation;
    let margin = app.config.valuation.margin_of_safety;
    let mut lines = vec![
        Line::from(Span::styled(
            "[a]dd [x]remove [f]etch all [F]etch one",
            theme::muted(),
        )),
        Line::from(Span::styled(
            format!("{:<8} {:>9} {:>9} {:>8}", "Ticker", "Price", "Fair", "Upside"),
            theme::muted(),
        )),
    ];

    if v.watchlist.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Watchlist is empty. Press a to add a ticker.",
            theme::muted(),
        )));
    }

    for (i, symbol) in v.watchlist.iter().enumerate() {
        let is_cursor = i == v.cursor;
        let sym_style = if is_cursor {
            theme::cursor()
        } else {
            theme::accent()
        };
        let mut spans = vec![Span::styled(format!("{symbol:<8}"), sym_style)];
        match v.cards.get(symbol) {
            Some(Ok(card)) => {
                let color = theme::upside_color(card.upside, margin);
                spans.push(Span::styled(format!(" {:>9.2}", card.price), theme::text()));
                spans.push(Span::styled(
                    format!(" {:>9.2}", card.dcf.per_share),
                    theme::text_secondary(),
                ));
                spans.push(Span::styled(
                    format!(" {:>+7.1}%", card.upside * 100.0),
                    Style::default().fg(color),
                ));
            }
            Some(Err(_)) => spans.push(Span::styled("  cannot value", theme::negative())),
            None if v.loading.contains(symbol) => {
                spans.push(Span::styled("  fetching...", theme::warning()))
            }
            None => spans.push(Span::styled("  not loaded", theme::muted())),
        }
        if let Some(fund) = v.fundamentals.get(symbol) {
            if fund.source.is_degraded() || fund.note.is_some() {
                spans.push(Span::styled(" *", theme::warning()));
            }
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    let rf = v.effective_risk_free(&app.config.valuation);
    lines.push(Line::from(vec![
        Span::styled("Risk-free ", theme::muted()),
        Span::styled(format!("{:.2}%", rf.value * 100.0), theme::accent()),
        Span::styled(
            format!(" ({}, {})", v.risk_free_country, rf.source.label()),
            Style::default().fg(theme::source_color(rf.source)),
        ),
    ]));
    lines.push(Line::from(Span::styled("[p] refresh risk-free", theme::muted())));
    lines.push(Line::from(""));
    lines.extend(override_lines(&v.overrides, &app.config.valuation));

    f.render_widget(Paragraph::new(lines), area);
}

fn override_lines(o: &ValuationOverrides, config: &ValuationConfig) -> Vec<Line<'static>> {
    let row = |keys: &str, label: &str, value: String, overridden: bool| {
        Line::from(vec![
            Span::styled(format!("[{keys}] "), theme::muted()),
            Span::styled(format!("{label:<16}"), theme::muted()),
            Span::styled(
                value,
                if overridden {
                    theme::accent_bold()
                } else {
                    theme::text_secondary()
                },
            ),
        ])
    };
    vec![
        Line::from(Span::styled("Assumptions  [0] reset", theme::accent_bold())),
        row(
            "g/G",
            "Growth",
            format!("{:.2}%", o.growth.unwrap_or(config.stage_one_growth) * 100.0),
            o.growth.is_some(),
        ),
        row(
            "t/T",
            "Terminal growth",
            format!(
                "{:.2}%",
                o.terminal_growth.unwrap_or(config.terminal_growth) * 100.0
            ),
            o.terminal_growth.is_some(),
        ),
        row(
            "r/R",
            "Discount rate",
            o.discount_rate
                .map(|r| format!("{:.2}%", r * 100.0))
                .unwrap_or_else(|| "CAPM".to_string()),
            o.discount_rate.is_some(),
        ),
        row(
            "y/Y",
            "Stage-one years",
            format!("{}", o.years.unwrap_or(config.stage_one_years)),
            o.years.is_some(),
        ),
    ]
}

fn render_detail(f: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default()
        .borders(Borders::LEFT)
        .border_style(theme::muted());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let v = &app.valuation;
    let Some(symbol) = v.current_symbol() else {
        return;
    };
    let lines = match v.cards.get(symbol) {
        Some(Ok(card)) => {
            let note = v.fundamentals.get(symbol).map(|fund| match &fund.note {
                Some(n) => format!("{} ({n})", fund.source.label()),
                None => fund.source.label().to_string(),
            });
            scorecard_lines(card, note, app.config.valuation.margin_of_safety)
        }
        Some(Err(e)) => vec![
            Line::from(Span::styled(symbol.to_string(), theme::accent_bold())),
            Line::from(""),
            Line::from(Span::styled(format!("Cannot value: {e}"), theme::negative())),
        ],
        None => vec![Line::from(Span::styled(
            format!("{symbol}: press F to fetch fundamentals"),
            theme::muted(),
        ))],
    };
    f.render_widget(Paragraph::new(lines), inner);
}

fn scorecard_lines(card: &Scorecard, source: Option<String>, margin: f64) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();
    let color = theme::upside_color(card.upside, margin);

    let mut title = vec![Span::styled(card.symbol.clone(), theme::accent_bold())];
    if let Some(name) = &card.name {
        title.push(Span::styled(format!("  {name}"), theme::text()));
    }
    if let Some(source) = source {
        title.push(Span::styled(format!("  [{source}]"), theme::muted()));
    }
    lines.push(Line::from(title));
    lines.push(Line::from(vec![
        Span::styled("Price ", theme::muted()),
        Span::styled(format!("{:.2}", card.price), theme::text()),
        Span::styled("  DCF ", theme::muted()),
        Span::styled(format!("{:.2}", card.dcf.per_share), theme::accent()),
        Span::styled("  Gordon ", theme::muted()),
        Span::styled(fmt_opt(card.gordon_value, 2), theme::text_secondary()),
        Span::styled("  Upside ", theme::muted()),
        Span::styled(
            format!("{:+.1}% ", card.upside * 100.0),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(card.verdict.label(), Style::default().fg(color)),
    ]));
    lines.push(Line::from(vec![
        Span::styled("P/E ", theme::muted()),
        Span::styled(fmt_opt(card.trailing_pe, 1), theme::text()),
        Span::styled("  FCF yield ", theme::muted()),
        Span::styled(
            fmt_opt(card.fcf_yield.map(|y| y * 100.0), 2) + "%",
            theme::text(),
        ),
        Span::styled("  Beta ", theme::muted()),
        Span::styled(format!("{:.2}", card.beta), theme::text()),
    ]));
    lines.push(Line::from(vec![
        Span::styled(format!("Discount {:.2}%  ", card.discount_rate * 100.0), theme::accent()),
        Span::styled(card.discount_basis.clone(), theme::muted()),
    ]));
    lines.push(Line::from(""));

    // DCF
    lines.push(Line::from(Span::styled("Two-stage DCF", theme::accent_bold())));
    lines.push(Line::from(Span::styled(
        format!("{:>6} {:>12} {:>12}", "Year", "FCF", "PV"),
        theme::muted(),
    )));
    for y in &card.dcf.years {
        lines.push(Line::from(Span::styled(
            format!("{:>6} {:>12} {:>12}", y.year, fmt_money(y.fcf), fmt_money(y.discounted)),
            theme::text_secondary(),
        )));
    }
    let tw = card
        .dcf
        .terminal_weight()
        .map(|w| format!(" ({:.0}% of EV)", w * 100.0))
        .unwrap_or_default();
    lines.push(Line::from(vec![
        Span::styled("Terminal PV ", theme::muted()),
        Span::styled(fmt_money(card.dcf.pv_terminal), theme::text()),
        Span::styled(tw, theme::muted()),
        Span::styled("  EV ", theme::muted()),
        Span::styled(fmt_money(card.dcf.enterprise_value), theme::text()),
        Span::styled("  Equity ", theme::muted()),
        Span::styled(fmt_money(card.dcf.equity_value), theme::text()),
    ]));
    lines.push(Line::from(""));

    // Checklist
    let cl = &card.checklist;
    lines.push(Line::from(vec![
        Span::styled("Quality checklist ", theme::accent_bold()),
        Span::styled(
            format!("{}/{} ({} available)", cl.score(), cl.max(), cl.available()),
            theme::accent(),
        ),
    ]));
    let mut row: Vec<Span> = Vec::new();
    for (i, check) in cl.checks.iter().enumerate() {
        row.push(Span::styled(
            format!("{} ", check.status.symbol()),
            Style::default().fg(theme::check_color(check.status)),
        ));
        row.push(Span::styled(format!("{:<24}", check.name), theme::text_secondary()));
        if i % 2 == 1 {
            lines.push(Line::from(std::mem::take(&mut row)));
        }
    }
    if !row.is_empty() {
        lines.push(Line::from(row));
    }
    lines.push(Line::from(""));

    // Sensitivity
    let s = &card.sensitivity;
    lines.push(Line::from(Span::styled(
        "Sensitivity (per share): discount rate x terminal growth",
        theme::accent_bold(),
    )));
    let mut head = vec![Span::styled(format!("{:>10}", ""), theme::muted())];
    for g in s.terminal_growths {
        head.push(Span::styled(format!("{:>10.2}%", g * 100.0), theme::muted()));
    }
    lines.push(Line::from(head));
    for (r, rate) in s.discount_rates.iter().enumerate() {
        let mut spans = vec![Span::styled(format!("{:>9.2}%", rate * 100.0), theme::muted())];
        for (c, value) in s.values[r].iter().enumerate() {
            let style = match value {
                Some(v) => {
                    let up = v / card.price - 1.0;
                    let st = Style::default().fg(theme::upside_color(up, margin));
                    if r == 1 && c == 1 {
                        st.add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                    } else {
                        st
                    }
                }
                None => theme::muted(),
            };
            spans.push(Span::styled(format!("{:>11}", fmt_opt(*value, 2)), style));
        }
        lines.push(Line::from(spans));
    }

    lines
}
