//! Panel 1: region/country tree, load progress and health scores.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_tree(f, cols[0], app);
    render_health(f, cols[1], app);
}

fn render_tree(f: &mut Frame, area: Rect, app: &AppState) {
    let state = &app.countries;
    let data = &app.macro_data;
    let mut header: Vec<Line> = Vec::new();

    header.push(Line::from(vec![
        Span::styled("Selected: ", theme::muted()),
        Span::styled(
            format!("{}/{}", state.selected.len(), state.countries.country_count()),
            theme::accent(),
        ),
        Span::styled(
            format!("  {}-{}", data.start_year, data.end_year),
            theme::muted(),
        ),
        Span::styled(
            if data.offline { "  OFFLINE" } else { "" },
            theme::warning(),
        ),
        Span::styled(
            if data.synthetic { "  SYNTH" } else { "" },
            theme::negative(),
        ),
    ]));
    header.push(Line::from(Span::styled(
        "[Space]toggle [a]ll [d]eselect [f]etch [F]orce [o]ffline [y]synth [Enter]focus",
        theme::muted(),
    )));

    if data.loading {
        let item = data.current_item.as_deref().unwrap_or("...");
        header.push(Line::from(vec![
            Span::styled("Loading ", theme::warning()),
            Span::styled(item.to_string(), theme::accent()),
            Span::styled(
                format!(" [{}/{}]  Esc to cancel", data.done.min(data.total), data.total),
                theme::muted(),
            ),
        ]));
    }
    header.push(Line::from(""));

    // Tree rows
    let mut rows: Vec<Line> = Vec::new();
    let mut row = 0usize;
    for region in state.countries.region_names() {
        let expanded = state.expanded_regions.contains(region);
        let countries = state.countries.region_countries(region).unwrap_or(&[]);
        let picked = countries
            .iter()
            .filter(|c| state.selected.contains(&c.code))
            .count();

        let arrow = if expanded { "▾" } else { "▸" };
        let style = if row == state.cursor {
            theme::cursor()
        } else {
            theme::neutral()
        };
        rows.push(Line::from(Span::styled(
            format!("{arrow} {region} ({picked}/{})", countries.len()),
            style,
        )));
        row += 1;

        if !expanded {
            continue;
        }
        for country in countries {
            let selected = state.selected.contains(&country.code);
            let check = if selected { "[x]" } else { "[ ]" };
            let name_style = if row == state.cursor {
                theme::cursor()
            } else if selected {
                theme::accent()
            } else {
                theme::muted()
            };

            let mut spans = vec![
                Span::raw("  "),
                Span::raw(check),
                Span::raw(" "),
                Span::styled(format!("{} {}", country.code, country.name), name_style),
            ];
            if country.code == app.rates.country {
                spans.push(Span::styled(" ◆", theme::warning()));
            }
            let (dot, dot_style) = match data.health_of(&country.code) {
                Some(h) => (" ●", Style::default().fg(theme::health_color(h.rating))),
                None => (" ○", theme::muted()),
            };
            spans.push(Span::styled(dot, dot_style));
            rows.push(Line::from(spans));
            row += 1;
        }
    }

    // Keep the cursor on screen.
    let tree_height = (area.height as usize).saturating_sub(header.len()).max(1);
    let offset = state.cursor.saturating_sub(tree_height - 1);
    let mut lines = header;
    lines.extend(rows.into_iter().skip(offset).take(tree_height));

    f.render_widget(Paragraph::new(lines), area);
}

fn render_health(f: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default()
        .borders(Borders::LEFT)
        .border_style(theme::muted())
        .title(Span::styled(" Health score ", theme::accent_bold()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let data = &app.macro_data;
    let mut lines: Vec<Line> = Vec::new();

    if data.health.is_empty() {
        let msg = if data.loading {
            "Loading..."
        } else {
            "Select countries and press f to load indicators."
        };
        lines.push(Line::from(Span::styled(msg, theme::muted())));
        f.render_widget(Paragraph::new(lines), inner);
        return;
    }

    let mut ranked: Vec<_> = data.health.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    lines.push(Line::from(Span::styled(
        format!("{:<5} {:<18} {:>6}  {:<9} {}", "", "Country", "Score", "Rating", "Bar"),
        theme::muted(),
    )));
    for h in ranked {
        let color = theme::health_color(h.rating);
        let filled = (h.score / 10.0).round().clamp(0.0, 10.0) as usize;
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled));
        let name = app.countries.countries.name_of(&h.country);
        let mut spans = vec![
            Span::styled(format!("{:<5} ", h.country), theme::accent()),
            Span::styled(format!("{:<18.18} ", name), theme::text()),
            Span::styled(format!("{:>6.1}  ", h.score), Style::default().fg(color)),
            Span::styled(format!("{:<9} ", h.rating.label()), Style::default().fg(color)),
            Span::styled(bar, Style::default().fg(color)),
        ];
        if !h.missing.is_empty() {
            spans.push(Span::styled(
                format!("  ({} missing)", h.missing.len()),
                theme::warning(),
            ));
        }
        lines.push(Line::from(spans));
    }

    if let Some(at) = data.loaded_at {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Loaded {}", at.format("%Y-%m-%d %H:%M")),
            theme::muted(),
        )));
    }
    if let Some(panel) = &data.panel {
        for (indicator, sourced) in &panel.sources {
            if let Some(note) = &sourced.note {
                lines.push(Line::from(vec![
                    Span::styled(format!("{}: ", indicator.code()), theme::muted()),
                    Span::styled(
                        format!("{} ({note})", sourced.source.label()),
                        Style::default().fg(theme::source_color(sourced.source)),
                    ),
                ]));
            }
        }
        if !panel.missing.is_empty() {
            let missing: Vec<&str> = panel.missing.iter().map(|i| i.code()).collect();
            lines.push(Line::from(Span::styled(
                format!("No data: {}", missing.join(", ")),
                theme::warning(),
            )));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}
