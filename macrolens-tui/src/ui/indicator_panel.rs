//! Panels 2-4: one indicator line chart per category, a line per selected country.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use macrolens_core::domain::{Category, Indicator};

use crate::app::AppState;
use crate::theme;
use crate::ui::fmt_money;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(category) = app.active_panel.category() else {
        return;
    };
    let Some(indicator) = app.charts.indicator_for(category) else {
        return;
    };

    let countries: Vec<String> = app
        .countries
        .selected_codes()
        .into_iter()
        .filter(|c| app.macro_data.points(indicator, c).is_some())
        .collect();

    let table_height = (countries.len() as u16 + 1).min(9);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(table_height),
        ])
        .split(area);

    render_tabs(f, rows[0], category, indicator);

    if countries.is_empty() {
        render_empty(f, rows[1], app);
        return;
    }
    render_chart(f, rows[1], app, indicator, &countries);
    render_latest(f, rows[2], app, indicator, &countries);
}

fn render_tabs(f: &mut Frame, area: Rect, category: Category, active: Indicator) {
    let mut spans = vec![Span::styled("[h/l] ", theme::muted())];
    for indicator in Indicator::in_category(category) {
        let style = if indicator == active {
            theme::cursor()
        } else {
            theme::muted()
        };
        spans.push(Span::styled(format!(" {} ", indicator.label()), style));
        spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_empty(f: &mut Frame, area: Rect, app: &AppState) {
    let msg = if app.macro_data.loading {
        "Loading indicators..."
    } else if app.macro_data.panel.is_none() {
        "No data yet. Select countries in panel 1 and press f."
    } else {
        "No observations for this indicator and the selected countries."
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(msg, theme::muted())),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

fn render_chart(
    f: &mut Frame,
    area: Rect,
    app: &AppState,
    indicator: Indicator,
    countries: &[String],
) {
    let series: Vec<(&str, &[(f64, f64)])> = countries
        .iter()
        .filter_map(|c| {
            app.macro_data
                .points(indicator, c)
                .map(|p| (c.as_str(), p))
        })
        .collect();

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for (_, points) in &series {
        for &(x, y) in *points {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    if !x_min.is_finite() || !y_min.is_finite() {
        render_empty(f, area, app);
        return;
    }
    let padding = ((y_max - y_min).abs() * 0.05).max(0.5);
    let (y_lo, y_hi) = (y_min - padding, y_max + padding);
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }

    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, (country, points))| {
            Dataset::default()
                .name(*country)
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(theme::series_color(i)))
                .graph_type(GraphType::Line)
                .data(points)
        })
        .collect();

    let y_label = |v: f64| {
        if indicator == Indicator::GdpCurrentUsd {
            fmt_money(v)
        } else {
            format!("{v:.1}")
        }
    };

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title(Span::styled("Year", theme::muted()))
                .style(theme::muted())
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::styled(format!("{x_min:.0}"), theme::muted()),
                    Span::styled(format!("{x_max:.0}"), theme::muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled(indicator.unit(), theme::muted()))
                .style(theme::muted())
                .bounds([y_lo, y_hi])
                .labels(vec![
                    Span::styled(y_label(y_lo), theme::muted()),
                    Span::styled(y_label((y_lo + y_hi) / 2.0), theme::muted()),
                    Span::styled(y_label(y_hi), theme::muted()),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_latest(
    f: &mut Frame,
    area: Rect,
    app: &AppState,
    indicator: Indicator,
    countries: &[String],
) {
    let source = app
        .macro_data
        .panel
        .as_ref()
        .and_then(|p| p.source_of(indicator));
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{:<5} {:<18} {:>6} {:>12}", "", "Latest", "Year", "Value"),
            theme::muted(),
        ),
        Span::styled(
            source.map(|s| format!("  source: {}", s.label())).unwrap_or_default(),
            Style::default().fg(source.map(theme::source_color).unwrap_or(theme::MUTED)),
        ),
    ])];

    for (i, code) in countries.iter().enumerate() {
        let Some((year, value)) = app.macro_data.latest(indicator, code) else {
            continue;
        };
        let shown = if indicator == Indicator::GdpCurrentUsd {
            fmt_money(value)
        } else {
            format!("{value:.2}")
        };
        let value_color = match indicator {
            Indicator::GdpGrowth | Indicator::IndustryGrowth | Indicator::RealInterestRate
            | Indicator::CurrentAccount => theme::signed_color(value),
            _ => theme::TEXT,
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{code:<5} "), Style::default().fg(theme::series_color(i))),
            Span::styled(
                format!("{:<18.18} ", app.countries.countries.name_of(code)),
                theme::text_secondary(),
            ),
            Span::styled(format!("{year:>6} "), theme::muted()),
            Span::styled(format!("{shown:>12}"), Style::default().fg(value_color)),
        ]));
    }

    f.render_widget(Paragraph::new(lines), area);
}
