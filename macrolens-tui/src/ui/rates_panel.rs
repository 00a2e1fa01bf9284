//! Panel 6: real-rate spread projection for the focus country.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use macrolens_core::analytics::{RateVerdict, RealRateProjection};

use crate::app::{AppState, RatesField};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(20)])
        .split(area);

    let current = app.focus_inflation();
    let projection = app.rates.projection(current.map(|(_, v)| v));

    let mut lines = inputs(app, current);
    match &projection {
        None => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "No inflation reading for this country.",
                theme::warning(),
            )));
            lines.push(Line::from(Span::styled(
                "Select it in panel 1 and press f to load indicators.",
                theme::muted(),
            )));
        }
        Some(Err(e)) => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(e.to_string(), theme::negative())));
        }
        Some(Ok(p)) => lines.extend(summary(p)),
    }
    f.render_widget(Paragraph::new(lines), cols[0]);

    if let Some(Ok(p)) = &projection {
        render_chart(f, cols[1], p);
    }
}

fn inputs(app: &AppState, current: Option<(i32, f64)>) -> Vec<Line<'static>> {
    let rates = &app.rates;
    let name = app.countries.countries.name_of(&rates.country).to_string();
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Country: ", theme::muted()),
            Span::styled(format!("{} ({})", name, rates.country), theme::accent_bold()),
        ]),
        Line::from(Span::styled(
            "[j/k]field [h/l]adjust [r]efresh rate [c]reset",
            theme::muted(),
        )),
        Line::from(""),
    ];

    let basis = match (&rates.policy_rate, rates.nominal_edited, rates.loading) {
        (_, true, _) => ("edited".to_string(), theme::accent()),
        (_, _, true) => ("fetching...".to_string(), theme::warning()),
        (Some(r), _, _) => {
            let note = r.note.as_deref().map(|n| format!(", {n}")).unwrap_or_default();
            (
                format!("{}{note}", r.source.label()),
                Style::default().fg(theme::source_color(r.source)),
            )
        }
        (None, _, _) => ("configured default".to_string(), theme::warning()),
    };

    let expected = match (rates.expected, current) {
        (Some(e), _) => format!("{e:.1}%"),
        (None, Some((_, c))) => format!("{:.1}% (= current)", rates.expected_or(c)),
        (None, None) => "-".to_string(),
    };

    for (i, field) in RatesField::ALL.iter().enumerate() {
        let value = match field {
            RatesField::Nominal => format!("{:.2}%", rates.nominal),
            RatesField::Expected => expected.clone(),
            RatesField::Months => format!("{}", rates.months),
        };
        let style = if i == rates.field {
            theme::cursor()
        } else {
            theme::text()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<20}", field.label()), theme::muted()),
            Span::styled(format!(" {value} "), style),
        ]));
        if *field == RatesField::Nominal {
            lines.push(Line::from(vec![
                Span::raw(" ".repeat(20)),
                Span::styled(format!(" {}", basis.0), basis.1),
            ]));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(format!("{:<20}", "Current inflation"), theme::muted()),
        Span::styled(
            match current {
                Some((year, v)) => format!(" {v:.2}% ({year})"),
                None => " -".to_string(),
            },
            theme::text(),
        ),
    ]));
    lines
}

fn summary(p: &RealRateProjection) -> Vec<Line<'static>> {
    let spread = p.final_spread();
    let verdict = p.verdict();
    let (tag, tag_style) = match verdict {
        RateVerdict::Strengthening => ("OK", theme::positive()),
        RateVerdict::CapitalFlightRisk => ("WARNING", theme::negative()),
    };
    let start = p.spread.first().copied().unwrap_or(spread);

    vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{:<20}", "Spread now"), theme::muted()),
            Span::styled(
                format!(" {start:+.2} pp"),
                Style::default().fg(theme::signed_color(start)),
            ),
        ]),
        Line::from(vec![
            Span::styled(format!("{:<20}", format!("Spread at {}m", p.months.len() - 1)), theme::muted()),
            Span::styled(
                format!(" {spread:+.2} pp"),
                Style::default()
                    .fg(theme::signed_color(spread))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("[{tag}] "), tag_style.add_modifier(Modifier::BOLD)),
            Span::styled(verdict.message(), tag_style),
        ]),
    ]
}

fn render_chart(f: &mut Frame, area: Rect, p: &RealRateProjection) {
    let spread: Vec<(f64, f64)> = p
        .months
        .iter()
        .zip(&p.spread)
        .map(|(&m, &s)| (f64::from(m), s))
        .collect();
    let inflation: Vec<(f64, f64)> = p
        .months
        .iter()
        .zip(&p.inflation)
        .map(|(&m, &v)| (f64::from(m), v))
        .collect();
    let nominal: Vec<(f64, f64)> = p.months.iter().map(|&m| (f64::from(m), p.nominal)).collect();
    let zero: Vec<(f64, f64)> = p.months.iter().map(|&m| (f64::from(m), 0.0)).collect();

    let values = p
        .spread
        .iter()
        .chain(&p.inflation)
        .copied()
        .chain([p.nominal, 0.0]);
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let pad = ((hi - lo).abs() * 0.1).max(0.5);
    let (y_lo, y_hi) = (lo - pad, hi + pad);
    let x_max = p.months.last().copied().map(f64::from).unwrap_or(1.0).max(1.0);

    let datasets = vec![
        Dataset::default()
            .name("real spread")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(theme::signed_color(p.final_spread())))
            .graph_type(GraphType::Line)
            .data(&spread),
        Dataset::default()
            .name("inflation path")
            .marker(symbols::Marker::Braille)
            .style(theme::warning())
            .graph_type(GraphType::Line)
            .data(&inflation),
        Dataset::default()
            .name("nominal")
            .marker(symbols::Marker::Dot)
            .style(theme::accent())
            .graph_type(GraphType::Line)
            .data(&nominal),
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .style(theme::muted())
            .graph_type(GraphType::Line)
            .data(&zero),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::LEFT)
                .border_style(theme::muted())
                .title(Span::styled(" Projection (pp) ", theme::accent_bold())),
        )
        .x_axis(
            Axis::default()
                .title(Span::styled("Month", theme::muted()))
                .style(theme::muted())
                .bounds([0.0, x_max])
                .labels(vec![
                    Span::styled("0", theme::muted()),
                    Span::styled(format!("{x_max:.0}"), theme::muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(theme::muted())
                .bounds([y_lo, y_hi])
                .labels(vec![
                    Span::styled(format!("{y_lo:.1}"), theme::muted()),
                    Span::styled(format!("{y_hi:.1}"), theme::muted()),
                ]),
        );

    f.render_widget(chart, area);
}
