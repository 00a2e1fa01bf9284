//! Panel 5: recession and overheating alerts, most severe first.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let alerts = &app.macro_data.alerts;
    let visible = app.alerts.visible(alerts);

    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::styled("Showing ", theme::muted()),
            Span::styled(format!("{}/{}", visible.len(), alerts.len()), theme::accent()),
            Span::styled(" at or above ", theme::muted()),
            Span::styled(
                app.alerts.min_severity.label(),
                Style::default().fg(theme::severity_color(app.alerts.min_severity)),
            ),
            Span::styled(
                "  [s]everity filter [Enter]open country in Rates",
                theme::muted(),
            ),
        ]),
        Line::from(""),
    ];

    if app.macro_data.panel.is_none() {
        lines.push(Line::from(Span::styled(
            "No data yet. Load indicators from panel 1.",
            theme::muted(),
        )));
        f.render_widget(Paragraph::new(lines), area);
        return;
    }
    if visible.is_empty() {
        lines.push(Line::from(Span::styled(
            "No alerts: no contraction, slump, unemployment jump or inflation spike detected.",
            theme::positive(),
        )));
        f.render_widget(Paragraph::new(lines), area);
        return;
    }

    let height = (area.height as usize).saturating_sub(lines.len()).max(1);
    let offset = app.alerts.cursor.saturating_sub(height - 1);
    for (i, alert) in visible.iter().enumerate().skip(offset).take(height) {
        let color = theme::severity_color(alert.severity);
        let mut sev_style = Style::default().fg(color);
        if alert.severity == macrolens_core::analytics::Severity::Critical {
            sev_style = sev_style.add_modifier(Modifier::BOLD);
        }
        let text_style = if i == app.alerts.cursor {
            theme::cursor()
        } else {
            theme::text()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<9}", alert.severity.label()), sev_style),
            Span::styled(format!("{:<5}", alert.country), theme::accent()),
            Span::styled(format!("{:<6}", alert.year), theme::muted()),
            Span::styled(alert.message.as_str(), text_style),
        ]));
    }

    f.render_widget(Paragraph::new(lines), area);
}
