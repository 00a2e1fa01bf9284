//! Bottom status bar: panel hints, background activity and the last message.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{AppState, Panel, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans: Vec<Span> = Vec::new();

    for panel in Panel::ALL {
        let style = if panel == app.active_panel {
            theme::accent_bold()
        } else {
            theme::muted()
        };
        spans.push(Span::styled(
            format!(" {}:{}", panel.index() + 1, short_label(panel)),
            style,
        ));
    }
    spans.push(Span::raw(" | "));

    if app.macro_data.loading {
        spans.push(Span::styled(
            format!("loading {}/{} ", app.macro_data.done, app.macro_data.total),
            theme::warning(),
        ));
    }
    if !app.valuation.loading.is_empty() {
        spans.push(Span::styled(
            format!("fetching {} ", app.valuation.loading.len()),
            theme::warning(),
        ));
    }

    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn short_label(panel: Panel) -> &'static str {
    match panel {
        Panel::Countries => "Ctry",
        Panel::Production => "Prod",
        Panel::Labour => "Lab",
        Panel::Finance => "Fin",
        Panel::Alerts => "Alrt",
        Panel::Rates => "Rate",
        Panel::Valuation => "Val",
        Panel::Help => "Help",
    }
}
