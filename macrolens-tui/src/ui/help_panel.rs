//! Panel 8: keyboard shortcuts.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, "Global");
    key(&mut lines, "1-8", "Switch to panel by number");
    key(&mut lines, "Tab / Shift+Tab", "Cycle panels forward / back");
    key(&mut lines, "Esc", "Cancel a running download");
    key(&mut lines, "q", "Quit (state is saved)");
    lines.push(Line::from(""));

    section(&mut lines, "1 Countries");
    key(&mut lines, "j / k", "Move cursor down / up");
    key(&mut lines, "h / l", "Collapse / expand region");
    key(&mut lines, "Space", "Toggle country, or a whole region");
    key(&mut lines, "a / d", "Select all / none");
    key(&mut lines, "f / F", "Load indicators / force refetch");
    key(&mut lines, "o / y", "Toggle offline / synthetic fallback");
    key(&mut lines, "Enter", "Make country the rates focus");
    lines.push(Line::from(""));

    section(&mut lines, "2-4 Production, Labour, Finance");
    key(&mut lines, "h / l", "Previous / next indicator");
    lines.push(Line::from(""));

    section(&mut lines, "5 Alerts");
    key(&mut lines, "j / k", "Scroll");
    key(&mut lines, "s", "Cycle minimum severity");
    key(&mut lines, "Enter", "Open the alert's country in Rates");
    lines.push(Line::from(""));

    section(&mut lines, "6 Rates");
    key(&mut lines, "j / k", "Select field");
    key(&mut lines, "h / l", "Decrease / increase");
    key(&mut lines, "r", "Refresh policy rate");
    key(&mut lines, "c", "Reset scenario");
    lines.push(Line::from(""));

    section(&mut lines, "7 Valuation");
    key(&mut lines, "a / x", "Add / remove ticker");
    key(&mut lines, "f / F", "Fetch all / current");
    key(&mut lines, "g G t T r R y Y", "Growth, terminal, discount, years down/up");
    key(&mut lines, "0", "Reset assumptions");
    key(&mut lines, "p", "Refresh risk-free rate");
    lines.push(Line::from(""));

    section(&mut lines, "8 Help");
    key(
        &mut lines,
        "e",
        &format!("Error history ({} recorded)", app.error_history.len()),
    );

    f.render_widget(Paragraph::new(lines), area);
}

fn section(lines: &mut Vec<Line<'_>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key(lines: &mut Vec<Line<'_>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {keys:>18}  "), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}
