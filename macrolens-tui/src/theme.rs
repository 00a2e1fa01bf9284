//! Dark terminal palette and style helpers for the dashboard.
//!
//! # Color Palette
//! - **Accent**: cyan (focus, highlights, headline numbers)
//! - **Positive**: green (healthy economies, upside, passed checks)
//! - **Negative**: pink (recession signals, downside, failed checks)
//! - **Warning**: orange (alerts, degraded or synthetic data)
//! - **Neutral**: purple (secondary info)
//! - **Muted**: steel blue (labels, disabled)

use ratatui::style::{Color, Modifier, Style};

use macrolens_core::analytics::{HealthRating, Severity};
use macrolens_core::data::DataSource;
use macrolens_core::valuation::CheckStatus;

pub const BACKGROUND: Color = Color::Rgb(18, 18, 20);
pub const ACCENT: Color = Color::Rgb(0, 255, 255);
pub const POSITIVE: Color = Color::Rgb(0, 255, 128);
pub const NEGATIVE: Color = Color::Rgb(255, 20, 147);
pub const WARNING: Color = Color::Rgb(255, 140, 0);
pub const NEUTRAL: Color = Color::Rgb(147, 112, 219);
pub const MUTED: Color = Color::Rgb(100, 149, 237);
pub const TEXT: Color = Color::White;
pub const TEXT_SECONDARY: Color = Color::Rgb(170, 170, 170);

/// Line colors cycled across countries in the charts.
pub const SERIES_COLORS: [Color; 8] = [
    ACCENT,
    POSITIVE,
    WARNING,
    NEUTRAL,
    NEGATIVE,
    Color::Rgb(255, 215, 0),
    Color::Rgb(64, 224, 208),
    Color::Rgb(240, 128, 128),
];

pub fn series_color(i: usize) -> Color {
    SERIES_COLORS[i % SERIES_COLORS.len()]
}

// ── Styles ───────────────────────────────────────────────────────────

pub fn accent() -> Style {
    Style::default().fg(ACCENT)
}

pub fn accent_bold() -> Style {
    accent().add_modifier(Modifier::BOLD)
}

pub fn positive() -> Style {
    Style::default().fg(POSITIVE)
}

pub fn negative() -> Style {
    Style::default().fg(NEGATIVE)
}

pub fn warning() -> Style {
    Style::default().fg(WARNING)
}

pub fn neutral() -> Style {
    Style::default().fg(NEUTRAL)
}

pub fn muted() -> Style {
    Style::default().fg(MUTED)
}

pub fn text() -> Style {
    Style::default().fg(TEXT)
}

pub fn text_secondary() -> Style {
    Style::default().fg(TEXT_SECONDARY)
}

pub fn panel_border(focused: bool) -> Style {
    if focused {
        accent()
    } else {
        muted()
    }
}

pub fn panel_title(focused: bool) -> Style {
    if focused {
        accent_bold()
    } else {
        muted()
    }
}

pub fn cursor() -> Style {
    accent().add_modifier(Modifier::REVERSED)
}

// ── Domain colors ────────────────────────────────────────────────────

/// Sign color: green at or above zero, pink below.
pub fn signed_color(value: f64) -> Color {
    if value >= 0.0 {
        POSITIVE
    } else {
        NEGATIVE
    }
}

pub fn health_color(rating: HealthRating) -> Color {
    match rating {
        HealthRating::Strong => POSITIVE,
        HealthRating::Moderate => WARNING,
        HealthRating::Weak => NEGATIVE,
    }
}

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => NEGATIVE,
        Severity::Warning => WARNING,
        Severity::Info => MUTED,
    }
}

pub fn check_color(status: CheckStatus) -> Color {
    match status {
        CheckStatus::Pass => POSITIVE,
        CheckStatus::Fail => NEGATIVE,
        CheckStatus::Unavailable => MUTED,
    }
}

/// Live sources are plain; anything substituted is flagged.
pub fn source_color(source: DataSource) -> Color {
    match source {
        DataSource::Synthetic => NEGATIVE,
        DataSource::Fallback => WARNING,
        _ => TEXT_SECONDARY,
    }
}

/// Upside relative to the margin of safety.
pub fn upside_color(upside: f64, margin_of_safety: f64) -> Color {
    if upside >= margin_of_safety {
        POSITIVE
    } else if upside >= 0.0 {
        ACCENT
    } else if upside >= -margin_of_safety {
        WARNING
    } else {
        NEGATIVE
    }
}
