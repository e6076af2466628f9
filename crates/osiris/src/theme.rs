use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(229, 192, 123))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(97, 175, 239))
    .fg(Color::Rgb(16, 18, 22))
    .add_modifier(Modifier::BOLD);
pub const KEY_STYLE: Style = Style::new().fg(Color::Cyan);
pub const DIM_STYLE: Style = Style::new().fg(Color::DarkGray);

/// Alternating row shading for the host list.
pub fn row_shade(index: usize) -> Style {
    match index % 2 {
        0 => Style::new().bg(Color::Rgb(22, 24, 29)),
        _ => Style::new().bg(Color::Rgb(30, 33, 39)),
    }
}

pub mod icons {
    pub const OK: &str = "o";
    pub const ALERT: &str = "!";
    pub const SEARCH: &str = "/";
}

pub fn health_color(has_alert: bool) -> Color {
    if has_alert {
        Color::Rgb(251, 73, 52)
    } else {
        Color::Rgb(184, 187, 38)
    }
}

/// Errors stand out; in-flight and stale states are muted.
pub fn status_color(is_error: bool, is_busy: bool) -> Color {
    if is_error {
        Color::Rgb(254, 128, 25)
    } else if is_busy {
        Color::Rgb(250, 189, 47)
    } else {
        Color::Rgb(146, 131, 116)
    }
}
