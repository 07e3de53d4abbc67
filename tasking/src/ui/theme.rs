//! Theme and styling constants for the TUI.

use ratatui::style::{Color, Modifier, Style};

use tasking_proto::task::TaskStatus;

use crate::mapsync::status_colour;

/// Primary foreground color.
pub const FG_PRIMARY: Color = Color::White;

/// Secondary foreground color (dimmed text).
pub const FG_SECONDARY: Color = Color::Gray;

/// Highlight color for focused elements.
pub const HIGHLIGHT: Color = Color::Cyan;

/// Success/online indicator color.
pub const SUCCESS: Color = Color::Green;

/// Warning indicator color.
pub const WARNING: Color = Color::Yellow;

/// Error/offline indicator color.
pub const ERROR: Color = Color::Red;

/// Border of selected tasks on the map.
pub const SELECTED_BORDER: Color = Color::Rgb(0xd7, 0x3f, 0x3f);

/// Border of unselected tasks and the project outline.
pub const TASK_BORDER: Color = Color::Rgb(0x92, 0x9d, 0xb3);

/// Panel title color for the task list.
pub const LIST_TITLE: Color = Color::Green;

/// Panel title color for the map.
pub const MAP_TITLE: Color = Color::Cyan;

/// Normal text style.
#[must_use]
pub fn normal() -> Style {
    Style::default().fg(FG_PRIMARY)
}

/// Dimmed text style (timestamps, metadata).
#[must_use]
pub fn dimmed() -> Style {
    Style::default().fg(FG_SECONDARY)
}

/// Bold text style.
#[must_use]
pub fn bold() -> Style {
    Style::default().fg(FG_PRIMARY).add_modifier(Modifier::BOLD)
}

/// Highlighted text style (focused panel borders).
#[must_use]
pub fn highlighted() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Row under the cursor.
#[must_use]
pub fn selected() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Style for the status bar background (dark background with white foreground).
#[must_use]
pub fn status_bar_bg() -> Style {
    Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50))
}

/// Style for panel titles with a given color (bold).
#[must_use]
pub fn panel_title(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Terminal colour for a `#rrggbb` string; `None` for anything else.
#[must_use]
pub fn parse_hex(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// The map fill colour of a status, as a terminal colour.
#[must_use]
pub fn status_color(status: TaskStatus) -> Color {
    parse_hex(status_colour(status)).unwrap_or(FG_SECONDARY)
}
