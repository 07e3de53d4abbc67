//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, PanelFocus};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = match app.focus {
        PanelFocus::List => {
            "↑↓/jk: move | ←→: page | Enter: select | a: action | u: release | f: filter | s: sort | m: map | /: search | q: quit"
        }
        PanelFocus::Search => "type to search | Enter/Esc: back to list",
    };

    let controller = &app.controller;
    let (dot_color, status_text) = if !app.online {
        (theme::WARNING, "Offline demo".to_string())
    } else if let Some(err) = controller.last_poll_error() {
        (theme::ERROR, format!("Poll failed: {err}"))
    } else {
        (theme::SUCCESS, "Live".to_string())
    };

    let mut spans = vec![
        Span::styled(
            format!(
                "#{} {}",
                controller.project().project_id,
                controller.project().project_info.name
            ),
            theme::bold(),
        ),
        Span::raw(format!(" | {} | ", controller.session().username())),
        Span::styled("●", theme::normal().fg(dot_color)),
        Span::raw(format!(" {status_text} | ")),
    ];
    if let Some(msg) = app.last_message() {
        spans.push(Span::raw(msg.to_string()));
        spans.push(Span::raw(" | "));
    }
    spans.push(Span::styled(help_text, theme::dimmed()));

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
