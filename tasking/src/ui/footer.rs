//! Footer rendering: the action button and project progress.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::theme;
use crate::app::App;

/// Render the footer.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let footer = app.controller.footer();
    let stats = app.controller.stats();

    let targets = footer
        .targets
        .iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ");
    let button_style = if footer.enabled {
        theme::selected()
    } else {
        theme::dimmed()
    };

    let mut spans = vec![
        Span::styled(format!(" {} ", footer.label()), button_style),
        Span::raw(" "),
    ];
    if !targets.is_empty() {
        spans.push(Span::styled(targets, theme::bold()));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(
        format!(
            "{}% mapped, {}% validated",
            stats.percent_mapped(),
            stats.percent_validated()
        ),
        theme::dimmed(),
    ));
    for (status, count) in stats.iter() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "\u{25a0}",
            theme::normal().fg(theme::status_color(status)),
        ));
        spans.push(Span::styled(format!(" {count}"), theme::dimmed()));
    }

    let block = Block::default().borders(Borders::ALL).border_style(theme::normal());
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
