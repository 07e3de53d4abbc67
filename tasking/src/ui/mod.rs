//! Terminal UI rendering.

pub mod footer;
pub mod map_panel;
pub mod status_bar;
pub mod task_panel;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::App;

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    // Content, footer, status bar
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45), // Task list
            Constraint::Percentage(55), // Map
        ])
        .split(main_chunks[0]);

    task_panel::render(frame, content_chunks[0], app);
    map_panel::render(frame, content_chunks[1], app);
    footer::render(frame, main_chunks[1], app);
    status_bar::render(frame, main_chunks[2], app);
}
