//! Task list rendering.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::theme;
use crate::app::{App, PanelFocus};
use crate::list::TaskRow;

/// Render the search box, the list header and the current list page.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    render_search(frame, chunks[0], app);
    render_list(frame, chunks[1], app);
}

fn render_search(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == PanelFocus::Search;
    let text = if app.search_input.is_empty() && !is_focused {
        Span::styled("/ to search by task id or username", theme::dimmed())
    } else {
        Span::styled(app.search_input.as_str(), theme::normal())
    };
    let block = Block::default()
        .title("Search")
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });
    frame.render_widget(Paragraph::new(Line::from(text)).block(block), area);
}

fn render_list(frame: &mut Frame, area: Rect, app: &App) {
    let controller = &app.controller;
    let page = controller.list_page();
    let query = controller.list_query();

    let mut items: Vec<ListItem> = page
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let line = row_line(app, row);
            let style = if idx == app.cursor && app.focus == PanelFocus::List {
                theme::selected()
            } else {
                theme::normal()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    if controller.tasks().is_none() {
        let text = if controller.load_error() {
            "Tasks could not be loaded. Press r to retry."
        } else {
            "Loading tasks..."
        };
        items.push(ListItem::new(Span::styled(text, theme::dimmed())));
    } else if page.rows.is_empty() {
        items.push(ListItem::new(Span::styled("No matching tasks", theme::dimmed())));
    }

    let title = Line::from(vec![
        Span::styled("Tasks", theme::panel_title(theme::LIST_TITLE)),
        Span::styled(
            format!(
                " | {} | {} | page {}/{} ({} tasks)",
                query.filter.label(),
                query.sort.label(),
                page.page,
                page.pages,
                page.matching,
            ),
            theme::dimmed(),
        ),
    ]);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if app.focus == PanelFocus::List {
            theme::highlighted()
        } else {
            theme::normal()
        });

    frame.render_widget(List::new(items).block(block), area);
}

fn row_line<'a>(app: &App, row: &'a TaskRow) -> Line<'a> {
    let controller = &app.controller;
    let marker = if controller.selection().contains(row.id) {
        "\u{25b6} "
    } else {
        "  "
    };
    let lock = if controller.locks().get(row.id).is_some() {
        " [yours]"
    } else {
        ""
    };
    let updated = row.updated.map_or_else(String::new, |t| {
        t.format(&app.timestamp_format).to_string()
    });

    Line::from(vec![
        Span::raw(marker),
        Span::styled(format!("#{:<5}", row.id.get()), theme::bold()),
        Span::styled("\u{25a0} ", theme::normal().fg(theme::status_color(row.status))),
        Span::raw(format!("{:<22}", row.status.as_str())),
        Span::styled(row.action_by.as_deref().unwrap_or(""), theme::dimmed()),
        Span::raw(" "),
        Span::styled(updated, theme::dimmed()),
        Span::styled(lock, theme::normal().fg(theme::WARNING)),
    ])
}
