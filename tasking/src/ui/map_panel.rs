//! Map rendering on a braille canvas.
//!
//! Draws the parameters produced by the map sync adapter: task outlines
//! coloured by status, the selection border, lock markers, or the project
//! outline with centroid markers in borders-only mode.

use ratatui::{
    Frame,
    layout::Rect,
    style::Color,
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph,
        canvas::{Canvas, Context, Line as Segment, Points},
    },
};
use serde_json::Value;

use tasking_proto::task::{BBox, Geometry, TaskFeature, TaskId};

use super::theme;
use crate::app::App;
use crate::mapsync::{DisplayMode, MapParams};

/// Render the map panel.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let mode = app.controller.display_mode();
    let title = match mode {
        DisplayMode::Tasks => "Map",
        DisplayMode::BordersOnly => "Map (outline)",
    };
    let block = Block::default()
        .title(Span::styled(title, theme::panel_title(theme::MAP_TITLE)))
        .borders(Borders::ALL)
        .border_style(theme::normal());

    let Some(params) = app.controller.map_params() else {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled("No tasks yet", theme::dimmed()))).block(block),
            area,
        );
        return;
    };
    let Some(bounds) = params.fit_bounds else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let user_id = app.controller.session().user_id();
    let selected = selected_ids(&params.selected_filter);
    let (x_bounds, y_bounds) = padded(bounds.bbox, bounds.padding);

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| draw(ctx, &params, &selected, user_id));
    frame.render_widget(canvas, area);
}

fn draw(ctx: &mut Context<'_>, params: &MapParams, selected: &[TaskId], user_id: u64) {
    let features = &params.source.features;

    if params.is_visible("outerhull-tasks-border")
        && let Some(hull) = params.source.bbox()
    {
        draw_box(ctx, hull, theme::TASK_BORDER);
    }
    if params.is_visible("point-tasks-centroid") {
        let centroids: Vec<(f64, f64)> = features
            .iter()
            .filter_map(|f| f.geometry.bbox())
            .map(centre)
            .collect();
        ctx.draw(&Points {
            coords: &centroids,
            color: theme::HIGHLIGHT,
        });
    }

    if params.is_visible("unselected-tasks-border") || params.is_visible("tasks-fill") {
        for feature in features.iter().filter(|f| !selected.contains(&f.id())) {
            let color = if params.is_visible("tasks-fill") {
                theme::status_color(feature.status())
            } else {
                theme::TASK_BORDER
            };
            draw_geometry(ctx, &feature.geometry, color);
        }
    }
    if params.is_visible("selected-tasks-border") {
        ctx.layer();
        for feature in features.iter().filter(|f| selected.contains(&f.id())) {
            draw_geometry(ctx, &feature.geometry, theme::SELECTED_BORDER);
        }
    }
    if params.is_visible("tasks-icon") {
        for feature in features {
            if let Some((icon, color)) = lock_icon(feature, user_id)
                && let Some(bbox) = feature.geometry.bbox()
            {
                let (x, y) = centre(bbox);
                ctx.print(x, y, Span::styled(icon, theme::normal().fg(color)));
            }
        }
    }
}

/// Ids listed in an `["in", "taskId", ...]` filter. The empty-string
/// sentinel matches nothing.
fn selected_ids(filter: &Value) -> Vec<TaskId> {
    filter
        .as_array()
        .map(|items| {
            items
                .iter()
                .skip(2)
                .filter_map(Value::as_u64)
                .filter_map(|id| u32::try_from(id).ok())
                .map(TaskId::new)
                .collect()
        })
        .unwrap_or_default()
}

/// Terminal rendition of the `redlock` / `lock` icons.
fn lock_icon(feature: &TaskFeature, user_id: u64) -> Option<(&'static str, Color)> {
    if !feature.status().is_locked() {
        return None;
    }
    if feature.properties.locked_by == Some(user_id) {
        Some(("L", theme::ERROR))
    } else {
        Some(("l", theme::FG_SECONDARY))
    }
}

fn padded(bbox: BBox, padding: u32) -> ([f64; 2], [f64; 2]) {
    let ratio = f64::from(padding) / 400.0;
    let dx = (bbox.east - bbox.west).max(1e-6) * ratio;
    let dy = (bbox.north - bbox.south).max(1e-6) * ratio;
    (
        [bbox.west - dx, bbox.east + dx],
        [bbox.south - dy, bbox.north + dy],
    )
}

fn centre(bbox: BBox) -> (f64, f64) {
    (
        f64::midpoint(bbox.west, bbox.east),
        f64::midpoint(bbox.south, bbox.north),
    )
}

fn draw_box(ctx: &mut Context<'_>, bbox: BBox, color: Color) {
    let ring = [
        [bbox.west, bbox.south],
        [bbox.east, bbox.south],
        [bbox.east, bbox.north],
        [bbox.west, bbox.north],
        [bbox.west, bbox.south],
    ];
    draw_ring(ctx, &ring, color);
}

fn draw_geometry(ctx: &mut Context<'_>, geometry: &Geometry, color: Color) {
    match geometry {
        Geometry::Polygon(rings) => {
            for ring in rings {
                draw_ring(ctx, ring, color);
            }
        }
        Geometry::MultiPolygon(polygons) => {
            for ring in polygons.iter().flatten() {
                draw_ring(ctx, ring, color);
            }
        }
    }
}

fn draw_ring(ctx: &mut Context<'_>, ring: &[[f64; 2]], color: Color) {
    for pair in ring.windows(2) {
        ctx.draw(&Segment::new(pair[0][0], pair[0][1], pair[1][0], pair[1][1], color));
    }
}
