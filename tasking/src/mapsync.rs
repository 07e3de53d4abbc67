//! Map sync adapter.
//!
//! Turns the merged task collection and the selection into the parameters a
//! Mapbox-style renderer consumes: the GeoJSON source, the filter for the
//! selected-tasks border layer, layer visibility, paint expressions and the
//! bounds to fit. Expressions are plain JSON so any renderer can take them.

use serde_json::{Value, json};

use tasking_proto::task::{BBox, TaskCollection, TaskId, TaskStatus};

/// Layers drawn in the normal task view.
pub const TASK_LAYERS: [&str; 4] = [
    "tasks-icon",
    "tasks-fill",
    "selected-tasks-border",
    "unselected-tasks-border",
];

/// Layers drawn when only the project outline is shown.
pub const OUTLINE_LAYERS: [&str; 3] = [
    "outerhull-tasks-border",
    "point-tasks-centroid",
    "point-tasks-centroid-inner",
];

/// Fill colour for tasks whose status has no palette entry.
const TRANSPARENT: &str = "rgba(0,0,0,0)";

/// Fill colour per status.
#[must_use]
pub const fn status_colour(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Ready | TaskStatus::LockedForMapping => "#ffffff",
        TaskStatus::Mapped | TaskStatus::LockedForValidation => "#a1d7e5",
        TaskStatus::Validated => "#40ac8c",
        TaskStatus::Invalidated => "#fceca4",
        TaskStatus::BadImagery => "#d8dae4",
        TaskStatus::PendingImageCapture => "#f7c779",
        TaskStatus::MoreImagesNeeded => "#f99f54",
        TaskStatus::ImageCaptureDone => "#7fb985",
        TaskStatus::Split | TaskStatus::Locked | TaskStatus::Unknown => TRANSPARENT,
    }
}

/// What the map shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// Individual tasks, coloured by status.
    #[default]
    Tasks,
    /// Only the project outline and centroid markers.
    BordersOnly,
}

impl DisplayMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Tasks => Self::BordersOnly,
            Self::BordersOnly => Self::Tasks,
        }
    }
}

/// Visibility of one renderer layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVisibility {
    /// Layer id.
    pub layer: &'static str,
    /// Whether the layer is drawn.
    pub visible: bool,
}

/// Camera target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitBounds {
    /// Area to fit.
    pub bbox: BBox,
    /// Padding around the area, in pixels.
    pub padding: u32,
    /// Zoom ceiling, if any.
    pub max_zoom: Option<f64>,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MapParams {
    /// GeoJSON source data.
    pub source: TaskCollection,
    /// Filter for `selected-tasks-border`.
    pub selected_filter: Value,
    /// Layer visibility, task layers first.
    pub layers: Vec<LayerVisibility>,
    /// `fill-color` paint expression for `tasks-fill`.
    pub fill_color: Value,
    /// `icon-image` layout expression for `tasks-icon`.
    pub icon_image: Value,
    /// Where to point the camera.
    pub fit_bounds: Option<FitBounds>,
}

impl MapParams {
    /// Builds the parameters for the given inputs.
    #[must_use]
    pub fn build(
        tasks: &TaskCollection,
        selection: &[TaskId],
        mode: DisplayMode,
        user_id: Option<u64>,
    ) -> Self {
        Self {
            source: tasks.clone(),
            selected_filter: selected_filter(selection),
            layers: layer_visibility(mode),
            fill_color: fill_color_expression(),
            icon_image: icon_image_expression(user_id),
            fit_bounds: fit_bounds(tasks, selection, mode),
        }
    }

    /// Whether `layer` is drawn.
    #[must_use]
    pub fn is_visible(&self, layer: &str) -> bool {
        self.layers.iter().any(|l| l.layer == layer && l.visible)
    }
}

/// `["in", "taskId", ids...]`, or the match-nothing sentinel
/// `["in", "taskId", ""]` for an empty selection.
#[must_use]
pub fn selected_filter(selection: &[TaskId]) -> Value {
    let mut filter = vec![json!("in"), json!("taskId")];
    if selection.is_empty() {
        filter.push(json!(""));
    } else {
        filter.extend(selection.iter().map(|id| json!(id.get())));
    }
    Value::Array(filter)
}

/// Task layers visible in [`DisplayMode::Tasks`], outline layers otherwise.
#[must_use]
pub fn layer_visibility(mode: DisplayMode) -> Vec<LayerVisibility> {
    let tasks_visible = mode == DisplayMode::Tasks;
    TASK_LAYERS
        .into_iter()
        .map(|layer| LayerVisibility {
            layer,
            visible: tasks_visible,
        })
        .chain(OUTLINE_LAYERS.into_iter().map(|layer| LayerVisibility {
            layer,
            visible: !tasks_visible,
        }))
        .collect()
}

/// `["match", ["get", "taskStatus"], status, colour, ..., fallback]`.
#[must_use]
pub fn fill_color_expression() -> Value {
    let mut expr = vec![json!("match"), json!(["get", "taskStatus"])];
    for status in TaskStatus::ALL {
        expr.push(json!(status.as_str()));
        expr.push(json!(status_colour(status)));
    }
    expr.push(json!(TRANSPARENT));
    Value::Array(expr)
}

/// Lock icons: `redlock` on tasks the user holds, `lock` on other locked
/// tasks, no icon otherwise.
///
/// The `redlock` branch is omitted when the user id is unknown.
#[must_use]
pub fn icon_image_expression(user_id: Option<u64>) -> Value {
    let locked = json!([
        "any",
        ["==", ["to-string", ["get", "taskStatus"]], "LOCKED_FOR_MAPPING"],
        ["==", ["to-string", ["get", "taskStatus"]], "LOCKED_FOR_VALIDATION"],
    ]);
    let mut expr = vec![json!("case")];
    if let Some(id) = user_id {
        expr.push(json!(["all", locked.clone(), ["==", ["get", "lockedBy"], id]]));
        expr.push(json!("redlock"));
    }
    expr.push(locked);
    expr.push(json!("lock"));
    expr.push(json!(""));
    Value::Array(expr)
}

/// The selected tasks when there are any, otherwise the whole project.
///
/// A selection whose ids are all missing from `tasks` falls back to the
/// whole project.
#[must_use]
pub fn fit_bounds(tasks: &TaskCollection, selection: &[TaskId], mode: DisplayMode) -> Option<FitBounds> {
    if !selection.is_empty()
        && let Some(bbox) = tasks.bbox_where(|f| selection.contains(&f.id()))
    {
        return Some(FitBounds {
            bbox,
            padding: 80,
            max_zoom: None,
        });
    }
    let bbox = tasks.bbox()?;
    Some(match mode {
        DisplayMode::Tasks => FitBounds {
            bbox,
            padding: 40,
            max_zoom: None,
        },
        DisplayMode::BordersOnly => FitBounds {
            bbox,
            padding: 220,
            max_zoom: Some(6.5),
        },
    })
}

/// Result of [`MapSync::sync`].
#[derive(Debug, Clone, PartialEq)]
pub enum SyncResult {
    /// Same inputs as last time; the renderer has nothing to do.
    Unchanged,
    /// New parameters to apply in full.
    Replaced(Box<MapParams>),
}

/// Remembers what was last pushed to the renderer.
#[derive(Debug, Default)]
pub struct MapSync {
    last: Option<MapParams>,
}

impl MapSync {
    /// Nothing pushed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Recomputes the parameters and reports whether they changed.
    pub fn sync(
        &mut self,
        tasks: &TaskCollection,
        selection: &[TaskId],
        mode: DisplayMode,
        user_id: Option<u64>,
    ) -> SyncResult {
        let params = MapParams::build(tasks, selection, mode, user_id);
        if self.last.as_ref() == Some(&params) {
            return SyncResult::Unchanged;
        }
        tracing::debug!(
            tasks = params.source.len(),
            selected = selection.len(),
            ?mode,
            "map parameters replaced"
        );
        self.last = Some(params.clone());
        SyncResult::Replaced(Box::new(params))
    }

    /// The parameters last pushed.
    #[must_use]
    pub const fn current(&self) -> Option<&MapParams> {
        self.last.as_ref()
    }
}
