//! Task model: identifiers, status, and the GeoJSON task collection.
//!
//! The backend serves a project's tasks as a GeoJSON `FeatureCollection`
//! whose feature properties carry the task id and status. The client never
//! treats these values as authoritative; it only mirrors what the backend
//! last reported.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a task within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u32);

impl TaskId {
    /// Creates a task identifier from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(u32);

impl ProjectId {
    /// Creates a project identifier from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which kind of work a lock reserves a task for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockKind {
    /// Locked while a mapper edits the task.
    Mapping,
    /// Locked while a validator reviews the task.
    Validation,
}

impl LockKind {
    /// The task status a task carries while held under this lock.
    #[must_use]
    pub const fn locked_status(self) -> TaskStatus {
        match self {
            Self::Mapping => TaskStatus::LockedForMapping,
            Self::Validation => TaskStatus::LockedForValidation,
        }
    }
}

/// Status of a task as reported by the backend.
///
/// The wire strings are the backend's enum names verbatim (note
/// `BADIMAGERY` has no underscore). Strings this client does not know
/// decode as [`TaskStatus::Unknown`] so one odd task cannot fail a whole
/// payload; [`FromStr`] stays strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not yet mapped.
    #[serde(rename = "READY")]
    Ready,
    /// Mapped, waiting for validation.
    #[serde(rename = "MAPPED")]
    Mapped,
    /// Validated; done.
    #[serde(rename = "VALIDATED")]
    Validated,
    /// Rejected by a validator; needs mapping again.
    #[serde(rename = "INVALIDATED")]
    Invalidated,
    /// Imagery was not usable.
    #[serde(rename = "BADIMAGERY")]
    BadImagery,
    /// Locked by a mapper.
    #[serde(rename = "LOCKED_FOR_MAPPING")]
    LockedForMapping,
    /// Locked by a validator.
    #[serde(rename = "LOCKED_FOR_VALIDATION")]
    LockedForValidation,
    /// Image capture projects: waiting for imagery.
    #[serde(rename = "PENDING_IMAGE_CAPTURE")]
    PendingImageCapture,
    /// Image capture projects: more imagery requested.
    #[serde(rename = "MORE_IMAGES_NEEDED")]
    MoreImagesNeeded,
    /// Image capture projects: imagery complete.
    #[serde(rename = "IMAGE_CAPTURE_DONE")]
    ImageCaptureDone,
    /// Replaced by smaller tasks.
    #[serde(rename = "SPLIT")]
    Split,
    /// Legacy lock without a kind. Not a `LOCKED_FOR_*` status.
    #[serde(rename = "LOCKED")]
    Locked,
    /// Any status string not listed above.
    #[serde(rename = "UNKNOWN", other)]
    Unknown,
}

/// Prefix shared by every locked status string.
pub const LOCKED_PREFIX: &str = "LOCKED_FOR_";

impl TaskStatus {
    /// Every known status, in display order. [`TaskStatus::Unknown`] is
    /// not included.
    pub const ALL: [Self; 12] = [
        Self::Ready,
        Self::LockedForMapping,
        Self::Mapped,
        Self::LockedForValidation,
        Self::Validated,
        Self::Invalidated,
        Self::BadImagery,
        Self::PendingImageCapture,
        Self::MoreImagesNeeded,
        Self::ImageCaptureDone,
        Self::Split,
        Self::Locked,
    ];

    /// The backend's string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Mapped => "MAPPED",
            Self::Validated => "VALIDATED",
            Self::Invalidated => "INVALIDATED",
            Self::BadImagery => "BADIMAGERY",
            Self::LockedForMapping => "LOCKED_FOR_MAPPING",
            Self::LockedForValidation => "LOCKED_FOR_VALIDATION",
            Self::PendingImageCapture => "PENDING_IMAGE_CAPTURE",
            Self::MoreImagesNeeded => "MORE_IMAGES_NEEDED",
            Self::ImageCaptureDone => "IMAGE_CAPTURE_DONE",
            Self::Split => "SPLIT",
            Self::Locked => "LOCKED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether the status string starts with `LOCKED_FOR_`.
    #[must_use]
    pub fn is_locked(self) -> bool {
        self.as_str().starts_with(LOCKED_PREFIX)
    }

    /// The lock kind for locked statuses, `None` otherwise.
    #[must_use]
    pub const fn lock_kind(self) -> Option<LockKind> {
        match self {
            Self::LockedForMapping => Some(LockKind::Mapping),
            Self::LockedForValidation => Some(LockKind::Validation),
            _ => None,
        }
    }

    /// READY or INVALIDATED: a mapper can pick this task up.
    #[must_use]
    pub const fn is_mappable(self) -> bool {
        matches!(self, Self::Ready | Self::Invalidated)
    }

    /// MAPPED or BADIMAGERY: a validator can pick this task up.
    #[must_use]
    pub const fn is_validatable(self) -> bool {
        matches!(self, Self::Mapped | Self::BadImagery)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Parse a backend timestamp.
///
/// The backend emits naive UTC timestamps (`2020-05-06T12:34:56.123456`);
/// RFC 3339 strings with an offset are accepted as well.
#[must_use]
pub fn parse_action_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A `[longitude, latitude]` position.
pub type Position = [f64; 2];

/// Task geometry. Tasks are always areal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single polygon: outer ring followed by holes.
    Polygon(Vec<Vec<Position>>),
    /// Several polygons.
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// Axis-aligned bounding box `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// Minimum longitude.
    pub west: f64,
    /// Minimum latitude.
    pub south: f64,
    /// Maximum longitude.
    pub east: f64,
    /// Maximum latitude.
    pub north: f64,
}

impl BBox {
    fn from_position(p: Position) -> Self {
        Self {
            west: p[0],
            south: p[1],
            east: p[0],
            north: p[1],
        }
    }

    fn extend(&mut self, p: Position) {
        self.west = self.west.min(p[0]);
        self.south = self.south.min(p[1]);
        self.east = self.east.max(p[0]);
        self.north = self.north.max(p[1]);
    }

    /// Smallest box covering both boxes.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// Bounding box over a set of positions, `None` when empty.
    pub fn covering(positions: impl IntoIterator<Item = Position>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let mut bbox = Self::from_position(iter.next()?);
        for p in iter {
            bbox.extend(p);
        }
        Some(bbox)
    }
}

impl Geometry {
    /// Iterate over every vertex of the geometry.
    pub fn positions(&self) -> Box<dyn Iterator<Item = Position> + '_> {
        match self {
            Self::Polygon(rings) => Box::new(rings.iter().flatten().copied()),
            Self::MultiPolygon(polys) => Box::new(polys.iter().flatten().flatten().copied()),
        }
    }

    /// Bounding box of the geometry, `None` for an empty geometry.
    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        BBox::covering(self.positions())
    }
}

/// Feature properties attached to each task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProperties {
    /// Task id within the project.
    pub task_id: TaskId,
    /// Current status.
    pub task_status: TaskStatus,
    /// User id holding the lock, when locked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<u64>,
    /// Username of the last acting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_by: Option<String>,
    /// Timestamp of the last action, as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_date: Option<String>,
}

/// One task as a GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFeature {
    /// Always `"Feature"`.
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    /// Task outline.
    pub geometry: Geometry,
    /// Task metadata.
    pub properties: TaskProperties,
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

impl TaskFeature {
    /// Builds a feature from a geometry and its properties.
    #[must_use]
    pub fn new(geometry: Geometry, properties: TaskProperties) -> Self {
        Self {
            kind: feature_type(),
            geometry,
            properties,
        }
    }

    /// Shortcut for `properties.task_id`.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.properties.task_id
    }

    /// Shortcut for `properties.task_status`.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.properties.task_status
    }
}

/// All tasks of a project as a GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,
    /// One feature per task.
    pub features: Vec<TaskFeature>,
}

impl Default for TaskCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TaskCollection {
    /// Wraps a list of features.
    #[must_use]
    pub fn new(features: Vec<TaskFeature>) -> Self {
        Self {
            kind: feature_collection_type(),
            features,
        }
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&TaskFeature> {
        self.features.iter().find(|f| f.id() == id)
    }

    /// Whether a task with this id exists.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Task ids in collection order.
    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.features.iter().map(TaskFeature::id)
    }

    /// Bounding box over every task.
    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        self.bbox_where(|_| true)
    }

    /// Bounding box over the tasks matching `pred`.
    pub fn bbox_where(&self, pred: impl Fn(&TaskFeature) -> bool) -> Option<BBox> {
        self.features
            .iter()
            .filter(|f| pred(f))
            .filter_map(|f| f.geometry.bbox())
            .reduce(BBox::union)
    }
}
