//! The latest-activity feed: a lightweight per-task status projection.
//!
//! Served by `GET /projects/{id}/activities/latest/` and polled by the
//! client. Entries carry no geometry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{LockKind, TaskId, TaskStatus, parse_action_date};

/// Latest status of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    /// Task id within the project.
    pub task_id: TaskId,
    /// Current status.
    pub task_status: TaskStatus,
    /// Username of the last acting user (the lock holder for locked tasks).
    #[serde(default)]
    pub action_by: Option<String>,
    /// Timestamp of the last action.
    #[serde(default)]
    pub action_date: Option<String>,
}

impl ActivityEntry {
    /// Whether `username` currently holds a lock on this task.
    #[must_use]
    pub fn is_locked_by(&self, username: &str) -> bool {
        self.task_status.is_locked() && self.action_by.as_deref() == Some(username)
    }

    /// Lock kind, when the task is locked.
    #[must_use]
    pub const fn lock_kind(&self) -> Option<LockKind> {
        self.task_status.lock_kind()
    }

    /// Parsed action timestamp.
    #[must_use]
    pub fn action_time(&self) -> Option<DateTime<Utc>> {
        self.action_date.as_deref().and_then(parse_action_date)
    }
}

/// One poll's worth of activity for a whole project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    /// One entry per task, in backend order.
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
}

impl ActivitySnapshot {
    /// Wraps a list of entries.
    #[must_use]
    pub const fn new(activity: Vec<ActivityEntry>) -> Self {
        Self { activity }
    }

    /// Looks up the entry for a task.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&ActivityEntry> {
        self.activity.iter().find(|e| e.task_id == id)
    }

    /// Entries locked by `username`, in feed order.
    pub fn locked_by<'a>(&'a self, username: &'a str) -> impl Iterator<Item = &'a ActivityEntry> {
        self.activity.iter().filter(move |e| e.is_locked_by(username))
    }
}
