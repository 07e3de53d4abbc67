//! Request bodies for the assign / unassign endpoints.

use serde::{Deserialize, Serialize};

use crate::task::{LockKind, TaskId};

/// Body of `POST /project/{id}/assign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRequest {
    /// Tasks to lock.
    pub task_ids: Vec<TaskId>,
    /// Mapping or validation.
    pub lock_type: LockKind,
}

/// Body of `POST /project/{id}/unassign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    /// Tasks to release.
    pub task_ids: Vec<TaskId>,
}

/// Error body returned by the backend on a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable reason.
    pub sub_code: String,
}
