//! Backend API abstraction.
//!
//! Defines the [`TaskingApi`] trait that every backend client satisfies.
//! Implementations:
//! - [`http::HttpApi`]: `reqwest` client for the real REST API
//! - [`memory::InMemoryApi`]: in-process fake for tests and offline demos
//!
//! The backend is the only source of truth for task status and locks; the
//! client never mutates task state except through these calls.

pub mod http;
pub mod memory;

use std::future::Future;

use tasking_proto::activity::ActivitySnapshot;
use tasking_proto::codec::CodecError;
use tasking_proto::lock::LockRequest;
use tasking_proto::project::{Project, UserDetails};
use tasking_proto::task::{ProjectId, TaskCollection, TaskId};

/// Errors that can occur while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, reset).
    #[error("request failed: {0}")]
    Transport(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body did not decode.
    #[error(transparent)]
    Decode(#[from] CodecError),

    /// The configured base URL cannot be used.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Async client for the Tasking Manager REST endpoints used by task
/// selection.
///
/// Every method is a single request; retries and polling cadence are the
/// caller's concern.
pub trait TaskingApi: Send + Sync {
    /// `GET /projects/{id}/`: project summary and permissions.
    fn fetch_project(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<Project, ApiError>> + Send;

    /// `GET /projects/{id}/tasks/`: full task geometry and status.
    fn fetch_tasks(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<TaskCollection, ApiError>> + Send;

    /// `GET /projects/{id}/activities/latest/`: status-only feed.
    fn fetch_latest_activity(
        &self,
        project_id: ProjectId,
    ) -> impl Future<Output = Result<ActivitySnapshot, ApiError>> + Send;

    /// `GET /users/me/`: the authenticated user's profile.
    fn fetch_current_user(&self) -> impl Future<Output = Result<UserDetails, ApiError>> + Send;

    /// `POST /project/{id}/assign`: lock tasks for mapping or validation.
    fn lock_tasks(
        &self,
        project_id: ProjectId,
        request: LockRequest,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST /project/{id}/unassign`: release the caller's locks.
    fn unlock_tasks(
        &self,
        project_id: ProjectId,
        task_ids: Vec<TaskId>,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}
