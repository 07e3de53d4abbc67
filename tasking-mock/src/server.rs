//! HTTP surface of the mock backend.
//!
//! Mirrors the REST paths the client uses, under `/api/v2`:
//!
//! | Method | Path                                   |
//! |--------|----------------------------------------|
//! | GET    | `/projects/{id}/`                      |
//! | GET    | `/projects/{id}/tasks/`                |
//! | GET    | `/projects/{id}/activities/latest/`    |
//! | GET    | `/users/me/`                           |
//! | POST   | `/project/{id}/assign`                 |
//! | POST   | `/project/{id}/unassign`               |
//!
//! Rejected requests answer with an `{"Error": ..., "SubCode": ...}` body.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

use tasking_proto::activity::ActivitySnapshot;
use tasking_proto::lock::{ErrorBody, LockRequest, UnlockRequest};
use tasking_proto::project::{Project, UserDetails};
use tasking_proto::task::{ProjectId, TaskCollection};

use crate::store::{ProjectStore, StoreError};

/// Shared server state.
pub struct MockState {
    /// The project and its users.
    pub store: ProjectStore,
}

impl MockState {
    /// Wraps a store.
    #[must_use]
    pub const fn new(store: ProjectStore) -> Self {
        Self { store }
    }
}

/// A rejected request.
#[derive(Debug)]
pub enum ApiFailure {
    /// No usable `Authorization: Token ...` header.
    Unauthorized,
    /// The store refused the request.
    Store(StoreError),
}

impl From<StoreError> for ApiFailure {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (status, error, sub_code) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or malformed token".to_string(),
                "INVALID_TOKEN",
            ),
            Self::Store(e) => {
                let status = match e {
                    StoreError::ProjectNotFound(_) | StoreError::TaskNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    StoreError::Conflict(_) => StatusCode::CONFLICT,
                };
                (status, e.to_string(), e.sub_code())
            }
        };
        let body = ErrorBody {
            error,
            sub_code: sub_code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type Shared = State<Arc<MockState>>;

/// Builds the router.
pub fn router(state: Arc<MockState>) -> axum::Router {
    axum::Router::new()
        .route("/api/v2/projects/{id}/", get(get_project))
        .route("/api/v2/projects/{id}/tasks/", get(get_tasks))
        .route("/api/v2/projects/{id}/activities/latest/", get(get_activity))
        .route("/api/v2/users/me/", get(get_me))
        .route("/api/v2/project/{id}/assign", post(assign))
        .route("/api/v2/project/{id}/unassign", post(unassign))
        .with_state(state)
}

/// Starts the mock server on `addr`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<MockState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "mock server error");
        }
    });

    Ok((bound_addr, handle))
}

async fn authenticate(state: &MockState, headers: &HeaderMap) -> Result<UserDetails, ApiFailure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Token "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiFailure::Unauthorized)?;
    Ok(state.store.user_for_token(token).await)
}

async fn get_project(
    State(state): Shared,
    Path(id): Path<u32>,
) -> Result<Json<Project>, ApiFailure> {
    Ok(Json(state.store.project(ProjectId::new(id)).await?))
}

async fn get_tasks(
    State(state): Shared,
    Path(id): Path<u32>,
) -> Result<Json<TaskCollection>, ApiFailure> {
    Ok(Json(state.store.tasks(ProjectId::new(id)).await?))
}

async fn get_activity(
    State(state): Shared,
    Path(id): Path<u32>,
) -> Result<Json<ActivitySnapshot>, ApiFailure> {
    Ok(Json(state.store.activity(ProjectId::new(id)).await?))
}

async fn get_me(State(state): Shared, headers: HeaderMap) -> Result<Json<UserDetails>, ApiFailure> {
    Ok(Json(authenticate(&state, &headers).await?))
}

async fn assign(
    State(state): Shared,
    Path(id): Path<u32>,
    headers: HeaderMap,
    Json(request): Json<LockRequest>,
) -> Result<StatusCode, ApiFailure> {
    let user = authenticate(&state, &headers).await?;
    state.store.lock(ProjectId::new(id), &user, &request).await?;
    Ok(StatusCode::OK)
}

async fn unassign(
    State(state): Shared,
    Path(id): Path<u32>,
    headers: HeaderMap,
    Json(request): Json<UnlockRequest>,
) -> Result<StatusCode, ApiFailure> {
    let user = authenticate(&state, &headers).await?;
    state
        .store
        .unlock(ProjectId::new(id), &user, &request.task_ids)
        .await?;
    Ok(StatusCode::OK)
}
