//! HTTP client for the Tasking Manager REST API.
//!
//! Paths are resolved relative to a base URL such as
//! `https://tasks.example.org/api/v2/`. When the session carries a token it
//! is sent as `Authorization: Token <token>`.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use url::Url;

use tasking_proto::activity::ActivitySnapshot;
use tasking_proto::codec;
use tasking_proto::lock::{LockRequest, UnlockRequest};
use tasking_proto::project::{Project, UserDetails};
use tasking_proto::task::{ProjectId, TaskCollection, TaskId};

use super::{ApiError, TaskingApi};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed [`TaskingApi`] implementation.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpApi {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// A trailing slash is appended to the base path if missing so that
    /// relative endpoint paths resolve beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` does not parse or
    /// cannot be a base, and [`ApiError::Transport`] if the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// The resolved base URL (always ends with `/`).
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("Token {token}")),
            None => request,
        }
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "GET");
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_success_body(path, response).await
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");
        let response = self
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_success_body(path, response).await.map(|_| ())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(e.to_string())
    }
}

async fn read_success_body(path: &str, response: reqwest::Response) -> Result<Vec<u8>, ApiError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(path.to_string()));
    }
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    Ok(body.to_vec())
}

impl TaskingApi for HttpApi {
    async fn fetch_project(&self, project_id: ProjectId) -> Result<Project, ApiError> {
        let bytes = self.get_bytes(&format!("projects/{project_id}/")).await?;
        Ok(codec::decode_project(&bytes)?)
    }

    async fn fetch_tasks(&self, project_id: ProjectId) -> Result<TaskCollection, ApiError> {
        let bytes = self
            .get_bytes(&format!("projects/{project_id}/tasks/"))
            .await?;
        Ok(codec::decode_tasks(&bytes)?)
    }

    async fn fetch_latest_activity(
        &self,
        project_id: ProjectId,
    ) -> Result<ActivitySnapshot, ApiError> {
        let bytes = self
            .get_bytes(&format!("projects/{project_id}/activities/latest/"))
            .await?;
        Ok(codec::decode_activity(&bytes)?)
    }

    async fn fetch_current_user(&self) -> Result<UserDetails, ApiError> {
        let bytes = self.get_bytes("users/me/").await?;
        Ok(codec::decode_user(&bytes)?)
    }

    async fn lock_tasks(&self, project_id: ProjectId, request: LockRequest) -> Result<(), ApiError> {
        self.post_json(&format!("project/{project_id}/assign"), &request)
            .await
    }

    async fn unlock_tasks(
        &self,
        project_id: ProjectId,
        task_ids: Vec<TaskId>,
    ) -> Result<(), ApiError> {
        self.post_json(
            &format!("project/{project_id}/unassign"),
            &UnlockRequest { task_ids },
        )
        .await
    }
}
