//! In-memory project store.
//!
//! Holds one project, its task grid and the known users. Every mutation
//! goes through [`ProjectStore`], which applies the backend's lock rules:
//! only mappable tasks lock for mapping, only validatable tasks lock for
//! validation, and only the holder may release a lock.

use std::collections::HashMap;

use tokio::sync::RwLock;

use tasking_proto::activity::{ActivityEntry, ActivitySnapshot};
use tasking_proto::grid::square_grid;
use tasking_proto::lock::LockRequest;
use tasking_proto::project::{MappingLevel, Project, UserDetails, UserRole};
use tasking_proto::task::{LockKind, ProjectId, TaskCollection, TaskId, TaskStatus};

/// South-west corner of generated grids.
const GRID_ORIGIN: [f64; 2] = [36.80, -1.30];

/// Cell size of generated grids, in degrees.
const GRID_CELL: f64 = 0.01;

/// Format of `actionDate` values (the backend's naive ISO timestamps).
const ACTION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Errors returned by store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No project with this id.
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    /// No task with this id in the project.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// The request conflicts with the current task state.
    #[error("{0}")]
    Conflict(String),
}

impl StoreError {
    /// Machine-readable reason, as sent in `SubCode`.
    #[must_use]
    pub const fn sub_code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            Self::TaskNotFound(_) => "TASK_NOT_FOUND",
            Self::Conflict(_) => "INVALID_TASK_STATE",
        }
    }
}

struct Inner {
    project: Project,
    tasks: TaskCollection,
    users: HashMap<String, UserDetails>,
    /// Status each locked task had before it was locked.
    pre_lock: HashMap<TaskId, TaskStatus>,
    next_user_id: u64,
}

impl Inner {
    fn check_project(&self, project_id: ProjectId) -> Result<(), StoreError> {
        if self.project.project_id == project_id {
            Ok(())
        } else {
            Err(StoreError::ProjectNotFound(project_id))
        }
    }

    fn status(&self, id: TaskId) -> Result<TaskStatus, StoreError> {
        self.tasks
            .get(id)
            .map(|f| f.status())
            .ok_or(StoreError::TaskNotFound(id))
    }

    fn apply(&mut self, id: TaskId, status: TaskStatus, user: Option<&UserDetails>) {
        let now = chrono::Utc::now().format(ACTION_DATE_FORMAT).to_string();
        if let Some(feature) = self.tasks.features.iter_mut().find(|f| f.id() == id) {
            feature.properties.task_status = status;
            feature.properties.action_by = user.map(|u| u.username.clone());
            feature.properties.action_date = Some(now);
            feature.properties.locked_by = user.filter(|_| status.is_locked()).map(|u| u.id);
        }
    }
}

/// Shared, async-safe project state.
pub struct ProjectStore {
    inner: RwLock<Inner>,
}

impl ProjectStore {
    /// A store serving `project` with `tasks`.
    #[must_use]
    pub fn new(project: Project, tasks: TaskCollection) -> Self {
        Self {
            inner: RwLock::new(Inner {
                project,
                tasks,
                users: HashMap::new(),
                pre_lock: HashMap::new(),
                next_user_id: 1,
            }),
        }
    }

    /// A store serving a `columns` x `rows` grid of READY tasks.
    #[must_use]
    pub fn with_grid(project_id: ProjectId, columns: u32, rows: u32) -> Self {
        let project = Project::new(project_id, &format!("Mock project {project_id}"));
        Self::new(project, square_grid(GRID_ORIGIN, GRID_CELL, columns, rows))
    }

    /// Registers a user profile, replacing any with the same username.
    pub async fn add_user(&self, user: UserDetails) {
        let mut inner = self.inner.write().await;
        inner.next_user_id = inner.next_user_id.max(user.id + 1);
        inner.users.insert(user.username.clone(), user);
    }

    /// The user a token authenticates as.
    ///
    /// Tokens are usernames. An unknown username is registered on first use
    /// as an intermediate mapper.
    pub async fn user_for_token(&self, token: &str) -> UserDetails {
        if let Some(user) = self.inner.read().await.users.get(token) {
            return user.clone();
        }
        let mut inner = self.inner.write().await;
        let id = inner.next_user_id;
        let user = inner
            .users
            .entry(token.to_string())
            .or_insert_with(|| UserDetails {
                id,
                username: token.to_string(),
                mapping_level: MappingLevel::Intermediate,
                role: UserRole::Mapper,
                is_expert: false,
                teams: Vec::new(),
            })
            .clone();
        if user.id == id {
            inner.next_user_id += 1;
            tracing::info!(username = %user.username, id, "registered user");
        }
        user
    }

    /// Project summary.
    ///
    /// # Errors
    ///
    /// [`StoreError::ProjectNotFound`] for any other project id.
    pub async fn project(&self, project_id: ProjectId) -> Result<Project, StoreError> {
        let inner = self.inner.read().await;
        inner.check_project(project_id)?;
        Ok(inner.project.clone())
    }

    /// All tasks with geometry.
    ///
    /// # Errors
    ///
    /// [`StoreError::ProjectNotFound`] for any other project id.
    pub async fn tasks(&self, project_id: ProjectId) -> Result<TaskCollection, StoreError> {
        let inner = self.inner.read().await;
        inner.check_project(project_id)?;
        Ok(inner.tasks.clone())
    }

    /// The latest-activity feed, one entry per task in id order.
    ///
    /// # Errors
    ///
    /// [`StoreError::ProjectNotFound`] for any other project id.
    pub async fn activity(&self, project_id: ProjectId) -> Result<ActivitySnapshot, StoreError> {
        let inner = self.inner.read().await;
        inner.check_project(project_id)?;
        Ok(ActivitySnapshot::new(
            inner
                .tasks
                .features
                .iter()
                .map(|f| ActivityEntry {
                    task_id: f.id(),
                    task_status: f.status(),
                    action_by: f.properties.action_by.clone(),
                    action_date: f.properties.action_date.clone(),
                })
                .collect(),
        ))
    }

    /// Locks every task in `request` for `user`, or none of them.
    ///
    /// # Errors
    ///
    /// [`StoreError::TaskNotFound`] for unknown ids and
    /// [`StoreError::Conflict`] when a task is not in a lockable state.
    pub async fn lock(
        &self,
        project_id: ProjectId,
        user: &UserDetails,
        request: &LockRequest,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_project(project_id)?;

        for id in &request.task_ids {
            let status = inner.status(*id)?;
            let lockable = match request.lock_type {
                LockKind::Mapping => status.is_mappable(),
                LockKind::Validation => status.is_validatable(),
            };
            if !lockable {
                return Err(StoreError::Conflict(format!(
                    "task {id} is {status} and cannot be locked for {}",
                    match request.lock_type {
                        LockKind::Mapping => "mapping",
                        LockKind::Validation => "validation",
                    }
                )));
            }
        }

        for id in &request.task_ids {
            let previous = inner.status(*id)?;
            inner.pre_lock.insert(*id, previous);
            inner.apply(*id, request.lock_type.locked_status(), Some(user));
        }
        tracing::info!(
            user = %user.username,
            tasks = ?request.task_ids,
            kind = ?request.lock_type,
            "tasks locked"
        );
        Ok(())
    }

    /// Releases `user`'s locks on `task_ids`, restoring the prior status.
    ///
    /// # Errors
    ///
    /// [`StoreError::TaskNotFound`] for unknown ids and
    /// [`StoreError::Conflict`] when a task is not locked by `user`.
    pub async fn unlock(
        &self,
        project_id: ProjectId,
        user: &UserDetails,
        task_ids: &[TaskId],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_project(project_id)?;

        for id in task_ids {
            let feature = inner.tasks.get(*id).ok_or(StoreError::TaskNotFound(*id))?;
            let held = feature.status().is_locked() && feature.properties.locked_by == Some(user.id);
            if !held {
                return Err(StoreError::Conflict(format!(
                    "task {id} is not locked by {}",
                    user.username
                )));
            }
        }

        for id in task_ids {
            let previous = inner.pre_lock.remove(id).unwrap_or(TaskStatus::Ready);
            inner.apply(*id, previous, Some(user));
        }
        tracing::info!(user = %user.username, tasks = ?task_ids, "tasks released");
        Ok(())
    }

    /// Sets a task's status directly, as if another client acted on it.
    ///
    /// # Errors
    ///
    /// [`StoreError::TaskNotFound`] for unknown ids.
    pub async fn set_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        user: Option<&UserDetails>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.status(id)?;
        inner.pre_lock.remove(&id);
        inner.apply(id, status, user);
        Ok(())
    }
}
