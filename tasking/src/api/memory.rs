//! In-process fake backend.
//!
//! [`InMemoryApi`] serves a single project from memory and applies the same
//! lock rules as the real backend. Failures and latency can be scripted so
//! tests can exercise load errors, poll failures and late responses.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use tasking_proto::activity::{ActivityEntry, ActivitySnapshot};
use tasking_proto::grid::square_grid;
use tasking_proto::lock::LockRequest;
use tasking_proto::project::{Project, UserDetails};
use tasking_proto::task::{LockKind, ProjectId, TaskCollection, TaskId, TaskStatus};

use super::{ApiError, TaskingApi};

struct State {
    project: Project,
    user: UserDetails,
    tasks: TaskCollection,
    activity: ActivitySnapshot,
    /// Status each locked task had before it was locked.
    pre_lock: HashMap<TaskId, TaskStatus>,
    fail_task_fetches: u32,
    fail_activity_fetches: u32,
    activity_delay: Option<Duration>,
    task_calls: u32,
    activity_calls: u32,
}

impl State {
    fn check_project(&self, project_id: ProjectId) -> Result<(), ApiError> {
        if self.project.project_id == project_id {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("project {project_id}")))
        }
    }

    fn set_status(&mut self, id: TaskId, status: TaskStatus, by: Option<&str>) {
        if let Some(entry) = self.activity.activity.iter_mut().find(|e| e.task_id == id) {
            entry.task_status = status;
            entry.action_by = by.map(String::from);
        }
        let locked_by = status.is_locked().then_some(self.user.id);
        if let Some(feature) = self.tasks.features.iter_mut().find(|f| f.id() == id) {
            feature.properties.task_status = status;
            feature.properties.action_by = by.map(String::from);
            feature.properties.locked_by = locked_by;
        }
    }

    fn conflict(reason: String) -> ApiError {
        ApiError::Status {
            status: 409,
            body: reason,
        }
    }
}

/// Single-project [`TaskingApi`] held entirely in memory.
pub struct InMemoryApi {
    state: Mutex<State>,
}

impl InMemoryApi {
    /// Creates a fake serving `project` with `tasks`, authenticated as `user`.
    ///
    /// The initial activity feed mirrors the task statuses.
    #[must_use]
    pub fn new(project: Project, user: UserDetails, tasks: TaskCollection) -> Self {
        let activity = ActivitySnapshot::new(
            tasks
                .features
                .iter()
                .map(|f| ActivityEntry {
                    task_id: f.id(),
                    task_status: f.status(),
                    action_by: f.properties.action_by.clone(),
                    action_date: f.properties.action_date.clone(),
                })
                .collect(),
        );
        Self {
            state: Mutex::new(State {
                project,
                user,
                tasks,
                activity,
                pre_lock: HashMap::new(),
                fail_task_fetches: 0,
                fail_activity_fetches: 0,
                activity_delay: None,
                task_calls: 0,
                activity_calls: 0,
            }),
        }
    }

    /// A demo project: a 4x3 grid of READY tasks.
    #[must_use]
    pub fn demo(user: UserDetails) -> Self {
        let project = Project::new(ProjectId::new(1), "Demo grid");
        Self::new(project, user, square_grid([36.80, -1.30], 0.01, 4, 3))
    }

    /// Replaces the activity feed served from now on.
    pub fn set_activity(&self, activity: ActivitySnapshot) {
        self.state.lock().activity = activity;
    }

    /// Sets one task's status as if another client had acted on it.
    pub fn set_status(&self, id: TaskId, status: TaskStatus, by: Option<&str>) {
        self.state.lock().set_status(id, status, by);
    }

    /// The next `n` task fetches fail with a transport error.
    pub fn fail_next_task_fetches(&self, n: u32) {
        self.state.lock().fail_task_fetches = n;
    }

    /// The next `n` activity fetches fail with a transport error.
    pub fn fail_next_activity_fetches(&self, n: u32) {
        self.state.lock().fail_activity_fetches = n;
    }

    /// Delay every activity response by `delay`.
    pub fn set_activity_delay(&self, delay: Option<Duration>) {
        self.state.lock().activity_delay = delay;
    }

    /// Number of task fetches served or failed so far.
    #[must_use]
    pub fn task_calls(&self) -> u32 {
        self.state.lock().task_calls
    }

    /// Number of activity fetches served or failed so far.
    #[must_use]
    pub fn activity_calls(&self) -> u32 {
        self.state.lock().activity_calls
    }

    /// Current status of a task.
    #[must_use]
    pub fn status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.state
            .lock()
            .activity
            .get(id)
            .map(|entry| entry.task_status)
    }
}

fn simulated_failure() -> ApiError {
    ApiError::Transport("simulated network error".to_string())
}

impl TaskingApi for InMemoryApi {
    async fn fetch_project(&self, project_id: ProjectId) -> Result<Project, ApiError> {
        let state = self.state.lock();
        state.check_project(project_id)?;
        Ok(state.project.clone())
    }

    async fn fetch_tasks(&self, project_id: ProjectId) -> Result<TaskCollection, ApiError> {
        let mut state = self.state.lock();
        state.task_calls += 1;
        state.check_project(project_id)?;
        if state.fail_task_fetches > 0 {
            state.fail_task_fetches -= 1;
            return Err(simulated_failure());
        }
        Ok(state.tasks.clone())
    }

    async fn fetch_latest_activity(
        &self,
        project_id: ProjectId,
    ) -> Result<ActivitySnapshot, ApiError> {
        let (delay, result) = {
            let mut state = self.state.lock();
            state.activity_calls += 1;
            let result = state.check_project(project_id).and_then(|()| {
                if state.fail_activity_fetches > 0 {
                    state.fail_activity_fetches -= 1;
                    Err(simulated_failure())
                } else {
                    Ok(state.activity.clone())
                }
            });
            (state.activity_delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn fetch_current_user(&self) -> Result<UserDetails, ApiError> {
        Ok(self.state.lock().user.clone())
    }

    async fn lock_tasks(&self, project_id: ProjectId, request: LockRequest) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.check_project(project_id)?;

        for id in &request.task_ids {
            let entry = state
                .activity
                .get(*id)
                .ok_or_else(|| ApiError::NotFound(format!("task {id}")))?;
            let lockable = match request.lock_type {
                LockKind::Mapping => entry.task_status.is_mappable(),
                LockKind::Validation => entry.task_status.is_validatable(),
            };
            if !lockable {
                return Err(State::conflict(format!(
                    "task {id} is {} and cannot be locked for {:?}",
                    entry.task_status, request.lock_type
                )));
            }
        }

        let username = state.user.username.clone();
        for id in request.task_ids {
            let previous = state.activity.get(id).map(|e| e.task_status);
            if let Some(previous) = previous {
                state.pre_lock.insert(id, previous);
            }
            state.set_status(id, request.lock_type.locked_status(), Some(&username));
        }
        Ok(())
    }

    async fn unlock_tasks(
        &self,
        project_id: ProjectId,
        task_ids: Vec<TaskId>,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.check_project(project_id)?;

        let username = state.user.username.clone();
        for id in &task_ids {
            let held = state
                .activity
                .get(*id)
                .is_some_and(|e| e.is_locked_by(&username));
            if !held {
                return Err(State::conflict(format!("task {id} is not locked by {username}")));
            }
        }

        for id in task_ids {
            let previous = state.pre_lock.remove(&id).unwrap_or(TaskStatus::Ready);
            state.set_status(id, previous, Some(&username));
        }
        Ok(())
    }
}
