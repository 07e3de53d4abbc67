//! Task collection cache.
//!
//! Holds the project's task geometry (fetched once) and the latest activity
//! snapshot (refreshed by polling), and exposes the merged view both panels
//! render. The backend stays authoritative: nothing here changes a status
//! except an accepted snapshot.

use std::collections::HashMap;

use tasking_proto::activity::ActivitySnapshot;
use tasking_proto::task::{ProjectId, TaskCollection, TaskId, TaskStatus};

use crate::api::{ApiError, TaskingApi};

/// Overlays the activity feed onto the initial task collection.
///
/// With no activity the tasks are returned as-is. Otherwise each feature
/// whose id appears in the feed takes the entry's status, `actionBy` and
/// `actionDate`; entries for ids not in `tasks` are ignored.
#[must_use]
pub fn merge_statuses(tasks: &TaskCollection, activity: Option<&ActivitySnapshot>) -> TaskCollection {
    let Some(activity) = activity else {
        return tasks.clone();
    };
    let latest: HashMap<TaskId, _> = activity
        .activity
        .iter()
        .map(|entry| (entry.task_id, entry))
        .collect();

    let mut merged = tasks.clone();
    for feature in &mut merged.features {
        if let Some(entry) = latest.get(&feature.id()) {
            feature.properties.task_status = entry.task_status;
            feature.properties.action_by.clone_from(&entry.action_by);
            feature.properties.action_date.clone_from(&entry.action_date);
        }
    }
    merged
}

/// Number of tasks per status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStats {
    counts: HashMap<TaskStatus, usize>,
    total: usize,
}

impl TaskStats {
    /// Counts the statuses in `tasks`.
    #[must_use]
    pub fn from_collection(tasks: &TaskCollection) -> Self {
        let mut counts = HashMap::new();
        for feature in &tasks.features {
            *counts.entry(feature.status()).or_insert(0) += 1;
        }
        Self {
            counts,
            total: tasks.len(),
        }
    }

    /// Tasks with `status`.
    #[must_use]
    pub fn count(&self, status: TaskStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Total number of tasks.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Non-zero counts in [`TaskStatus::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskStatus, usize)> + '_ {
        TaskStatus::ALL
            .into_iter()
            .map(|status| (status, self.count(status)))
            .filter(|(_, n)| *n > 0)
    }

    /// Percentage of usable tasks that are mapped or validated.
    ///
    /// Tasks flagged BADIMAGERY are excluded from the denominator.
    #[must_use]
    pub fn percent_mapped(&self) -> usize {
        self.percent_of(self.count(TaskStatus::Mapped) + self.count(TaskStatus::Validated))
    }

    /// Percentage of usable tasks that are validated.
    #[must_use]
    pub fn percent_validated(&self) -> usize {
        self.percent_of(self.count(TaskStatus::Validated))
    }

    fn percent_of(&self, n: usize) -> usize {
        let usable = self.total.saturating_sub(self.count(TaskStatus::BadImagery));
        if usable == 0 { 0 } else { n * 100 / usable }
    }
}

/// Initial tasks plus the latest accepted activity snapshot.
#[derive(Debug, Default)]
pub struct TaskCache {
    initial: Option<TaskCollection>,
    activity: Option<ActivitySnapshot>,
    merged: Option<TaskCollection>,
    load_error: bool,
}

impl TaskCache {
    /// An empty cache, nothing loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the project's task geometry and stores the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the fetch. The cache keeps its prior
    /// state and raises [`load_error`](Self::load_error).
    pub async fn load_initial_tasks<A: TaskingApi>(
        &mut self,
        api: &A,
        project_id: ProjectId,
    ) -> Result<(), ApiError> {
        let result = api.fetch_tasks(project_id).await;
        self.apply_initial(result)
    }

    /// Repeats the initial fetch after a failure.
    ///
    /// # Errors
    ///
    /// Same as [`load_initial_tasks`](Self::load_initial_tasks).
    pub async fn retry<A: TaskingApi>(
        &mut self,
        api: &A,
        project_id: ProjectId,
    ) -> Result<(), ApiError> {
        tracing::info!(%project_id, "retrying initial task load");
        self.load_initial_tasks(api, project_id).await
    }

    /// Stores the result of an initial task fetch made elsewhere.
    ///
    /// # Errors
    ///
    /// Passes the fetch error through after raising the load error flag.
    pub fn apply_initial(&mut self, result: Result<TaskCollection, ApiError>) -> Result<(), ApiError> {
        match result {
            Ok(tasks) => {
                tracing::info!(tasks = tasks.len(), "initial tasks loaded");
                self.initial = Some(tasks);
                self.load_error = false;
                self.remerge();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "initial task load failed");
                self.load_error = true;
                Err(e)
            }
        }
    }

    /// Replaces the activity snapshot and recomputes the merged view.
    pub fn apply_activity(&mut self, snapshot: ActivitySnapshot) {
        self.activity = Some(snapshot);
        self.remerge();
    }

    fn remerge(&mut self) {
        self.merged = self
            .initial
            .as_ref()
            .map(|tasks| merge_statuses(tasks, self.activity.as_ref()));
    }

    /// Whether the last initial load failed and a retry should be offered.
    #[must_use]
    pub const fn load_error(&self) -> bool {
        self.load_error
    }

    /// The tasks as first fetched.
    #[must_use]
    pub const fn initial(&self) -> Option<&TaskCollection> {
        self.initial.as_ref()
    }

    /// The latest accepted activity snapshot.
    #[must_use]
    pub const fn activity(&self) -> Option<&ActivitySnapshot> {
        self.activity.as_ref()
    }

    /// The merged view: initial tasks with current statuses.
    #[must_use]
    pub const fn tasks(&self) -> Option<&TaskCollection> {
        self.merged.as_ref()
    }

    /// Whether `id` is a task of the loaded project.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.initial.as_ref().is_some_and(|tasks| tasks.contains(id))
    }

    /// Current status of `id` in the merged view.
    #[must_use]
    pub fn status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.tasks()?.get(id).map(|f| f.status())
    }

    /// Status counts over the merged view.
    #[must_use]
    pub fn stats(&self) -> TaskStats {
        self.tasks().map(TaskStats::from_collection).unwrap_or_default()
    }
}
