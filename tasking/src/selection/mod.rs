//! Task selection state.
//!
//! The [`SelectionState`] holds which tasks are selected and the action the
//! footer offers for them. Every mutation keeps the selection a subset of
//! the tasks the caller reports as known, so ids from a stale poll or a
//! mistyped search cannot leak in.

pub mod action;
pub mod reconcile;

use std::fmt;

use serde::{Deserialize, Serialize};

use tasking_proto::task::{LockKind, TaskId, TaskStatus};

use self::action::{Capabilities, resolve_action};
use self::reconcile::LockSet;

/// What the footer button does for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskAction {
    /// Lock a task for mapping (first pick of the session).
    MapATask,
    /// Lock a task for mapping (later picks).
    MapAnotherTask,
    /// Lock a task for validation (first pick of the session).
    ValidateATask,
    /// Lock a task for validation (later picks).
    ValidateAnotherTask,
    /// Reopen tasks the user already holds for mapping.
    ResumeMapping,
    /// Reopen tasks the user already holds for validation.
    ResumeValidation,
}

impl TaskAction {
    /// The resume action for a lock of `kind`.
    #[must_use]
    pub const fn resume(kind: LockKind) -> Self {
        match kind {
            LockKind::Mapping => Self::ResumeMapping,
            LockKind::Validation => Self::ResumeValidation,
        }
    }

    /// The kind of lock this action takes or reopens.
    #[must_use]
    pub const fn lock_kind(self) -> LockKind {
        match self {
            Self::MapATask | Self::MapAnotherTask | Self::ResumeMapping => LockKind::Mapping,
            Self::ValidateATask | Self::ValidateAnotherTask | Self::ResumeValidation => {
                LockKind::Validation
            }
        }
    }

    /// Whether this action reopens an existing lock instead of taking one.
    #[must_use]
    pub const fn is_resume(self) -> bool {
        matches!(self, Self::ResumeMapping | Self::ResumeValidation)
    }

    /// The action's identifier, as used by the web frontend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MapATask => "mapATask",
            Self::MapAnotherTask => "mapAnotherTask",
            Self::ValidateATask => "validateATask",
            Self::ValidateAnotherTask => "validateAnotherTask",
            Self::ResumeMapping => "resumeMapping",
            Self::ResumeValidation => "resumeValidation",
        }
    }

    /// Button label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MapATask => "Map a task",
            Self::MapAnotherTask => "Map another task",
            Self::ValidateATask => "Validate a task",
            Self::ValidateAnotherTask => "Validate another task",
            Self::ResumeMapping => "Resume mapping",
            Self::ResumeValidation => "Resume validation",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of selected task ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(Vec<TaskId>);

impl Selection {
    /// Nothing selected.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Selected ids in selection order.
    #[must_use]
    pub fn ids(&self) -> &[TaskId] {
        &self.0
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of selected tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.0.contains(&id)
    }

    /// Whether `id` is the only selected task.
    #[must_use]
    pub fn is_sole(&self, id: TaskId) -> bool {
        self.0 == [id]
    }

    fn replace(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        self.0.clear();
        for id in ids {
            if !self.0.contains(&id) {
                self.0.push(id);
            }
        }
    }
}

/// Result of a user selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The id is not a known task; nothing changed.
    Ignored,
    /// The sole selected task was picked again and got deselected.
    Cleared,
    /// The task is now the sole selection.
    Selected,
}

/// Selection plus the footer action derived from it.
#[derive(Debug, Clone)]
pub struct SelectionState {
    selection: Selection,
    action: Option<TaskAction>,
    capabilities: Capabilities,
    picks: u32,
}

impl SelectionState {
    /// Empty selection with the idle action for `capabilities`.
    #[must_use]
    pub const fn new(capabilities: Capabilities) -> Self {
        Self {
            selection: Selection::new(),
            action: capabilities.idle_action(),
            capabilities,
            picks: 0,
        }
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Current footer action, `None` when no action is possible.
    #[must_use]
    pub const fn action(&self) -> Option<TaskAction> {
        self.action
    }

    /// What the user may do on this project.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Replaces the capabilities, e.g. once the project has loaded.
    ///
    /// With nothing selected the action follows the new idle default.
    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
        if self.selection.is_empty() {
            self.action = capabilities.idle_action();
        }
    }

    /// Handles a click on task `id`.
    ///
    /// `status` is the task's current status, or `None` if the id is not in
    /// the cache. Picking the sole selected task again clears the
    /// selection; anything else replaces it.
    pub fn select_task(
        &mut self,
        id: TaskId,
        status: Option<TaskStatus>,
        locks: &LockSet,
    ) -> SelectOutcome {
        let Some(status) = status else {
            tracing::debug!(%id, "ignoring selection of unknown task");
            return SelectOutcome::Ignored;
        };

        if self.selection.is_sole(id) {
            self.clear();
            return SelectOutcome::Cleared;
        }

        self.selection.replace([id]);
        self.action = match locks.get(id) {
            Some(kind) => Some(TaskAction::resume(kind)),
            None => resolve_action(status, self.picks == 0, self.capabilities),
        };
        self.picks = self.picks.saturating_add(1);
        tracing::debug!(%id, %status, action = ?self.action, "task selected");
        SelectOutcome::Selected
    }

    /// Replaces the selection with `ids`, without toggling.
    ///
    /// Ids for which `known` is false are dropped. The action is left
    /// untouched.
    pub fn select_tasks(&mut self, ids: &[TaskId], known: impl Fn(TaskId) -> bool) {
        self.selection
            .replace(ids.iter().copied().filter(|id| known(*id)));
    }

    /// Overrides the footer action.
    pub const fn set_action(&mut self, action: Option<TaskAction>) {
        self.action = action;
    }

    /// Clears the selection and restores the idle action.
    pub fn clear(&mut self) {
        self.selection = Selection::new();
        self.action = self.capabilities.idle_action();
    }

    /// Drops selected ids that are no longer known.
    ///
    /// Restores the idle action if that empties the selection.
    pub fn retain_known(&mut self, known: impl Fn(TaskId) -> bool) {
        let before = self.selection.len();
        self.selection.0.retain(|id| known(*id));
        if before > 0 && self.selection.is_empty() {
            self.action = self.capabilities.idle_action();
        }
    }
}
