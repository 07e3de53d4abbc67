//! Random task suggestion and the footer it feeds.

use rand::Rng;
use rand::seq::IndexedRandom;

use tasking_proto::task::{TaskCollection, TaskId};

use crate::selection::TaskAction;

/// Tasks the action could be applied to right now.
///
/// Map actions take READY/INVALIDATED tasks, validate actions take
/// MAPPED/BADIMAGERY tasks. Resume actions never get a suggestion.
#[must_use]
pub fn candidates(tasks: &TaskCollection, action: TaskAction) -> Vec<TaskId> {
    let mapping = match action {
        TaskAction::MapATask | TaskAction::MapAnotherTask => true,
        TaskAction::ValidateATask | TaskAction::ValidateAnotherTask => false,
        TaskAction::ResumeMapping | TaskAction::ResumeValidation => return Vec::new(),
    };
    tasks
        .features
        .iter()
        .filter(|f| {
            if mapping {
                f.status().is_mappable()
            } else {
                f.status().is_validatable()
            }
        })
        .map(|f| f.id())
        .collect()
}

/// Picks a random task for `action`, if any task qualifies.
pub fn suggest_task<R: Rng + ?Sized>(
    tasks: &TaskCollection,
    action: TaskAction,
    rng: &mut R,
) -> Option<TaskId> {
    candidates(tasks, action).choose(rng).copied()
}

/// The footer button state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    /// Action offered, if any.
    pub action: Option<TaskAction>,
    /// Tasks the action will lock or reopen.
    pub targets: Vec<TaskId>,
    /// Whether pressing the button does anything.
    pub enabled: bool,
}

impl Footer {
    /// Targets the selection when there is one, otherwise the suggestion.
    #[must_use]
    pub fn new(selection: &[TaskId], action: Option<TaskAction>, suggestion: Option<TaskId>) -> Self {
        let targets: Vec<TaskId> = if selection.is_empty() {
            suggestion.into_iter().collect()
        } else {
            selection.to_vec()
        };
        let enabled = action.is_some() && !targets.is_empty();
        Self {
            action,
            targets,
            enabled,
        }
    }

    /// Button text.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.action.map_or("No action available", TaskAction::label)
    }
}
