//! Lock reconciliation.
//!
//! When the client starts, the user may still hold locks from an earlier
//! session. The first activity snapshot tells us which: every task whose
//! status is `LOCKED_FOR_*` and whose `actionBy` is the current username.
//! Those tasks become the selection and the footer offers to resume them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tasking_proto::activity::{ActivityEntry, ActivitySnapshot};
use tasking_proto::task::{LockKind, TaskId};

use super::TaskAction;

/// Tasks the current user holds a lock on, and the kind of each lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSet(BTreeMap<TaskId, LockKind>);

impl LockSet {
    /// Builds a lock set from explicit entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (TaskId, LockKind)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// The locks `username` holds according to `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: &ActivitySnapshot, username: &str) -> Self {
        Self::from_entries(
            snapshot
                .locked_by(username)
                .filter_map(|e| e.lock_kind().map(|kind| (e.task_id, kind))),
        )
    }

    /// Lock kind held on `id`, if any.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<LockKind> {
        self.0.get(&id).copied()
    }

    /// Whether no locks are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of held locks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Locked task ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.0.keys().copied()
    }

    /// Records freshly taken locks.
    pub fn insert(&mut self, ids: &[TaskId], kind: LockKind) {
        self.0.extend(ids.iter().map(|id| (*id, kind)));
    }

    /// Forgets released locks.
    pub fn release(&mut self, ids: &[TaskId]) {
        for id in ids {
            self.0.remove(id);
        }
    }

    /// Locked task ids held under `kind`.
    pub fn ids_of(&self, kind: LockKind) -> impl Iterator<Item = TaskId> + '_ {
        self.0
            .iter()
            .filter(move |(_, k)| **k == kind)
            .map(|(id, _)| *id)
    }
}

/// Which lock decides the resume action when the user holds locks of both
/// kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockTieBreak {
    /// The first locked entry in feed order.
    FirstListed,
    /// Mapping if any mapping lock is held, validation otherwise.
    #[default]
    PreferMapping,
    /// The lock with the latest `actionDate`; undated entries lose.
    MostRecent,
}

impl LockTieBreak {
    /// Name as written in config files and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstListed => "first-listed",
            Self::PreferMapping => "prefer-mapping",
            Self::MostRecent => "most-recent",
        }
    }

    fn winner(self, locks: &[&ActivityEntry]) -> Option<LockKind> {
        match self {
            Self::FirstListed => locks.iter().find_map(|e| e.lock_kind()),
            Self::PreferMapping => {
                let kinds = || locks.iter().filter_map(|e| e.lock_kind());
                kinds()
                    .find(|k| *k == LockKind::Mapping)
                    .or_else(|| kinds().next())
            }
            // Reversed so that ties go to the entry listed first.
            Self::MostRecent => locks
                .iter()
                .rev()
                .max_by_key(|e| e.action_time())
                .and_then(|e| e.lock_kind()),
        }
    }
}

impl fmt::Display for LockTieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown tie-break name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lock tie-break {0:?} (expected first-listed, prefer-mapping or most-recent)")]
pub struct UnknownTieBreak(pub String);

impl FromStr for LockTieBreak {
    type Err = UnknownTieBreak;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::FirstListed, Self::PreferMapping, Self::MostRecent]
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTieBreak(s.to_string()))
    }
}

/// Outcome of reconciling the user's locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Tasks to select, in feed order. Empty when no locks are held.
    pub selection: Vec<TaskId>,
    /// Resume action, `None` when the default action should stay.
    pub action: Option<TaskAction>,
    /// Every lock the feed reports for the user, cached or not.
    pub locks: LockSet,
}

/// Finds the locks `username` holds in `snapshot`.
///
/// Only tasks for which `known` returns true are selected or take part in
/// the tie-break, so a lock on a task missing from the cache never decides
/// the resume action.
#[must_use]
pub fn reconcile(
    snapshot: &ActivitySnapshot,
    username: &str,
    tie_break: LockTieBreak,
    known: impl Fn(TaskId) -> bool,
) -> Reconciliation {
    let held: Vec<&ActivityEntry> = snapshot
        .locked_by(username)
        .filter(|e| known(e.task_id))
        .collect();
    let selection = held.iter().map(|e| e.task_id).collect();
    let action = tie_break.winner(&held).map(TaskAction::resume);
    Reconciliation {
        selection,
        action,
        locks: LockSet::from_snapshot(snapshot, username),
    }
}
