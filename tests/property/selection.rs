//! Property-based tests for task selection.
//!
//! Uses proptest to verify, over arbitrary task sets and click sequences:
//! 1. Clicking an id outside the cache never changes the selection.
//! 2. Clicking the same task twice returns to the idle state.
//! 3. The selection stays a subset of the cached ids whatever happens.
//! 4. The map filter never matches everything.
//! 5. Reconciliation selects exactly the user's own locks, in feed order.
//! 6. Merging without activity returns the initial tasks unchanged.

use proptest::prelude::*;
use serde_json::json;

use tasking::cache::merge_statuses;
use tasking::controller::{ControllerConfig, TaskSelectionController};
use tasking::mapsync::selected_filter;
use tasking::selection::TaskAction;
use tasking::selection::reconcile::LockTieBreak;
use tasking::session::Session;
use tasking_proto::activity::{ActivityEntry, ActivitySnapshot};
use tasking_proto::grid::square_grid;
use tasking_proto::project::{Project, UserDetails};
use tasking_proto::task::{ProjectId, TaskCollection, TaskId, TaskStatus};

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

/// A row of 1..=16 tasks with arbitrary statuses, numbered from 1.
fn arb_tasks() -> impl Strategy<Value = TaskCollection> {
    prop::collection::vec(arb_status(), 1..=16).prop_map(|statuses| {
        let columns = u32::try_from(statuses.len()).unwrap_or(1);
        let mut tasks = square_grid([0.0, 0.0], 1.0, columns, 1);
        for (feature, status) in tasks.features.iter_mut().zip(statuses) {
            feature.properties.task_status = status;
        }
        tasks
    })
}

fn arb_tie_break() -> impl Strategy<Value = LockTieBreak> {
    prop::sample::select(vec![
        LockTieBreak::FirstListed,
        LockTieBreak::PreferMapping,
        LockTieBreak::MostRecent,
    ])
}

fn arb_entry() -> impl Strategy<Value = ActivityEntry> {
    (
        1u32..=20,
        arb_status(),
        prop::sample::select(vec!["alice", "bob"]),
        proptest::option::of(0u32..24),
    )
        .prop_map(|(id, status, by, hour)| ActivityEntry {
            task_id: TaskId::new(id),
            task_status: status,
            action_by: Some(by.to_string()),
            action_date: hour.map(|h| format!("2024-06-01T{h:02}:00:00")),
        })
}

/// Feed entries with distinct task ids.
fn arb_snapshot() -> impl Strategy<Value = ActivitySnapshot> {
    prop::collection::vec(arb_entry(), 0..12).prop_map(|entries| {
        let mut seen = Vec::new();
        let activity = entries
            .into_iter()
            .filter(|e| {
                let fresh = !seen.contains(&e.task_id);
                seen.push(e.task_id);
                fresh
            })
            .collect();
        ActivitySnapshot::new(activity)
    })
}

#[derive(Debug, Clone)]
enum Op {
    Click(u32),
    Bulk(Vec<u32>),
    Reload(usize),
    Poll(ActivitySnapshot),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..24).prop_map(Op::Click),
        prop::collection::vec(0u32..24, 0..5).prop_map(Op::Bulk),
        (1usize..=16).prop_map(Op::Reload),
        arb_snapshot().prop_map(Op::Poll),
    ]
}

// --- Helpers ---

fn controller(tasks: TaskCollection, tie_break: LockTieBreak) -> TaskSelectionController {
    let config = ControllerConfig {
        tie_break,
        ..ControllerConfig::default()
    };
    let mut c = TaskSelectionController::with_seed(
        Project::new(ProjectId::new(1), "props"),
        Session::new(UserDetails::mapper(1, "alice"), None),
        config,
        0,
    );
    c.on_tasks_loaded(Ok(tasks));
    c
}

fn loaded(tasks: TaskCollection) -> TaskSelectionController {
    let mut c = controller(tasks, LockTieBreak::default());
    c.on_activity(1, ActivitySnapshot::default());
    c
}

// --- Properties ---

proptest! {
    #[test]
    fn unknown_ids_leave_selection_unchanged(
        tasks in arb_tasks(),
        first in 1u32..=16,
        stale in 17u32..,
    ) {
        let mut c = loaded(tasks);
        c.select_task(TaskId::new(first));
        let selection = c.selection().clone();
        let action = c.action();

        c.select_task(TaskId::new(stale));
        c.select_task(TaskId::new(0));

        prop_assert_eq!(c.selection(), &selection);
        prop_assert_eq!(c.action(), action);
    }

    #[test]
    fn double_click_returns_to_idle(tasks in arb_tasks(), pick in 1u32..=16) {
        let len = u32::try_from(tasks.len()).unwrap_or(0);
        let mut c = loaded(tasks);
        let idle = c.action();
        let id = TaskId::new(pick.min(len));

        c.select_task(id);
        prop_assert_eq!(c.selection().ids(), &[id]);
        c.select_task(id);

        prop_assert!(c.selection().is_empty());
        prop_assert_eq!(c.action(), idle);
    }

    #[test]
    fn selection_stays_within_cache(
        tasks in arb_tasks(),
        tie_break in arb_tie_break(),
        ops in prop::collection::vec(arb_op(), 1..24),
    ) {
        let mut c = controller(tasks, tie_break);
        let mut seq = 0;
        for op in ops {
            match op {
                Op::Click(id) => {
                    c.select_task(TaskId::new(id));
                }
                Op::Bulk(ids) => {
                    let ids: Vec<TaskId> = ids.into_iter().map(TaskId::new).collect();
                    c.select_tasks(&ids);
                }
                Op::Reload(n) => {
                    let columns = u32::try_from(n).unwrap_or(1);
                    c.on_tasks_loaded(Ok(square_grid([0.0, 0.0], 1.0, columns, 1)));
                }
                Op::Poll(snapshot) => {
                    seq += 1;
                    c.on_activity(seq, snapshot);
                }
            }

            let tasks = c.tasks().expect("tasks were loaded");
            for id in c.selection().ids() {
                prop_assert!(tasks.contains(*id), "selected {} is not cached", id);
            }
            if let Some(suggestion) = c.suggestion() {
                prop_assert!(tasks.contains(suggestion));
            }
        }
    }

    #[test]
    fn filter_never_matches_everything(ids in prop::collection::vec(1u32..1000, 0..8)) {
        let ids: Vec<TaskId> = ids.into_iter().map(TaskId::new).collect();
        let filter = selected_filter(&ids);
        let items = filter.as_array().expect("filter is an array");

        prop_assert_eq!(&items[0], &json!("in"));
        prop_assert_eq!(&items[1], &json!("taskId"));
        if ids.is_empty() {
            prop_assert_eq!(&items[2..], &[json!("")][..]);
        } else {
            prop_assert_eq!(items.len(), ids.len() + 2);
        }
    }

    #[test]
    fn reconciliation_selects_own_locks(
        snapshot in arb_snapshot(),
        tie_break in arb_tie_break(),
    ) {
        let mut c = controller(square_grid([0.0, 0.0], 1.0, 4, 5), tie_break);
        let own: Vec<TaskId> = snapshot.locked_by("alice").map(|e| e.task_id).collect();
        let kinds: Vec<_> = snapshot.locked_by("alice").filter_map(ActivityEntry::lock_kind).collect();

        c.on_activity(1, snapshot);

        prop_assert!(c.reconciled());
        prop_assert_eq!(c.selection().ids(), own.as_slice());
        match c.action() {
            Some(TaskAction::ResumeMapping | TaskAction::ResumeValidation) => {
                let kind = c.action().map(TaskAction::lock_kind);
                prop_assert!(kinds.iter().any(|k| Some(*k) == kind));
            }
            other => {
                prop_assert!(own.is_empty());
                prop_assert_eq!(other, Some(TaskAction::MapATask));
            }
        }
    }

    #[test]
    fn merge_without_activity_is_identity(tasks in arb_tasks()) {
        prop_assert_eq!(merge_statuses(&tasks, None), tasks);
    }
}
