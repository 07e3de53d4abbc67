//! Integration tests for restoring the user's existing locks.
//!
//! Reconciliation seeds the selection and the resume action from the first
//! activity snapshot, exactly once, and the tie-break policy decides which
//! resume action wins when both lock kinds are held.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use tasking::api::TaskingApi;
use tasking::api::memory::InMemoryApi;
use tasking::controller::{ControllerConfig, TaskSelectionController};
use tasking::selection::TaskAction;
use tasking::selection::reconcile::LockTieBreak;
use tasking::session::Session;
use tasking::sync::{SyncCommand, SyncConfig, SyncEvent, spawn_sync};
use tasking_proto::activity::{ActivityEntry, ActivitySnapshot};
use tasking_proto::grid::square_grid;
use tasking_proto::lock::LockRequest;
use tasking_proto::project::{Project, UserDetails};
use tasking_proto::task::{LockKind, ProjectId, TaskId, TaskStatus};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PROJECT: ProjectId = ProjectId::new(1);

fn id(n: u32) -> TaskId {
    TaskId::new(n)
}

fn entry(task: u32, status: TaskStatus, by: &str, date: &str) -> ActivityEntry {
    ActivityEntry {
        task_id: id(task),
        task_status: status,
        action_by: Some(by.to_string()),
        action_date: Some(date.to_string()),
    }
}

fn controller(tie_break: LockTieBreak) -> TaskSelectionController {
    let config = ControllerConfig {
        tie_break,
        ..ControllerConfig::default()
    };
    let mut controller = TaskSelectionController::with_seed(
        Project::new(PROJECT, "locks"),
        Session::new(UserDetails::mapper(1, "alice"), None),
        config,
        5,
    );
    controller.on_tasks_loaded(Ok(square_grid([0.0, 0.0], 1.0, 3, 3)));
    controller
}

/// Alice holds a mapping lock on 2 (listed first, older) and a validation
/// lock on 6 (newer). Bob holds 8.
fn mapping_first() -> ActivitySnapshot {
    ActivitySnapshot::new(vec![
        entry(2, TaskStatus::LockedForMapping, "alice", "2024-03-01T08:00:00"),
        entry(8, TaskStatus::LockedForMapping, "bob", "2024-03-01T12:00:00"),
        entry(6, TaskStatus::LockedForValidation, "alice", "2024-03-01T09:30:00"),
    ])
}

/// Same locks with the validation lock listed first.
fn validation_first() -> ActivitySnapshot {
    ActivitySnapshot::new(vec![
        entry(6, TaskStatus::LockedForValidation, "alice", "2024-03-01T09:30:00"),
        entry(2, TaskStatus::LockedForMapping, "alice", "2024-03-01T08:00:00"),
    ])
}

/// Feeds coordinator events to the controller until the first accepted
/// activity snapshot.
async fn apply_until_activity(
    controller: &mut TaskSelectionController,
    events: &mut mpsc::Receiver<SyncEvent>,
) {
    loop {
        let event = events.recv().await.expect("coordinator stopped");
        match event {
            SyncEvent::ProjectLoaded(project) => controller.on_project_loaded(project),
            SyncEvent::TasksLoaded(result) => controller.on_tasks_loaded(result),
            SyncEvent::Activity { seq, snapshot } => {
                controller.on_activity(seq, snapshot);
                return;
            }
            SyncEvent::PollFailed { seq, error } => controller.on_poll_failed(seq, &error),
            SyncEvent::LockChanged { task_ids, kind } => controller.on_lock_changed(&task_ids, kind),
            SyncEvent::Error(message) => panic!("unexpected error: {message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation through the controller
// ---------------------------------------------------------------------------

#[test]
fn both_locks_selected_with_first_listed_resume() {
    let mut c = controller(LockTieBreak::FirstListed);
    c.on_activity(1, mapping_first());

    assert!(c.reconciled());
    assert_eq!(c.selection().ids(), &[id(2), id(6)]);
    assert_eq!(c.action(), Some(TaskAction::ResumeMapping));
    assert_eq!(c.locks().len(), 2);
    assert_eq!(c.locks().get(id(8)), None);
}

#[test]
fn first_listed_follows_feed_order() {
    let mut c = controller(LockTieBreak::FirstListed);
    c.on_activity(1, validation_first());
    assert_eq!(c.selection().ids(), &[id(6), id(2)]);
    assert_eq!(c.action(), Some(TaskAction::ResumeValidation));
}

#[test]
fn prefer_mapping_ignores_feed_order() {
    let mut c = controller(LockTieBreak::PreferMapping);
    c.on_activity(1, validation_first());
    assert_eq!(c.selection().ids(), &[id(6), id(2)]);
    assert_eq!(c.action(), Some(TaskAction::ResumeMapping));
}

#[test]
fn most_recent_lock_wins() {
    let mut c = controller(LockTieBreak::MostRecent);
    c.on_activity(1, mapping_first());
    assert_eq!(c.action(), Some(TaskAction::ResumeValidation));
}

#[test]
fn other_users_locks_are_not_resumed() {
    let mut c = controller(LockTieBreak::default());
    c.on_activity(
        1,
        ActivitySnapshot::new(vec![entry(
            4,
            TaskStatus::LockedForMapping,
            "bob",
            "2024-03-01T08:00:00",
        )]),
    );
    assert!(c.reconciled());
    assert!(c.selection().is_empty());
    assert_eq!(c.action(), Some(TaskAction::MapATask));
    assert!(c.locks().is_empty());
}

#[test]
fn reconciliation_runs_only_once() {
    let mut c = controller(LockTieBreak::PreferMapping);
    c.on_activity(1, mapping_first());
    assert_eq!(c.selection().len(), 2);

    // The user picks one of the locked tasks, then deselects it.
    c.select_task(id(2));
    assert_eq!(c.action(), Some(TaskAction::ResumeMapping));
    c.select_task(id(2));
    assert!(c.selection().is_empty());

    // Later polls still show the locks but do not reseed the selection.
    c.on_activity(2, mapping_first());
    c.on_activity(3, validation_first());
    assert!(c.selection().is_empty());
    assert_eq!(c.action(), Some(TaskAction::MapATask));
    assert_eq!(c.locks().len(), 2);
}

#[test]
fn reconciliation_waits_for_tasks() {
    let mut c = TaskSelectionController::with_seed(
        Project::new(PROJECT, "locks"),
        Session::new(UserDetails::mapper(1, "alice"), None),
        ControllerConfig::default(),
        5,
    );
    c.on_activity(1, mapping_first());
    assert!(!c.reconciled());
    assert!(c.selection().is_empty());

    c.on_tasks_loaded(Ok(square_grid([0.0, 0.0], 1.0, 3, 3)));
    assert!(c.reconciled());
    assert_eq!(c.selection().ids(), &[id(2), id(6)]);
}

#[test]
fn locks_on_tasks_outside_the_cache_are_not_selected() {
    let mut c = controller(LockTieBreak::FirstListed);
    c.on_activity(
        1,
        ActivitySnapshot::new(vec![
            entry(40, TaskStatus::LockedForValidation, "alice", "2024-03-01T08:00:00"),
            entry(3, TaskStatus::LockedForMapping, "alice", "2024-03-01T08:00:00"),
        ]),
    );
    assert_eq!(c.selection().ids(), &[id(3)]);
    assert_eq!(c.action(), Some(TaskAction::ResumeMapping));
}

#[test]
fn locks_only_on_uncached_tasks_keep_the_default_action() {
    let mut c = controller(LockTieBreak::FirstListed);
    c.on_activity(
        1,
        ActivitySnapshot::new(vec![
            entry(40, TaskStatus::LockedForValidation, "alice", "2024-03-01T08:00:00"),
            entry(41, TaskStatus::LockedForMapping, "alice", "2024-03-01T09:00:00"),
        ]),
    );
    assert!(c.reconciled());
    assert!(c.selection().is_empty());
    assert_eq!(c.action(), Some(TaskAction::MapATask));
}

#[test]
fn release_request_covers_all_resumed_locks() {
    let mut c = controller(LockTieBreak::PreferMapping);
    c.on_activity(1, mapping_first());
    assert_eq!(c.release_request(), Some(vec![id(2), id(6)]));

    c.on_lock_changed(&[id(2), id(6)], None);
    assert!(c.selection().is_empty());
    assert!(c.locks().is_empty());
    assert!(c.release_request().is_none());
}

// ---------------------------------------------------------------------------
// Reconciliation through the sync coordinator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn existing_lock_is_resumed_after_restart() {
    let api = Arc::new(InMemoryApi::demo(UserDetails::mapper(1, "alice")));
    api.lock_tasks(
        PROJECT,
        LockRequest {
            task_ids: vec![id(5)],
            lock_type: LockKind::Mapping,
        },
    )
    .await
    .unwrap();

    let mut c = TaskSelectionController::with_seed(
        Project::new(PROJECT, ""),
        Session::new(UserDetails::mapper(1, "alice"), None),
        ControllerConfig::default(),
        9,
    );
    let (cmd_tx, mut events) = spawn_sync(Arc::clone(&api), SyncConfig::new(PROJECT));
    apply_until_activity(&mut c, &mut events).await;

    assert_eq!(c.project().project_info.name, "Demo grid");
    assert_eq!(c.selection().ids(), &[id(5)]);
    assert_eq!(c.action(), Some(TaskAction::ResumeMapping));

    cmd_tx
        .send(SyncCommand::Unlock {
            task_ids: c.release_request().unwrap(),
        })
        .await
        .unwrap();
    apply_until_activity(&mut c, &mut events).await;

    assert!(c.selection().is_empty());
    assert!(c.locks().is_empty());
    assert_eq!(api.status_of(id(5)), Some(TaskStatus::Ready));

    cmd_tx.send(SyncCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn lock_from_footer_then_resume() {
    let api = Arc::new(InMemoryApi::demo(UserDetails::mapper(1, "alice")));
    let mut c = TaskSelectionController::with_seed(
        Project::new(PROJECT, ""),
        Session::new(UserDetails::mapper(1, "alice"), None),
        ControllerConfig::default(),
        9,
    );
    let (cmd_tx, mut events) = spawn_sync(Arc::clone(&api), SyncConfig::new(PROJECT));
    apply_until_activity(&mut c, &mut events).await;
    assert!(c.reconciled());
    assert!(c.selection().is_empty());

    c.select_task(id(4));
    let (task_ids, kind) = c.lock_request().unwrap();
    assert_eq!(task_ids, vec![id(4)]);
    assert_eq!(kind, LockKind::Mapping);

    cmd_tx.send(SyncCommand::Lock { task_ids, kind }).await.unwrap();
    apply_until_activity(&mut c, &mut events).await;

    assert_eq!(c.selection().ids(), &[id(4)]);
    assert_eq!(c.action(), Some(TaskAction::ResumeMapping));
    assert_eq!(c.locks().get(id(4)), Some(LockKind::Mapping));
    assert_eq!(api.status_of(id(4)), Some(TaskStatus::LockedForMapping));
    assert!(c.lock_request().is_none());

    cmd_tx.send(SyncCommand::Shutdown).await.unwrap();
}
