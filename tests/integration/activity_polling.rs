//! Integration tests for activity polling through the sync coordinator.
//!
//! Run on a paused tokio clock: `recv().await` auto-advances time to the
//! next poll, so the minute-long interval costs nothing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use tasking::api::memory::InMemoryApi;
use tasking::controller::{ControllerConfig, TaskSelectionController};
use tasking::poll::Sequencer;
use tasking::session::Session;
use tasking::sync::{SyncCommand, SyncConfig, SyncEvent, spawn_sync};
use tasking_proto::activity::{ActivityEntry, ActivitySnapshot};
use tasking_proto::project::{Project, UserDetails};
use tasking_proto::task::{ProjectId, TaskId, TaskStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PROJECT: ProjectId = ProjectId::new(1);
const INTERVAL: Duration = Duration::from_secs(60);

fn id(n: u32) -> TaskId {
    TaskId::new(n)
}

fn api() -> Arc<InMemoryApi> {
    Arc::new(InMemoryApi::demo(UserDetails::mapper(1, "alice")))
}

fn config() -> SyncConfig {
    SyncConfig {
        project_id: PROJECT,
        poll_interval: INTERVAL,
        channel_capacity: 16,
    }
}

fn controller() -> TaskSelectionController {
    TaskSelectionController::with_seed(
        Project::new(PROJECT, ""),
        Session::new(UserDetails::mapper(1, "alice"), None),
        ControllerConfig::default(),
        21,
    )
}

fn status(c: &TaskSelectionController, task: u32) -> TaskStatus {
    c.tasks().unwrap().get(id(task)).unwrap().status()
}

fn apply(c: &mut TaskSelectionController, event: SyncEvent) {
    match event {
        SyncEvent::ProjectLoaded(project) => c.on_project_loaded(project),
        SyncEvent::TasksLoaded(result) => c.on_tasks_loaded(result),
        SyncEvent::Activity { seq, snapshot } => {
            c.on_activity(seq, snapshot);
        }
        SyncEvent::PollFailed { seq, error } => c.on_poll_failed(seq, &error),
        SyncEvent::LockChanged { task_ids, kind } => c.on_lock_changed(&task_ids, kind),
        SyncEvent::Error(_) => {}
    }
}

/// Runs the initial load: project, tasks and the first snapshot.
async fn initial_load(c: &mut TaskSelectionController, events: &mut mpsc::Receiver<SyncEvent>) {
    for _ in 0..3 {
        let event = events.recv().await.unwrap();
        apply(c, event);
    }
    assert_eq!(c.last_seq(), 1);
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn poll_picks_up_remote_changes() {
    let api = api();
    let mut c = controller();
    let (cmd_tx, mut events) = spawn_sync(Arc::clone(&api), config());
    initial_load(&mut c, &mut events).await;
    assert_eq!(status(&c, 2), TaskStatus::Ready);

    let start = Instant::now();
    api.set_status(id(2), TaskStatus::Mapped, Some("bob"));
    let event = events.recv().await.unwrap();
    assert!(matches!(event, SyncEvent::Activity { seq: 2, .. }));
    assert!(start.elapsed() >= INTERVAL);
    apply(&mut c, event);

    assert_eq!(status(&c, 2), TaskStatus::Mapped);
    assert_eq!(c.stats().count(TaskStatus::Mapped), 1);

    cmd_tx.send(SyncCommand::Shutdown).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_poll_keeps_previous_statuses() {
    let api = api();
    let mut c = controller();
    let (cmd_tx, mut events) = spawn_sync(Arc::clone(&api), config());
    initial_load(&mut c, &mut events).await;
    c.select_task(id(3));

    api.set_status(id(3), TaskStatus::Mapped, Some("bob"));
    api.fail_next_activity_fetches(1);

    let failed = events.recv().await.unwrap();
    assert!(matches!(failed, SyncEvent::PollFailed { seq: 2, .. }));
    apply(&mut c, failed);

    assert_eq!(status(&c, 3), TaskStatus::Ready);
    assert_eq!(c.selection().ids(), &[id(3)]);
    assert_eq!(c.last_seq(), 1);
    assert!(c.last_poll_error().unwrap().contains("simulated network error"));

    // No faster retry: the next attempt waits a full interval.
    let start = Instant::now();
    let next = events.recv().await.unwrap();
    assert!(start.elapsed() >= INTERVAL);
    assert!(matches!(next, SyncEvent::Activity { seq: 3, .. }));
    apply(&mut c, next);

    assert_eq!(status(&c, 3), TaskStatus::Mapped);
    assert!(c.last_poll_error().is_none());

    cmd_tx.send(SyncCommand::Shutdown).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_polling() {
    let api = api();
    let mut c = controller();
    let (cmd_tx, mut events) = spawn_sync(Arc::clone(&api), config());
    initial_load(&mut c, &mut events).await;

    cmd_tx.send(SyncCommand::Shutdown).await.unwrap();
    while events.recv().await.is_some() {}

    let calls = api.activity_calls();
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(api.activity_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn load_failure_offers_retry() {
    let api = api();
    api.fail_next_task_fetches(1);
    let mut c = controller();
    let (cmd_tx, mut events) = spawn_sync(Arc::clone(&api), config());

    let project = events.recv().await.unwrap();
    assert!(matches!(project, SyncEvent::ProjectLoaded(_)));
    apply(&mut c, project);
    let tasks = events.recv().await.unwrap();
    assert!(matches!(tasks, SyncEvent::TasksLoaded(Err(_))));
    apply(&mut c, tasks);

    assert!(c.load_error());
    assert!(c.tasks().is_none());
    assert!(c.map_params().is_none());

    // Nothing polls until the tasks are in.
    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(api.activity_calls(), 0);

    cmd_tx.send(SyncCommand::Reload).await.unwrap();
    loop {
        let event = events.recv().await.unwrap();
        let done = matches!(event, SyncEvent::Activity { .. });
        apply(&mut c, event);
        if done {
            break;
        }
    }

    assert!(!c.load_error());
    assert_eq!(c.tasks().unwrap().len(), 12);
    assert_eq!(api.task_calls(), 2);

    cmd_tx.send(SyncCommand::Shutdown).await.unwrap();
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

fn snapshot_with(task: u32, status: TaskStatus) -> ActivitySnapshot {
    ActivitySnapshot::new(vec![ActivityEntry {
        task_id: id(task),
        task_status: status,
        action_by: Some("bob".to_string()),
        action_date: None,
    }])
}

#[test]
fn late_response_does_not_overwrite_newer_snapshot() {
    let mut c = controller();
    c.on_tasks_loaded(Ok(tasking_proto::grid::square_grid([0.0, 0.0], 1.0, 2, 2)));

    let sequencer = Sequencer::new();
    let slow = sequencer.next();
    let fast = sequencer.next();

    assert!(c.on_activity(fast, snapshot_with(1, TaskStatus::Validated)));
    assert!(!c.on_activity(slow, snapshot_with(1, TaskStatus::Mapped)));

    assert_eq!(status(&c, 1), TaskStatus::Validated);
    assert_eq!(c.last_seq(), fast);
}

#[test]
fn stale_failure_is_still_reported() {
    let mut c = controller();
    c.on_tasks_loaded(Ok(tasking_proto::grid::square_grid([0.0, 0.0], 1.0, 2, 2)));
    assert!(c.on_activity(4, snapshot_with(2, TaskStatus::Mapped)));

    c.on_poll_failed(3, &tasking::api::ApiError::Timeout);
    assert_eq!(status(&c, 2), TaskStatus::Mapped);
    assert_eq!(c.last_seq(), 4);
    assert!(c.last_poll_error().is_some());
}
