//! Integration tests for selecting tasks through the view controller.
//!
//! Covers toggling, stale ids, the first/subsequent pick actions, the footer
//! target and the map parameters derived from the selection.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;

use tasking::controller::{ControllerConfig, TaskSelectionController};
use tasking::list::{SortBy, StatusFilter};
use tasking::mapsync::{DisplayMode, SyncResult};
use tasking::selection::{SelectOutcome, TaskAction};
use tasking::session::Session;
use tasking_proto::activity::{ActivityEntry, ActivitySnapshot};
use tasking_proto::grid::square_grid;
use tasking_proto::project::{Permission, Project, UserDetails, UserRole};
use tasking_proto::task::{ProjectId, TaskCollection, TaskId, TaskStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A single row of tasks with the given statuses, numbered from 1.
fn tasks_with(statuses: &[TaskStatus]) -> TaskCollection {
    let columns = u32::try_from(statuses.len()).unwrap();
    let mut tasks = square_grid([30.0, -2.0], 0.01, columns, 1);
    for (feature, status) in tasks.features.iter_mut().zip(statuses) {
        feature.properties.task_status = *status;
    }
    tasks
}

fn validator(name: &str) -> UserDetails {
    let mut user = UserDetails::mapper(7, name);
    user.role = UserRole::Validator;
    user
}

fn controller_for(user: UserDetails, project: Project, tasks: TaskCollection) -> TaskSelectionController {
    let mut controller = TaskSelectionController::with_seed(
        project,
        Session::new(user, None),
        ControllerConfig::default(),
        11,
    );
    controller.on_tasks_loaded(Ok(tasks));
    assert!(controller.on_activity(1, ActivitySnapshot::default()));
    controller
}

fn controller(statuses: &[TaskStatus]) -> TaskSelectionController {
    controller_for(
        validator("alice"),
        Project::new(ProjectId::new(1), "selection"),
        tasks_with(statuses),
    )
}

fn id(n: u32) -> TaskId {
    TaskId::new(n)
}

// ---------------------------------------------------------------------------
// Selection and action
// ---------------------------------------------------------------------------

#[test]
fn validate_then_validate_another() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Mapped, TaskStatus::BadImagery]);

    assert_eq!(c.select_task(id(2)), SelectOutcome::Selected);
    assert_eq!(c.selection().ids(), &[id(2)]);
    assert_eq!(c.action(), Some(TaskAction::ValidateATask));

    assert_eq!(c.select_task(id(3)), SelectOutcome::Selected);
    assert_eq!(c.selection().ids(), &[id(3)]);
    assert_eq!(c.action(), Some(TaskAction::ValidateAnotherTask));
}

#[test]
fn map_then_map_another() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Invalidated]);
    c.select_task(id(1));
    assert_eq!(c.action(), Some(TaskAction::MapATask));
    c.select_task(id(2));
    assert_eq!(c.action(), Some(TaskAction::MapAnotherTask));
}

#[test]
fn unknown_task_leaves_selection_unchanged() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Mapped]);
    c.select_task(id(2));

    for stale in [0, 3, 99, u32::MAX] {
        assert_eq!(c.select_task(id(stale)), SelectOutcome::Ignored);
        assert_eq!(c.selection().ids(), &[id(2)]);
        assert_eq!(c.action(), Some(TaskAction::ValidateATask));
    }
}

#[test]
fn toggling_twice_returns_to_default() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Mapped]);
    let idle = c.action();
    assert_eq!(idle, Some(TaskAction::MapATask));

    assert_eq!(c.select_task(id(2)), SelectOutcome::Selected);
    assert_eq!(c.select_task(id(2)), SelectOutcome::Cleared);
    assert!(c.selection().is_empty());
    assert_eq!(c.action(), idle);
}

#[test]
fn default_action_after_several_picks_is_first_pick_variant() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Ready]);
    c.select_task(id(1));
    c.select_task(id(2));
    c.select_task(id(2));
    assert_eq!(c.action(), Some(TaskAction::MapATask));
}

#[test]
fn finished_task_has_no_action() {
    let mut c = controller(&[TaskStatus::Validated, TaskStatus::Ready]);
    c.select_task(id(1));
    assert_eq!(c.selection().ids(), &[id(1)]);
    assert_eq!(c.action(), None);
    let footer = c.footer();
    assert!(!footer.enabled);
    assert_eq!(footer.label(), "No action available");
    assert!(c.lock_request().is_none());
}

#[test]
fn mapper_without_validation_rights_gets_no_validate_action() {
    let mut project = Project::new(ProjectId::new(1), "level gated");
    project.validation_permission = Permission::Level;
    let mut c = controller_for(
        UserDetails::mapper(3, "carol"),
        project,
        tasks_with(&[TaskStatus::Mapped, TaskStatus::Ready]),
    );

    c.select_task(id(1));
    assert_eq!(c.action(), None);
    c.select_task(id(2));
    assert_eq!(c.action(), Some(TaskAction::MapAnotherTask));
}

#[test]
fn selecting_own_locked_task_offers_resume() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Ready, TaskStatus::Ready]);
    let snapshot = ActivitySnapshot::new(vec![ActivityEntry {
        task_id: id(3),
        task_status: TaskStatus::LockedForValidation,
        action_by: Some("alice".to_string()),
        action_date: Some("2024-05-01T10:00:00".to_string()),
    }]);
    assert!(c.on_activity(2, snapshot));

    // Already reconciled on the first snapshot, so nothing is auto-selected.
    assert!(c.selection().is_empty());

    c.select_task(id(3));
    assert_eq!(c.action(), Some(TaskAction::ResumeValidation));
    assert!(c.lock_request().is_none());
    assert_eq!(c.release_request(), Some(vec![id(3)]));
}

#[test]
fn selection_drops_tasks_missing_from_reload() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Ready, TaskStatus::Ready]);
    c.select_tasks(&[id(1), id(3), id(42)]);
    assert_eq!(c.selection().ids(), &[id(1), id(3)]);

    c.on_tasks_loaded(Ok(tasks_with(&[TaskStatus::Ready, TaskStatus::Ready])));
    assert_eq!(c.selection().ids(), &[id(1)]);
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

#[test]
fn footer_targets_selection_or_suggestion() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Mapped, TaskStatus::Ready]);

    let idle = c.footer();
    assert_eq!(idle.action, Some(TaskAction::MapATask));
    assert!(idle.enabled);
    let suggested = c.suggestion().unwrap();
    assert!([id(1), id(3)].contains(&suggested));
    assert_eq!(idle.targets, vec![suggested]);

    c.select_task(id(2));
    let footer = c.footer();
    assert_eq!(footer.targets, vec![id(2)]);
    assert_eq!(c.lock_request(), Some((vec![id(2)], tasking_proto::task::LockKind::Validation)));
}

#[test]
fn no_suggestion_when_nothing_is_available() {
    let c = controller(&[TaskStatus::Validated, TaskStatus::Mapped]);
    // Idle action is mapping and no task can be mapped.
    assert_eq!(c.action(), Some(TaskAction::MapATask));
    assert_eq!(c.suggestion(), None);
    assert!(!c.footer().enabled);
}

// ---------------------------------------------------------------------------
// Map parameters
// ---------------------------------------------------------------------------

#[test]
fn empty_selection_filter_matches_nothing() {
    let c = controller(&[TaskStatus::Ready, TaskStatus::Mapped]);
    let params = c.map_params().unwrap();
    assert_eq!(params.selected_filter, json!(["in", "taskId", ""]));
}

#[test]
fn selection_filter_lists_selected_ids() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Mapped, TaskStatus::Ready]);
    c.select_tasks(&[id(3), id(1)]);
    let params = c.map_params().unwrap();
    assert_eq!(params.selected_filter, json!(["in", "taskId", 3, 1]));
}

#[test]
fn borders_only_mode_swaps_layers() {
    let mut c = controller(&[TaskStatus::Ready]);
    let tasks = c.map_params().unwrap();
    assert!(tasks.is_visible("tasks-fill"));
    assert!(!tasks.is_visible("outerhull-tasks-border"));

    c.set_display_mode(DisplayMode::BordersOnly);
    let borders = c.map_params().unwrap();
    assert!(!borders.is_visible("tasks-fill"));
    assert!(!borders.is_visible("selected-tasks-border"));
    assert!(borders.is_visible("outerhull-tasks-border"));
}

#[test]
fn map_sync_only_replaces_on_change() {
    let mut c = controller(&[TaskStatus::Ready, TaskStatus::Ready]);
    assert!(matches!(c.sync_map(), Some(SyncResult::Replaced(_))));
    assert_eq!(c.sync_map(), Some(SyncResult::Unchanged));

    c.select_task(id(1));
    match c.sync_map() {
        Some(SyncResult::Replaced(params)) => {
            assert_eq!(params.selected_filter, json!(["in", "taskId", 1]));
        }
        other => panic!("expected replacement, got {other:?}"),
    }
    assert_eq!(c.sync_map(), Some(SyncResult::Unchanged));

    c.toggle_display_mode();
    assert!(matches!(c.sync_map(), Some(SyncResult::Replaced(_))));
}

#[test]
fn map_params_wait_for_tasks() {
    let mut c = TaskSelectionController::with_seed(
        Project::new(ProjectId::new(1), "empty"),
        Session::new(validator("alice"), None),
        ControllerConfig::default(),
        1,
    );
    assert!(c.map_params().is_none());
    assert!(c.sync_map().is_none());
    assert_eq!(c.select_task(id(1)), SelectOutcome::Ignored);
}

// ---------------------------------------------------------------------------
// Task list
// ---------------------------------------------------------------------------

fn page_ids(c: &TaskSelectionController) -> Vec<u32> {
    c.list_page().rows.iter().map(|row| row.id.get()).collect()
}

#[test]
fn list_filters_searches_sorts_and_pages() {
    let mut c = controller(&[
        TaskStatus::Ready,
        TaskStatus::Mapped,
        TaskStatus::Ready,
        TaskStatus::BadImagery,
        TaskStatus::Validated,
        TaskStatus::Invalidated,
        TaskStatus::Ready,
        TaskStatus::Mapped,
    ]);

    let first = c.list_page();
    assert_eq!((first.page, first.pages, first.matching), (1, 2, 8));
    assert_eq!(page_ids(&c), vec![1, 2, 3, 4, 5, 6]);

    c.set_page(2);
    assert_eq!(page_ids(&c), vec![7, 8]);
    c.set_page(9);
    assert_eq!(c.list_page().page, 1);

    c.set_filter(StatusFilter::ReadyToValidate);
    assert_eq!(page_ids(&c), vec![2, 4, 8]);
    c.set_filter(StatusFilter::ReadyToMap);
    assert_eq!(page_ids(&c), vec![1, 3, 6, 7]);

    c.set_filter(StatusFilter::All);
    c.set_search("6");
    assert_eq!(page_ids(&c), vec![6]);
    c.set_search("");

    let snapshot = ActivitySnapshot::new(vec![
        ActivityEntry {
            task_id: id(3),
            task_status: TaskStatus::Ready,
            action_by: Some("bob".to_string()),
            action_date: Some("2024-01-02T10:00:00".to_string()),
        },
        ActivityEntry {
            task_id: id(7),
            task_status: TaskStatus::Ready,
            action_by: Some("bobby".to_string()),
            action_date: Some("2024-01-05T10:00:00".to_string()),
        },
    ]);
    assert!(c.on_activity(2, snapshot));

    c.set_sort(SortBy::LastUpdate);
    assert_eq!(page_ids(&c)[..3], [7, 3, 1]);

    c.set_search("bob");
    assert_eq!(page_ids(&c), vec![7, 3]);
    c.set_sort(SortBy::Id);
    assert_eq!(page_ids(&c), vec![3, 7]);
}
