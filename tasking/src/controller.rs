//! The task selection view controller.
//!
//! [`TaskSelectionController`] is the single owner of the selection, the
//! footer action, the user's lock set, the task cache and the map sync
//! state. The list panel and the map panel both read from it; every input
//! (load results, activity snapshots, clicks, list settings, lock results)
//! goes through one of its `on_*` or setter methods.

use rand::SeedableRng;
use rand::rngs::StdRng;

use tasking_proto::activity::ActivitySnapshot;
use tasking_proto::project::Project;
use tasking_proto::task::{LockKind, TaskCollection, TaskId};

use crate::api::ApiError;
use crate::cache::{TaskCache, TaskStats};
use crate::list::{DEFAULT_PAGE_SIZE, ListPage, ListQuery, SortBy, StatusFilter};
use crate::mapsync::{DisplayMode, MapParams, MapSync, SyncResult};
use crate::selection::action::Capabilities;
use crate::selection::reconcile::{LockSet, LockTieBreak, reconcile};
use crate::selection::{SelectOutcome, Selection, SelectionState, TaskAction};
use crate::session::Session;
use crate::suggest::{Footer, candidates, suggest_task};

/// Controller settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Which lock picks the resume action when both kinds are held.
    pub tie_break: LockTieBreak,
    /// Rows per task list page.
    pub page_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tie_break: LockTieBreak::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Owns all task selection state for one project view.
pub struct TaskSelectionController {
    project: Project,
    session: Session,
    config: ControllerConfig,
    cache: TaskCache,
    selection: SelectionState,
    locks: LockSet,
    reconciled: bool,
    last_seq: u64,
    display_mode: DisplayMode,
    map_sync: MapSync,
    list: ListQuery,
    suggestion: Option<TaskId>,
    rng: StdRng,
    last_poll_error: Option<String>,
}

impl TaskSelectionController {
    /// A controller for `project`, viewed by the user in `session`.
    #[must_use]
    pub fn new(project: Project, session: Session, config: ControllerConfig) -> Self {
        Self::with_rng(project, session, config, StdRng::from_os_rng())
    }

    /// Like [`new`](Self::new), with a seeded suggestion generator.
    #[must_use]
    pub fn with_seed(project: Project, session: Session, config: ControllerConfig, seed: u64) -> Self {
        Self::with_rng(project, session, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(project: Project, session: Session, config: ControllerConfig, rng: StdRng) -> Self {
        let capabilities = Capabilities::for_user(&project, &session.user);
        Self {
            project,
            session,
            config,
            cache: TaskCache::new(),
            selection: SelectionState::new(capabilities),
            locks: LockSet::default(),
            reconciled: false,
            last_seq: 0,
            display_mode: DisplayMode::default(),
            map_sync: MapSync::new(),
            list: ListQuery::with_page_size(config.page_size),
            suggestion: None,
            rng,
            last_poll_error: None,
        }
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// Updated project details (permissions may have changed).
    pub fn on_project_loaded(&mut self, project: Project) {
        let capabilities = Capabilities::for_user(&project, &self.session.user);
        tracing::debug!(
            project_id = %project.project_id,
            can_map = capabilities.can_map,
            can_validate = capabilities.can_validate,
            "project loaded"
        );
        self.project = project;
        self.selection.set_capabilities(capabilities);
        self.refresh_suggestion();
    }

    /// Result of the initial (or retried) task fetch.
    pub fn on_tasks_loaded(&mut self, result: Result<TaskCollection, ApiError>) {
        if self.cache.apply_initial(result).is_ok() {
            self.try_reconcile();
            self.drop_unknown_selection();
            self.refresh_suggestion();
        }
    }

    /// An activity snapshot tagged with the sequence number of its request.
    ///
    /// Returns `false` when the snapshot is older than one already applied
    /// and was discarded.
    pub fn on_activity(&mut self, seq: u64, snapshot: ActivitySnapshot) -> bool {
        if seq < self.last_seq {
            tracing::debug!(seq, last = self.last_seq, "discarding stale activity snapshot");
            return false;
        }
        self.last_seq = seq;
        self.last_poll_error = None;
        self.locks = LockSet::from_snapshot(&snapshot, self.session.username());
        self.cache.apply_activity(snapshot);
        self.try_reconcile();
        self.drop_unknown_selection();
        self.refresh_suggestion();
        true
    }

    /// A poll failed. The previous snapshot stays in place.
    pub fn on_poll_failed(&mut self, seq: u64, error: &ApiError) {
        tracing::warn!(seq, %error, "activity poll failed");
        self.last_poll_error = Some(error.to_string());
    }

    /// The backend accepted a lock (`Some`) or a release (`None`).
    pub fn on_lock_changed(&mut self, task_ids: &[TaskId], kind: Option<LockKind>) {
        match kind {
            Some(kind) => {
                self.locks.insert(task_ids, kind);
                let cache = &self.cache;
                self.selection.select_tasks(task_ids, |id| cache.contains(id));
                self.selection.set_action(Some(TaskAction::resume(kind)));
            }
            None => {
                self.locks.release(task_ids);
                self.selection.clear();
            }
        }
        self.refresh_suggestion();
    }

    /// A click on task `id` in the list or on the map.
    pub fn select_task(&mut self, id: TaskId) -> SelectOutcome {
        let status = self.cache.status_of(id);
        let outcome = self.selection.select_task(id, status, &self.locks);
        if outcome != SelectOutcome::Ignored {
            self.refresh_suggestion();
        }
        outcome
    }

    /// Selects several tasks at once, dropping unknown ids.
    pub fn select_tasks(&mut self, ids: &[TaskId]) {
        let cache = &self.cache;
        self.selection.select_tasks(ids, |id| cache.contains(id));
        self.refresh_suggestion();
    }

    /// Switches between the task view and the borders-only view.
    pub const fn toggle_display_mode(&mut self) {
        self.display_mode = self.display_mode.toggled();
    }

    /// Sets the map display mode.
    pub const fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    /// Sets the list status filter and goes back to page 1.
    ///
    /// `ReadyToValidate` falls back to `All` for users who cannot validate.
    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.list.filter = if filter == StatusFilter::ReadyToValidate
            && !self.selection.capabilities().can_validate
        {
            StatusFilter::All
        } else {
            filter
        };
        self.list.page = 1;
    }

    /// Moves to the next status filter offered to this user.
    pub fn cycle_filter(&mut self) {
        let next = self.list.filter.next(self.selection.capabilities().can_validate);
        self.set_filter(next);
    }

    /// Sets the list search text and goes back to page 1.
    pub fn set_search(&mut self, search: &str) {
        search.clone_into(&mut self.list.search);
        self.list.page = 1;
    }

    /// Sets the list ordering.
    pub const fn set_sort(&mut self, sort: SortBy) {
        self.list.sort = sort;
    }

    /// Flips the list ordering.
    pub const fn toggle_sort(&mut self) {
        self.list.sort = self.list.sort.toggled();
    }

    /// Requests a 1-based list page. Out-of-range pages show page 1.
    pub const fn set_page(&mut self, page: usize) {
        self.list.page = page;
    }

    /// Next list page, wrapping to the first.
    pub fn next_page(&mut self) {
        let current = self.list_page();
        self.list.page = if current.page >= current.pages {
            1
        } else {
            current.page + 1
        };
    }

    /// Previous list page, wrapping to the last.
    pub fn prev_page(&mut self) {
        let current = self.list_page();
        self.list.page = if current.page <= 1 {
            current.pages
        } else {
            current.page - 1
        };
    }

    // -----------------------------------------------------------------------
    // Outputs
    // -----------------------------------------------------------------------

    /// The merged task collection, once loaded.
    #[must_use]
    pub const fn tasks(&self) -> Option<&TaskCollection> {
        self.cache.tasks()
    }

    /// The current selection.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        self.selection.selection()
    }

    /// The current footer action.
    #[must_use]
    pub const fn action(&self) -> Option<TaskAction> {
        self.selection.action()
    }

    /// Locks the user holds.
    #[must_use]
    pub const fn locks(&self) -> &LockSet {
        &self.locks
    }

    /// Whether the user's existing locks have been reconciled.
    #[must_use]
    pub const fn reconciled(&self) -> bool {
        self.reconciled
    }

    /// Whether the initial load failed and a retry should be offered.
    #[must_use]
    pub const fn load_error(&self) -> bool {
        self.cache.load_error()
    }

    /// Message from the most recent failed poll, cleared by the next
    /// accepted snapshot.
    #[must_use]
    pub fn last_poll_error(&self) -> Option<&str> {
        self.last_poll_error.as_deref()
    }

    /// Sequence number of the last applied snapshot (0 before the first).
    #[must_use]
    pub const fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// The project.
    #[must_use]
    pub const fn project(&self) -> &Project {
        &self.project
    }

    /// The session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// What the user may do on this project.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.selection.capabilities()
    }

    /// Current map display mode.
    #[must_use]
    pub const fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Current list settings.
    #[must_use]
    pub const fn list_query(&self) -> &ListQuery {
        &self.list
    }

    /// The visible page of the task list.
    #[must_use]
    pub fn list_page(&self) -> ListPage {
        let empty = TaskCollection::default();
        self.list.page(self.tasks().unwrap_or(&empty))
    }

    /// Status counts over the merged tasks.
    #[must_use]
    pub fn stats(&self) -> TaskStats {
        self.cache.stats()
    }

    /// The random task offered while nothing is selected.
    #[must_use]
    pub const fn suggestion(&self) -> Option<TaskId> {
        self.suggestion
    }

    /// The footer button.
    #[must_use]
    pub fn footer(&self) -> Footer {
        Footer::new(self.selection().ids(), self.action(), self.suggestion)
    }

    /// Map parameters for the current state, once tasks are loaded.
    #[must_use]
    pub fn map_params(&self) -> Option<MapParams> {
        self.tasks().map(|tasks| {
            MapParams::build(
                tasks,
                self.selection().ids(),
                self.display_mode,
                Some(self.session.user_id()),
            )
        })
    }

    /// Pushes the current state through the map sync adapter.
    ///
    /// `None` until tasks are loaded.
    pub fn sync_map(&mut self) -> Option<SyncResult> {
        let tasks = self.cache.tasks()?;
        Some(self.map_sync.sync(
            tasks,
            self.selection.selection().ids(),
            self.display_mode,
            Some(self.session.user_id()),
        ))
    }

    /// The lock the footer button would take, if it takes one.
    ///
    /// Resume actions reopen existing locks and need no request.
    #[must_use]
    pub fn lock_request(&self) -> Option<(Vec<TaskId>, LockKind)> {
        let footer = self.footer();
        let action = footer.action.filter(|a| footer.enabled && !a.is_resume())?;
        Some((footer.targets, action.lock_kind()))
    }

    /// The locks a release would drop: selected locked tasks, or every
    /// held lock when none of them is selected.
    #[must_use]
    pub fn release_request(&self) -> Option<Vec<TaskId>> {
        let selected: Vec<TaskId> = self
            .selection()
            .ids()
            .iter()
            .copied()
            .filter(|id| self.locks.get(*id).is_some())
            .collect();
        let ids = if selected.is_empty() {
            self.locks.ids().collect()
        } else {
            selected
        };
        (!ids.is_empty()).then_some(ids)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn try_reconcile(&mut self) {
        if self.reconciled || self.cache.initial().is_none() {
            return;
        }
        let Some(snapshot) = self.cache.activity() else {
            return;
        };

        let cache = &self.cache;
        let result = reconcile(
            snapshot,
            self.session.username(),
            self.config.tie_break,
            |id| cache.contains(id),
        );
        self.reconciled = true;
        if result.selection.is_empty() {
            tracing::debug!("no existing locks to resume");
            return;
        }

        tracing::info!(
            tasks = ?result.selection,
            action = ?result.action,
            "resuming existing locks"
        );
        self.selection
            .select_tasks(&result.selection, |id| cache.contains(id));
        self.selection.set_action(result.action);
        self.locks = result.locks;
    }

    fn drop_unknown_selection(&mut self) {
        let cache = &self.cache;
        self.selection.retain_known(|id| cache.contains(id));
    }

    fn refresh_suggestion(&mut self) {
        let (Some(tasks), Some(action)) = (self.cache.tasks(), self.selection.action()) else {
            self.suggestion = None;
            return;
        };
        let pool = candidates(tasks, action);
        if self.suggestion.is_some_and(|id| pool.contains(&id)) {
            return;
        }
        self.suggestion = suggest_task(tasks, action, &mut self.rng);
    }
}
