//! Sync coordinator wiring the TUI to the async API.
//!
//! Bridges the synchronous TUI event loop (crossterm poll-based) with the
//! async [`TaskingApi`]. A background tokio task owns the API handle and the
//! activity poller and talks to the main thread over [`SyncCommand`] /
//! [`SyncEvent`] channels.
//!
//! # Architecture
//!
//! ```text
//! TUI (main thread)  ←── SyncEvent ───  coordinator task ←── PollEvent ── poller
//!                     ─── SyncCommand →
//! ```
//!
//! On start the coordinator loads the project, the task geometry and one
//! activity snapshot, then starts polling. Every activity fetch, whether
//! from the poller or after a lock change, draws from one [`Sequencer`] so
//! the controller can order them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use tasking_proto::activity::ActivitySnapshot;
use tasking_proto::lock::LockRequest;
use tasking_proto::project::Project;
use tasking_proto::task::{LockKind, ProjectId, TaskCollection, TaskId};

use crate::api::{ApiError, TaskingApi};
use crate::poll::{ActivityPoller, DEFAULT_POLL_INTERVAL, PollEvent, PollHandle, Sequencer};

/// Commands sent from the TUI main loop to the coordinator.
#[derive(Debug)]
pub enum SyncCommand {
    /// Fetch the project and its tasks again (retry after a load error).
    Reload,
    /// Lock tasks for mapping or validation.
    Lock {
        /// Tasks to lock.
        task_ids: Vec<TaskId>,
        /// Lock kind.
        kind: LockKind,
    },
    /// Release the user's locks on tasks.
    Unlock {
        /// Tasks to release.
        task_ids: Vec<TaskId>,
    },
    /// Stop polling and exit.
    Shutdown,
}

/// Events sent from the coordinator to the TUI main loop.
#[derive(Debug)]
pub enum SyncEvent {
    /// Project details arrived.
    ProjectLoaded(Project),
    /// The initial task fetch finished.
    TasksLoaded(Result<TaskCollection, ApiError>),
    /// An activity snapshot arrived.
    Activity {
        /// Sequence number drawn before the request.
        seq: u64,
        /// The snapshot.
        snapshot: ActivitySnapshot,
    },
    /// An activity fetch failed.
    PollFailed {
        /// Sequence number drawn before the request.
        seq: u64,
        /// Why.
        error: ApiError,
    },
    /// The backend accepted a lock or unlock.
    LockChanged {
        /// Affected tasks.
        task_ids: Vec<TaskId>,
        /// Lock now held, `None` after a release.
        kind: Option<LockKind>,
    },
    /// A request failed in a way the user should hear about.
    Error(String),
}

impl From<PollEvent> for SyncEvent {
    fn from(event: PollEvent) -> Self {
        match event {
            PollEvent::Activity { seq, snapshot } => Self::Activity { seq, snapshot },
            PollEvent::Failed { seq, error } => Self::PollFailed { seq, error },
        }
    }
}

/// Configuration for the coordinator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Project to load.
    pub project_id: ProjectId,
    /// Time between activity polls.
    pub poll_interval: Duration,
    /// Capacity of the command and event channels.
    pub channel_capacity: usize,
}

/// Default channel capacity for commands and events.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

impl SyncConfig {
    /// Default cadence and channel sizes for `project_id`.
    #[must_use]
    pub const fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Spawn the coordinator and return its channel handles.
///
/// The initial load starts immediately. Must be called from within a tokio
/// runtime.
pub fn spawn_sync<A: TaskingApi + 'static>(
    api: Arc<A>,
    config: SyncConfig,
) -> (mpsc::Sender<SyncCommand>, mpsc::Receiver<SyncEvent>) {
    let capacity = config.channel_capacity.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let (evt_tx, evt_rx) = mpsc::channel(capacity);

    let coordinator = Coordinator {
        api,
        config,
        sequencer: Sequencer::new(),
        evt_tx,
        poller: None,
    };
    tokio::spawn(coordinator.run(cmd_rx));

    (cmd_tx, evt_rx)
}

struct Coordinator<A> {
    api: Arc<A>,
    config: SyncConfig,
    sequencer: Sequencer,
    evt_tx: mpsc::Sender<SyncEvent>,
    poller: Option<PollHandle>,
}

impl<A: TaskingApi + 'static> Coordinator<A> {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SyncCommand>) {
        self.load().await;

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                SyncCommand::Reload => self.load().await,
                SyncCommand::Lock { task_ids, kind } => self.lock(task_ids, kind).await,
                SyncCommand::Unlock { task_ids } => self.unlock(task_ids).await,
                SyncCommand::Shutdown => {
                    tracing::info!("sync coordinator shutting down");
                    break;
                }
            }
        }

        if let Some(poller) = self.poller.take() {
            poller.stop_and_join().await;
        }
    }

    async fn emit(&self, event: SyncEvent) {
        if self.evt_tx.send(event).await.is_err() {
            tracing::debug!("sync event receiver dropped");
        }
    }

    async fn load(&mut self) {
        let project_id = self.config.project_id;
        match self.api.fetch_project(project_id).await {
            Ok(project) => self.emit(SyncEvent::ProjectLoaded(project)).await,
            Err(e) => {
                tracing::warn!(%project_id, error = %e, "project fetch failed");
                self.emit(SyncEvent::Error(format!("Could not load project: {e}")))
                    .await;
            }
        }

        let tasks = self.api.fetch_tasks(project_id).await;
        let loaded = tasks.is_ok();
        self.emit(SyncEvent::TasksLoaded(tasks)).await;
        if !loaded {
            return;
        }

        self.refresh_activity().await;
        self.ensure_polling();
    }

    async fn refresh_activity(&self) {
        let seq = self.sequencer.next();
        let event = match self.api.fetch_latest_activity(self.config.project_id).await {
            Ok(snapshot) => SyncEvent::Activity { seq, snapshot },
            Err(error) => {
                tracing::warn!(seq, %error, "activity fetch failed");
                SyncEvent::PollFailed { seq, error }
            }
        };
        self.emit(event).await;
    }

    fn ensure_polling(&mut self) {
        if self.poller.as_ref().is_some_and(|p| !p.is_finished()) {
            return;
        }
        let (poll_tx, poll_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let handle = ActivityPoller::new(
            Arc::clone(&self.api),
            self.config.project_id,
            self.config.poll_interval,
        )
        .with_sequencer(self.sequencer.clone())
        .spawn(poll_tx);
        tokio::spawn(forward_poll_events(poll_rx, self.evt_tx.clone()));
        self.poller = Some(handle);
    }

    async fn lock(&self, task_ids: Vec<TaskId>, kind: LockKind) {
        let request = LockRequest {
            task_ids: task_ids.clone(),
            lock_type: kind,
        };
        match self.api.lock_tasks(self.config.project_id, request).await {
            Ok(()) => {
                tracing::info!(?task_ids, ?kind, "tasks locked");
                self.emit(SyncEvent::LockChanged {
                    task_ids,
                    kind: Some(kind),
                })
                .await;
                self.refresh_activity().await;
            }
            Err(e) => {
                tracing::warn!(?task_ids, error = %e, "lock failed");
                self.emit(SyncEvent::Error(format!("Could not lock tasks: {e}")))
                    .await;
            }
        }
    }

    async fn unlock(&self, task_ids: Vec<TaskId>) {
        match self
            .api
            .unlock_tasks(self.config.project_id, task_ids.clone())
            .await
        {
            Ok(()) => {
                tracing::info!(?task_ids, "tasks released");
                self.emit(SyncEvent::LockChanged {
                    task_ids,
                    kind: None,
                })
                .await;
                self.refresh_activity().await;
            }
            Err(e) => {
                tracing::warn!(?task_ids, error = %e, "unlock failed");
                self.emit(SyncEvent::Error(format!("Could not release tasks: {e}")))
                    .await;
            }
        }
    }
}

/// Background task: map poller output onto the event channel.
async fn forward_poll_events(mut poll_rx: mpsc::Receiver<PollEvent>, evt_tx: mpsc::Sender<SyncEvent>) {
    while let Some(event) = poll_rx.recv().await {
        if evt_tx.send(event.into()).await.is_err() {
            break;
        }
    }
}
