//! Cancellable activity poller.
//!
//! Fetches the latest-activity feed on a fixed cadence and forwards each
//! result over an mpsc channel. Every request is tagged with a sequence
//! number drawn before it is sent, so a consumer can drop a response that
//! arrives after a newer one has already been applied.
//!
//! ```text
//! ActivityPoller ── PollEvent::{Activity, Failed} ──▶ consumer
//!        ▲
//!        └── PollHandle::stop() / Drop (watch channel)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use tasking_proto::activity::ActivitySnapshot;
use tasking_proto::task::ProjectId;

use crate::api::{ApiError, TaskingApi};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest accepted poll interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared, monotonically increasing request counter.
///
/// Clones share the same counter; the first number handed out is 1.
#[derive(Debug, Clone, Default)]
pub struct Sequencer(Arc<AtomicU64>);

impl Sequencer {
    /// A counter that has handed out nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws the next sequence number.
    #[must_use]
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// One poll outcome.
#[derive(Debug)]
pub enum PollEvent {
    /// The feed was fetched.
    Activity {
        /// Sequence number drawn before the request.
        seq: u64,
        /// The snapshot.
        snapshot: ActivitySnapshot,
    },
    /// The fetch failed; the next attempt waits a full interval.
    Failed {
        /// Sequence number drawn before the request.
        seq: u64,
        /// Why.
        error: ApiError,
    },
}

impl PollEvent {
    /// The event's sequence number.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        match self {
            Self::Activity { seq, .. } | Self::Failed { seq, .. } => *seq,
        }
    }
}

/// Handle to a running poller. Dropping it stops the poller.
#[derive(Debug)]
pub struct PollHandle {
    shutdown_tx: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Asks the poller to stop.
    ///
    /// A fetch in flight is abandoned and its response never sent.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stops the poller and waits for its task to finish.
    pub async fn stop_and_join(mut self) {
        self.stop();
        if let Some(join) = self.join.take()
            && let Err(e) = join.await
        {
            tracing::warn!(error = %e, "activity poller task failed");
        }
    }

    /// Whether the poller task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Polls `GET /projects/{id}/activities/latest/` on a fixed interval.
pub struct ActivityPoller<A> {
    api: Arc<A>,
    project_id: ProjectId,
    interval: Duration,
    sequencer: Sequencer,
}

impl<A: TaskingApi + 'static> ActivityPoller<A> {
    /// A poller with its own sequencer.
    #[must_use]
    pub fn new(api: Arc<A>, project_id: ProjectId, interval: Duration) -> Self {
        Self {
            api,
            project_id,
            interval: interval.max(MIN_POLL_INTERVAL),
            sequencer: Sequencer::new(),
        }
    }

    /// Draws sequence numbers from `sequencer` instead.
    ///
    /// Share one sequencer between every fetch of the feed so that their
    /// results order against each other.
    #[must_use]
    pub fn with_sequencer(mut self, sequencer: Sequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    /// Starts polling. The first request goes out one interval from now.
    #[must_use]
    pub fn spawn(self, events: mpsc::Sender<PollEvent>) -> PollHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(events, shutdown_rx));
        PollHandle {
            shutdown_tx,
            join: Some(join),
        }
    }

    async fn run(self, events: mpsc::Sender<PollEvent>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(project_id = %self.project_id, interval = ?self.interval, "activity poller started");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let seq = self.sequencer.next();
            let result = tokio::select! {
                _ = shutdown_rx.changed() => break,
                result = self.api.fetch_latest_activity(self.project_id) => result,
            };

            // Stopped while the response was being decoded.
            if *shutdown_rx.borrow() {
                break;
            }

            let event = match result {
                Ok(snapshot) => {
                    tracing::debug!(seq, entries = snapshot.activity.len(), "activity polled");
                    PollEvent::Activity { seq, snapshot }
                }
                Err(error) => {
                    tracing::warn!(seq, %error, "activity poll failed, keeping previous snapshot");
                    PollEvent::Failed { seq, error }
                }
            };
            if events.send(event).await.is_err() {
                tracing::debug!("poll event receiver dropped");
                break;
            }
        }

        tracing::debug!(project_id = %self.project_id, "activity poller stopped");
    }
}
