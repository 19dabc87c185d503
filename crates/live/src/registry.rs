//! In-memory state for runs that are currently executing.
//!
//! [`LiveRunRegistry`] owns a run-id keyed table shared by the orchestrator
//! (writer), the stream endpoint (subscriber), and the cancel operation. All
//! access goes through the registry's methods; nothing else holds a reference
//! into the table. Mutations to one run's entry are mutually exclusive, while
//! operations on different runs never block each other.
//!
//! Output persisted on the run record stays authoritative; live delivery to
//! a subscriber is best-effort and may drop frames for that subscriber alone
//! when it falls behind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use runforge_core::status::RunStatus;
use runforge_core::types::DbId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Default per-subscriber channel capacity.
///
/// Sized generously relative to expected output rates; a subscriber this far
/// behind starts losing frames while everyone else keeps receiving.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 512;

// ---------------------------------------------------------------------------
// LiveRunState
// ---------------------------------------------------------------------------

/// Ephemeral per-run state. Never persisted; lost on process exit.
struct LiveRunState {
    /// Append-only output buffer, replayed to every new subscriber.
    lines: Vec<String>,
    /// Active subscriber channels keyed by subscription token.
    subscribers: HashMap<u64, mpsc::Sender<String>>,
    /// Next subscription token to hand out.
    next_token: u64,
    /// Set once by [`LiveRunRegistry::finish`]; appends are ignored after.
    done: bool,
    /// Terminal status, present exactly when `done` is set.
    status: Option<RunStatus>,
    /// When the run finished, for retention sweeps.
    finished_at: Option<Instant>,
    /// Cooperative cancellation handle wired into the execution task.
    cancel: CancellationToken,
}

// ---------------------------------------------------------------------------
// RunSubscription
// ---------------------------------------------------------------------------

/// One subscriber's view of a run, taken atomically against appends.
///
/// `history` holds every line buffered before the subscription; `receiver`
/// tails lines appended after it, with no gap or duplicate at the boundary.
/// For a run that already finished, `status` is set and the receiver yields
/// `None` immediately.
pub struct RunSubscription {
    pub history: Vec<String>,
    pub receiver: mpsc::Receiver<String>,
    pub token: u64,
    pub status: Option<RunStatus>,
}

// ---------------------------------------------------------------------------
// LiveRunRegistry
// ---------------------------------------------------------------------------

/// Run-id keyed table of live run state.
///
/// Shared as `Arc<LiveRunRegistry>` across the orchestrator, the stream
/// endpoint, and the cancel endpoint.
pub struct LiveRunRegistry {
    runs: RwLock<HashMap<DbId, Arc<Mutex<LiveRunState>>>>,
    subscriber_capacity: usize,
}

impl LiveRunRegistry {
    pub fn new() -> Self {
        Self::with_subscriber_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Create a registry with a specific per-subscriber channel capacity.
    pub fn with_subscriber_capacity(capacity: usize) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            subscriber_capacity: capacity.max(1),
        }
    }

    /// Track a newly launched run.
    ///
    /// The supplied token is the handle [`cancel`](Self::cancel) triggers; the
    /// execution task observes it through its own clone.
    pub async fn register(&self, run_id: DbId, cancel: CancellationToken) {
        let state = LiveRunState {
            lines: Vec::new(),
            subscribers: HashMap::new(),
            next_token: 0,
            done: false,
            status: None,
            finished_at: None,
            cancel,
        };
        self.runs
            .write()
            .await
            .insert(run_id, Arc::new(Mutex::new(state)));
        tracing::debug!(run_id, "Live run registered");
    }

    /// Append an output line and push it to every active subscriber.
    ///
    /// Pushes never block: a subscriber whose channel is full loses this
    /// frame, and one whose receiver is gone is pruned. Appends against an
    /// unknown or finished run are ignored.
    pub async fn append(&self, run_id: DbId, line: String) {
        let Some(entry) = self.entry(run_id).await else {
            return;
        };
        let mut state = entry.lock().await;
        if state.done {
            return;
        }
        state.lines.push(line.clone());

        let mut gone = Vec::new();
        for (token, sender) in &state.subscribers {
            match sender.try_send(line.clone()) {
                Ok(()) => {}
                // Slow consumer: this frame is lost for them alone.
                Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Closed(_)) => gone.push(*token),
            }
        }
        for token in gone {
            state.subscribers.remove(&token);
        }
    }

    /// Attach a subscriber to a run, returning `None` when the run is not
    /// tracked.
    ///
    /// The history snapshot and the channel registration happen under the
    /// entry lock, so no line appended afterwards can be missed or seen
    /// twice. Subscribing to a finished run yields the full buffer, the
    /// terminal status, and an already-closed receiver.
    pub async fn subscribe(&self, run_id: DbId) -> Option<RunSubscription> {
        let entry = self.entry(run_id).await?;
        let mut state = entry.lock().await;
        let (sender, receiver) = mpsc::channel(self.subscriber_capacity);
        let token = state.next_token;
        state.next_token += 1;
        if !state.done {
            state.subscribers.insert(token, sender);
        }
        Some(RunSubscription {
            history: state.lines.clone(),
            receiver,
            token,
            status: state.status,
        })
    }

    /// Detach a subscriber. Safe to call concurrently with appends, and a
    /// no-op for tokens already pruned or closed by [`finish`](Self::finish).
    pub async fn unsubscribe(&self, run_id: DbId, token: u64) {
        let Some(entry) = self.entry(run_id).await else {
            return;
        };
        entry.lock().await.subscribers.remove(&token);
    }

    /// Mark a run finished, recording its terminal status and closing every
    /// subscriber channel. Lines already buffered in a subscriber's channel
    /// are still delivered before it observes the close.
    pub async fn finish(&self, run_id: DbId, status: RunStatus) {
        let Some(entry) = self.entry(run_id).await else {
            return;
        };
        let mut state = entry.lock().await;
        if state.done {
            return;
        }
        state.done = true;
        state.status = Some(status);
        state.finished_at = Some(Instant::now());
        state.subscribers.clear();
        tracing::debug!(run_id, status = %status, "Live run finished");
    }

    /// Request cooperative cancellation of a run.
    ///
    /// Returns `false` when the run is not tracked or already finished; the
    /// remote process is not guaranteed to terminate either way.
    pub async fn cancel(&self, run_id: DbId) -> bool {
        let Some(entry) = self.entry(run_id).await else {
            return false;
        };
        let state = entry.lock().await;
        if state.done {
            return false;
        }
        state.cancel.cancel();
        tracing::info!(run_id, "Run cancellation requested");
        true
    }

    /// Terminal status of a tracked run, `None` while it is still going or
    /// when it is unknown.
    pub async fn status(&self, run_id: DbId) -> Option<RunStatus> {
        let entry = self.entry(run_id).await?;
        let state = entry.lock().await;
        state.status
    }

    /// Drop finished entries older than `older_than`, returning how many
    /// were evicted. In-flight runs are never touched.
    pub async fn sweep_finished(&self, older_than: Duration) -> usize {
        let mut runs = self.runs.write().await;
        let mut expired = Vec::new();
        for (run_id, entry) in runs.iter() {
            let state = entry.lock().await;
            if state.done {
                if let Some(finished_at) = state.finished_at {
                    if finished_at.elapsed() >= older_than {
                        expired.push(*run_id);
                    }
                }
            }
        }
        for run_id in &expired {
            runs.remove(run_id);
        }
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "Evicted finished live runs");
        }
        expired.len()
    }

    async fn entry(&self, run_id: DbId) -> Option<Arc<Mutex<LiveRunState>>> {
        self.runs.read().await.get(&run_id).cloned()
    }
}

impl Default for LiveRunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_replays_history_then_tails_live_lines() {
        let registry = LiveRunRegistry::new();
        registry.register(1, CancellationToken::new()).await;
        registry.append(1, "one".to_string()).await;

        let mut sub = registry.subscribe(1).await.expect("run is tracked");
        assert_eq!(sub.history, vec!["one"]);
        assert!(sub.status.is_none());

        registry.append(1, "two".to_string()).await;
        assert_eq!(sub.receiver.recv().await.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn late_subscriber_gets_buffer_and_an_immediate_close() {
        let registry = LiveRunRegistry::new();
        registry.register(7, CancellationToken::new()).await;
        registry.append(7, "alpha".to_string()).await;
        registry.append(7, "beta".to_string()).await;
        registry.finish(7, RunStatus::Success).await;

        let mut sub = registry.subscribe(7).await.expect("entry is retained");
        assert_eq!(sub.history, vec!["alpha", "beta"]);
        assert_eq!(sub.status, Some(RunStatus::Success));
        assert!(sub.receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn finish_closes_active_subscribers_after_draining() {
        let registry = LiveRunRegistry::new();
        registry.register(3, CancellationToken::new()).await;
        let mut sub = registry.subscribe(3).await.unwrap();

        registry.append(3, "last words".to_string()).await;
        registry.finish(3, RunStatus::Failed).await;

        assert_eq!(sub.receiver.recv().await.as_deref(), Some("last words"));
        assert!(sub.receiver.recv().await.is_none());
        assert_eq!(registry.status(3).await, Some(RunStatus::Failed));
    }

    #[tokio::test]
    async fn slow_subscriber_loses_frames_without_blocking_the_producer() {
        let registry = LiveRunRegistry::with_subscriber_capacity(1);
        registry.register(4, CancellationToken::new()).await;
        let mut sub = registry.subscribe(4).await.unwrap();

        for i in 0..3 {
            registry.append(4, format!("line {i}")).await;
        }
        registry.finish(4, RunStatus::Success).await;

        // Only the first line fit the channel; the buffer has all of them.
        assert_eq!(sub.receiver.recv().await.as_deref(), Some("line 0"));
        assert!(sub.receiver.recv().await.is_none());

        let replay = registry.subscribe(4).await.unwrap();
        assert_eq!(replay.history.len(), 3);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery_for_that_subscriber_only() {
        let registry = LiveRunRegistry::new();
        registry.register(5, CancellationToken::new()).await;
        let mut first = registry.subscribe(5).await.unwrap();
        let mut second = registry.subscribe(5).await.unwrap();

        registry.unsubscribe(5, first.token).await;
        registry.append(5, "still here".to_string()).await;

        assert!(first.receiver.recv().await.is_none());
        assert_eq!(second.receiver.recv().await.as_deref(), Some("still here"));
    }

    #[tokio::test]
    async fn cancel_fires_the_registered_token() {
        let registry = LiveRunRegistry::new();
        let token = CancellationToken::new();
        registry.register(6, token.clone()).await;

        assert!(registry.cancel(6).await);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_of_untracked_or_finished_runs_reports_false() {
        let registry = LiveRunRegistry::new();
        assert!(!registry.cancel(99).await);

        registry.register(8, CancellationToken::new()).await;
        registry.finish(8, RunStatus::Success).await;
        assert!(!registry.cancel(8).await);
    }

    #[tokio::test]
    async fn finish_is_recorded_once() {
        let registry = LiveRunRegistry::new();
        registry.register(9, CancellationToken::new()).await;
        registry.finish(9, RunStatus::Failed).await;
        registry.finish(9, RunStatus::Success).await;

        assert_eq!(registry.status(9).await, Some(RunStatus::Failed));
    }

    #[tokio::test]
    async fn appends_after_finish_are_ignored() {
        let registry = LiveRunRegistry::new();
        registry.register(10, CancellationToken::new()).await;
        registry.finish(10, RunStatus::Success).await;
        registry.append(10, "too late".to_string()).await;

        let sub = registry.subscribe(10).await.unwrap();
        assert!(sub.history.is_empty());
    }

    #[tokio::test]
    async fn sweep_evicts_only_stale_finished_entries() {
        let registry = LiveRunRegistry::new();
        registry.register(11, CancellationToken::new()).await;
        registry.register(12, CancellationToken::new()).await;
        registry.finish(11, RunStatus::Success).await;

        assert_eq!(registry.sweep_finished(Duration::ZERO).await, 1);
        assert!(registry.subscribe(11).await.is_none());
        assert!(registry.subscribe(12).await.is_some());

        registry.finish(12, RunStatus::Failed).await;
        assert_eq!(registry.sweep_finished(Duration::from_secs(3600)).await, 0);
        assert!(registry.subscribe(12).await.is_some());
    }
}
