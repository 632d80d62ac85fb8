//! Task registry for asynchronous login attempts.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use {dashmap::DashMap, tracing::debug};

use catalyst_browser::LoginOutcome;

/// A completed login outcome awaiting its first (and only) poll.
struct TaskEntry {
    outcome: LoginOutcome,
    completed_at: Instant,
}

/// Process-wide registry mapping task ids to completed login outcomes.
///
/// [`TaskStore::take`] removes the entry atomically, so a result is delivered
/// to at most one poller. An absent id is indistinguishable from one that was
/// never submitted, is still in flight, or was already consumed; callers
/// uniformly report all of these as "pending".
#[derive(Default)]
pub struct TaskStore {
    entries: DashMap<String, TaskEntry>,
    last_id: AtomicU64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next task id: the current clock reading in nanoseconds, bumped past
    /// the previous id so two submissions in the same clock tick still
    /// receive distinct ids.
    pub fn next_task_id(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        loop {
            let last = self.last_id.load(Ordering::SeqCst);
            let id = now.max(last + 1);
            if self
                .last_id
                .compare_exchange(last, id, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return id.to_string();
            }
        }
    }

    /// Record a completed outcome under `task_id`.
    pub fn put(&self, task_id: String, outcome: LoginOutcome) {
        self.entries.insert(
            task_id,
            TaskEntry {
                outcome,
                completed_at: Instant::now(),
            },
        );
    }

    /// Atomically remove and return the outcome for `task_id`, if present.
    pub fn take(&self, task_id: &str) -> Option<LoginOutcome> {
        self.entries
            .remove(task_id)
            .map(|(_, entry)| entry.outcome)
    }

    /// Number of completed-but-unread entries.
    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    /// Drop completed entries that nobody polled within `ttl`.
    pub fn sweep_expired(&self, ttl: Duration) {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.completed_at.elapsed() <= ttl);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "expired unread task results");
        }
    }
}
