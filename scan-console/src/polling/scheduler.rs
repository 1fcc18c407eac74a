//! Per-task polling with one timer per tracked id.
//!
//! Each `start(id)` installs a [`PollingHandle`] and spawns a task that fetches
//! once immediately, derives its interval from that first status, then ticks
//! until the task reaches a terminal status, disappears, or the handle is
//! stopped. Every result is applied under the handles lock and only if the
//! handle that produced it is still the live one for its id.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fetcher::{FetchError, StatusFetcher};
use super::policy::PollingPolicy;
use super::status::{TaskProgress, TaskStatus};
use super::store::EntityStateStore;

/// Observable polling state for one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Handle installed; the first fetch has not settled yet.
    Starting,
    Active(Duration),
    Stopped,
}

/// The live polling handle for one id.
#[derive(Debug)]
pub struct PollingHandle {
    pub id: i64,
    /// Fixed once the first fetch settles.
    pub interval: Option<Duration>,
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollingHandle {
    fn cancel(&self) {
        self.cancel.cancel();
    }
}

struct SchedulerInner {
    fetcher: Arc<dyn StatusFetcher>,
    store: Arc<EntityStateStore>,
    policy: PollingPolicy,
    handles: Mutex<HashMap<i64, PollingHandle>>,
    next_generation: AtomicU64,
}

/// Owns the polling timers for all tracked tasks.
///
/// Dropping the scheduler cancels every timer it owns.
pub struct PollingScheduler {
    inner: Arc<SchedulerInner>,
    shutdown: CancellationToken,
}

impl PollingScheduler {
    pub fn new(
        fetcher: Arc<dyn StatusFetcher>,
        store: Arc<EntityStateStore>,
        policy: PollingPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                fetcher,
                store,
                policy,
                handles: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &Arc<EntityStateStore> {
        &self.inner.store
    }

    pub fn policy(&self) -> PollingPolicy {
        self.inner.policy
    }

    /// Start polling `id`, replacing any existing handle for it.
    ///
    /// Returns as soon as the handle is installed; the first fetch runs on the
    /// spawned polling task. Must be called within a Tokio runtime.
    pub fn start(&self, id: i64) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = self.shutdown.child_token();

        let mut handles = self.inner.handles.lock();
        if let Some(previous) = handles.remove(&id) {
            debug!(id, generation = previous.generation, "Replacing polling handle");
            previous.cancel();
        }

        let task = tokio::spawn(poll_loop(
            self.inner.clone(),
            id,
            generation,
            cancel.clone(),
        ));

        handles.insert(
            id,
            PollingHandle {
                id,
                interval: None,
                generation,
                cancel,
                task,
            },
        );
        info!(id, generation, "Started polling");
    }

    /// Stop polling `id`. Returns whether a handle was removed.
    pub fn stop(&self, id: i64) -> bool {
        match self.inner.remove_handle(id) {
            Some(handle) => {
                handle.cancel();
                info!(id, "Stopped polling");
                true
            }
            None => false,
        }
    }

    /// Stop polling every id.
    pub fn stop_all(&self) {
        let drained: Vec<_> = self.inner.handles.lock().drain().collect();
        for (_, handle) in &drained {
            handle.cancel();
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "Stopped all polling");
        }
    }

    pub fn is_active(&self, id: i64) -> bool {
        self.inner.handles.lock().contains_key(&id)
    }

    pub fn active_ids(&self) -> Vec<i64> {
        let mut ids: Vec<_> = self.inner.handles.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn active_count(&self) -> usize {
        self.inner.handles.lock().len()
    }

    /// Interval of the live handle for `id`, once its first fetch settled.
    pub fn interval(&self, id: i64) -> Option<Duration> {
        self.inner.handles.lock().get(&id).and_then(|h| h.interval)
    }

    /// Generation of the live handle for `id`; bumps on every `start`.
    pub fn generation(&self, id: i64) -> Option<u64> {
        self.inner.handles.lock().get(&id).map(|h| h.generation)
    }

    pub fn state(&self, id: i64) -> PollState {
        match self.inner.handles.lock().get(&id) {
            None => PollState::Stopped,
            Some(handle) => match handle.interval {
                None => PollState::Starting,
                Some(interval) => PollState::Active(interval),
            },
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
        for (_, handle) in self.inner.handles.lock().drain() {
            handle.task.abort();
        }
    }
}

impl SchedulerInner {
    fn remove_handle(&self, id: i64) -> Option<PollingHandle> {
        self.handles.lock().remove(&id)
    }

    /// Apply a fetch result produced by handle `generation`.
    ///
    /// Returns whether the polling loop should keep going.
    fn apply(
        &self,
        id: i64,
        generation: u64,
        cancel: &CancellationToken,
        result: Result<TaskProgress, FetchError>,
        interval: Option<Duration>,
    ) -> bool {
        let mut handles = self.handles.lock();

        let Some(handle) = handles.get_mut(&id) else {
            debug!(id, generation, "Discarding result for stopped id");
            return false;
        };
        if handle.generation != generation || cancel.is_cancelled() {
            debug!(id, generation, "Discarding result from superseded handle");
            return false;
        }
        if let Some(interval) = interval {
            handle.interval = Some(interval);
        }

        let stop_reason = match result {
            Ok(progress) => {
                let status = progress.status;
                debug!(id, %status, progress = progress.progress, "Task status updated");
                self.store.update(id, progress);
                status
                    .is_terminal()
                    .then(|| format!("task reached terminal status {}", status))
            }
            Err(err) if err.stops_polling() => Some(err.to_string()),
            Err(err) => {
                warn!(id, error = %err, "Status fetch failed; will retry on next tick");
                None
            }
        };

        match stop_reason {
            Some(reason) => {
                if let Some(handle) = handles.remove(&id) {
                    handle.cancel();
                }
                info!(id, reason = %reason, "Stopped polling");
                false
            }
            None => true,
        }
    }
}

async fn fetch_or_cancel(
    inner: &SchedulerInner,
    id: i64,
    cancel: &CancellationToken,
) -> Option<Result<TaskProgress, FetchError>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = inner.fetcher.fetch_status(id) => Some(result),
    }
}

async fn poll_loop(
    inner: Arc<SchedulerInner>,
    id: i64,
    generation: u64,
    cancel: CancellationToken,
) {
    let Some(first) = fetch_or_cancel(&inner, id, &cancel).await else {
        return;
    };

    // A failed first fetch falls back to the last known status.
    let status = match &first {
        Ok(progress) => progress.status,
        Err(_) => inner.store.status(id).unwrap_or(TaskStatus::Pending),
    };
    let period = inner.policy.interval_for(status);

    if !inner.apply(id, generation, &cancel, first, Some(period)) {
        return;
    }
    debug!(id, ?period, "Polling interval fixed");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(result) = fetch_or_cancel(&inner, id, &cancel).await else {
            break;
        };
        if !inner.apply(id, generation, &cancel, result, None) {
            break;
        }
    }
}
