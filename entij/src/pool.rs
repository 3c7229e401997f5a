// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Pooled serial workers for asynchronous reactions
//!
//! An [`AsyncEntry`] owns one worker thread fed by a private channel, so the
//! work submitted to it runs in submission order and never overlaps. The
//! [`AsyncEntryPool`] keeps idle entries on a free list so worker threads are
//! reused across entities.
//!
//! # Lifecycle
//!
//! ```text
//! Active --shutdown_later--> Draining --shutdown_now--> Stopped
//!    \_____________________shutdown_now_____________________/
//! ```
//!
//! - `Active`: entries are handed out and taken back.
//! - `Draining`: idle workers are stopped at once; checked-out entries keep
//!   accepting work and stop when their queue next becomes empty.
//! - `Stopped`: like `Draining`, and every new submission is refused. Work
//!   already queued still runs.
//!
//! # Configuration
//!
//! [`PoolConfig::from_env`] reads:
//! ```bash
//! export ENTIJ_ASYNC_MAX_IDLE=32
//! export ENTIJ_ASYNC_THREAD_PREFIX=game-async
//! ```

use crate::entity::{Entity, Reaction};
use crate::error::{panic_message, EntijError, Result};
use crate::sync::lock;
use crate::value::Value;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, trace, warn};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Environment variable overriding [`PoolConfig::max_idle_entries`]
pub const MAX_IDLE_ENV: &str = "ENTIJ_ASYNC_MAX_IDLE";
/// Environment variable overriding [`PoolConfig::thread_name_prefix`]
pub const THREAD_PREFIX_ENV: &str = "ENTIJ_ASYNC_THREAD_PREFIX";

/// Configuration for async entry pool behavior
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of idle entries kept on the free list
    pub max_idle_entries: usize,
    /// Prefix of worker thread names
    pub thread_name_prefix: String,
    /// Whether to log every checkout and return
    pub log_events: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_idle_entries: 16,
            thread_name_prefix: "entij-async".to_string(),
            log_events: false,
        }
    }
}

impl PoolConfig {
    /// Create a configuration keeping at most `max_idle_entries` idle workers
    pub fn new(max_idle_entries: usize) -> Self {
        PoolConfig {
            max_idle_entries,
            ..Self::default()
        }
    }

    /// Defaults overridden by `ENTIJ_ASYNC_MAX_IDLE` and `ENTIJ_ASYNC_THREAD_PREFIX`
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MAX_IDLE_ENV) {
            match raw.trim().parse() {
                Ok(max) => config.max_idle_entries = max,
                Err(_) => warn!("ignoring {}={:?}: not a count", MAX_IDLE_ENV, raw),
            }
        }
        if let Ok(prefix) = std::env::var(THREAD_PREFIX_ENV) {
            if !prefix.is_empty() {
                config.thread_name_prefix = prefix;
            }
        }
        config
    }

    /// Enable logging for checkout and return events
    pub fn with_logging(mut self) -> Self {
        self.log_events = true;
        self
    }

    /// Set the prefix of worker thread names
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Statistics for monitoring pool reuse
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Checkouts served from the free list
    pub hits: usize,
    /// Checkouts that had to start a new worker
    pub misses: usize,
    /// Entries currently on the free list
    pub idle_count: usize,
    /// Largest free list observed
    pub peak_idle: usize,
    /// Workers stopped so far
    pub retired: usize,
    /// Entries handed back after their worker had already been shut down
    pub discarded: usize,
}

impl PoolStats {
    /// Calculate the hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Pool lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolLifecycle {
    /// Entries are handed out and taken back
    Active,
    /// Idle workers stopped; checked-out workers stop once drained
    Draining,
    /// New submissions are refused
    Stopped,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    lifecycle: PoolLifecycle,
    free: Vec<AsyncEntry>,
    retired: Vec<JoinHandle<()>>,
    stats: PoolStats,
    next_id: usize,
}

struct PoolShared {
    config: PoolConfig,
    state: Mutex<PoolState>,
}

impl PoolShared {
    fn lifecycle(&self) -> PoolLifecycle {
        lock(&self.state).lifecycle
    }

    /// Stop the entry's worker once its queue drains and keep its handle for joining
    fn retire(&self, entry: &AsyncEntry) {
        // LOCK ORDERING: entry lock released before the pool lock is taken
        let Some(worker) = entry.stop_worker() else {
            return;
        };
        trace!("async entry {} retired", entry.id());
        let mut state = lock(&self.state);
        state.retired.push(worker);
        state.stats.retired += 1;
    }
}

/// A pool of reusable serial workers
///
/// Cloning the pool yields another handle to the same free list.
///
/// # Example
///
/// ```
/// use entij::{AsyncEntryPool, Entity};
///
/// let pool = AsyncEntryPool::new();
/// let hero = Entity::named("hero");
/// let entry = pool.get().unwrap();
/// let first = entry.submit(&hero, |e| e.set_posit(1)).unwrap();
/// let second = entry.submit(&hero, |e| e.posit() + 1).unwrap();
/// first.wait().unwrap();
/// assert_eq!(second.wait().unwrap(), 2);
/// pool.put_back(entry);
/// pool.shutdown_now();
/// pool.join_retired();
/// ```
#[derive(Clone)]
pub struct AsyncEntryPool {
    shared: Arc<PoolShared>,
}

impl AsyncEntryPool {
    /// Create a pool with default configuration
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool with custom configuration
    pub fn with_config(config: PoolConfig) -> Self {
        AsyncEntryPool {
            shared: Arc::new(PoolShared {
                config,
                state: Mutex::new(PoolState {
                    lifecycle: PoolLifecycle::Active,
                    free: Vec::new(),
                    retired: Vec::new(),
                    stats: PoolStats::default(),
                    next_id: 0,
                }),
            }),
        }
    }

    /// Check out an entry, reusing an idle one when available
    ///
    /// # Errors
    ///
    /// [`EntijError::PoolShutdown`] once the pool is stopped, and
    /// [`EntijError::WorkerSpawn`] if a new worker thread cannot be started.
    pub fn get(&self) -> Result<AsyncEntry> {
        let id = {
            let mut state = lock(&self.shared.state);
            if state.lifecycle == PoolLifecycle::Stopped {
                warn!("refusing checkout: async entry pool is stopped");
                return Err(EntijError::PoolShutdown);
            }
            if let Some(entry) = state.free.pop() {
                state.stats.hits += 1;
                state.stats.idle_count = state.free.len();
                lock(&entry.shared.state).idle = false;
                if self.shared.config.log_events {
                    debug!(
                        "async entry {} checked out (hit rate: {:.1}%)",
                        entry.id(),
                        state.stats.hit_rate()
                    );
                }
                return Ok(entry);
            }
            state.stats.misses += 1;
            state.next_id += 1;
            state.next_id
        }; // pool lock released before the worker is spawned

        let entry = AsyncEntry::spawn(&self.shared, id)?;
        if self.shared.config.log_events {
            debug!("async entry {} created", id);
        }
        Ok(entry)
    }

    /// Return an entry to the free list
    ///
    /// An entry whose worker has been shut down is discarded. While the pool
    /// is shutting down, or when the free list is full, the entry's worker is
    /// stopped instead.
    pub fn put_back(&self, entry: AsyncEntry) {
        let mut state = lock(&self.shared.state);
        let accept = state.lifecycle == PoolLifecycle::Active
            && state.free.len() < self.shared.config.max_idle_entries;
        {
            let mut entry_state = lock(&entry.shared.state);
            if entry_state.shutdown {
                warn!("discarding async entry {}: its worker has been shut down", entry.id());
                state.stats.discarded += 1;
                return;
            }
            if entry_state.idle {
                trace!("async entry {} is already idle", entry.id());
                return;
            }
            entry_state.idle = accept;
        }
        if accept {
            if self.shared.config.log_events {
                debug!("async entry {} returned", entry.id());
            }
            state.free.push(entry);
            state.stats.idle_count = state.free.len();
            if state.stats.idle_count > state.stats.peak_idle {
                state.stats.peak_idle = state.stats.idle_count;
            }
            return;
        }
        drop(state);
        self.shared.retire(&entry);
    }

    /// Begin draining: stop idle workers now, checked-out ones once drained
    pub fn shutdown_later(&self) {
        self.begin_shutdown(PoolLifecycle::Draining);
    }

    /// Refuse every new submission and stop workers once their queues drain
    pub fn shutdown_now(&self) {
        self.begin_shutdown(PoolLifecycle::Stopped);
    }

    fn begin_shutdown(&self, target: PoolLifecycle) {
        let idle = {
            let mut state = lock(&self.shared.state);
            if state.lifecycle != PoolLifecycle::Stopped {
                state.lifecycle = target;
            }
            state.stats.idle_count = 0;
            std::mem::take(&mut state.free)
        };
        debug!("async entry pool moving to {:?}, stopping {} idle workers", target, idle.len());
        for entry in idle {
            lock(&entry.shared.state).idle = false;
            self.shared.retire(&entry);
        }
    }

    /// Current lifecycle stage
    pub fn lifecycle(&self) -> PoolLifecycle {
        self.shared.lifecycle()
    }

    /// Whether shutdown has begun
    pub fn is_shutdown(&self) -> bool {
        self.lifecycle() != PoolLifecycle::Active
    }

    /// Number of entries on the free list
    pub fn idle_count(&self) -> usize {
        lock(&self.shared.state).free.len()
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        lock(&self.shared.state).stats.clone()
    }

    /// Wait for every stopped worker to finish its remaining queue
    ///
    /// Returns the number of workers joined. A worker is never joined from
    /// its own thread; such a handle is kept for a later call.
    pub fn join_retired(&self) -> usize {
        let workers = std::mem::take(&mut lock(&self.shared.state).retired);
        let current = thread::current().id();
        let mut joined = 0;
        let mut deferred = Vec::new();
        for worker in workers {
            if worker.thread().id() == current {
                deferred.push(worker);
                continue;
            }
            if worker.join().is_err() {
                error!("async worker terminated by a panic");
            }
            joined += 1;
        }
        if !deferred.is_empty() {
            lock(&self.shared.state).retired.extend(deferred);
        }
        joined
    }
}

impl Default for AsyncEntryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AsyncEntryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("AsyncEntryPool")
            .field("lifecycle", &state.lifecycle)
            .field("idle", &state.free.len())
            .field("stats", &state.stats)
            .finish()
    }
}

struct EntryState {
    pending: usize,
    shutdown: bool,
    idle: bool,
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

struct EntryShared {
    id: usize,
    state: Mutex<EntryState>,
    pool: Weak<PoolShared>,
}

impl EntryShared {
    /// Runs on the worker after every task, before its result is delivered
    fn complete(self: &Arc<Self>, entity: &Entity) {
        let idle = {
            let mut state = lock(&self.state);
            state.pending = state.pending.saturating_sub(1);
            state.pending == 0
        }; // entry lock released before the pool or the entity is touched
        if !idle {
            return;
        }
        let entry = AsyncEntry {
            shared: Arc::clone(self),
        };
        match self.pool.upgrade() {
            Some(pool) if pool.lifecycle() == PoolLifecycle::Active => {}
            Some(pool) => pool.retire(&entry),
            None => {
                entry.stop_worker();
            }
        }
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| entity.signal_async_queue_empty())) {
            error!(
                "async queue empty signal for entity {} panicked: {}",
                entity.id(),
                panic_message(payload.as_ref())
            );
        }
    }
}

/// A checked-out serial worker
///
/// Clones refer to the same worker.
#[derive(Clone)]
pub struct AsyncEntry {
    shared: Arc<EntryShared>,
}

impl AsyncEntry {
    fn spawn(pool: &Arc<PoolShared>, id: usize) -> Result<AsyncEntry> {
        let (sender, receiver): (Sender<Job>, Receiver<Job>) = crossbeam_channel::unbounded();
        let name = format!("{}-{}", pool.config.thread_name_prefix, id);
        let worker = thread::Builder::new().name(name).spawn(move || {
            for job in receiver.iter() {
                job();
            }
        })?;
        trace!("async worker {} started", id);
        Ok(AsyncEntry {
            shared: Arc::new(EntryShared {
                id,
                state: Mutex::new(EntryState {
                    pending: 0,
                    shutdown: false,
                    idle: false,
                    sender: Some(sender),
                    worker: Some(worker),
                }),
                pool: Arc::downgrade(pool),
            }),
        })
    }

    /// Pool-unique identifier of this entry
    pub fn id(&self) -> usize {
        self.shared.id
    }

    /// Number of submitted tasks that have not completed
    pub fn pending(&self) -> usize {
        lock(&self.shared.state).pending
    }

    /// Whether the worker has been told to stop
    pub fn is_shutdown(&self) -> bool {
        lock(&self.shared.state).shutdown
    }

    /// Close the queue; the worker exits once the tasks already queued ran
    fn stop_worker(&self) -> Option<JoinHandle<()>> {
        let mut state = lock(&self.shared.state);
        state.shutdown = true;
        state.sender = None;
        state.worker.take()
    }

    /// Hand the entry back to the pool it came from
    pub fn release(&self) {
        match self.shared.pool.upgrade() {
            Some(pool) => AsyncEntryPool { shared: pool }.put_back(self.clone()),
            None => {
                self.stop_worker();
            }
        }
    }

    /// Run `computation` against `entity` on this entry's worker
    ///
    /// Tasks run in submission order, one at a time. Once a task completes
    /// and the queue is empty, `entity` is signalled through
    /// [`Entity::signal_async_queue_empty`].
    ///
    /// # Errors
    ///
    /// [`EntijError::PoolShutdown`] if the pool has been stopped,
    /// [`EntijError::EntryShutdown`] if this entry's worker has been stopped.
    pub fn submit<T, F>(&self, entity: &Entity, computation: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce(&Entity) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.enqueue(entity, move |e| Ok(computation(e)))
    }

    /// Feed `input` to `entity`'s logic chain on this entry's worker
    pub fn submit_action(
        &self,
        entity: &Entity,
        input: Value,
    ) -> Result<TaskHandle<Option<Reaction>>> {
        if input.is_nil() {
            return Err(EntijError::invalid_argument("input cannot be nil"));
        }
        self.enqueue(entity, move |e| e.react(input))
    }

    fn enqueue<T, F>(&self, entity: &Entity, computation: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce(&Entity) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if let Some(pool) = self.shared.pool.upgrade() {
            if pool.lifecycle() == PoolLifecycle::Stopped {
                warn!(
                    "refusing submission for entity {}: async entry pool is stopped",
                    entity.id()
                );
                return Err(EntijError::PoolShutdown);
            }
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let job: Job = {
            let entity = entity.clone();
            let entry = Arc::clone(&self.shared);
            let cancelled = Arc::clone(&cancelled);
            let finished = Arc::clone(&finished);
            Box::new(move || {
                let outcome = if cancelled.load(Ordering::SeqCst) {
                    Err(EntijError::TaskCancelled)
                } else {
                    catch_unwind(AssertUnwindSafe(|| computation(&entity)))
                        .unwrap_or_else(|payload| {
                            Err(EntijError::TaskPanicked(panic_message(payload.as_ref())))
                        })
                };
                entry.complete(&entity);
                finished.store(true, Ordering::SeqCst);
                // the handle may have been dropped
                let _ = result_tx.send(outcome);
            })
        };

        let mut state = lock(&self.shared.state);
        let sent = match &state.sender {
            Some(sender) => sender.send(job).is_ok(),
            None => false,
        };
        if !sent {
            return Err(EntijError::EntryShutdown);
        }
        // the worker cannot complete the task before this lock is released
        state.pending += 1;
        Ok(TaskHandle {
            result: result_rx,
            cancelled,
            finished,
        })
    }
}

impl fmt::Debug for AsyncEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("AsyncEntry")
            .field("id", &self.shared.id)
            .field("pending", &state.pending)
            .field("shutdown", &state.shutdown)
            .finish()
    }
}

/// Handle to a submitted task
///
/// Cancellation is cooperative: a task cancelled before it starts never runs,
/// a running task is not interrupted. The result is delivered once.
pub struct TaskHandle<T> {
    result: Receiver<Result<T>>,
    cancelled: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl<T> TaskHandle<T> {
    /// Ask the task not to start; `false` if it already completed
    pub fn cancel(&self) -> bool {
        self.cancelled.store(true, Ordering::SeqCst);
        !self.is_finished()
    }

    /// Whether [`TaskHandle::cancel`] was called
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the task ran, or was skipped because it was cancelled
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Block until the task completes
    ///
    /// # Errors
    ///
    /// [`EntijError::TaskCancelled`] if it was cancelled before starting,
    /// [`EntijError::TaskPanicked`] if it panicked, or the task's own error.
    pub fn wait(self) -> Result<T> {
        self.result.recv().unwrap_or(Err(EntijError::EntryShutdown))
    }

    /// Block until the task completes or `timeout` elapses
    ///
    /// Returns `None` on timeout; the handle can be waited on again.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        match self.result.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(EntijError::EntryShutdown)),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_idle_entries, 16);
        assert_eq!(config.thread_name_prefix, "entij-async");
        assert!(!config.log_events);
    }

    #[test]
    fn test_pool_config_custom() {
        let config = PoolConfig::new(2).with_thread_name_prefix("board").with_logging();
        assert_eq!(config.max_idle_entries, 2);
        assert_eq!(config.thread_name_prefix, "board");
        assert!(config.log_events);
    }

    #[test]
    fn test_reuse_counts_hits() {
        let pool = AsyncEntryPool::new();
        let first = pool.get().unwrap();
        let id = first.id();
        pool.put_back(first);
        assert_eq!(pool.idle_count(), 1);

        let second = pool.get().unwrap();
        assert_eq!(second.id(), id);
        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 50.0);
        assert_eq!(stats.peak_idle, 1);
    }

    #[test]
    fn test_double_put_back_lists_once() {
        let pool = AsyncEntryPool::new();
        let entry = pool.get().unwrap();
        pool.put_back(entry.clone());
        pool.put_back(entry);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_idle_cap_retires_surplus() {
        let pool = AsyncEntryPool::with_config(PoolConfig::new(1));
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        pool.put_back(a);
        pool.put_back(b.clone());
        assert_eq!(pool.idle_count(), 1);
        assert!(b.is_shutdown());
        assert_eq!(pool.join_retired(), 1);
    }

    #[test]
    fn test_worker_thread_name() {
        let pool =
            AsyncEntryPool::with_config(PoolConfig::default().with_thread_name_prefix("tester"));
        let entry = pool.get().unwrap();
        let name = entry
            .submit(&Entity::new(), |_| thread::current().name().map(str::to_string))
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(name.as_deref(), Some(format!("tester-{}", entry.id()).as_str()));
    }

    #[test]
    fn test_cancel_before_start() {
        let pool = AsyncEntryPool::new();
        let entry = pool.get().unwrap();
        let e = Entity::new();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let blocker = entry
            .submit(&e, move |_| {
                let _ = release_rx.recv();
            })
            .unwrap();
        let skipped = entry.submit(&e, |e| e.set_state(9)).unwrap();
        assert!(skipped.cancel());
        assert!(skipped.is_cancelled());
        release_tx.send(()).unwrap();

        blocker.wait().unwrap();
        assert!(matches!(skipped.wait(), Err(EntijError::TaskCancelled)));
        assert_eq!(e.state(), 0);
    }

    #[test]
    fn test_panicking_task_reported() {
        let pool = AsyncEntryPool::new();
        let entry = pool.get().unwrap();
        let e = Entity::new();
        let failed = entry.submit(&e, |_| -> i64 { panic!("boom") }).unwrap();
        assert!(matches!(
            failed.wait(),
            Err(EntijError::TaskPanicked(message)) if message == "boom"
        ));
        let after = entry.submit(&e, |_| 7).unwrap();
        assert_eq!(after.wait().unwrap(), 7);
    }

    #[test]
    fn test_wait_timeout() {
        let pool = AsyncEntryPool::new();
        let entry = pool.get().unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let handle = entry
            .submit(&Entity::new(), move |_| {
                let _ = release_rx.recv();
                5
            })
            .unwrap();
        assert!(handle.wait_timeout(Duration::from_millis(10)).is_none());
        assert!(!handle.is_finished());
        release_tx.send(()).unwrap();
        assert_eq!(handle.wait_timeout(Duration::from_secs(5)).unwrap().unwrap(), 5);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_submit_after_shutdown_now() {
        let pool = AsyncEntryPool::new();
        let entry = pool.get().unwrap();
        pool.shutdown_now();
        assert_eq!(pool.lifecycle(), PoolLifecycle::Stopped);
        let err = entry.submit(&Entity::new(), |_| ()).unwrap_err();
        assert!(matches!(err, EntijError::PoolShutdown));
        assert!(err.is_state_violation());
        assert!(matches!(pool.get(), Err(EntijError::PoolShutdown)));
    }

    #[test]
    fn test_shutdown_later_stops_idle_workers() {
        let pool = AsyncEntryPool::new();
        let idle = pool.get().unwrap();
        pool.put_back(idle.clone());
        pool.shutdown_later();

        assert_eq!(pool.lifecycle(), PoolLifecycle::Draining);
        assert!(idle.is_shutdown());
        assert_eq!(pool.idle_count(), 0);
        assert!(matches!(idle.submit(&Entity::new(), |_| ()), Err(EntijError::EntryShutdown)));
        assert_eq!(pool.join_retired(), 1);
        assert_eq!(pool.stats().retired, 1);
    }

    #[test]
    fn test_put_back_shut_down_entry_is_discarded() {
        let pool = AsyncEntryPool::new();
        let entry = pool.get().unwrap();
        pool.shutdown_later();
        pool.put_back(entry.clone());
        assert!(entry.is_shutdown());
        assert_eq!(pool.stats().discarded, 1);

        let fresh = AsyncEntryPool::new();
        fresh.put_back(entry);
        assert_eq!(fresh.idle_count(), 0);
        assert_eq!(fresh.stats().discarded, 1);
    }

    #[test]
    fn test_nil_action_rejected() {
        let pool = AsyncEntryPool::new();
        let entry = pool.get().unwrap();
        assert!(matches!(
            entry.submit_action(&Entity::new(), Value::Nil),
            Err(EntijError::InvalidArgument(_))
        ));
    }
}
