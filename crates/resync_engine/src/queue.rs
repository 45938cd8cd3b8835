//! Durable sync task queue.

use crate::error::{EngineError, EngineResult};
use crate::store::{Snapshot, TaskStore, SNAPSHOT_VERSION};
use crate::task::{Operation, Payload, SyncTask, TaskId, TaskOptions, TaskState};
use parking_lot::Mutex;
use resync_net::ClassifiedError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Resident tasks (pending + in flight + failed).
    pub total: usize,
    /// Tasks waiting for a cycle.
    pub pending: usize,
    /// Tasks currently being sent.
    pub in_flight: usize,
    /// Tasks completed since the queue was opened or last cleared.
    pub completed: u64,
    /// Tasks that gave up.
    pub failed: usize,
}

struct QueueState {
    /// Resident tasks keyed by sequence.
    tasks: BTreeMap<u64, SyncTask>,
    next_sequence: u64,
    last_created_at: u64,
    completed: u64,
    durable: bool,
}

impl QueueState {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            tasks: snapshot
                .tasks
                .into_iter()
                .map(|task| (task.sequence, task))
                .collect(),
            next_sequence: snapshot.next_sequence,
            last_created_at: snapshot.last_created_at,
            completed: 0,
            durable: true,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            next_sequence: self.next_sequence,
            last_created_at: self.last_created_at,
            tasks: self.tasks.values().cloned().collect(),
        }
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut SyncTask> {
        self.tasks.values_mut().find(|t| t.id.as_str() == id)
    }

    fn sequence_of(&self, id: &str) -> Option<u64> {
        self.tasks
            .values()
            .find(|t| t.id.as_str() == id)
            .map(|t| t.sequence)
    }

    fn collect(&self, state: TaskState) -> Vec<SyncTask> {
        let mut tasks: Vec<SyncTask> = self
            .tasks
            .values()
            .filter(|t| t.state == state)
            .cloned()
            .collect();
        tasks.sort_by_key(SyncTask::order_key);
        tasks
    }
}

/// The durable queue of pending mutations.
///
/// All access is serialized by one internal lock, so tasks can be enqueued
/// while a sync cycle is running. Every public mutating call persists the
/// full snapshot before returning. A failed save never fails the caller: it
/// is logged and [`is_durable`](Self::is_durable) turns false until the next
/// successful save.
///
/// # Example
///
/// ```rust
/// use resync_engine::{Operation, Payload, SyncTaskQueue, TaskOptions};
///
/// let queue = SyncTaskQueue::in_memory();
/// let id = queue
///     .enqueue("members", Operation::Create, Payload::new(b"{}".to_vec()), TaskOptions::default())
///     .unwrap();
/// assert_eq!(queue.stats().pending, 1);
/// assert!(queue.get(id.as_str()).is_some());
/// ```
pub struct SyncTaskQueue {
    store: TaskStore,
    state: Mutex<QueueState>,
    clock: fn() -> u64,
}

impl SyncTaskQueue {
    /// Opens a queue, recovering any persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    pub fn open(store: TaskStore) -> EngineResult<Self> {
        let snapshot = store.load_snapshot()?;
        tracing::info!(
            key = store.key(),
            tasks = snapshot.tasks.len(),
            "opened sync task queue"
        );
        Ok(Self {
            store,
            state: Mutex::new(QueueState::from_snapshot(snapshot)),
            clock: wall_clock_millis,
        })
    }

    /// Creates an empty queue backed by an in-memory blob store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            store: TaskStore::in_memory(),
            state: Mutex::new(QueueState::from_snapshot(Snapshot::empty())),
            clock: wall_clock_millis,
        }
    }

    /// Replaces the millisecond wall clock used for `created_at` and ids.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the underlying task store.
    #[must_use]
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Adds a mutation as a `Pending` task and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyEntity`] if `entity` is empty.
    pub fn enqueue(
        &self,
        entity: &str,
        operation: Operation,
        payload: Payload,
        options: TaskOptions,
    ) -> EngineResult<TaskId> {
        if entity.trim().is_empty() {
            return Err(EngineError::EmptyEntity);
        }

        let now = (self.clock)();
        let mut state = self.state.lock();
        let created_at = now.max(state.last_created_at);
        let sequence = state.next_sequence;
        state.last_created_at = created_at;
        state.next_sequence += 1;

        let id = TaskId::generate(entity, operation, now);
        let task = SyncTask {
            id: id.clone(),
            entity: entity.to_string(),
            operation,
            payload,
            created_at,
            sequence,
            attempt: 0,
            max_attempts: options.max_attempts.max(1),
            state: TaskState::Pending,
            last_error: None,
        };
        tracing::debug!(task_id = %id, entity, operation = %operation, "task enqueued");
        state.tasks.insert(sequence, task);
        self.persist(&mut state);
        Ok(id)
    }

    /// Removes a task; returns true if it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let Some(sequence) = state.sequence_of(id) else {
            return false;
        };
        state.tasks.remove(&sequence);
        self.persist(&mut state);
        true
    }

    /// Returns a task by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<SyncTask> {
        self.state
            .lock()
            .tasks
            .values()
            .find(|t| t.id.as_str() == id)
            .cloned()
    }

    /// Returns every resident task in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<SyncTask> {
        self.state.lock().tasks.values().cloned().collect()
    }

    /// Returns `Pending` tasks ordered by `(created_at, sequence)`.
    #[must_use]
    pub fn pending(&self) -> Vec<SyncTask> {
        self.state.lock().collect(TaskState::Pending)
    }

    /// Returns `Failed` tasks ordered by `(created_at, sequence)`.
    #[must_use]
    pub fn failed(&self) -> Vec<SyncTask> {
        self.state.lock().collect(TaskState::Failed)
    }

    /// Returns `InFlight` tasks.
    #[must_use]
    pub fn in_flight(&self) -> Vec<SyncTask> {
        self.state.lock().collect(TaskState::InFlight)
    }

    /// Returns the number of resident tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Returns true if no task is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    /// Returns the queue counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        let mut stats = QueueStats {
            total: state.tasks.len(),
            completed: state.completed,
            ..QueueStats::default()
        };
        for task in state.tasks.values() {
            match task.state {
                TaskState::Pending => stats.pending += 1,
                TaskState::InFlight => stats.in_flight += 1,
                TaskState::Failed => stats.failed += 1,
                TaskState::Completed => {}
            }
        }
        stats
    }

    /// Returns false while the last save failed.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.state.lock().durable
    }

    /// Resets every `Failed` task to `Pending` with no attempts; returns the
    /// number reset.
    pub fn reset_failed_to_pending(&self) -> usize {
        let mut state = self.state.lock();
        let mut reset = 0;
        for task in state.tasks.values_mut() {
            if task.state == TaskState::Failed {
                task.state = TaskState::Pending;
                task.attempt = 0;
                task.last_error = None;
                reset += 1;
            }
        }
        if reset > 0 {
            tracing::info!(reset, "failed tasks reset to pending");
            self.persist(&mut state);
        }
        reset
    }

    /// Forgets completed tasks; returns how many were cleared.
    ///
    /// Completed tasks are pruned as soon as they complete, so this resets
    /// the completed counter.
    pub fn clear_completed(&self) -> usize {
        let mut state = self.state.lock();
        let before = state.tasks.len();
        state.tasks.retain(|_, t| t.state != TaskState::Completed);
        let pruned = before - state.tasks.len();
        let cleared = usize::try_from(state.completed)
            .unwrap_or(usize::MAX)
            .saturating_add(pruned);
        state.completed = 0;
        if pruned > 0 {
            self.persist(&mut state);
        }
        cleared
    }

    /// Removes every task; returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.tasks.len();
        state.tasks.clear();
        state.completed = 0;
        tracing::info!(removed, "all sync tasks cleared");
        self.persist(&mut state);
        removed
    }

    /// Resets stale `InFlight` tasks to `Pending` without persisting.
    ///
    /// Only valid while no cycle is running.
    pub(crate) fn recover_in_flight(&self) -> usize {
        let mut state = self.state.lock();
        let mut recovered = 0;
        for task in state.tasks.values_mut() {
            if task.state == TaskState::InFlight {
                task.state = TaskState::Pending;
                recovered += 1;
            }
        }
        recovered
    }

    /// Marks a `Pending` task `InFlight` and returns it.
    ///
    /// Returns `None` if the task was removed or is not pending.
    pub(crate) fn begin_attempt(&self, id: &str) -> Option<SyncTask> {
        let mut state = self.state.lock();
        let task = state.find_mut(id)?;
        if task.state != TaskState::Pending {
            return None;
        }
        task.state = TaskState::InFlight;
        Some(task.clone())
    }

    /// Removes a task that the remote store accepted.
    pub(crate) fn complete(&self, id: &str) -> Option<SyncTask> {
        let mut state = self.state.lock();
        let sequence = state.sequence_of(id)?;
        let mut task = state.tasks.remove(&sequence)?;
        task.state = TaskState::Completed;
        state.completed += 1;
        Some(task)
    }

    /// Records a failed attempt.
    ///
    /// The task returns to `Pending` while attempts remain and the error is
    /// retryable, and becomes `Failed` otherwise.
    pub(crate) fn record_failure(&self, id: &str, error: ClassifiedError) -> Option<SyncTask> {
        let mut state = self.state.lock();
        let task = state.find_mut(id)?;
        task.attempt = (task.attempt + 1).min(task.max_attempts);
        task.state = if error.retryable && !task.is_exhausted() {
            TaskState::Pending
        } else {
            TaskState::Failed
        };
        task.last_error = Some(error);
        Some(task.clone())
    }

    /// Persists the current state.
    pub(crate) fn flush(&self) {
        let mut state = self.state.lock();
        self.persist(&mut state);
    }

    fn persist(&self, state: &mut QueueState) {
        match self.store.save_snapshot(&state.snapshot()) {
            Ok(()) => {
                if !state.durable {
                    tracing::info!("task snapshot persisted again, queue is durable");
                }
                state.durable = true;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist task snapshot, queue is not durable");
                state.durable = false;
            }
        }
    }
}

impl std::fmt::Debug for SyncTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncTaskQueue")
            .field("store", &self.store)
            .field("stats", &self.stats())
            .finish()
    }
}

fn wall_clock_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_net::Failure;
    use resync_storage::{BlobStore, InMemoryBlobStore};
    use std::sync::Arc;

    fn enqueue(queue: &SyncTaskQueue, entity: &str) -> TaskId {
        queue
            .enqueue(entity, Operation::Create, Payload::default(), TaskOptions::default())
            .unwrap()
    }

    fn server_error() -> ClassifiedError {
        ClassifiedError::from(Failure::status(503, ""))
    }

    #[test]
    fn enqueue_defaults() {
        let queue = SyncTaskQueue::in_memory();
        let id = enqueue(&queue, "members");

        let task = queue.get(id.as_str()).unwrap();
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.attempt, 0);
        assert_eq!(task.max_attempts, 3);
        assert_eq!(task.sequence, 0);
        assert!(id.as_str().starts_with("members_CREATE_"));
    }

    #[test]
    fn enqueue_rejects_empty_entity() {
        let queue = SyncTaskQueue::in_memory();
        let result = queue.enqueue("  ", Operation::Create, Payload::default(), TaskOptions::default());
        assert!(matches!(result, Err(EngineError::EmptyEntity)));
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_max_attempts_is_clamped() {
        let queue = SyncTaskQueue::in_memory();
        let id = queue
            .enqueue(
                "e",
                Operation::Delete,
                Payload::default(),
                TaskOptions::default().with_max_attempts(0),
            )
            .unwrap();
        assert_eq!(queue.get(id.as_str()).unwrap().max_attempts, 1);
    }

    #[test]
    fn created_at_never_decreases() {
        fn backwards_clock() -> u64 {
            use std::sync::atomic::{AtomicU64, Ordering};
            static NOW: AtomicU64 = AtomicU64::new(10_000);
            NOW.fetch_sub(1_000, Ordering::SeqCst)
        }

        let queue = SyncTaskQueue::in_memory().with_clock(backwards_clock);
        enqueue(&queue, "e");
        enqueue(&queue, "e");
        enqueue(&queue, "e");

        let pending = queue.pending();
        assert!(pending.iter().all(|t| t.created_at == 10_000));
        let sequences: Vec<u64> = pending.iter().map(|t| t.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn remove_and_get() {
        let queue = SyncTaskQueue::in_memory();
        let id = enqueue(&queue, "e");

        assert!(queue.remove(id.as_str()));
        assert!(!queue.remove(id.as_str()));
        assert!(queue.get(id.as_str()).is_none());
    }

    #[test]
    fn complete_prunes_and_counts() {
        let queue = SyncTaskQueue::in_memory();
        let id = enqueue(&queue, "e");

        queue.begin_attempt(id.as_str()).unwrap();
        assert_eq!(queue.stats().in_flight, 1);

        let done = queue.complete(id.as_str()).unwrap();
        assert_eq!(done.state, TaskState::Completed);
        assert_eq!(
            queue.stats(),
            QueueStats {
                total: 0,
                pending: 0,
                in_flight: 0,
                completed: 1,
                failed: 0
            }
        );

        assert_eq!(queue.clear_completed(), 1);
        assert_eq!(queue.stats().completed, 0);
    }

    #[test]
    fn failure_consumes_budget() {
        let queue = SyncTaskQueue::in_memory();
        let id = queue
            .enqueue(
                "e",
                Operation::Update,
                Payload::default(),
                TaskOptions::default().with_max_attempts(2),
            )
            .unwrap();

        queue.begin_attempt(id.as_str());
        let task = queue.record_failure(id.as_str(), server_error()).unwrap();
        assert_eq!((task.state, task.attempt), (TaskState::Pending, 1));

        queue.begin_attempt(id.as_str());
        let task = queue.record_failure(id.as_str(), server_error()).unwrap();
        assert_eq!((task.state, task.attempt), (TaskState::Failed, 2));
        assert_eq!(task.last_error, Some(server_error()));
    }

    #[test]
    fn non_retryable_failure_is_terminal() {
        let queue = SyncTaskQueue::in_memory();
        let id = enqueue(&queue, "e");

        queue.begin_attempt(id.as_str());
        let task = queue
            .record_failure(id.as_str(), ClassifiedError::from(Failure::status(403, "")))
            .unwrap();
        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.attempt, 1);
    }

    #[test]
    fn begin_attempt_requires_pending() {
        let queue = SyncTaskQueue::in_memory();
        let id = enqueue(&queue, "e");

        assert!(queue.begin_attempt(id.as_str()).is_some());
        assert!(queue.begin_attempt(id.as_str()).is_none());
        assert!(queue.begin_attempt("missing").is_none());
    }

    #[test]
    fn reset_failed() {
        let queue = SyncTaskQueue::in_memory();
        let id = enqueue(&queue, "e");
        queue.begin_attempt(id.as_str());
        queue.record_failure(id.as_str(), ClassifiedError::from(Failure::status(400, "")));
        assert_eq!(queue.failed().len(), 1);

        assert_eq!(queue.reset_failed_to_pending(), 1);
        let task = queue.get(id.as_str()).unwrap();
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.attempt, 0);
        assert!(task.last_error.is_none());
    }

    #[test]
    fn pending_is_ordered() {
        let queue = SyncTaskQueue::in_memory();
        let a = enqueue(&queue, "b-entity");
        let b = enqueue(&queue, "a-entity");
        let c = enqueue(&queue, "b-entity");

        let ids: Vec<TaskId> = queue.pending().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn clear_all() {
        let queue = SyncTaskQueue::in_memory();
        enqueue(&queue, "a");
        enqueue(&queue, "b");
        assert_eq!(queue.clear_all(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn reopen_restores_tasks_and_counters() {
        let blobs: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        let first_id = {
            let queue = SyncTaskQueue::open(TaskStore::new(Arc::clone(&blobs))).unwrap();
            let id = enqueue(&queue, "e");
            queue.begin_attempt(id.as_str());
            queue.flush();
            id
        };

        let queue = SyncTaskQueue::open(TaskStore::new(blobs)).unwrap();
        let task = queue.get(first_id.as_str()).unwrap();
        assert_eq!(task.state, TaskState::Pending);

        let second = enqueue(&queue, "e");
        assert_eq!(queue.get(second.as_str()).unwrap().sequence, 1);
    }

    #[test]
    fn recover_in_flight() {
        let queue = SyncTaskQueue::in_memory();
        let id = enqueue(&queue, "e");
        queue.begin_attempt(id.as_str());

        assert_eq!(queue.recover_in_flight(), 1);
        assert_eq!(queue.pending().len(), 1);
    }
}
