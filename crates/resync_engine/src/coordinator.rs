//! Sync coordinator.
//!
//! A cycle snapshots the pending tasks, groups them by entity and replays
//! each group in insertion order through the request executor. Groups are
//! independent and may run concurrently; tasks of one entity never do.

use crate::config::SyncConfig;
use crate::error::EngineResult;
use crate::queue::{QueueStats, SyncTaskQueue};
use crate::task::{Operation, Payload, SyncTask, TaskId, TaskOptions, TaskState};
use crate::transport::{send, DataStoreTransport};
use crate::trigger::{BackgroundTrigger, BACKGROUND_SYNC_TAG};
use parking_lot::RwLock;
use resync_net::{ClassifiedError, RequestExecutor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify, Semaphore};
use tokio::task::JoinSet;

/// Why a trigger did not run a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another cycle was running.
    AlreadyRunning,
    /// The coordinator believes the link is down.
    Offline,
}

/// Result of a sync cycle.
#[derive(Debug, Clone, Default)]
pub struct SyncCycleResult {
    /// True iff the cycle ran and every task it touched completed.
    pub success: bool,
    /// Tasks accepted by the remote store.
    pub synced_tasks: Vec<SyncTask>,
    /// Tasks that ended `Failed`.
    pub failed_tasks: Vec<SyncTask>,
    /// Tasks that failed but have attempts left.
    pub retrying_tasks: Vec<SyncTask>,
    /// One message per failed attempt.
    pub errors: Vec<String>,
    /// Set when the trigger was skipped.
    pub skipped: Option<SkipReason>,
    /// Wall time of the cycle.
    pub duration: Duration,
}

impl SyncCycleResult {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    /// Returns true if the cycle actually ran.
    #[must_use]
    pub fn ran(&self) -> bool {
        self.skipped.is_none()
    }

    /// Highest attempt count among retrying tasks.
    #[must_use]
    pub fn max_retry_attempt(&self) -> Option<u32> {
        self.retrying_tasks.iter().map(|t| t.attempt).max()
    }

    fn absorb(&mut self, report: GroupReport) {
        self.synced_tasks.extend(report.synced);
        self.failed_tasks.extend(report.failed);
        self.retrying_tasks.extend(report.retrying);
        self.errors.extend(report.errors);
    }
}

/// Cumulative coordinator counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Cycles that ran.
    pub cycles_completed: u64,
    /// Triggers skipped because a cycle was running or the link was down.
    pub cycles_skipped: u64,
    /// Tasks accepted by the remote store.
    pub tasks_synced: u64,
    /// Tasks that ended `Failed`.
    pub tasks_failed: u64,
    /// Failed attempts that left the task pending.
    pub retries: u64,
    /// When the last cycle finished.
    pub last_sync_time: Option<std::time::Instant>,
}

/// Progress notifications for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A cycle started with this many pending tasks.
    CycleStarted {
        /// Pending tasks at the start of the cycle.
        pending: usize,
    },
    /// A task was accepted by the remote store.
    TaskSynced {
        /// Task id.
        id: TaskId,
        /// Task entity.
        entity: String,
    },
    /// A task failed and will be retried.
    TaskRetrying {
        /// Task id.
        id: TaskId,
        /// Task entity.
        entity: String,
        /// Attempts made so far.
        attempt: u32,
        /// The classified failure.
        error: ClassifiedError,
    },
    /// A task gave up.
    TaskFailed {
        /// Task id.
        id: TaskId,
        /// Task entity.
        entity: String,
        /// The classified failure.
        error: ClassifiedError,
    },
    /// A cycle finished.
    CycleFinished {
        /// Tasks synced.
        synced: usize,
        /// Tasks failed.
        failed: usize,
        /// Tasks left pending for retry.
        retrying: usize,
        /// Whether the cycle succeeded.
        success: bool,
    },
    /// The connectivity flag changed.
    ConnectivityChanged {
        /// New state.
        online: bool,
    },
}

/// Replays queued tasks against the remote store.
///
/// # Single flight
///
/// At most one cycle runs at a time. A trigger that arrives while a cycle
/// runs returns immediately with [`SkipReason::AlreadyRunning`]; it is not
/// queued.
///
/// # Cancellation
///
/// A cycle runs on its own tokio task. Dropping the future returned by
/// [`sync_now`](Self::sync_now) stops waiting for the result but not the
/// cycle: transport calls already sent run to completion, and
/// [`is_running`](Self::is_running) stays true until the last one returns.
pub struct SyncCoordinator {
    queue: Arc<SyncTaskQueue>,
    transport: Arc<dyn DataStoreTransport>,
    executor: Arc<RequestExecutor>,
    config: SyncConfig,
    background: Option<Arc<dyn BackgroundTrigger>>,
    running: Arc<AtomicBool>,
    online: AtomicBool,
    wake: Notify,
    events: broadcast::Sender<SyncEvent>,
    stats: Arc<RwLock<SyncStats>>,
}

impl SyncCoordinator {
    /// Creates a coordinator. The connectivity flag starts online.
    pub fn new(
        queue: Arc<SyncTaskQueue>,
        transport: Arc<dyn DataStoreTransport>,
        executor: Arc<RequestExecutor>,
        config: SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            queue,
            transport,
            executor,
            config,
            background: None,
            running: Arc::new(AtomicBool::new(false)),
            online: AtomicBool::new(true),
            wake: Notify::new(),
            events,
            stats: Arc::new(RwLock::new(SyncStats::default())),
        }
    }

    /// Sets the platform background-sync trigger.
    #[must_use]
    pub fn with_background_trigger(mut self, trigger: Arc<dyn BackgroundTrigger>) -> Self {
        self.background = Some(trigger);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the task queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<SyncTaskQueue> {
        &self.queue
    }

    /// Returns the request executor.
    #[must_use]
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// Returns true while a cycle runs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns the connectivity flag.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Updates the connectivity flag; returns true if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        if self.online.swap(online, Ordering::SeqCst) == online {
            return false;
        }
        tracing::info!(online, "sync connectivity changed");
        self.emit(SyncEvent::ConnectivityChanged { online });
        true
    }

    /// Returns true if a background trigger is configured.
    #[must_use]
    pub fn is_background_sync_available(&self) -> bool {
        self.background.is_some()
    }

    /// Returns a receiver for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Returns cumulative counters.
    #[must_use]
    pub fn sync_stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Asks the worker to run a cycle soon.
    pub fn request_sync(&self) {
        self.wake.notify_one();
    }

    pub(crate) async fn wait_for_request(&self) {
        self.wake.notified().await;
    }

    /// Enqueues a mutation and schedules a sync.
    ///
    /// While offline or mid-cycle, a background sync is also registered
    /// with the platform if a trigger is configured.
    ///
    /// # Errors
    ///
    /// See [`SyncTaskQueue::enqueue`].
    pub fn enqueue(
        &self,
        entity: &str,
        operation: Operation,
        payload: Payload,
        options: TaskOptions,
    ) -> EngineResult<TaskId> {
        let id = self.queue.enqueue(entity, operation, payload, options)?;
        tracing::info!(task_id = %id, entity, "sync task added");

        if !self.is_online() || self.is_running() {
            self.register_background_sync();
        }
        if self.config.sync_on_enqueue {
            self.request_sync();
        }
        Ok(id)
    }

    /// Removes a task; returns true if it existed.
    pub fn remove_task(&self, id: &str) -> bool {
        self.queue.remove(id)
    }

    /// Returns the queue counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Returns pending tasks in replay order.
    #[must_use]
    pub fn pending(&self) -> Vec<SyncTask> {
        self.queue.pending()
    }

    /// Returns failed tasks.
    #[must_use]
    pub fn failed(&self) -> Vec<SyncTask> {
        self.queue.failed()
    }

    /// Forgets completed tasks.
    pub fn clear_completed_tasks(&self) -> usize {
        self.queue.clear_completed()
    }

    /// Removes every task.
    pub fn clear_all_tasks(&self) -> usize {
        self.queue.clear_all()
    }

    /// Runs the remote store's health check through the executor.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of the last attempt.
    pub async fn check_backend(&self) -> Result<(), ClassifiedError> {
        let transport = &*self.transport;
        self.executor
            .execute("health_check", self.config.request_attempts, || {
                transport.health_check()
            })
            .await
    }

    /// Resets failed tasks to pending, then runs a cycle.
    pub async fn retry_failed_tasks(&self) -> SyncCycleResult {
        self.queue.reset_failed_to_pending();
        self.sync_now().await
    }

    /// Entry point for the platform's background-sync callback.
    pub async fn on_background_sync(&self) -> SyncCycleResult {
        tracing::info!("background sync fired");
        self.sync_now().await
    }

    /// Runs one sync cycle now.
    ///
    /// Returns immediately with a skipped result if the link is down or a
    /// cycle is already running.
    pub async fn sync_now(&self) -> SyncCycleResult {
        if !self.is_online() {
            tracing::debug!("sync skipped: offline");
            self.stats.write().cycles_skipped += 1;
            return SyncCycleResult::skipped(SkipReason::Offline);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("sync skipped: already running");
            self.stats.write().cycles_skipped += 1;
            return SyncCycleResult::skipped(SkipReason::AlreadyRunning);
        }

        let cycle = Cycle {
            runner: self.runner(),
            stats: Arc::clone(&self.stats),
            max_concurrent_groups: self.config.max_concurrent_groups.max(1),
            _running: RunningGuard(Arc::clone(&self.running)),
        };
        match tokio::spawn(cycle.run()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "sync cycle aborted");
                SyncCycleResult {
                    errors: vec![format!("sync cycle aborted: {e}")],
                    ..SyncCycleResult::default()
                }
            }
        }
    }

    fn runner(&self) -> GroupRunner {
        GroupRunner {
            queue: Arc::clone(&self.queue),
            transport: Arc::clone(&self.transport),
            executor: Arc::clone(&self.executor),
            events: self.events.clone(),
            request_attempts: self.config.request_attempts,
        }
    }

    fn register_background_sync(&self) {
        let Some(trigger) = &self.background else {
            return;
        };
        match trigger.register(BACKGROUND_SYNC_TAG) {
            Ok(()) => tracing::debug!("background sync registered"),
            Err(reason) => tracing::error!(%reason, "failed to register background sync"),
        }
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

/// Clears the single-flight flag when a cycle ends, however it ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct GroupReport {
    synced: Vec<SyncTask>,
    failed: Vec<SyncTask>,
    retrying: Vec<SyncTask>,
    errors: Vec<String>,
}

/// One cycle, detached from the coordinator that started it.
struct Cycle {
    runner: GroupRunner,
    stats: Arc<RwLock<SyncStats>>,
    max_concurrent_groups: usize,
    _running: RunningGuard,
}

impl Cycle {
    async fn run(self) -> SyncCycleResult {
        let started = tokio::time::Instant::now();
        let queue = &self.runner.queue;
        let recovered = queue.recover_in_flight();
        if recovered > 0 {
            tracing::warn!(recovered, "reset tasks left in flight by an interrupted cycle");
        }

        let pending = queue.pending();
        tracing::info!(pending = pending.len(), "starting sync cycle");
        let _ = self.runner.events.send(SyncEvent::CycleStarted {
            pending: pending.len(),
        });

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_groups));
        let mut groups = JoinSet::new();
        for (entity, tasks) in group_by_entity(pending) {
            let runner = self.runner.clone();
            let semaphore = Arc::clone(&semaphore);
            groups.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                runner.run(entity, tasks).await
            });
        }

        let mut result = SyncCycleResult::default();
        while let Some(joined) = groups.join_next().await {
            match joined {
                Ok(report) => result.absorb(report),
                Err(e) => {
                    tracing::error!(error = %e, "entity group aborted");
                    result.errors.push(format!("entity group aborted: {e}"));
                }
            }
        }

        result.duration = started.elapsed();
        result.success = result.failed_tasks.is_empty()
            && result.retrying_tasks.is_empty()
            && result.errors.is_empty();

        {
            let mut stats = self.stats.write();
            stats.cycles_completed += 1;
            stats.tasks_synced += result.synced_tasks.len() as u64;
            stats.tasks_failed += result.failed_tasks.len() as u64;
            stats.retries += result.retrying_tasks.len() as u64;
            stats.last_sync_time = Some(std::time::Instant::now());
        }

        tracing::info!(
            synced = result.synced_tasks.len(),
            failed = result.failed_tasks.len(),
            retrying = result.retrying_tasks.len(),
            duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            "sync cycle finished"
        );
        let _ = self.runner.events.send(SyncEvent::CycleFinished {
            synced: result.synced_tasks.len(),
            failed: result.failed_tasks.len(),
            retrying: result.retrying_tasks.len(),
            success: result.success,
        });
        result
    }
}

/// Everything one entity group needs, detached from the coordinator.
#[derive(Clone)]
struct GroupRunner {
    queue: Arc<SyncTaskQueue>,
    transport: Arc<dyn DataStoreTransport>,
    executor: Arc<RequestExecutor>,
    events: broadcast::Sender<SyncEvent>,
    request_attempts: u32,
}

impl GroupRunner {
    async fn run(self, entity: String, tasks: Vec<SyncTask>) -> GroupReport {
        let mut report = GroupReport::default();
        tracing::debug!(entity = %entity, tasks = tasks.len(), "syncing entity group");

        for queued in tasks {
            let Some(task) = self.queue.begin_attempt(queued.id.as_str()) else {
                tracing::debug!(task_id = %queued.id, "task no longer pending, skipped");
                continue;
            };

            let transport = &*self.transport;
            let label = format!("{} {}", task.operation, task.entity);
            let outcome = self
                .executor
                .execute(&label, self.request_attempts, || {
                    send(transport, task.operation, &task.entity, &task.payload)
                })
                .await;

            match outcome {
                Ok(()) => {
                    if let Some(done) = self.queue.complete(task.id.as_str()) {
                        tracing::debug!(task_id = %done.id, entity = %done.entity, "task synced");
                        let _ = self.events.send(SyncEvent::TaskSynced {
                            id: done.id.clone(),
                            entity: done.entity.clone(),
                        });
                        report.synced.push(done);
                    }
                }
                Err(error) => {
                    report.errors.push(format!("{}: {error}", task.id));
                    let Some(updated) = self.queue.record_failure(task.id.as_str(), error.clone())
                    else {
                        continue;
                    };
                    if updated.state == TaskState::Failed {
                        tracing::error!(
                            task_id = %updated.id,
                            entity = %updated.entity,
                            attempt = updated.attempt,
                            error = %error,
                            "task failed"
                        );
                        let _ = self.events.send(SyncEvent::TaskFailed {
                            id: updated.id.clone(),
                            entity: updated.entity.clone(),
                            error,
                        });
                        report.failed.push(updated);
                    } else {
                        tracing::warn!(
                            task_id = %updated.id,
                            entity = %updated.entity,
                            attempt = updated.attempt,
                            max_attempts = updated.max_attempts,
                            error = %error,
                            "task will be retried"
                        );
                        let _ = self.events.send(SyncEvent::TaskRetrying {
                            id: updated.id.clone(),
                            entity: updated.entity.clone(),
                            attempt: updated.attempt,
                            error,
                        });
                        report.retrying.push(updated);
                    }
                }
            }
        }

        self.queue.flush();
        report
    }
}

/// Groups tasks by entity, keeping the incoming order within and across
/// groups.
fn group_by_entity(tasks: Vec<SyncTask>) -> Vec<(String, Vec<SyncTask>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<SyncTask>)> = Vec::new();
    for task in tasks {
        match index.get(&task.entity) {
            Some(&i) => groups[i].1.push(task),
            None => {
                index.insert(task.entity.clone(), groups.len());
                groups.push((task.entity.clone(), vec![task]));
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use crate::trigger::MockBackgroundTrigger;
    use resync_net::{ErrorKind, Failure};

    fn setup(config: SyncConfig) -> (Arc<SyncCoordinator>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let coordinator = SyncCoordinator::new(
            Arc::new(SyncTaskQueue::in_memory()),
            Arc::clone(&transport) as Arc<dyn DataStoreTransport>,
            Arc::new(RequestExecutor::default()),
            config,
        );
        (Arc::new(coordinator), transport)
    }

    fn add(coordinator: &SyncCoordinator, entity: &str, max_attempts: u32) -> TaskId {
        coordinator
            .enqueue(
                entity,
                Operation::Create,
                Payload::new(entity.as_bytes().to_vec()),
                TaskOptions::default().with_max_attempts(max_attempts),
            )
            .unwrap()
    }

    #[test]
    fn groups_keep_order() {
        let queue = SyncTaskQueue::in_memory();
        for entity in ["a", "b", "a", "c", "b"] {
            queue
                .enqueue(entity, Operation::Create, Payload::default(), TaskOptions::default())
                .unwrap();
        }
        let groups = group_by_entity(queue.pending());
        let shape: Vec<(String, Vec<u64>)> = groups
            .into_iter()
            .map(|(e, tasks)| (e, tasks.iter().map(|t| t.sequence).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("a".to_string(), vec![0, 2]),
                ("b".to_string(), vec![1, 4]),
                ("c".to_string(), vec![3]),
            ]
        );
    }

    #[tokio::test]
    async fn successful_cycle_prunes_tasks() {
        let (coordinator, transport) = setup(SyncConfig::default());
        add(&coordinator, "members", 3);

        let result = coordinator.sync_now().await;
        assert!(result.success);
        assert_eq!(result.synced_tasks.len(), 1);
        assert_eq!(result.synced_tasks[0].state, TaskState::Completed);
        assert_eq!(transport.call_count(), 1);

        let stats = coordinator.stats();
        assert_eq!((stats.total, stats.completed), (0, 1));
    }

    #[tokio::test]
    async fn empty_cycle_succeeds() {
        let (coordinator, transport) = setup(SyncConfig::default());
        let result = coordinator.sync_now().await;
        assert!(result.success);
        assert!(result.ran());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn offline_skips_without_touching_tasks() {
        let (coordinator, transport) = setup(SyncConfig::default());
        add(&coordinator, "members", 3);
        coordinator.set_online(false);

        let result = coordinator.sync_now().await;
        assert_eq!(result.skipped, Some(SkipReason::Offline));
        assert!(!result.success);
        assert_eq!(transport.call_count(), 0);
        assert_eq!(coordinator.pending().len(), 1);
    }

    #[tokio::test]
    async fn retryable_failure_keeps_task_pending() {
        let (coordinator, transport) = setup(SyncConfig::default());
        transport.set_default_response(Err(Failure::status(503, "")));
        let id = add(&coordinator, "members", 2);

        let first = coordinator.sync_now().await;
        assert!(!first.success);
        assert_eq!(first.retrying_tasks.len(), 1);
        assert_eq!(first.max_retry_attempt(), Some(1));
        assert_eq!(first.errors.len(), 1);

        let second = coordinator.sync_now().await;
        assert_eq!(second.failed_tasks.len(), 1);
        let task = coordinator.queue().get(id.as_str()).unwrap();
        assert_eq!((task.state, task.attempt), (TaskState::Failed, 2));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn auth_failure_fails_immediately() {
        let (coordinator, transport) = setup(SyncConfig::default());
        transport.push_response(Err(Failure::status(401, "")));
        add(&coordinator, "members", 3);

        let result = coordinator.sync_now().await;
        assert_eq!(result.failed_tasks.len(), 1);
        let task = &result.failed_tasks[0];
        assert_eq!(task.attempt, 1);
        assert_eq!(task.last_error.as_ref().map(|e| e.kind), Some(ErrorKind::Auth));
    }

    #[tokio::test]
    async fn retry_failed_tasks_replays() {
        let (coordinator, transport) = setup(SyncConfig::default());
        transport.push_response(Err(Failure::status(400, "")));
        add(&coordinator, "members", 3);

        coordinator.sync_now().await;
        assert_eq!(coordinator.failed().len(), 1);

        let result = coordinator.retry_failed_tasks().await;
        assert!(result.success);
        assert_eq!(result.synced_tasks.len(), 1);
        assert!(coordinator.failed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_trigger_is_skipped() {
        let (coordinator, transport) = setup(SyncConfig::default());
        transport.set_delay(Some(Duration::from_secs(1)));
        add(&coordinator, "members", 3);

        let background = Arc::clone(&coordinator);
        let first = tokio::spawn(async move { background.sync_now().await });
        tokio::task::yield_now().await;
        while !coordinator.is_running() {
            tokio::task::yield_now().await;
        }

        let second = coordinator.sync_now().await;
        assert_eq!(second.skipped, Some(SkipReason::AlreadyRunning));

        let first = first.await.unwrap();
        assert!(first.success);
        assert!(!coordinator.is_running());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn events_are_published() {
        let (coordinator, transport) = setup(SyncConfig::default());
        transport.push_response(Err(Failure::status(500, "")));
        let mut events = coordinator.subscribe();
        let id = add(&coordinator, "members", 3);

        coordinator.sync_now().await;

        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::CycleStarted { pending: 1 }
        );
        match events.recv().await.unwrap() {
            SyncEvent::TaskRetrying { id: got, attempt, .. } => {
                assert_eq!(got, id);
                assert_eq!(attempt, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::CycleFinished {
                synced: 0,
                failed: 0,
                retrying: 1,
                success: false
            }
        );
    }

    #[tokio::test]
    async fn background_registered_while_offline() {
        let transport = Arc::new(MockTransport::new());
        let trigger = Arc::new(MockBackgroundTrigger::new());
        let coordinator = SyncCoordinator::new(
            Arc::new(SyncTaskQueue::in_memory()),
            transport as Arc<dyn DataStoreTransport>,
            Arc::new(RequestExecutor::default()),
            SyncConfig::default(),
        )
        .with_background_trigger(Arc::clone(&trigger) as Arc<dyn BackgroundTrigger>);
        assert!(coordinator.is_background_sync_available());

        add(&coordinator, "members", 3);
        assert!(trigger.registrations().is_empty());

        coordinator.set_online(false);
        add(&coordinator, "members", 3);
        assert_eq!(trigger.registrations(), vec![BACKGROUND_SYNC_TAG]);

        coordinator.set_online(true);
        let result = coordinator.on_background_sync().await;
        assert_eq!(result.synced_tasks.len(), 2);
    }

    #[tokio::test]
    async fn check_backend_uses_health_check() {
        let (coordinator, transport) = setup(SyncConfig::default());
        assert!(coordinator.check_backend().await.is_ok());

        transport.set_health(Err(Failure::status(403, "")));
        let err = coordinator.check_backend().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Auth);
    }

    #[tokio::test]
    async fn sync_stats_accumulate() {
        let (coordinator, _) = setup(SyncConfig::default());
        add(&coordinator, "a", 3);
        add(&coordinator, "b", 3);
        coordinator.sync_now().await;
        coordinator.set_online(false);
        coordinator.sync_now().await;

        let stats = coordinator.sync_stats();
        assert_eq!(stats.cycles_completed, 1);
        assert_eq!(stats.cycles_skipped, 1);
        assert_eq!(stats.tasks_synced, 2);
        assert!(stats.last_sync_time.is_some());
    }
}
