//! Background sync worker.
//!
//! The worker owns the scheduling side of the engine: it runs a cycle at
//! start-up, on explicit requests, on every offline-to-online transition,
//! on the periodic interval and after the backoff of retrying tasks. All
//! cycles go through [`SyncCoordinator::sync_now`], so single-flight still
//! holds when the host application triggers cycles itself.

use crate::coordinator::{SkipReason, SyncCoordinator, SyncCycleResult};
use resync_net::{ConnectivityEvent, ConnectivityEventSource};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Drives a [`SyncCoordinator`] from a background task.
pub struct SyncWorker {
    coordinator: Arc<SyncCoordinator>,
    connectivity: Option<Arc<dyn ConnectivityEventSource>>,
}

impl SyncWorker {
    /// Creates a worker for `coordinator`.
    #[must_use]
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self {
            coordinator,
            connectivity: None,
        }
    }

    /// Follows connectivity transitions from `source`.
    #[must_use]
    pub fn with_connectivity(mut self, source: Arc<dyn ConnectivityEventSource>) -> Self {
        self.connectivity = Some(source);
        self
    }

    /// Spawns the worker loop; it stops when `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> SyncWorkerHandle {
        let token = shutdown.clone();
        let task = tokio::spawn(self.run(token));
        SyncWorkerHandle { shutdown, task }
    }

    async fn run(self, shutdown: CancellationToken) {
        let coordinator = self.coordinator;
        let config = coordinator.config().clone();
        let mut events = self.connectivity.as_ref().map(|source| source.subscribe());
        let mut interval = config.periodic_interval().map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut retry_at: Option<Instant> = None;

        tracing::info!(
            interval_secs = config.periodic_interval().map(|d| d.as_secs()),
            "sync worker started"
        );

        if config.sync_on_start {
            let result = coordinator.sync_now().await;
            retry_at = next_retry(&coordinator, &result);
        }

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                () = coordinator.wait_for_request() => {
                    tracing::debug!("sync requested");
                    let result = coordinator.sync_now().await;
                    retry_at = next_retry(&coordinator, &result);
                }

                event = recv_event(&mut events) => match event {
                    Ok(ConnectivityEvent::Online) => {
                        coordinator.set_online(true);
                        let result = coordinator.sync_now().await;
                        retry_at = next_retry(&coordinator, &result);
                    }
                    Ok(ConnectivityEvent::Offline) => {
                        coordinator.set_online(false);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "connectivity events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("connectivity source closed");
                        events = None;
                    }
                },

                () = tick(&mut interval) => {
                    tracing::debug!("periodic sync");
                    let result = coordinator.sync_now().await;
                    retry_at = next_retry(&coordinator, &result);
                }

                () = sleep_until(retry_at) => {
                    tracing::debug!("auto-retry sync");
                    retry_at = None;
                    let result = coordinator.sync_now().await;
                    retry_at = next_retry(&coordinator, &result);
                }
            }
        }

        tracing::info!("sync worker stopped");
    }
}

/// Handle to a running [`SyncWorker`].
#[derive(Debug)]
pub struct SyncWorkerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl SyncWorkerHandle {
    /// Returns true once the worker loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the worker and waits for the current cycle to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "sync worker panicked");
        }
    }
}

/// When to run the next auto-retry cycle, if any.
fn next_retry(coordinator: &SyncCoordinator, result: &SyncCycleResult) -> Option<Instant> {
    if !coordinator.config().auto_retry {
        return None;
    }
    let policy = coordinator.executor().policy();
    match result.skipped {
        None => result
            .max_retry_attempt()
            .map(|attempt| Instant::now() + policy.backoff(attempt)),
        // Someone else's cycle is running; look again shortly.
        Some(SkipReason::AlreadyRunning) if !coordinator.pending().is_empty() => {
            Some(Instant::now() + policy.backoff(1))
        }
        Some(_) => None,
    }
}

async fn recv_event(
    events: &mut Option<broadcast::Receiver<ConnectivityEvent>>,
) -> Result<ConnectivityEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
