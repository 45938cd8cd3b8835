//! Periodic connectivity monitor.

use crate::config::MonitorConfig;
use crate::events::{ConnectivityEvent, ConnectivityEventSource};
use crate::probe::{ConnectivityDiagnostics, ConnectivityProbe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Re-probes connectivity on an interval and broadcasts transitions.
///
/// The monitor assumes the link starts online, matching a freshly built
/// coordinator, so the first probe only emits if it finds the link down.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    probe: Arc<ConnectivityProbe>,
    config: MonitorConfig,
    online: AtomicBool,
    tx: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityMonitor {
    /// Creates a monitor over `probe`.
    #[must_use]
    pub fn new(probe: Arc<ConnectivityProbe>, config: MonitorConfig) -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            probe,
            config,
            online: AtomicBool::new(true),
            tx,
        }
    }

    /// Returns the last known state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Probes once, broadcasting a transition if the state changed.
    pub async fn check_once(&self) -> ConnectivityDiagnostics {
        let diagnostics = self.probe.test_connectivity().await;
        let online = if self.config.require_reachability {
            diagnostics.is_online && (diagnostics.can_reach_internet || diagnostics.can_reach_backend)
        } else {
            diagnostics.is_online
        };

        if self.online.swap(online, Ordering::SeqCst) != online {
            tracing::info!(online, quality = diagnostics.quality.as_str(), "connectivity changed");
            let _ = self.tx.send(ConnectivityEvent::from_online(online));
        }
        diagnostics
    }

    /// Spawns the probe loop; it runs until `shutdown` is cancelled.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.probe_interval());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.check_once().await;
                    }
                }
            }
            tracing::debug!("connectivity monitor stopped");
        })
    }
}

impl ConnectivityEventSource for ConnectivityMonitor {
    fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.tx.subscribe()
    }
}
