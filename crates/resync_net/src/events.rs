//! Connectivity change events.

use crate::probe::NetworkAdapter;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

/// A connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// The link came up.
    Online,
    /// The link went down.
    Offline,
}

impl ConnectivityEvent {
    /// Returns the event matching an online flag.
    #[must_use]
    pub fn from_online(online: bool) -> Self {
        if online {
            ConnectivityEvent::Online
        } else {
            ConnectivityEvent::Offline
        }
    }

    /// Returns true for [`ConnectivityEvent::Online`].
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectivityEvent::Online)
    }
}

/// Anything that reports connectivity transitions.
pub trait ConnectivityEventSource: Send + Sync {
    /// Returns a receiver for future transitions.
    fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent>;
}

/// A connectivity source driven by platform glue.
///
/// Call [`set_online`](Self::set_online) from whatever observes the network
/// (OS callbacks, a UI toggle, tests). Only transitions are broadcast.
/// It also serves as the [`NetworkAdapter`] for a probe.
#[derive(Debug)]
pub struct ManualConnectivity {
    online: AtomicBool,
    tx: broadcast::Sender<ConnectivityEvent>,
}

impl ManualConnectivity {
    /// Creates a source with the given initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            online: AtomicBool::new(online),
            tx,
        }
    }

    /// Updates the state; returns true if it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }
        tracing::info!(online, "connectivity changed");
        // No subscribers is fine.
        let _ = self.tx.send(ConnectivityEvent::from_online(online));
        true
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkAdapter for ManualConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

impl ConnectivityEventSource for ManualConnectivity {
    fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.tx.subscribe()
    }
}
