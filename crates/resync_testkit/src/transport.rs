//! A scripted transport for ordering and concurrency tests.

use parking_lot::Mutex;
use resync_engine::{DataStoreTransport, Operation, Payload};
use resync_net::{BoxFuture, Failure};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One call seen by a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Entity addressed.
    pub entity: String,
    /// Operation sent.
    pub operation: Operation,
    /// Payload sent.
    pub payload: Payload,
}

/// A transport with per-entity scripted responses.
///
/// Each entity has its own response queue; an entity with nothing scripted
/// succeeds. Every call optionally sleeps for a fixed latency, which makes
/// overlapping calls observable through the concurrency counters.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Result<(), Failure>>>>,
    log: Mutex<Vec<CallRecord>>,
    active: Mutex<HashMap<String, usize>>,
    active_total: AtomicUsize,
    max_per_entity: AtomicUsize,
    max_total: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl ScriptedTransport {
    /// Creates a transport that accepts everything instantly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call take `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = Some(latency);
        self
    }

    /// Appends responses for `entity`.
    pub fn script<I>(&self, entity: &str, responses: I)
    where
        I: IntoIterator<Item = Result<(), Failure>>,
    {
        self.scripts
            .lock()
            .entry(entity.to_string())
            .or_default()
            .extend(responses);
    }

    /// Returns every call in the order it started.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.log.lock().clone()
    }

    /// Returns the payloads sent for `entity`, in order.
    pub fn payloads_for(&self, entity: &str) -> Vec<Payload> {
        self.log
            .lock()
            .iter()
            .filter(|c| c.entity == entity)
            .map(|c| c.payload.clone())
            .collect()
    }

    /// Highest number of overlapping calls for a single entity.
    pub fn max_concurrency_per_entity(&self) -> usize {
        self.max_per_entity.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping calls overall.
    pub fn max_concurrency(&self) -> usize {
        self.max_total.load(Ordering::SeqCst)
    }

    fn call<'a>(
        &'a self,
        operation: Operation,
        entity: &'a str,
        payload: &'a Payload,
    ) -> BoxFuture<'a, Result<(), Failure>> {
        Box::pin(async move {
            self.log.lock().push(CallRecord {
                entity: entity.to_string(),
                operation,
                payload: payload.clone(),
            });
            let for_entity = {
                let mut active = self.active.lock();
                let count = active.entry(entity.to_string()).or_default();
                *count += 1;
                *count
            };
            let total = self.active_total.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_per_entity.fetch_max(for_entity, Ordering::SeqCst);
            self.max_total.fetch_max(total, Ordering::SeqCst);

            let latency = *self.latency.lock();
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            if let Some(count) = self.active.lock().get_mut(entity) {
                *count -= 1;
            }
            self.active_total.fetch_sub(1, Ordering::SeqCst);

            self.scripts
                .lock()
                .get_mut(entity)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Ok(()))
        })
    }
}

impl DataStoreTransport for ScriptedTransport {
    fn create<'a>(&'a self, entity: &'a str, payload: &'a Payload) -> BoxFuture<'a, Result<(), Failure>> {
        self.call(Operation::Create, entity, payload)
    }

    fn update<'a>(&'a self, entity: &'a str, payload: &'a Payload) -> BoxFuture<'a, Result<(), Failure>> {
        self.call(Operation::Update, entity, payload)
    }

    fn delete<'a>(&'a self, entity: &'a str, payload: &'a Payload) -> BoxFuture<'a, Result<(), Failure>> {
        self.call(Operation::Delete, entity, payload)
    }

    fn health_check(&self) -> BoxFuture<'_, Result<(), Failure>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripts_are_per_entity() {
        let transport = ScriptedTransport::new();
        transport.script("a", [Err(Failure::status(500, ""))]);
        let payload = Payload::default();

        assert!(transport.create("b", &payload).await.is_ok());
        assert!(transport.create("a", &payload).await.is_err());
        assert!(transport.create("a", &payload).await.is_ok());
        assert_eq!(transport.calls().len(), 3);
        assert_eq!(transport.payloads_for("a").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_overlap() {
        let transport = ScriptedTransport::new().with_latency(Duration::from_millis(10));
        let payload = Payload::default();

        let (a, b) = tokio::join!(
            transport.create("a", &payload),
            transport.update("b", &payload)
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.max_concurrency(), 2);
        assert_eq!(transport.max_concurrency_per_entity(), 1);
    }
}
