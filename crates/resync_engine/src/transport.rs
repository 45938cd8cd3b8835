//! Transport layer abstraction for replaying tasks.

use crate::task::{Operation, Payload};
use parking_lot::Mutex;
use resync_net::{BoxFuture, Failure};
use std::collections::VecDeque;
use std::time::Duration;

/// The remote data store, as seen by the coordinator.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (REST client, SDK wrapper, mock for testing, etc.).
/// Delivery is at-least-once, so implementations should be idempotent
/// where the remote store allows it.
pub trait DataStoreTransport: Send + Sync {
    /// Creates a record in `entity`.
    fn create<'a>(&'a self, entity: &'a str, payload: &'a Payload) -> BoxFuture<'a, Result<(), Failure>>;

    /// Updates a record in `entity`.
    fn update<'a>(&'a self, entity: &'a str, payload: &'a Payload) -> BoxFuture<'a, Result<(), Failure>>;

    /// Deletes a record in `entity`.
    fn delete<'a>(&'a self, entity: &'a str, payload: &'a Payload) -> BoxFuture<'a, Result<(), Failure>>;

    /// Checks that the remote store is reachable and accepts our credentials.
    fn health_check(&self) -> BoxFuture<'_, Result<(), Failure>>;
}

/// Dispatches one operation to the matching transport method.
pub fn send<'a, T: DataStoreTransport + ?Sized>(
    transport: &'a T,
    operation: Operation,
    entity: &'a str,
    payload: &'a Payload,
) -> BoxFuture<'a, Result<(), Failure>> {
    match operation {
        Operation::Create => transport.create(entity, payload),
        Operation::Update => transport.update(entity, payload),
        Operation::Delete => transport.delete(entity, payload),
    }
}

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCall {
    /// The operation sent.
    pub operation: Operation,
    /// The entity addressed.
    pub entity: String,
    /// The payload sent.
    pub payload: Payload,
}

/// A mock transport for testing.
///
/// Responses are consumed in order; once the queue is empty the default
/// response is returned.
#[derive(Debug)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<(), Failure>>>,
    default_response: Mutex<Result<(), Failure>>,
    health: Mutex<Result<(), Failure>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<TransportCall>>,
}

impl MockTransport {
    /// Creates a mock that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_response: Mutex::new(Ok(())),
            health: Mutex::new(Ok(())),
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queues a response for the next call.
    pub fn push_response(&self, response: Result<(), Failure>) {
        self.responses.lock().push_back(response);
    }

    /// Sets the response used once queued responses run out.
    pub fn set_default_response(&self, response: Result<(), Failure>) {
        *self.default_response.lock() = response;
    }

    /// Sets the health check response.
    pub fn set_health(&self, response: Result<(), Failure>) {
        *self.health.lock() = response;
    }

    /// Makes every call take `delay` before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Returns the calls made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn respond<'a>(
        &'a self,
        operation: Operation,
        entity: &'a str,
        payload: &'a Payload,
    ) -> BoxFuture<'a, Result<(), Failure>> {
        self.calls.lock().push(TransportCall {
            operation,
            entity: entity.to_string(),
            payload: payload.clone(),
        });
        let response = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_response.lock().clone());
        let delay = *self.delay.lock();
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            response
        })
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStoreTransport for MockTransport {
    fn create<'a>(&'a self, entity: &'a str, payload: &'a Payload) -> BoxFuture<'a, Result<(), Failure>> {
        self.respond(Operation::Create, entity, payload)
    }

    fn update<'a>(&'a self, entity: &'a str, payload: &'a Payload) -> BoxFuture<'a, Result<(), Failure>> {
        self.respond(Operation::Update, entity, payload)
    }

    fn delete<'a>(&'a self, entity: &'a str, payload: &'a Payload) -> BoxFuture<'a, Result<(), Failure>> {
        self.respond(Operation::Delete, entity, payload)
    }

    fn health_check(&self) -> BoxFuture<'_, Result<(), Failure>> {
        let response = self.health.lock().clone();
        Box::pin(async move { response })
    }
}
