//! Resilient request execution.

use crate::classify::{ClassifiedError, ErrorKind, Failure};
use crate::config::RetryPolicy;
use crate::unix_millis;
use parking_lot::RwLock;
use serde::Serialize;
use std::future::Future;

/// Counters and the last outcome seen by a [`RequestExecutor`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestDiagnostics {
    /// Calls that eventually succeeded.
    pub successes: u64,
    /// Calls that gave up with an error.
    pub failures: u64,
    /// Retries performed across all calls.
    pub retries: u64,
    /// Unix millis of the last successful call.
    pub last_success_at_ms: Option<u64>,
    /// Label of the last call that gave up.
    pub last_failed_label: Option<String>,
    /// Error of the last call that gave up.
    pub last_error: Option<ClassifiedError>,
}

/// Wraps outbound calls with a per-attempt timeout and capped exponential
/// backoff.
///
/// The executor is shared; every call updates one [`RequestDiagnostics`]
/// snapshot.
///
/// # Example
///
/// ```rust
/// use resync_net::{Failure, RequestExecutor};
///
/// # async fn demo() {
/// let executor = RequestExecutor::default();
/// let value = executor
///     .execute("ping", 3, || async { Ok::<_, Failure>(42) })
///     .await
///     .unwrap();
/// assert_eq!(value, 42);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RequestExecutor {
    policy: RetryPolicy,
    diagnostics: RwLock<RequestDiagnostics>,
}

impl RequestExecutor {
    /// Creates an executor with the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            diagnostics: RwLock::new(RequestDiagnostics::default()),
        }
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns a snapshot of the diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> RequestDiagnostics {
        self.diagnostics.read().clone()
    }

    /// Clears all counters and the last error.
    pub fn reset_diagnostics(&self) {
        *self.diagnostics.write() = RequestDiagnostics::default();
    }

    /// Runs `request` until it succeeds, fails terminally, or `max_attempts`
    /// attempts have been made.
    ///
    /// Each attempt is bounded by the policy's request timeout. A timeout is
    /// terminal for the call. Non-retryable failures return immediately.
    /// `max_attempts == 0` is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns the classified error of the last attempt.
    pub async fn execute<T, F, Fut>(
        &self,
        label: &str,
        max_attempts: u32,
        mut request: F,
    ) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.policy.request_timeout, request()).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(Failure::Timeout),
            };

            let failure = match outcome {
                Ok(value) => {
                    self.record_success();
                    if attempt > 1 {
                        tracing::debug!(label, attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let error = ClassifiedError::from_failure(&failure);
            let terminal = error.kind == ErrorKind::Timeout || !error.retryable;
            if terminal || attempt >= max_attempts {
                tracing::warn!(
                    label,
                    attempt,
                    max_attempts,
                    kind = %error.kind,
                    error = %error.message,
                    "request failed"
                );
                self.record_failure(label, &error);
                return Err(error);
            }

            let delay = self.policy.backoff(attempt);
            tracing::warn!(
                label,
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error.message,
                "request failed, retrying"
            );
            self.diagnostics.write().retries += 1;
            tokio::time::sleep(delay).await;
        }
    }

    fn record_success(&self) {
        let mut diag = self.diagnostics.write();
        diag.successes += 1;
        diag.last_success_at_ms = Some(unix_millis());
    }

    fn record_failure(&self, label: &str, error: &ClassifiedError) {
        let mut diag = self.diagnostics.write();
        diag.failures += 1;
        diag.last_failed_label = Some(label.to_string());
        diag.last_error = Some(error.clone());
    }
}
