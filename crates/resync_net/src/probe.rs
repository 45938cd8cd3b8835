//! Connectivity probing.
//!
//! The probe answers "can we talk to the backend right now, and how well?"
//! It is advisory: it never fails, and nothing in the sync path gates on it.

use crate::classify::{ClassifiedError, Failure};
use crate::config::ProbeConfig;
use crate::executor::RequestDiagnostics;
use crate::{unix_millis, BoxFuture};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Local network adapter state, as reported by the platform.
pub trait NetworkAdapter: Send + Sync {
    /// Returns true if the platform believes a network is attached.
    fn is_online(&self) -> bool;
}

/// An adapter that always reports online.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl NetworkAdapter for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Minimal HTTP access needed by the probe.
pub trait HttpProber: Send + Sync {
    /// Sends a HEAD request and returns the response status.
    ///
    /// A response with any status is `Ok`; only transport-level problems
    /// are `Err`.
    fn head<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<u16, Failure>>;
}

/// Overall link grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    /// Internet and backend reachable.
    Excellent,
    /// Either the internet or the backend reachable.
    Good,
    /// Adapter online but nothing answered.
    Poor,
    /// Adapter offline.
    Offline,
}

impl ConnectionQuality {
    /// Derives the grade from the three reachability flags.
    #[must_use]
    pub fn from_flags(is_online: bool, can_reach_internet: bool, can_reach_backend: bool) -> Self {
        match (is_online, can_reach_internet, can_reach_backend) {
            (false, _, _) => ConnectionQuality::Offline,
            (true, true, true) => ConnectionQuality::Excellent,
            (true, true, false) | (true, false, true) => ConnectionQuality::Good,
            (true, false, false) => ConnectionQuality::Poor,
        }
    }

    /// Returns the lowercase name of the grade.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionQuality::Excellent => "excellent",
            ConnectionQuality::Good => "good",
            ConnectionQuality::Poor => "poor",
            ConnectionQuality::Offline => "offline",
        }
    }
}

/// Outcome of the backend health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    /// The health endpoint answered 2xx or 3xx.
    Connected,
    /// The health endpoint answered 401 or 403.
    Unauthorized,
    /// No usable answer.
    Unreachable,
    /// No backend URL configured.
    NotConfigured,
}

/// A connectivity snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityDiagnostics {
    /// Local adapter flag.
    pub is_online: bool,
    /// At least one internet endpoint answered.
    pub can_reach_internet: bool,
    /// The backend health endpoint answered successfully.
    pub can_reach_backend: bool,
    /// Grade derived from the flags above.
    pub quality: ConnectionQuality,
    /// Detailed backend outcome.
    pub backend_status: BackendStatus,
    /// Round trip of the backend health request.
    pub latency_ms: Option<u64>,
    /// Unix millis when the snapshot was taken.
    pub checked_at_ms: u64,
    /// Most recent error seen by the request executor, if merged in.
    pub last_error: Option<ClassifiedError>,
}

impl ConnectivityDiagnostics {
    /// Builds a snapshot, deriving the quality from the flags.
    #[must_use]
    pub fn new(
        is_online: bool,
        can_reach_internet: bool,
        backend_status: BackendStatus,
        latency: Option<Duration>,
    ) -> Self {
        let can_reach_backend = backend_status == BackendStatus::Connected;
        Self {
            is_online,
            can_reach_internet,
            can_reach_backend,
            quality: ConnectionQuality::from_flags(is_online, can_reach_internet, can_reach_backend),
            backend_status,
            latency_ms: latency.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            checked_at_ms: unix_millis(),
            last_error: None,
        }
    }

    /// Snapshot for an offline adapter.
    #[must_use]
    pub fn offline(backend_configured: bool) -> Self {
        let backend_status = if backend_configured {
            BackendStatus::Unreachable
        } else {
            BackendStatus::NotConfigured
        };
        Self::new(false, false, backend_status, None)
    }

    /// Attaches the executor's last error.
    #[must_use]
    pub fn with_request_diagnostics(mut self, diagnostics: &RequestDiagnostics) -> Self {
        self.last_error = diagnostics.last_error.clone();
        self
    }
}

/// Probes local, internet and backend reachability.
pub struct ConnectivityProbe {
    config: ProbeConfig,
    adapter: Arc<dyn NetworkAdapter>,
    http: Arc<dyn HttpProber>,
    last: RwLock<Option<ConnectivityDiagnostics>>,
}

impl ConnectivityProbe {
    /// Creates a probe over the given adapter and HTTP client.
    pub fn new(
        config: ProbeConfig,
        adapter: Arc<dyn NetworkAdapter>,
        http: Arc<dyn HttpProber>,
    ) -> Self {
        Self {
            config,
            adapter,
            http,
            last: RwLock::new(None),
        }
    }

    /// Returns the probe configuration.
    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Returns the snapshot from the most recent probe, if any.
    #[must_use]
    pub fn last_diagnostics(&self) -> Option<ConnectivityDiagnostics> {
        self.last.read().clone()
    }

    /// Runs a full probe and stores the result.
    ///
    /// Never fails. When the adapter reports offline no request is sent.
    pub async fn test_connectivity(&self) -> ConnectivityDiagnostics {
        let diagnostics = if self.adapter.is_online() {
            let can_reach_internet = self.check_internet().await;
            let (backend_status, latency) = self.check_backend().await;
            ConnectivityDiagnostics::new(true, can_reach_internet, backend_status, latency)
        } else {
            ConnectivityDiagnostics::offline(self.config.backend_url.is_some())
        };

        tracing::debug!(
            quality = diagnostics.quality.as_str(),
            internet = diagnostics.can_reach_internet,
            backend = diagnostics.can_reach_backend,
            "connectivity probed"
        );
        *self.last.write() = Some(diagnostics.clone());
        diagnostics
    }

    /// Returns true as soon as one internet endpoint answers.
    pub async fn check_internet(&self) -> bool {
        for url in &self.config.internet_endpoints {
            match self.http.head(url, &[], self.config.timeout).await {
                Ok(_) => return true,
                Err(failure) => {
                    tracing::warn!(url = %url, error = %failure, "internet endpoint unreachable");
                }
            }
        }
        false
    }

    /// Sends the backend health request.
    ///
    /// Returns the outcome and the measured latency of any answer.
    pub async fn check_backend(&self) -> (BackendStatus, Option<Duration>) {
        let Some(url) = self.config.backend_url.as_deref() else {
            return (BackendStatus::NotConfigured, None);
        };

        let started = tokio::time::Instant::now();
        match self
            .http
            .head(url, &self.config.backend_headers, self.config.timeout)
            .await
        {
            Ok(code) => {
                let latency = started.elapsed();
                let status = match code {
                    200..=399 => BackendStatus::Connected,
                    401 | 403 => BackendStatus::Unauthorized,
                    _ => {
                        tracing::warn!(url, status = code, "backend health check failed");
                        BackendStatus::Unreachable
                    }
                };
                (status, Some(latency))
            }
            Err(failure) => {
                tracing::warn!(url, error = %failure, "backend unreachable");
                (BackendStatus::Unreachable, None)
            }
        }
    }
}

impl std::fmt::Debug for ConnectivityProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityProbe")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Adapter(AtomicBool);

    impl NetworkAdapter for Adapter {
        fn is_online(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct FakeHttp {
        answers: HashMap<String, Result<u16, Failure>>,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl FakeHttp {
        fn answer(mut self, url: &str, outcome: Result<u16, Failure>) -> Self {
            self.answers.insert(url.to_string(), outcome);
            self
        }
    }

    impl HttpProber for FakeHttp {
        fn head<'a>(
            &'a self,
            url: &'a str,
            headers: &'a [(String, String)],
            _timeout: Duration,
        ) -> BoxFuture<'a, Result<u16, Failure>> {
            self.requests
                .lock()
                .push((url.to_string(), headers.to_vec()));
            let outcome = self
                .answers
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(Failure::connect("no route")));
            Box::pin(async move { outcome })
        }
    }

    fn probe(online: bool, config: ProbeConfig, http: FakeHttp) -> (ConnectivityProbe, Arc<FakeHttp>) {
        let http = Arc::new(http);
        let probe = ConnectivityProbe::new(
            config,
            Arc::new(Adapter(AtomicBool::new(online))),
            Arc::clone(&http) as Arc<dyn HttpProber>,
        );
        (probe, http)
    }

    fn config() -> ProbeConfig {
        ProbeConfig::new()
            .with_internet_endpoints(["https://a.test", "https://b.test"])
            .with_backend_url("https://api.test/health")
            .with_backend_header("X-Project", "p1")
    }

    #[test]
    fn quality_truth_table() {
        use ConnectionQuality::*;
        assert_eq!(ConnectionQuality::from_flags(true, true, true), Excellent);
        assert_eq!(ConnectionQuality::from_flags(true, true, false), Good);
        assert_eq!(ConnectionQuality::from_flags(true, false, true), Good);
        assert_eq!(ConnectionQuality::from_flags(true, false, false), Poor);
        assert_eq!(ConnectionQuality::from_flags(false, true, true), Offline);
    }

    #[tokio::test]
    async fn offline_adapter_sends_nothing() {
        let (probe, http) = probe(false, config(), FakeHttp::default());
        let diag = probe.test_connectivity().await;

        assert_eq!(diag.quality, ConnectionQuality::Offline);
        assert_eq!(diag.backend_status, BackendStatus::Unreachable);
        assert!(http.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn excellent_when_everything_answers() {
        let http = FakeHttp::default()
            .answer("https://a.test", Ok(200))
            .answer("https://api.test/health", Ok(204));
        let (probe, http) = probe(true, config(), http);

        let diag = probe.test_connectivity().await;
        assert_eq!(diag.quality, ConnectionQuality::Excellent);
        assert_eq!(diag.backend_status, BackendStatus::Connected);
        assert!(diag.latency_ms.is_some());

        // First internet endpoint answered, so the second is skipped.
        let requests = http.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].1, vec![("X-Project".to_string(), "p1".to_string())]);
    }

    #[tokio::test]
    async fn falls_back_to_next_internet_endpoint() {
        let http = FakeHttp::default().answer("https://b.test", Ok(404));
        let (probe, _) = probe(true, config(), http);

        assert!(probe.check_internet().await);
    }

    #[tokio::test]
    async fn unauthorized_backend_is_not_reachable() {
        let http = FakeHttp::default()
            .answer("https://a.test", Ok(200))
            .answer("https://api.test/health", Ok(401));
        let (probe, _) = probe(true, config(), http);

        let diag = probe.test_connectivity().await;
        assert_eq!(diag.backend_status, BackendStatus::Unauthorized);
        assert!(!diag.can_reach_backend);
        assert_eq!(diag.quality, ConnectionQuality::Good);
    }

    #[tokio::test]
    async fn backend_without_internet_is_good() {
        let http = FakeHttp::default().answer("https://api.test/health", Ok(200));
        let (probe, _) = probe(true, config(), http);

        let diag = probe.test_connectivity().await;
        assert!(!diag.can_reach_internet);
        assert_eq!(diag.quality, ConnectionQuality::Good);
    }

    #[tokio::test]
    async fn nothing_answers_is_poor() {
        let (probe, _) = probe(true, config(), FakeHttp::default());
        let diag = probe.test_connectivity().await;
        assert_eq!(diag.quality, ConnectionQuality::Poor);
        assert_eq!(diag.backend_status, BackendStatus::Unreachable);
    }

    #[tokio::test]
    async fn no_backend_configured() {
        let http = FakeHttp::default().answer("https://a.test", Ok(200));
        let mut config = config();
        config.backend_url = None;
        let (probe, _) = probe(true, config, http);

        let diag = probe.test_connectivity().await;
        assert_eq!(diag.backend_status, BackendStatus::NotConfigured);
        assert_eq!(diag.quality, ConnectionQuality::Good);
    }

    #[tokio::test]
    async fn last_diagnostics_is_stored() {
        let (probe, _) = probe(true, config(), FakeHttp::default());
        assert!(probe.last_diagnostics().is_none());

        let diag = probe.test_connectivity().await;
        assert_eq!(probe.last_diagnostics(), Some(diag));
    }

    #[test]
    fn merges_request_diagnostics() {
        let request = RequestDiagnostics {
            last_error: Some(ClassifiedError::from(Failure::Timeout)),
            ..RequestDiagnostics::default()
        };
        let diag = ConnectivityDiagnostics::offline(false).with_request_diagnostics(&request);
        assert_eq!(diag.last_error, request.last_error);
    }
}
