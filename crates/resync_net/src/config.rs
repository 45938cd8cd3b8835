//! Configuration for probing and request execution.

use std::time::Duration;

/// Default internet reachability endpoints, tried in order.
const DEFAULT_INTERNET_ENDPOINTS: [&str; 3] = [
    "https://httpbin.org/status/200",
    "https://www.google.com/favicon.ico",
    "https://api.github.com/zen",
];

/// Timeout and backoff for outbound requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Timeout applied to each attempt.
    pub request_timeout: Duration,
}

impl RetryPolicy {
    /// Creates the default policy: 1 s base, 5 s cap, 10 s timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-indexed).
    ///
    /// `min(base_delay * 2^(attempt-1), max_delay)`; zero for attempt 0.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Endpoints and limits for the connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Public endpoints used to detect internet reachability.
    pub internet_endpoints: Vec<String>,
    /// Backend health URL, if any.
    pub backend_url: Option<String>,
    /// Headers sent with the backend health request.
    pub backend_headers: Vec<(String, String)>,
    /// Timeout for each probe request.
    pub timeout: Duration,
}

impl ProbeConfig {
    /// Creates a config with the default internet endpoints and no backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            internet_endpoints: DEFAULT_INTERNET_ENDPOINTS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            backend_url: None,
            backend_headers: Vec::new(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Sets the backend health URL.
    #[must_use]
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Adds a header to the backend health request.
    #[must_use]
    pub fn with_backend_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.backend_headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the internet endpoints.
    #[must_use]
    pub fn with_internet_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.internet_endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-request probe timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Shortest interval the connectivity monitor probes at.
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the periodic connectivity monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between probes, at least [`MIN_PROBE_INTERVAL`].
    pub interval: Duration,
    /// Treat the link as offline unless the internet or backend answers.
    ///
    /// When false, only the local adapter flag decides.
    pub require_reachability: bool,
}

impl MonitorConfig {
    /// Creates the default config: probe every 30 s, adapter flag only.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(30),
            require_reachability: false,
        }
    }

    /// Sets the probe interval, raised to [`MIN_PROBE_INTERVAL`] if shorter.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_PROBE_INTERVAL);
        self
    }

    /// Returns the interval the monitor actually probes at.
    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        self.interval.max(MIN_PROBE_INTERVAL)
    }

    /// Sets whether reachability is required to count as online.
    #[must_use]
    pub fn with_require_reachability(mut self, require: bool) -> Self {
        self.require_reachability = require;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}
