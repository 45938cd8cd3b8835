//! `reqwest`-backed [`HttpProber`].

use crate::classify::Failure;
use crate::probe::HttpProber;
use crate::BoxFuture;
use std::time::Duration;

/// HTTP prober using a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestProber {
    client: reqwest::Client,
}

impl ReqwestProber {
    /// Creates a prober with its own client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("resync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Creates a prober over an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpProber for ReqwestProber {
    fn head<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<u16, Failure>> {
        Box::pin(async move {
            let mut request = self.client.head(url).timeout(timeout);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
            let response = request.send().await?;
            Ok(response.status().as_u16())
        })
    }
}
