// # HTTP IP Source
//
// This crate provides the HTTP-based external IP source for ipbeacon.
//
// ## Architecture
//
// Issues one GET per `fetch()` against a public echo service that answers
// with the caller's address as plain text (ipify by default). The response
// is trimmed and must parse as an IP address; anything else is treated as a
// network failure so that an error page never reaches the chat channel.
//
// Polling, retries and change detection belong to the `Poller`.

use ipbeacon_core::traits::IpSource;
use ipbeacon_core::{DEFAULT_IP_CHECK_URL, Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default HTTP timeout for the echo request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based external IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(Error::config(format!(
                "IP check URL must use HTTP or HTTPS scheme. Got: {}",
                url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    /// Create a source for the default echo service
    pub fn ipify() -> Result<Self> {
        Self::new(DEFAULT_IP_CHECK_URL)
    }

    /// URL this source queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn fetch(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::network(format!(
                "{} answered with HTTP {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))?;

        let ip_text = body.trim();
        if ip_text.is_empty() {
            return Err(Error::network(format!("{} returned an empty body", self.url)));
        }

        let ip: IpAddr = ip_text
            .parse()
            .map_err(|_| Error::network(format!("Invalid IP address: {}", ip_text)))?;

        tracing::debug!("{} reports external IP {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
