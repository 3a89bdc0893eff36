//! A `reqwest::Client` tuned for sustained, highly concurrent polling of a
//! single upstream host.

use crate::error::PipelineError;
use std::time::Duration;

/// Fixed connection-pool and timeout tuning. Values are a direct port of a
/// transport built for exactly this access pattern: many short-lived
/// requests to one host, kept warm rather than opened per request.
///
/// There's only ever one upstream host in play, so `pool_idle_per_host`
/// already bounds the total idle pool; reqwest has no separate "total
/// across hosts" knob to wire a second cap into.
#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub max_idle_connections_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub connect_timeout: Duration,
    /// Upper bound on time-to-first-byte. reqwest has no header-only
    /// timeout knob, so this wraps the `send()` future (which resolves once
    /// headers arrive, before the body is read) in `tokio::time::timeout`.
    pub header_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            max_idle_connections_per_host: 15,
            pool_idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            header_timeout: Duration::from_secs(40),
        }
    }
}

/// Thin wrapper around `reqwest::Client` that classifies transport failures
/// into [`PipelineError`] the same way for every call site.
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
    header_timeout: Duration,
}

impl Client {
    /// # Errors
    ///
    /// Returns an error if the underlying TLS/connector setup fails.
    pub fn new(config: ClientConfig) -> Result<Self, PipelineError> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_connections_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .tcp_nodelay(true)
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .build()
            .map_err(|e| PipelineError::net(e.to_string()))?;
        Ok(Self { inner, header_timeout: config.header_timeout })
    }

    #[must_use]
    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.inner.get(url)
    }

    #[must_use]
    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.inner.post(url)
    }

    /// Sends a request, enforcing the header deadline, classifying any
    /// transport failure via [`PipelineError::from_reqwest`], mapping
    /// non-2xx responses (after reading the body for the error message)
    /// onto [`PipelineError::Http`], and treating a 200 with an empty body
    /// as [`PipelineError::EmptyResult`] rather than letting it fall through
    /// to a parse error downstream.
    ///
    /// # Errors
    ///
    /// Returns an error if the header deadline is exceeded, the request
    /// fails at the transport level, the response status is not a success
    /// code, or the response body is empty.
    pub async fn execute_buffered(&self, request: reqwest::RequestBuilder) -> Result<String, PipelineError> {
        let response = tokio::time::timeout(self.header_timeout, request.send())
            .await
            .map_err(|_| PipelineError::timeout("header deadline exceeded"))?
            .map_err(PipelineError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::http(status.as_u16(), body));
        }
        let body = response.text().await.map_err(PipelineError::from_reqwest)?;
        if body.is_empty() {
            return Err(PipelineError::empty_result("empty response body"));
        }
        Ok(body)
    }
}
