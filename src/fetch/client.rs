//! HTTP client wrapper for JSON GET requests.
//!
//! This module provides the `HttpClient` struct which owns one pooled
//! `reqwest::Client` with timeout and User-Agent policy applied.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use crate::user_agent;

/// Timeout and identity settings used to build a batch client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    pub read_timeout_secs: u64,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            user_agent: user_agent::default_user_agent(),
        }
    }
}

impl ClientSettings {
    /// Default settings with explicit timeouts.
    #[must_use]
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self {
            connect_timeout_secs,
            read_timeout_secs,
            ..Self::default()
        }
    }
}

/// HTTP client for JSON GET requests.
///
/// Cloning is cheap and shares the connection pool, so one client serves a
/// whole batch of concurrent requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Builds a client from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when the TLS backend or system
    /// configuration cannot be initialized.
    #[instrument(level = "debug")]
    pub fn new(settings: &ClientSettings) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .read_timeout(Duration::from_secs(settings.read_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .gzip(true)
            .build()
            .map_err(|source| FetchError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Issues one GET and parses a 200 body as JSON.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` is not an absolute http(s) URL
    /// - [`FetchError::Network`] / [`FetchError::Timeout`] on transport failure
    /// - [`FetchError::HttpStatus`] for any status other than 200
    /// - [`FetchError::Decode`] if the body is not JSON
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(url));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status().as_u16();
        debug!(status, "response received");
        if status != 200 {
            return Err(FetchError::http_status(url, status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url, e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::decode(url, e))
    }
}
