//! Read-only REST client for the monitoring server.
//!
//! Wraps the `/v1` query endpoints (monitors, plugins, monitor results)
//! using [`reqwest`]. The console uses it to seed the local store before
//! the push channel delivers its bootstrap snapshot.

use serde::de::DeserializeOwned;
use vigil_core::{Monitor, MonitorPlugin, MonitoringResult};

/// Default REST base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// API version prefix appended to the base URL.
const API_VERSION: &str = "v1";

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("Monitor API error ({status}): {body}")]
    Status {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// HTTP client for the monitoring server's query endpoints.
pub struct MonitorApi {
    client: reqwest::Client,
    base_url: String,
}

impl MonitorApi {
    /// `base_url` is the API root without the version prefix, e.g.
    /// `http://localhost:5000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /v1/systemmonitor`
    pub async fn list_monitors(&self) -> Result<Vec<Monitor>, ApiError> {
        self.get("systemmonitor").await
    }

    /// `GET /v1/systemmonitor/{id}`
    pub async fn get_monitor(&self, id: &str) -> Result<Monitor, ApiError> {
        self.get(&format!("systemmonitor/{id}")).await
    }

    /// `GET /v1/Plugins`
    pub async fn list_plugins(&self) -> Result<Vec<MonitorPlugin>, ApiError> {
        self.get("Plugins").await
    }

    /// `GET /v1/MonitorResults`
    pub async fn list_results(&self) -> Result<Vec<MonitoringResult>, ApiError> {
        self.get("MonitorResults").await
    }

    /// `GET /v1/MonitorResults/{id}`
    pub async fn list_results_by_id(&self, id: &str) -> Result<Vec<MonitoringResult>, ApiError> {
        self.get(&format!("MonitorResults/{id}")).await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}/{API_VERSION}/{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!(url = %url, "GET");
        let response = self.client.get(&url).send().await?;
        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`] with the
    /// status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_carry_the_version_prefix() {
        let api = MonitorApi::new(DEFAULT_BASE_URL);
        assert_eq!(api.url("systemmonitor"), "http://localhost:5000/api/v1/systemmonitor");
        assert_eq!(api.url("MonitorResults/m1"), "http://localhost:5000/api/v1/MonitorResults/m1");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = MonitorApi::new("http://example.test/api/");
        assert_eq!(api.base_url(), "http://example.test/api");
        assert_eq!(api.url("Plugins"), "http://example.test/api/v1/Plugins");
    }
}
