//! HTTP transport for the parser backend.
//!
//! `ApiClient` executes JSON requests against the configured base URL. The
//! backend's session cookie lives in the client's cookie jar and is never
//! read or written by this crate.

use futures::future::BoxFuture;
use reqwest::{header, Client, Method};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, CredentialMode};

use super::ApiError;

/// Uniform request seam shared by the gateway, the session manager and the
/// protected-action invoker.
pub trait Transport: Send + Sync {
    /// Send `body` (if any) to `path` relative to the base URL and decode the
    /// JSON reply. Non-2xx statuses and network failures come back as `ApiError`.
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<Value>,
    ) -> BoxFuture<'a, Result<Value, ApiError>>;
}

/// API client for the parser backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling
/// and the cookie jar is shared between clones.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(config.credentials == CredentialMode::Include)
            .default_headers(Self::default_headers(&config)?);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        debug!(base_url = config.base_url(), credentials = ?config.credentials, "API client created");
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn default_headers(config: &ClientConfig) -> anyhow::Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref token) = config.bearer_token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error built from the body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_status(status, &body);
            if err.is_authorization() {
                warn!(status = status.as_u16(), "Backend rejected session credential");
            } else {
                debug!(status = status.as_u16(), body = %ApiError::truncate_body(&body), "Request failed");
            }
            Err(err)
        }
    }

    /// Decode a successful body. An empty body is JSON `null`.
    fn decode_body(text: &str) -> Result<Value, ApiError> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(text)
            .map_err(|e| ApiError::InvalidResponse(format!("{} ({})", e, ApiError::truncate_body(text))))
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let url = self.config.url_for(path);
        debug!(%method, path, "Sending request");

        let mut request = self.client.request(method, &url);
        if let Some(ref body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(path, error = %e, "Request did not reach the backend");
            ApiError::from(e)
        })?;

        let response = Self::check_response(response).await?;
        let text = response.text().await.map_err(ApiError::from)?;
        Self::decode_body(&text)
    }
}

impl Transport for ApiClient {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<Value>,
    ) -> BoxFuture<'a, Result<Value, ApiError>> {
        Box::pin(self.send(method, path, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body() {
        assert_eq!(ApiClient::decode_body("").unwrap(), Value::Null);
        assert_eq!(ApiClient::decode_body("  \n").unwrap(), Value::Null);
        assert_eq!(
            ApiClient::decode_body(r#"{"status":"ok"}"#).unwrap(),
            serde_json::json!({"status": "ok"})
        );
        let err = ApiClient::decode_body("<html></html>").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_bearer_header_only_when_configured() {
        let plain = ClientConfig::new("http://localhost:8000").unwrap();
        let headers = ApiClient::default_headers(&plain).unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());

        let with_token = plain.with_bearer_token("abc");
        let headers = ApiClient::default_headers(&with_token).unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn test_new_client_keeps_config() {
        let config = ClientConfig::new("http://localhost:8000/").unwrap();
        let client = ApiClient::new(config).unwrap();
        assert_eq!(client.config().base_url(), "http://localhost:8000");
    }
}
