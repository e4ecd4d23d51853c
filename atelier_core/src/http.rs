//! HTTP client for Atelier control-plane calls.
//!
//! This module provides an async HTTP client with Bearer + `X-API-Key`
//! authentication, connection pooling, and proper error handling. One
//! `HttpClient` is owned by each [`crate::api::AtelierClient`], so pooling
//! happens per platform instance.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default pool size for idle connections per host.
pub const DEFAULT_POOL_SIZE: usize = 32;

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// HTTP error details.
#[derive(Debug, Clone)]
pub struct HttpErrorDetail {
    pub status: u16,
    pub url: String,
    pub message: String,
    pub body_snippet: Option<String>,
}

impl std::fmt::Display for HttpErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} for {}: {}", self.status, self.url, self.message)?;
        if let Some(ref snippet) = self.body_snippet {
            let truncated: String = snippet.chars().take(200).collect();
            write!(f, " | body[0:200]={}", truncated)?;
        }
        Ok(())
    }
}

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request failed: {err} (is_connect={conn}, is_timeout={timeout})", err = .0, conn = .0.is_connect(), timeout = .0.is_timeout())]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    Response(HttpErrorDetail),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("json parse error: {0}")]
    JsonParse(String),
}

impl HttpError {
    /// Create an HTTP error from a response.
    pub fn from_response(status: u16, url: &str, body: Option<&str>) -> Self {
        // Keep enough body to preserve structured JSON error payloads;
        // Display paths still truncate to 200 chars.
        let body_snippet = body.map(|s| s.chars().take(4096).collect());
        HttpError::Response(HttpErrorDetail {
            status,
            url: url.to_string(),
            message: "request_failed".to_string(),
            body_snippet,
        })
    }

    /// Get the HTTP status code, if available.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Response(detail) => Some(detail.status),
            HttpError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Multipart file payload for dataset uploads.
#[derive(Debug, Clone)]
pub struct MultipartFile {
    pub field: String,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl MultipartFile {
    pub fn new(
        field: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            filename: filename.into(),
            bytes,
            content_type,
        }
    }
}

/// Async HTTP client for the Atelier management API.
///
/// Provides Bearer + `X-API-Key` authentication and automatic JSON
/// handling.
///
/// # Example
///
/// ```ignore
/// let client = HttpClient::new("https://studio.example.com", "ak_live_...", 30)?;
/// let projects: Value = client.get("/api/projects", None).await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for the instance (without trailing slash)
    /// * `api_key` - API key, sent as both Bearer token and `X-API-Key`
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();

        // Only add auth headers if api_key is non-empty
        if !api_key.is_empty() {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|_| HttpError::InvalidUrl("invalid api key characters".to_string()))?,
            );
            headers.insert(
                "X-API-Key",
                HeaderValue::from_str(api_key)
                    .map_err(|_| HttpError::InvalidUrl("invalid api key characters".to_string()))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(DEFAULT_POOL_SIZE)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .map_err(HttpError::Request)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert a relative path to an absolute URL.
    fn abs_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let path = path.trim_start_matches('/');

        // Handle /api prefix duplication
        if self.base_url.ends_with("/api") && path.starts_with("api/") {
            return format!("{}/{}", self.base_url, &path[4..]);
        }

        format!("{}/{}", self.base_url, path)
    }

    /// Make a GET request.
    ///
    /// # Arguments
    ///
    /// * `path` - API path (relative or absolute)
    /// * `params` - Optional query parameters
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<T, HttpError> {
        let url = self.abs_url(path);
        let mut req = self.client.get(&url);
        if let Some(p) = params {
            req = req.query(p);
        }
        let (status, body) = send(req).await?;
        parse_json(status, &url, &body)
    }

    /// Make a GET request and return the raw body bytes.
    pub async fn get_bytes(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<Vec<u8>, HttpError> {
        let url = self.abs_url(path);
        let mut req = self.client.get(&url);
        if let Some(p) = params {
            req = req.query(p);
        }
        let (status, body) = send(req).await?;
        if (200..300).contains(&status) {
            return Ok(body);
        }
        let text = String::from_utf8_lossy(&body);
        Err(HttpError::from_response(
            status,
            &url,
            if text.trim().is_empty() { None } else { Some(&text) },
        ))
    }

    /// Make a POST request with JSON body.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, HttpError> {
        let url = self.abs_url(path);
        let (status, bytes) = send(self.client.post(&url).json(body)).await?;
        parse_json(status, &url, &bytes)
    }

    /// Make a PUT request with JSON body.
    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, HttpError> {
        let url = self.abs_url(path);
        let (status, bytes) = send(self.client.put(&url).json(body)).await?;
        parse_json(status, &url, &bytes)
    }

    /// Make a POST request with multipart form data (file upload).
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        data: &[(String, String)],
        files: &[MultipartFile],
    ) -> Result<T, HttpError> {
        let url = self.abs_url(path);
        let mut form = Form::new();
        for (key, value) in data {
            form = form.text(key.clone(), value.clone());
        }
        for file in files {
            let part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
            let part = match &file.content_type {
                Some(ct) => part.mime_str(ct).unwrap_or_else(|_| {
                    Part::bytes(file.bytes.clone()).file_name(file.filename.clone())
                }),
                None => part,
            };
            form = form.part(file.field.clone(), part);
        }
        let (status, bytes) = send(self.client.post(&url).multipart(form)).await?;
        parse_json(status, &url, &bytes)
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<(), HttpError> {
        let url = self.abs_url(path);
        let (status, bytes) = send(self.client.delete(&url)).await?;
        if (200..300).contains(&status) {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&bytes);
        Err(HttpError::from_response(
            status,
            &url,
            if text.trim().is_empty() { None } else { Some(&text) },
        ))
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

async fn send(req: reqwest::RequestBuilder) -> Result<(u16, Vec<u8>), HttpError> {
    let resp = req.send().await.map_err(HttpError::Request)?;
    let status = resp.status().as_u16();
    let body = resp.bytes().await.map_err(HttpError::Request)?;
    Ok((status, body.to_vec()))
}

fn parse_json<T: DeserializeOwned>(status: u16, url: &str, body: &[u8]) -> Result<T, HttpError> {
    if !(200..300).contains(&status) {
        let text = String::from_utf8_lossy(body);
        return Err(HttpError::from_response(
            status,
            url,
            if text.trim().is_empty() { None } else { Some(&text) },
        ));
    }

    serde_json::from_slice(body).map_err(|e| {
        let text = String::from_utf8_lossy(body);
        HttpError::JsonParse(format!("{}: {}", e, &text[..text.len().min(100)]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_abs_url() {
        let client = HttpClient::new("https://studio.example.com", "k", 5).unwrap();
        assert_eq!(
            client.abs_url("/api/projects"),
            "https://studio.example.com/api/projects"
        );
        assert_eq!(
            client.abs_url("api/projects"),
            "https://studio.example.com/api/projects"
        );

        // /api-suffixed base does not duplicate the prefix
        let client = HttpClient::new("https://studio.example.com/api", "k", 5).unwrap();
        assert_eq!(
            client.abs_url("/api/projects"),
            "https://studio.example.com/api/projects"
        );
    }

    #[tokio::test]
    async fn test_get_sends_auth_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects")
                .header("authorization", "Bearer ak_test")
                .header("x-api-key", "ak_test");
            then.status(200).json_body(json!([{"project_key": "P"}]));
        });

        let client = HttpClient::new(&server.base_url(), "ak_test", 5).unwrap();
        let value: Value = client.get("/api/projects", None).await.unwrap();
        assert_eq!(value[0]["project_key"], "P");
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_error_carries_body_snippet() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/projects/NOPE");
            then.status(404).body("{\"message\":\"no such project\"}");
        });

        let client = HttpClient::new(&server.base_url(), "ak_test", 5).unwrap();
        let err = client
            .get::<Value>("/api/projects/NOPE", None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        match err {
            HttpError::Response(detail) => {
                assert!(detail.body_snippet.unwrap().contains("no such project"));
            }
            other => panic!("expected response error, got {other:?}"),
        }
    }
}
