//! Core error types for the Atelier SDK.
//!
//! Two families of failures exist and only one of them lives here:
//! configuration, lookup, authentication, and transport problems are
//! `CoreError`s; a remote operation that *ran* and ended badly (failed,
//! aborted, timed out) is not an error at all: it is carried as a
//! non-throwing [`crate::ops::OperationResult`] so calling code can branch
//! on `success` without unwinding.

use crate::http::HttpError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP error details for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorInfo {
    /// HTTP status code (e.g., 404, 500)
    pub status: u16,
    /// Request URL
    pub url: String,
    /// Error message
    pub message: String,
    /// First 200 chars of response body (for debugging)
    pub body_snippet: Option<String>,
}

impl std::fmt::Display for HttpErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} for {}: {}", self.status, self.url, self.message)?;
        if let Some(ref snippet) = self.body_snippet {
            let truncated: String = snippet.chars().take(200).collect();
            write!(f, " | body[0:200]={}", truncated)?;
        }
        Ok(())
    }
}

/// Unified error enum for the Atelier core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad or missing instance configuration. Fatal at startup.
    #[error("config error: {0}")]
    Config(String),

    /// A named thing (instance, project, dataset, recipe, scenario, job)
    /// does not exist. Recoverable; reported to the caller.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// Authentication against a platform instance failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Malformed start-operation arguments or request payload.
    #[error("validation error: {0}")]
    Validation(String),

    /// URL parsing failed
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP request failed (network layer)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP response error (4xx/5xx)
    #[error("{0}")]
    HttpResponse(HttpErrorInfo),

    /// Protocol/wire format error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        CoreError::Config(message.into())
    }

    /// Create a not-found error for a named target.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        CoreError::Authentication(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    /// Create an HTTP response error.
    pub fn http_response(status: u16, url: &str, message: &str, body: Option<&str>) -> Self {
        CoreError::HttpResponse(HttpErrorInfo {
            status,
            url: url.to_string(),
            message: message.to_string(),
            body_snippet: body.map(|s| s.chars().take(200).collect()),
        })
    }

    /// Check if this is an authentication error.
    ///
    /// The instance hub uses this to decide whether to invalidate a
    /// cached client handle.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, CoreError::Authentication(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::NotFound { .. } => true,
            CoreError::HttpResponse(info) => info.status == 404,
            _ => false,
        }
    }

    /// Check if this is a retryable error (5xx or network).
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::HttpResponse(info) => info.status >= 500,
            CoreError::Http(_) => true,
            _ => false,
        }
    }

    /// Get HTTP status code if this is an HTTP error.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            CoreError::HttpResponse(info) => Some(info.status),
            CoreError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Protocol(format!("json serialization failed: {}", err))
    }
}

impl From<HttpError> for CoreError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Request(e) => CoreError::Http(e),
            HttpError::Response(detail) => {
                if detail.status == 401 || detail.status == 403 {
                    CoreError::Authentication(format!("{}", detail))
                } else {
                    CoreError::HttpResponse(HttpErrorInfo {
                        status: detail.status,
                        url: detail.url,
                        message: detail.message,
                        body_snippet: detail.body_snippet,
                    })
                }
            }
            HttpError::InvalidUrl(msg) => CoreError::Validation(msg),
            HttpError::JsonParse(msg) => CoreError::Protocol(msg),
        }
    }
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
