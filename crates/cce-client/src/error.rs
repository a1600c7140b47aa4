//! Cloud client errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error returned by the provider API
///
/// Built at the HTTP boundary from the response status, the `X-Request-Id`
/// header and the JSON error body. Renders as its JSON form so identical
/// failures produce identical messages once the request id is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub status_code: u16,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_code: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
}

fn is_zero(code: &u16) -> bool {
    *code == 0
}

impl ProviderError {
    /// Create a provider error with no request id
    pub fn new(status_code: u16, error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            status_code,
            request_id: String::new(),
            error_code: error_code.into(),
            error_message: error_message.into(),
        }
    }

    /// Shorthand for a 404 response
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "NotFound", message)
    }

    /// Copy of this error with the request id cleared
    pub fn without_request_id(&self) -> Self {
        Self {
            request_id: String::new(),
            ..self.clone()
        }
    }

    /// Whether the provider reported the resource as absent
    pub fn is_not_found(&self) -> bool {
        self.status_code == 404
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "status {} {}: {}", self.status_code, self.error_code, self.error_message),
        }
    }
}

/// Errors that can occur when talking to the cloud provider
#[derive(Debug, Error)]
pub enum CloudError {
    /// HTTP transport error (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error status
    #[error("{0}")]
    Provider(ProviderError),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A field the caller relies on was missing from a successful response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Credentials were rejected or could not be used to sign
    #[error("Authentication failed: {0}")]
    Authentication(String),
}

impl CloudError {
    /// Structured provider error, if this is one
    pub fn provider(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status reported by the provider
    ///
    /// Transport failures and malformed responses carry no status.
    pub fn status_code(&self) -> Option<u16> {
        self.provider().map(|e| e.status_code)
    }

    /// True only for a structured 404 from the provider
    pub fn is_not_found(&self) -> bool {
        self.provider().is_some_and(ProviderError::is_not_found)
    }
}

impl From<ProviderError> for CloudError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}
