//! Controller-specific error types.
//!
//! Provider failures arrive as [`CloudError`]s and keep their structure all
//! the way to the error-recording wrapper, which is the only place that
//! turns an error into the text written to `status.failureMessage`.

use cce_client::CloudError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the CCE operator.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Cloud provider API error
    #[error("{0}")]
    Cloud(#[from] CloudError),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The desired state is incomplete or inconsistent
    #[error("{0}")]
    Validation(String),

    /// Invalid operator configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Credential secret missing or unusable
    #[error("{0}")]
    Credential(String),

    /// A provider response lacked a field the operator depends on
    #[error("{0}")]
    InvalidResponse(String),

    /// A long-running provider operation (creation, upgrade) ended in failure
    #[error("{0}")]
    Operation(String),

    /// Optimistic concurrency conflict on a record write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Health/metrics HTTP server failed
    #[error("HTTP server error: {0}")]
    Server(String),
}

impl ControllerError {
    /// Text recorded in `status.failureMessage` for this error
    ///
    /// Provider errors are rendered as JSON with the request id cleared so
    /// that a repeat of the same failure produces the same message.
    pub fn failure_message(&self) -> String {
        match self {
            Self::Cloud(CloudError::Provider(e)) => e.without_request_id().to_string(),
            other => other.to_string(),
        }
    }

    /// True only for a structured provider 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Cloud(e) if e.is_not_found())
    }

    /// True for a record write rejected because the record changed underneath
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Kube(KubeError::Api(response)) => response.code == 409,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cce_client::ProviderError;

    #[test]
    fn test_failure_message_drops_request_id() {
        let first = ControllerError::from(CloudError::Provider(ProviderError {
            request_id: "req-1".to_string(),
            ..ProviderError::new(400, "CCE.01400001", "bad flavor")
        }));
        let second = ControllerError::from(CloudError::Provider(ProviderError {
            request_id: "req-2".to_string(),
            ..ProviderError::new(400, "CCE.01400001", "bad flavor")
        }));
        assert_eq!(first.failure_message(), second.failure_message());
        assert!(first.failure_message().contains("bad flavor"));
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = ControllerError::Validation("field [name] must be provided".to_string());
        assert_eq!(err.failure_message(), "field [name] must be provided");
    }

    #[test]
    fn test_not_found_classification() {
        assert!(ControllerError::from(CloudError::Provider(ProviderError::not_found("gone"))).is_not_found());
        assert!(!ControllerError::from(CloudError::InvalidResponse("x".to_string())).is_not_found());
        assert!(!ControllerError::Validation("x".to_string()).is_not_found());
    }
}
