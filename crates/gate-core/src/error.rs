//! # Gate Error Types
//!
//! Typed error handling for the playgate backend.
//! All store, provider and token operations return `Result<T, GateError>`.

use thiserror::Error;

/// Core error type for all gate operations
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data (missing required field, malformed body)
    #[error("{0}")]
    InvalidRequest(String),

    /// Payment record does not exist
    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with an upstream service
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Document store rejected or failed an operation
    #[error("Store error [{backend}]: {message}")]
    StoreError { backend: String, message: String },

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Access token failed signature, expiry or claim checks
    #[error("Invalid or expired token")]
    InvalidToken(String),

    /// Access token could not be signed
    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Shorthand for a store failure
    pub fn store(backend: impl Into<String>, message: impl Into<String>) -> Self {
        GateError::StoreError {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::Configuration(_) => 500,
            GateError::InvalidRequest(_) => 400,
            GateError::RecordNotFound { .. } => 404,
            GateError::ProviderError { .. } => 500,
            GateError::NetworkError(_) => 500,
            GateError::StoreError { .. } => 500,
            GateError::WebhookVerificationFailed(_) => 400,
            GateError::WebhookParseError(_) => 400,
            GateError::InvalidToken(_) => 403,
            GateError::TokenSigning(_) => 500,
            GateError::Serialization(_) => 500,
            GateError::Internal(_) => 500,
        }
    }
}

/// Result type alias for gate operations
pub type GateResult<T> = Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GateError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(
            GateError::RecordNotFound { id: "x".into() }.status_code(),
            404
        );
        assert_eq!(
            GateError::ProviderError {
                provider: "stripe".into(),
                message: "boom".into()
            }
            .status_code(),
            500
        );
        assert_eq!(
            GateError::WebhookVerificationFailed("bad".into()).status_code(),
            400
        );
        assert_eq!(GateError::InvalidToken("expired".into()).status_code(), 403);
    }

    #[test]
    fn test_invalid_token_hides_cause() {
        let err = GateError::InvalidToken("ExpiredSignature".into());
        assert_eq!(err.to_string(), "Invalid or expired token");
    }

    #[test]
    fn test_upstream_message_passes_through() {
        let err = GateError::store("firestore", "PERMISSION_DENIED: missing scope");
        assert!(err.to_string().contains("PERMISSION_DENIED: missing scope"));
    }
}
