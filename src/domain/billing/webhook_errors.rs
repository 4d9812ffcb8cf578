//! Webhook error types for gateway notification handling.
//!
//! Status codes decide the gateway's redelivery behavior: 2xx stops
//! redelivery, anything else makes the gateway try again later.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that abort webhook ingestion.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing or not matching the body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is not valid JSON.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Dedup store or ledger storage failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the gateway should redeliver this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_) | WebhookError::ParseError(_))
    }

    /// Maps the error to the HTTP status returned to the gateway.
    ///
    /// Malformed bodies answer 500 so that the gateway retries; a later
    /// delivery may be complete.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::ParseError(_) | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<crate::domain::foundation::DomainError> for WebhookError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}
