//! Payment gateway port.
//!
//! The gateway is the source of truth for whether money moved. Billing
//! creates charges through it and reads back snapshots; it never retries a
//! call within one invocation.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{PayerInfo, PaymentSnapshot};
use crate::domain::foundation::{DomainError, ErrorCode, GatewayPaymentId};

/// Card brands offered when the gateway cannot list its methods.
pub const FALLBACK_PAYMENT_METHODS: [&str; 3] = ["visa", "master", "amex"];

/// Payment type ids accepted for direct card charges.
pub const CARD_PAYMENT_TYPES: [&str; 2] = ["credit_card", "debit_card"];

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submits a charge. `idempotency_key` must be fresh per logical attempt.
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
        idempotency_key: &str,
    ) -> Result<PaymentSnapshot, GatewayError>;

    /// Fetches the current state of a charge. `None` when the gateway does
    /// not know the id.
    async fn get_payment(&self, id: &GatewayPaymentId) -> Result<Option<PaymentSnapshot>, GatewayError>;

    /// Lists every payment method enabled for the account.
    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, GatewayError>;

    /// Methods to offer when listing fails.
    fn fallback_payment_methods(&self) -> Vec<String> {
        FALLBACK_PAYMENT_METHODS.iter().map(|m| m.to_string()).collect()
    }
}

/// A card charge to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub transaction_amount: Decimal,
    /// Single-use card token produced by the gateway's client SDK.
    pub token: String,
    pub description: String,
    pub installments: u32,
    pub payment_method_id: String,
    pub external_reference: String,
    pub statement_descriptor: String,
    pub payer: PayerInfo,
}

/// One payment method enabled on the gateway account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub payment_type_id: String,
}

impl PaymentMethod {
    pub fn is_card(&self) -> bool {
        CARD_PAYMENT_TYPES.contains(&self.payment_type_id.as_str())
    }
}

/// Errors from gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// HTTP status returned by the gateway, if any.
    pub provider_status: Option<u16>,
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_status: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_status(mut self, status: u16) -> Self {
        self.provider_status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }

    /// Maps a non-success HTTP status to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let code = match status {
            400 | 422 => GatewayErrorCode::InvalidRequest,
            401 | 403 => GatewayErrorCode::AuthenticationError,
            404 => GatewayErrorCode::NotFound,
            408 | 504 => GatewayErrorCode::Timeout,
            429 => GatewayErrorCode::RateLimitExceeded,
            500..=599 => GatewayErrorCode::ProviderError,
            _ => GatewayErrorCode::Unknown,
        };
        Self::new(code, body).with_provider_status(status)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        let code = match err.code {
            GatewayErrorCode::NotFound => ErrorCode::PaymentNotFound,
            _ => ErrorCode::GatewayError,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    NetworkError,
    Timeout,
    AuthenticationError,
    /// The gateway rejected the request body (bad token, amount, ...).
    InvalidRequest,
    NotFound,
    RateLimitExceeded,
    ProviderError,
    /// Response could not be decoded.
    InvalidResponse,
    Unknown,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError
                | GatewayErrorCode::Timeout
                | GatewayErrorCode::RateLimitExceeded
                | GatewayErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::InvalidResponse => "invalid_response",
            GatewayErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(GatewayError::network("reset").retryable);
        assert!(GatewayError::timeout("slow").retryable);
        assert!(!GatewayError::invalid_request("bad token").retryable);
        assert!(!GatewayError::authentication("bad key").retryable);
    }

    #[test]
    fn from_status_classifies_responses() {
        assert_eq!(GatewayError::from_status(400, "").code, GatewayErrorCode::InvalidRequest);
        assert_eq!(GatewayError::from_status(401, "").code, GatewayErrorCode::AuthenticationError);
        assert_eq!(GatewayError::from_status(429, "").code, GatewayErrorCode::RateLimitExceeded);
        let err = GatewayError::from_status(503, "unavailable");
        assert_eq!(err.code, GatewayErrorCode::ProviderError);
        assert_eq!(err.provider_status, Some(503));
        assert!(err.retryable);
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = GatewayError::invalid_request("invalid card token");
        assert_eq!(err.to_string(), "invalid_request: invalid card token");
    }

    #[test]
    fn card_methods_are_recognized() {
        let visa = PaymentMethod {
            id: "visa".to_string(),
            payment_type_id: "credit_card".to_string(),
        };
        let cash = PaymentMethod {
            id: "pagoefectivo_atm".to_string(),
            payment_type_id: "atm".to_string(),
        };
        assert!(visa.is_card());
        assert!(!cash.is_card());
    }
}
