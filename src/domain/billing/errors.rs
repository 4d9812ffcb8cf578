//! Billing-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | PaymentNotFound | 404 |
//! | PlanNotFound | 404 |
//! | NoActiveSubscription | 404 |
//! | PlanNotActive | 400 |
//! | AmountMismatch | 400 |
//! | SamePlan | 400 |
//! | ValidationFailed | 400 |
//! | SubscriptionExpired | 422 |
//! | InvalidState | 409 |
//! | ConcurrentModification | 409 |
//! | Gateway | 502 |
//! | Infrastructure | 500 |

use rust_decimal::Decimal;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, PlanId, Timestamp, UserId};
use crate::ports::GatewayError;

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// No payment carries this external reference.
    PaymentNotFound(String),

    PlanNotFound(PlanId),

    PlanNotActive(PlanId),

    /// Submitted amount differs from the plan's list price.
    AmountMismatch { expected: Decimal, actual: Decimal },

    /// The user has no approved payment to upgrade from.
    NoActiveSubscription(UserId),

    /// The current subscription period already ended.
    SubscriptionExpired { expired_at: Timestamp },

    /// Upgrade target equals the current plan.
    SamePlan(PlanId),

    InvalidState { current: String, attempted: String },

    /// Optimistic update kept losing to concurrent writers.
    ConcurrentModification(PaymentId),

    /// The gateway refused or failed the call.
    Gateway { message: String, retryable: bool },

    ValidationFailed { field: String, message: String },

    Infrastructure(String),
}

impl BillingError {
    pub fn payment_not_found(external_reference: impl Into<String>) -> Self {
        BillingError::PaymentNotFound(external_reference.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::PaymentNotFound(_) => ErrorCode::PaymentNotFound,
            BillingError::PlanNotFound(_) => ErrorCode::PlanNotFound,
            BillingError::PlanNotActive(_) => ErrorCode::PlanInactive,
            BillingError::AmountMismatch { .. } => ErrorCode::AmountMismatch,
            BillingError::NoActiveSubscription(_) => ErrorCode::NoActiveSubscription,
            BillingError::SubscriptionExpired { .. } => ErrorCode::SubscriptionExpired,
            BillingError::SamePlan(_) => ErrorCode::SamePlan,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::ConcurrentModification(_) => ErrorCode::ConcurrentModification,
            BillingError::Gateway { .. } => ErrorCode::GatewayError,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::PaymentNotFound(reference) => {
                format!("Payment not found for reference: {}", reference)
            }
            BillingError::PlanNotFound(id) => format!("Plan not found: {}", id),
            BillingError::PlanNotActive(id) => format!("Plan {} is not active", id),
            BillingError::AmountMismatch { expected, actual } => format!(
                "Amount {} does not match plan price {}",
                actual, expected
            ),
            BillingError::NoActiveSubscription(user_id) => {
                format!("No approved payment found for user {}", user_id)
            }
            BillingError::SubscriptionExpired { expired_at } => format!(
                "Subscription expired at {}",
                expired_at.as_datetime().to_rfc3339()
            ),
            BillingError::SamePlan(id) => format!("User is already subscribed to plan {}", id),
            BillingError::InvalidState { current, attempted } => {
                format!("Cannot {} payment in {} state", attempted, current)
            }
            BillingError::ConcurrentModification(id) => {
                format!("Payment {} was modified concurrently", id)
            }
            BillingError::Gateway { message, .. } => format!("Payment gateway error: {}", message),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::Gateway { retryable, .. } => *retryable,
            BillingError::ConcurrentModification(_) | BillingError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::GatewayError => BillingError::Gateway {
                message: err.message,
                retryable: false,
            },
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        BillingError::Gateway {
            retryable: err.retryable,
            message: err.to_string(),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
