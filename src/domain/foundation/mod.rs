//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, error types, the state machine contract and
//! event envelope used across the billing domain.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{domain_event, DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{GatewayPaymentId, PaymentId, PlanId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
