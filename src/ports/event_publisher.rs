//! EventPublisher port - Interface for publishing domain events.
//!
//! Billing only publishes after the state change that produced the event
//! has been committed. Failures are reported to the caller, which logs
//! them; nothing is rolled back.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event. Delivery is at-least-once.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;
}
