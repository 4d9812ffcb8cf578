//! PaymentRepository port - persistence for the payment aggregate.
//!
//! Writes are guarded twice: inserts rely on the unique external reference,
//! updates are compare-and-set on the `version` column.

use async_trait::async_trait;

use crate::domain::billing::{Payment, PaymentStatus};
use crate::domain::foundation::{DomainError, GatewayPaymentId, PaymentId, UserId};

/// Result of inserting a new payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    Inserted,
    /// A row with the same external reference (or gateway id) already exists.
    AlreadyExists,
}

/// Result of a compare-and-set update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Row written; its stored version is now `payment.version + 1`.
    Updated,
    /// Stored version no longer matches; nothing written.
    VersionConflict,
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts a new payment with `ON CONFLICT DO NOTHING` semantics.
    async fn insert(&self, payment: &Payment) -> Result<InsertResult, DomainError>;

    /// Writes `payment` only if the stored version equals `payment.version`.
    async fn update(&self, payment: &Payment) -> Result<UpdateResult, DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    async fn find_by_external_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<Payment>, DomainError>;

    async fn find_by_gateway_payment_id(
        &self,
        id: &GatewayPaymentId,
    ) -> Result<Option<Payment>, DomainError>;

    /// Payments whose status is in `statuses`, oldest first.
    async fn find_by_statuses(&self, statuses: &[PaymentStatus]) -> Result<Vec<Payment>, DomainError>;

    /// The user's most recently approved payment still in `Approved`.
    async fn find_latest_approved_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Payment>, DomainError>;
}
