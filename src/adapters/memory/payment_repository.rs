//! In-memory payment repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{Payment, PaymentStatus};
use crate::domain::foundation::{DomainError, ErrorCode, GatewayPaymentId, PaymentId, UserId};
use crate::ports::{InsertResult, PaymentRepository, UpdateResult};

#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payments.
    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }

    /// Snapshot of every stored payment.
    pub async fn all(&self) -> Vec<Payment> {
        self.payments.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<InsertResult, DomainError> {
        let mut payments = self.payments.write().await;
        let clashes = payments.values().any(|existing| {
            existing.id == payment.id
                || existing.external_reference == payment.external_reference
                || (payment.gateway_payment_id.is_some()
                    && existing.gateway_payment_id == payment.gateway_payment_id)
        });
        if clashes {
            return Ok(InsertResult::AlreadyExists);
        }
        payments.insert(payment.id, payment.clone());
        Ok(InsertResult::Inserted)
    }

    async fn update(&self, payment: &Payment) -> Result<UpdateResult, DomainError> {
        let mut payments = self.payments.write().await;
        let stored = payments.get_mut(&payment.id).ok_or_else(|| {
            DomainError::new(ErrorCode::PaymentNotFound, format!("Payment {} not found", payment.id))
        })?;
        if stored.version != payment.version {
            return Ok(UpdateResult::VersionConflict);
        }
        let mut next = payment.clone();
        next.version += 1;
        *stored = next;
        Ok(UpdateResult::Updated)
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.read().await.get(id).cloned())
    }

    async fn find_by_external_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.external_reference == external_reference)
            .cloned())
    }

    async fn find_by_gateway_payment_id(
        &self,
        id: &GatewayPaymentId,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.gateway_payment_id.as_ref() == Some(id))
            .cloned())
    }

    async fn find_by_statuses(&self, statuses: &[PaymentStatus]) -> Result<Vec<Payment>, DomainError> {
        let mut found: Vec<Payment> = self
            .payments
            .read()
            .await
            .values()
            .filter(|p| statuses.contains(&p.status))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.created_at);
        Ok(found)
    }

    async fn find_latest_approved_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .filter(|p| p.user_id == *user_id && p.status == PaymentStatus::Approved)
            .max_by_key(|p| (p.access_start(), p.created_at))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{PayerInfo, PaymentDraft, PaymentSnapshot};
    use crate::domain::foundation::{PlanId, Timestamp};
    use rust_decimal_macros::dec;

    fn payment(reference: &str, gateway_id: &str, status: PaymentStatus) -> Payment {
        let draft = PaymentDraft {
            external_reference: reference.to_string(),
            user_id: UserId::new(),
            plan_id: PlanId::new(),
            amount: dec!(50.00),
            currency: "PEN".to_string(),
            installments: 1,
            payment_method_id: Some("visa".to_string()),
            payer: PayerInfo {
                email: "luis@example.com".to_string(),
                first_name: "Luis".to_string(),
                last_name: "Rojas".to_string(),
                identification_type: None,
                identification_number: None,
            },
        };
        let snapshot = PaymentSnapshot::new(GatewayPaymentId::new(gateway_id).unwrap())
            .with_status(status);
        Payment::from_gateway_charge(draft, &snapshot, Timestamp::now())
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_external_reference() {
        let repo = InMemoryPaymentRepository::new();
        let first = payment("order-1", "1", PaymentStatus::InProcess);
        let second = payment("order-1", "2", PaymentStatus::InProcess);

        assert_eq!(repo.insert(&first).await.unwrap(), InsertResult::Inserted);
        assert_eq!(repo.insert(&second).await.unwrap(), InsertResult::AlreadyExists);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_gateway_id() {
        let repo = InMemoryPaymentRepository::new();
        repo.insert(&payment("order-1", "1", PaymentStatus::InProcess)).await.unwrap();
        let clash = payment("order-2", "1", PaymentStatus::InProcess);
        assert_eq!(repo.insert(&clash).await.unwrap(), InsertResult::AlreadyExists);
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let repo = InMemoryPaymentRepository::new();
        let mut p = payment("order-1", "1", PaymentStatus::InProcess);
        repo.insert(&p).await.unwrap();

        p.status = PaymentStatus::Approved;
        assert_eq!(repo.update(&p).await.unwrap(), UpdateResult::Updated);

        let stored = repo.find_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.status, PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let repo = InMemoryPaymentRepository::new();
        let p = payment("order-1", "1", PaymentStatus::InProcess);
        repo.insert(&p).await.unwrap();
        repo.update(&p).await.unwrap();

        assert_eq!(repo.update(&p).await.unwrap(), UpdateResult::VersionConflict);
    }

    #[tokio::test]
    async fn update_of_missing_payment_fails() {
        let repo = InMemoryPaymentRepository::new();
        let err = repo.update(&payment("order-1", "1", PaymentStatus::InProcess)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentNotFound);
    }

    #[tokio::test]
    async fn finds_by_references_and_status() {
        let repo = InMemoryPaymentRepository::new();
        repo.insert(&payment("order-1", "1", PaymentStatus::InProcess)).await.unwrap();
        repo.insert(&payment("order-2", "2", PaymentStatus::Approved)).await.unwrap();

        let by_gateway = repo
            .find_by_gateway_payment_id(&GatewayPaymentId::new("2").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_gateway.external_reference, "order-2");
        assert!(repo.find_by_external_reference("order-1").await.unwrap().is_some());

        let pending = repo.find_by_statuses(&[PaymentStatus::InProcess]).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].external_reference, "order-1");
    }

    #[tokio::test]
    async fn latest_approved_ignores_other_statuses() {
        let repo = InMemoryPaymentRepository::new();
        let approved = payment("order-1", "1", PaymentStatus::Approved);
        let mut upgraded = payment("order-2", "2", PaymentStatus::Approved);
        upgraded.user_id = approved.user_id;
        upgraded.status = PaymentStatus::Upgraded;
        repo.insert(&approved).await.unwrap();
        repo.insert(&upgraded).await.unwrap();

        let latest = repo
            .find_latest_approved_for_user(&approved.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, approved.id);
    }
}
