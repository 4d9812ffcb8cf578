//! GetPaymentStatusHandler - reads a payment, refreshing it from the
//! gateway first when possible.
//!
//! The refresh goes through the ledger's reconciliation path, so a status
//! query can itself approve a payment and publish the approved event. Any
//! failure during the refresh falls back to the stored row.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Payment};
use crate::ports::PaymentGateway;

use super::payment_ledger::PaymentLedger;

pub struct GetPaymentStatusHandler {
    ledger: Arc<PaymentLedger>,
    gateway: Arc<dyn PaymentGateway>,
}

impl GetPaymentStatusHandler {
    pub fn new(ledger: Arc<PaymentLedger>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { ledger, gateway }
    }

    pub async fn handle(&self, external_reference: &str) -> Result<Payment, BillingError> {
        let payment = self
            .ledger
            .find_by_external_reference(external_reference)
            .await?
            .ok_or_else(|| BillingError::payment_not_found(external_reference))?;

        let Some(gateway_payment_id) = payment.gateway_payment_id.clone() else {
            return Ok(payment);
        };

        let snapshot = match self.gateway.get_payment(&gateway_payment_id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Ok(payment),
            Err(e) => {
                tracing::warn!(
                    external_reference,
                    gateway_payment_id = %gateway_payment_id,
                    error = %e,
                    "Gateway refresh failed, returning stored status"
                );
                return Ok(payment);
            }
        };

        match self.ledger.reconcile_payment(payment.clone(), Some(&snapshot)).await {
            Ok(update) => Ok(update.payment),
            Err(e) => {
                tracing::warn!(
                    external_reference,
                    error = %e,
                    "Could not store refreshed status, returning stored status"
                );
                Ok(payment)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{InMemoryPaymentRepository, InMemoryPlanRepository};
    use crate::domain::billing::{fixtures, PaymentStatus};
    use crate::ports::{GatewayError, PaymentRepository};

    async fn setup(status: PaymentStatus) -> (GetPaymentStatusHandler, MockPaymentGateway, Payment) {
        let payment = fixtures::payment_with_status(status);
        let payments = Arc::new(InMemoryPaymentRepository::new());
        payments.insert(&payment).await.unwrap();
        let ledger = Arc::new(PaymentLedger::new(
            payments,
            Arc::new(InMemoryPlanRepository::new()),
            Arc::new(InMemoryEventBus::new()),
        ));
        let gateway = MockPaymentGateway::new();
        let handler = GetPaymentStatusHandler::new(ledger, Arc::new(gateway.clone()));
        (handler, gateway, payment)
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let (handler, _, _) = setup(PaymentStatus::InProcess).await;
        let err = handler.handle("missing").await.unwrap_err();
        assert!(matches!(err, BillingError::PaymentNotFound(_)));
    }

    #[tokio::test]
    async fn refresh_applies_gateway_status() {
        let (handler, gateway, payment) = setup(PaymentStatus::InProcess).await;
        let gateway_id = payment.gateway_payment_id.clone().unwrap();
        gateway.insert_snapshot(crate::domain::billing::PaymentSnapshot::new(gateway_id.clone()));
        gateway.set_status(&gateway_id, PaymentStatus::Approved);

        let refreshed = handler.handle("order-1").await.unwrap();

        assert_eq!(refreshed.status, PaymentStatus::Approved);
        assert!(refreshed.approved_at.is_some());
    }

    #[tokio::test]
    async fn gateway_failure_returns_stored_view() {
        let (handler, gateway, _) = setup(PaymentStatus::InProcess).await;
        gateway.fail_lookups(GatewayError::timeout("slow"));

        let stored = handler.handle("order-1").await.unwrap();

        assert_eq!(stored.status, PaymentStatus::InProcess);
    }
}
