//! WebhookIngestor - turns a gateway notification into at most one ledger effect.
//!
//! Steps:
//! 1. Verify the signature over the raw body
//! 2. Derive the dedup key; skip if already recorded
//! 3. Fetch the referenced payment from the gateway and reconcile it
//! 4. Record the event
//!
//! Gateway and ledger failures in step 3 are logged and the event is still
//! recorded; the reconciliation sweep picks the payment up later.

use std::sync::Arc;

use http::HeaderMap;

use crate::domain::billing::{
    EventDeduplicator, WebhookError, WebhookNotification, WebhookSignatureVerifier,
};
use crate::domain::foundation::GatewayPaymentId;
use crate::ports::{PaymentGateway, SaveResult};

use super::payment_ledger::PaymentLedger;

/// Acknowledgement returned to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// First delivery, fully handled.
    Processed,
    /// A previous delivery was already recorded.
    AlreadyProcessed,
    /// Nothing actionable in the notification.
    Ignored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Processed => "processed",
            WebhookOutcome::AlreadyProcessed => "already_processed",
            WebhookOutcome::Ignored => "ignored",
        }
    }
}

pub struct WebhookIngestor {
    verifier: WebhookSignatureVerifier,
    deduplicator: EventDeduplicator,
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<PaymentLedger>,
}

impl WebhookIngestor {
    pub fn new(
        verifier: WebhookSignatureVerifier,
        deduplicator: EventDeduplicator,
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<PaymentLedger>,
    ) -> Self {
        Self {
            verifier,
            deduplicator,
            gateway,
            ledger,
        }
    }

    pub async fn ingest(&self, headers: &HeaderMap, raw_body: &[u8]) -> Result<WebhookOutcome, WebhookError> {
        if !self.verifier.verify_headers(raw_body, headers) {
            tracing::warn!(body_len = raw_body.len(), "Rejected webhook with invalid signature");
            return Err(WebhookError::InvalidSignature);
        }

        let notification = WebhookNotification::parse(raw_body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse webhook payload");
            e
        })?;

        let topic = notification.topic();
        let resource_id = notification.resource_id();
        let Some(event_id) = notification.event_key() else {
            tracing::warn!(topic = %topic, "Webhook carries no id or resource id, ignoring");
            return Ok(WebhookOutcome::Ignored);
        };

        if !self.deduplicator.is_new(&event_id).await? {
            tracing::info!(event_id = %event_id, "Webhook already processed");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        let outcome = match notification.gateway_payment_id() {
            Some(gateway_payment_id) => {
                self.sync_payment(&event_id, &gateway_payment_id).await;
                WebhookOutcome::Processed
            }
            None => {
                tracing::warn!(event_id = %event_id, "Webhook has no payment id");
                WebhookOutcome::Ignored
            }
        };

        match self
            .deduplicator
            .record(&event_id, &topic, resource_id, raw_body)
            .await?
        {
            SaveResult::Inserted => {
                tracing::info!(event_id = %event_id, topic = %topic, outcome = outcome.as_str(), "Webhook recorded");
                Ok(outcome)
            }
            SaveResult::AlreadyExists => {
                tracing::info!(event_id = %event_id, "Concurrent delivery recorded the webhook first");
                Ok(WebhookOutcome::AlreadyProcessed)
            }
        }
    }

    async fn sync_payment(&self, event_id: &str, gateway_payment_id: &GatewayPaymentId) {
        let snapshot = match self.gateway.get_payment(gateway_payment_id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::warn!(
                    event_id,
                    gateway_payment_id = %gateway_payment_id,
                    "Gateway has no payment for webhook"
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    event_id,
                    gateway_payment_id = %gateway_payment_id,
                    error = %e,
                    "Gateway lookup failed, leaving payment for the sweep"
                );
                return;
            }
        };

        match self.ledger.apply_snapshot(&snapshot).await {
            Ok(Some(update)) => tracing::info!(
                event_id,
                payment_id = %update.payment.id,
                status = %update.payment.status,
                changed = update.changed,
                published = update.published,
                "Webhook reconciled payment"
            ),
            Ok(None) => {}
            Err(e) => tracing::error!(
                event_id,
                gateway_payment_id = %gateway_payment_id,
                error = %e,
                "Failed to reconcile payment from webhook"
            ),
        }
    }
}
