//! PaymentLedger - the only place payment rows are written.
//!
//! Every status change goes through `reconcile_payment`, which re-runs the
//! reconciliation on a fresh read whenever the compare-and-set update loses
//! to a concurrent writer. Approved events are published after the write
//! commits; a failed publish is logged and never undoes the write.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, Payment, PaymentApproved, PaymentSnapshot, PaymentStatus, ReconciliationEngine,
};
use crate::domain::foundation::{EventEnvelope, Timestamp, UserId};
use crate::ports::{EventPublisher, InsertResult, PaymentRepository, PlanRepository, UpdateResult};

/// Compare-and-set attempts before giving up with `ConcurrentModification`.
pub const MAX_RECONCILE_ATTEMPTS: usize = 3;

/// Outcome of inserting a new payment.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// This call wrote the row.
    Created(Payment),
    /// Another writer already owns the external reference; its row is returned.
    Existing(Payment),
}

impl RecordOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            RecordOutcome::Created(p) | RecordOutcome::Existing(p) => p,
        }
    }

    pub fn into_payment(self) -> Payment {
        match self {
            RecordOutcome::Created(p) | RecordOutcome::Existing(p) => p,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, RecordOutcome::Created(_))
    }
}

/// Outcome of reconciling one payment against a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerUpdate {
    /// Payment as stored after this call.
    pub payment: Payment,
    pub previous_status: PaymentStatus,
    /// A row was written.
    pub changed: bool,
    /// The approved event went out.
    pub published: bool,
    /// The snapshot tried to leave a closed status and was ignored.
    pub refused: bool,
}

pub struct PaymentLedger {
    payments: Arc<dyn PaymentRepository>,
    plans: Arc<dyn PlanRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl PaymentLedger {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        plans: Arc<dyn PlanRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            payments,
            plans,
            publisher,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reads
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn find_by_external_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<Payment>, BillingError> {
        Ok(self
            .payments
            .find_by_external_reference(external_reference)
            .await?)
    }

    pub async fn find_by_statuses(&self, statuses: &[PaymentStatus]) -> Result<Vec<Payment>, BillingError> {
        Ok(self.payments.find_by_statuses(statuses).await?)
    }

    /// The approved payment currently granting the user access.
    pub async fn active_subscription(&self, user_id: &UserId) -> Result<Option<Payment>, BillingError> {
        Ok(self.payments.find_latest_approved_for_user(user_id).await?)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Writes
    // ════════════════════════════════════════════════════════════════════════════

    /// Persists a payment for the first time.
    ///
    /// Losing the unique-reference race is not an error: the winner's row is
    /// returned and nothing is published for the loser.
    pub async fn record_new(&self, payment: Payment) -> Result<RecordOutcome, BillingError> {
        match self.payments.insert(&payment).await? {
            InsertResult::Inserted => {
                tracing::info!(
                    payment_id = %payment.id,
                    external_reference = %payment.external_reference,
                    status = %payment.status,
                    "Payment recorded"
                );
                if payment.status.is_approved() {
                    self.publish_approved(&payment).await;
                }
                Ok(RecordOutcome::Created(payment))
            }
            InsertResult::AlreadyExists => {
                let existing = self.find_conflicting(&payment).await?.ok_or_else(|| {
                    BillingError::infrastructure(format!(
                        "Insert of {} conflicted but no existing row was found",
                        payment.external_reference
                    ))
                })?;
                tracing::info!(
                    payment_id = %existing.id,
                    external_reference = %existing.external_reference,
                    "Payment already recorded, returning existing"
                );
                Ok(RecordOutcome::Existing(existing))
            }
        }
    }

    async fn find_conflicting(&self, payment: &Payment) -> Result<Option<Payment>, BillingError> {
        if let Some(existing) = self
            .payments
            .find_by_external_reference(&payment.external_reference)
            .await?
        {
            return Ok(Some(existing));
        }
        match &payment.gateway_payment_id {
            Some(id) => Ok(self.payments.find_by_gateway_payment_id(id).await?),
            None => Ok(None),
        }
    }

    /// Locates the local payment a snapshot describes and reconciles it.
    ///
    /// Looks up by gateway id first, then by the snapshot's external
    /// reference. The reference match only counts while the local row has
    /// no gateway id of its own. Returns `None` when nothing matches.
    pub async fn apply_snapshot(
        &self,
        snapshot: &PaymentSnapshot,
    ) -> Result<Option<LedgerUpdate>, BillingError> {
        let mut local = self.payments.find_by_gateway_payment_id(&snapshot.id).await?;
        if local.is_none() {
            if let Some(reference) = snapshot.external_reference() {
                local = self
                    .payments
                    .find_by_external_reference(reference)
                    .await?
                    .filter(|payment| match &payment.gateway_payment_id {
                        Some(known) if *known != snapshot.id => {
                            tracing::warn!(
                                payment_id = %payment.id,
                                local_gateway_payment_id = %known,
                                gateway_payment_id = %snapshot.id,
                                external_reference = reference,
                                "Snapshot belongs to a different charge, not merging"
                            );
                            false
                        }
                        _ => true,
                    });
            }
        }

        match local {
            Some(payment) => self.reconcile_payment(payment, Some(snapshot)).await.map(Some),
            None => {
                tracing::warn!(
                    gateway_payment_id = %snapshot.id,
                    external_reference = snapshot.external_reference().unwrap_or(""),
                    "No local payment matches gateway snapshot"
                );
                Ok(None)
            }
        }
    }

    /// Merges `snapshot` into `payment` and stores the result.
    pub async fn reconcile_payment(
        &self,
        payment: Payment,
        snapshot: Option<&PaymentSnapshot>,
    ) -> Result<LedgerUpdate, BillingError> {
        let payment_id = payment.id;
        let mut current = payment;

        for attempt in 1..=MAX_RECONCILE_ATTEMPTS {
            let outcome = ReconciliationEngine::reconcile(&current, snapshot);

            if outcome.refused {
                tracing::warn!(
                    payment_id = %current.id,
                    current = %current.status,
                    reported = ?snapshot.and_then(|s| s.status),
                    "Ignoring gateway status for closed payment"
                );
            }
            if !outcome.changed {
                return Ok(LedgerUpdate {
                    payment: outcome.payment,
                    previous_status: outcome.previous_status,
                    changed: false,
                    published: false,
                    refused: outcome.refused,
                });
            }

            match self.payments.update(&outcome.payment).await? {
                UpdateResult::Updated => {
                    let mut stored = outcome.payment;
                    stored.version += 1;

                    if stored.status != outcome.previous_status {
                        tracing::info!(
                            payment_id = %stored.id,
                            from = %outcome.previous_status,
                            to = %stored.status,
                            status_detail = stored.status_detail.as_deref().unwrap_or(""),
                            "Payment status changed"
                        );
                    }

                    let published = if outcome.should_publish_approved {
                        self.publish_approved(&stored).await
                    } else {
                        false
                    };

                    return Ok(LedgerUpdate {
                        payment: stored,
                        previous_status: outcome.previous_status,
                        changed: true,
                        published,
                        refused: false,
                    });
                }
                UpdateResult::VersionConflict => {
                    tracing::debug!(
                        payment_id = %payment_id,
                        attempt,
                        "Version conflict, re-reading payment"
                    );
                    current = self
                        .payments
                        .find_by_id(&payment_id)
                        .await?
                        .ok_or_else(|| BillingError::payment_not_found(payment_id.to_string()))?;
                }
            }
        }

        tracing::warn!(payment_id = %payment_id, "Gave up reconciling after repeated conflicts");
        Err(BillingError::ConcurrentModification(payment_id))
    }

    /// Moves an approved payment to `Upgraded`.
    pub async fn mark_upgraded(&self, payment: Payment) -> Result<Payment, BillingError> {
        let payment_id = payment.id;
        let mut current = payment;

        for _ in 0..MAX_RECONCILE_ATTEMPTS {
            let mut next = current.clone();
            next.mark_upgraded(Timestamp::now())?;

            match self.payments.update(&next).await? {
                UpdateResult::Updated => {
                    next.version += 1;
                    tracing::info!(payment_id = %next.id, "Payment superseded by upgrade");
                    return Ok(next);
                }
                UpdateResult::VersionConflict => {
                    current = self
                        .payments
                        .find_by_id(&payment_id)
                        .await?
                        .ok_or_else(|| BillingError::payment_not_found(payment_id.to_string()))?;
                }
            }
        }

        Err(BillingError::ConcurrentModification(payment_id))
    }

    /// Publishes `payment.approved.v1`. Returns whether it went out.
    pub async fn publish_approved(&self, payment: &Payment) -> bool {
        let plan = match self.plans.find_by_id(&payment.plan_id).await {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                tracing::error!(
                    payment_id = %payment.id,
                    plan_id = %payment.plan_id,
                    "Plan missing, approved event not published"
                );
                return false;
            }
            Err(e) => {
                tracing::error!(payment_id = %payment.id, error = %e, "Plan lookup failed, approved event not published");
                return false;
            }
        };

        let event = PaymentApproved::new(payment, &plan);
        let envelope = match EventEnvelope::from_event(&event) {
            Ok(envelope) => envelope.with_user_id(payment.user_id.to_string()),
            Err(e) => {
                tracing::error!(payment_id = %payment.id, error = %e, "Failed to serialize approved event");
                return false;
            }
        };

        match self.publisher.publish(envelope).await {
            Ok(()) => {
                tracing::info!(
                    payment_id = %payment.id,
                    event_id = %event.event_id,
                    "Published payment approved event"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    payment_id = %payment.id,
                    error = %e,
                    "Failed to publish payment approved event"
                );
                false
            }
        }
    }
}
