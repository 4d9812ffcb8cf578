//! Merging a gateway snapshot into a local payment.
//!
//! Pure and deterministic for a given `now`. Persistence, retries and
//! event publication live in the payment ledger.

use super::{Payment, PaymentSnapshot, PaymentStatus};
use crate::domain::foundation::{StateMachine, Timestamp};

/// Result of merging one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The payment after the merge (unchanged when nothing applied).
    pub payment: Payment,
    pub previous_status: PaymentStatus,
    /// True exactly when this merge moved the payment into `Approved`.
    pub should_publish_approved: bool,
    /// True when any stored field differs from the input payment.
    pub changed: bool,
    /// True when the snapshot asked for a transition out of a closed state.
    pub refused: bool,
}

/// Decides how a snapshot changes a payment.
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn reconcile(local: &Payment, snapshot: Option<&PaymentSnapshot>) -> Reconciliation {
        Self::reconcile_at(local, snapshot, Timestamp::now())
    }

    /// Same as `reconcile` with an explicit clock.
    pub fn reconcile_at(
        local: &Payment,
        snapshot: Option<&PaymentSnapshot>,
        now: Timestamp,
    ) -> Reconciliation {
        let previous_status = local.status;
        let unchanged = |refused| Reconciliation {
            payment: local.clone(),
            previous_status,
            should_publish_approved: false,
            changed: false,
            refused,
        };

        let Some(snapshot) = snapshot else {
            return unchanged(false);
        };

        let remote_status = snapshot.resolved_status();
        if !previous_status.can_transition_to(&remote_status) {
            return unchanged(true);
        }

        let mut payment = local.clone();
        payment.status = remote_status;
        payment.status_detail = snapshot.status_detail.clone();

        if payment.gateway_payment_id.is_none() {
            payment.gateway_payment_id = Some(snapshot.id.clone());
        }
        if let Some(code) = snapshot.authorization_code() {
            payment.authorization_code = Some(code.to_string());
        }
        if payment.approved_at.is_none() {
            payment.approved_at = match (snapshot.date_approved, remote_status) {
                (Some(at), _) => Some(at),
                (None, PaymentStatus::Approved) => Some(now),
                _ => None,
            };
        }
        if payment.payment_type_id.is_none() {
            payment.payment_type_id = snapshot.payment_type_id.clone();
        }

        let changed = payment != *local;
        if changed {
            payment.updated_at = now;
        }

        Reconciliation {
            should_publish_approved: remote_status == PaymentStatus::Approved
                && previous_status != PaymentStatus::Approved,
            payment,
            previous_status,
            changed,
            refused: false,
        }
    }
}
