//! Payment aggregate.
//!
//! One row per charge attempt. Status changes coming from the gateway go
//! through `ReconciliationEngine`; the only local transition is
//! `mark_upgraded`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BillingError, PaymentSnapshot, PaymentStatus};
use crate::domain::foundation::{
    GatewayPaymentId, PaymentId, PlanId, StateMachine, Timestamp, UserId,
};

/// Stored when the gateway has not issued an authorization code yet.
pub const PENDING_AUTHORIZATION_CODE: &str = "PENDING";

/// Authorization code of an upgrade that needed no charge.
pub const UPGRADE_AUTHORIZATION_CODE: &str = "UPGRADE";

/// Who is paying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerInfo {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub identification_type: Option<String>,
    pub identification_number: Option<String>,
}

impl PayerInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Local facts about a charge before the gateway has answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDraft {
    pub external_reference: String,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub amount: Decimal,
    pub currency: String,
    pub installments: u32,
    pub payment_method_id: Option<String>,
    pub payer: PayerInfo,
}

/// A recorded payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub external_reference: String,
    pub gateway_payment_id: Option<GatewayPaymentId>,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub amount: Decimal,
    pub currency: String,
    pub installments: u32,
    pub payment_method_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub authorization_code: Option<String>,
    pub transaction_id: Option<String>,
    pub payer: PayerInfo,
    pub created_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub updated_at: Timestamp,
    /// Optimistic concurrency token, bumped by the repository on every write.
    pub version: i64,
}

impl Payment {
    /// Builds the row for a charge the gateway has just accepted.
    ///
    /// The gateway's amount, currency and method win over what was
    /// requested. A missing authorization code is stored as the
    /// `PENDING` placeholder until reconciliation fills it in.
    pub fn from_gateway_charge(draft: PaymentDraft, snapshot: &PaymentSnapshot, now: Timestamp) -> Self {
        let status = snapshot.resolved_status();
        let approved_at = match (status, snapshot.date_approved) {
            (_, Some(at)) => Some(at),
            (PaymentStatus::Approved, None) => Some(now),
            _ => None,
        };

        Self {
            id: PaymentId::new(),
            external_reference: draft.external_reference,
            gateway_payment_id: Some(snapshot.id.clone()),
            user_id: draft.user_id,
            plan_id: draft.plan_id,
            amount: snapshot.transaction_amount.unwrap_or(draft.amount),
            currency: snapshot.currency_id.clone().unwrap_or(draft.currency),
            installments: snapshot.installments.unwrap_or(draft.installments),
            payment_method_id: snapshot.payment_method_id.clone().or(draft.payment_method_id),
            payment_type_id: snapshot.payment_type_id.clone(),
            status,
            status_detail: snapshot.status_detail.clone(),
            authorization_code: Some(
                snapshot
                    .authorization_code()
                    .unwrap_or(PENDING_AUTHORIZATION_CODE)
                    .to_string(),
            ),
            transaction_id: Some(snapshot.id.to_string()),
            payer: draft.payer,
            created_at: snapshot.date_created.unwrap_or(now),
            approved_at,
            updated_at: now,
            version: 0,
        }
    }

    /// Builds an already-approved row for an upgrade whose prorated cost is zero.
    pub fn approved_without_charge(draft: PaymentDraft, now: Timestamp) -> Self {
        Self {
            id: PaymentId::new(),
            external_reference: draft.external_reference,
            gateway_payment_id: None,
            user_id: draft.user_id,
            plan_id: draft.plan_id,
            amount: Decimal::ZERO.round_dp(2),
            currency: draft.currency,
            installments: draft.installments,
            payment_method_id: draft.payment_method_id,
            payment_type_id: None,
            status: PaymentStatus::Approved,
            status_detail: Some("upgrade_without_charge".to_string()),
            authorization_code: Some(UPGRADE_AUTHORIZATION_CODE.to_string()),
            transaction_id: None,
            payer: draft.payer,
            created_at: now,
            approved_at: Some(now),
            updated_at: now,
            version: 0,
        }
    }

    /// Retires an approved payment after its plan was upgraded.
    pub fn mark_upgraded(&mut self, now: Timestamp) -> Result<(), BillingError> {
        if self.status != PaymentStatus::Approved {
            return Err(BillingError::invalid_state(self.status.as_str(), "upgrade"));
        }
        self.status = self
            .status
            .transition_to(PaymentStatus::Upgraded)
            .map_err(|e| BillingError::invalid_state(self.status.as_str(), e.to_string()))?;
        self.updated_at = now;
        Ok(())
    }

    /// True while only the placeholder authorization code is stored.
    pub fn awaiting_authorization_code(&self) -> bool {
        matches!(
            self.authorization_code.as_deref(),
            None | Some(PENDING_AUTHORIZATION_CODE)
        )
    }

    /// When access granted by this payment started.
    pub fn access_start(&self) -> Timestamp {
        self.approved_at.unwrap_or(self.created_at)
    }
}
