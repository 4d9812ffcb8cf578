//! Billing domain events.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Payment, Plan};
use crate::domain::foundation::{domain_event, EventId, PaymentId, PlanId, Timestamp, UserId};

/// Published once per payment when it first becomes approved.
///
/// Consumers grant the subscription from this event, so it carries
/// everything they need without calling back into billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentApproved {
    pub event_id: EventId,
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub payer_email: String,
    pub payer_full_name: String,
    pub plan_id: PlanId,
    pub plan_name: String,
    pub plan_duration_months: u32,
    pub amount: Decimal,
    pub currency: String,
    pub external_reference: String,
    pub payment_created_at: Timestamp,
    pub transaction_id: Option<String>,
    pub occurred_at: Timestamp,
}

domain_event!(
    PaymentApproved,
    event_type = "payment.approved.v1",
    schema_version = 1,
    aggregate_id = payment_id,
    aggregate_type = "Payment",
    occurred_at = occurred_at,
    event_id = event_id
);

impl PaymentApproved {
    pub fn new(payment: &Payment, plan: &Plan) -> Self {
        Self {
            event_id: EventId::new(),
            payment_id: payment.id,
            user_id: payment.user_id,
            payer_email: payment.payer.email.clone(),
            payer_full_name: payment.payer.full_name(),
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            plan_duration_months: plan.duration_months,
            amount: payment.amount,
            currency: payment.currency.clone(),
            external_reference: payment.external_reference.clone(),
            payment_created_at: payment.created_at,
            transaction_id: payment.transaction_id.clone(),
            occurred_at: Timestamp::now(),
        }
    }
}
