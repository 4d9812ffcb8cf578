//! Gateway-reported view of a single charge.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PaymentStatus;
use crate::domain::foundation::{GatewayPaymentId, Timestamp};

/// What the gateway says about a payment at one point in time.
///
/// Every field except the id is optional because the gateway omits them
/// freely depending on payment method and state. Timestamps are already
/// normalized to UTC by the adapter that built the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    pub id: GatewayPaymentId,
    pub status: Option<PaymentStatus>,
    pub status_detail: Option<String>,
    pub transaction_amount: Option<Decimal>,
    pub currency_id: Option<String>,
    pub external_reference: Option<String>,
    pub payment_method_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub authorization_code: Option<String>,
    pub installments: Option<u32>,
    pub date_created: Option<Timestamp>,
    pub date_approved: Option<Timestamp>,
}

impl PaymentSnapshot {
    /// Bare snapshot carrying only the gateway id.
    pub fn new(id: GatewayPaymentId) -> Self {
        Self {
            id,
            status: None,
            status_detail: None,
            transaction_amount: None,
            currency_id: None,
            external_reference: None,
            payment_method_id: None,
            payment_type_id: None,
            authorization_code: None,
            installments: None,
            date_created: None,
            date_approved: None,
        }
    }

    /// Status to apply locally; a missing status reads as `Unknown`.
    pub fn resolved_status(&self) -> PaymentStatus {
        self.status.unwrap_or(PaymentStatus::Unknown)
    }

    /// Authorization code, ignoring blank strings.
    pub fn authorization_code(&self) -> Option<&str> {
        self.authorization_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// External reference, ignoring blank strings.
    pub fn external_reference(&self) -> Option<&str> {
        self.external_reference
            .as_deref()
            .map(str::trim)
            .filter(|reference| !reference.is_empty())
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_status_detail(mut self, detail: impl Into<String>) -> Self {
        self.status_detail = Some(detail.into());
        self
    }

    pub fn with_external_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    pub fn with_authorization_code(mut self, code: impl Into<String>) -> Self {
        self.authorization_code = Some(code.into());
        self
    }

    pub fn with_date_approved(mut self, at: Timestamp) -> Self {
        self.date_approved = Some(at);
        self
    }

    pub fn with_amount(mut self, amount: Decimal, currency_id: impl Into<String>) -> Self {
        self.transaction_amount = Some(amount);
        self.currency_id = Some(currency_id.into());
        self
    }
}
