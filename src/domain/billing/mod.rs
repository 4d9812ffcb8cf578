//! Billing domain - payments, plans, reconciliation and proration.
//!
//! A payment is created once per external reference and afterwards only
//! changes through reconciliation against a gateway snapshot, or when an
//! upgrade supersedes it.

mod deduplicator;
mod errors;
mod events;
mod notification;
mod payment;
mod plan;
mod proration;
mod reconciliation;
mod signature;
mod snapshot;
mod status;
mod webhook_errors;

pub use deduplicator::EventDeduplicator;
pub use errors::BillingError;
pub use events::PaymentApproved;
pub use notification::{WebhookNotification, UNKNOWN_TOPIC};
pub use payment::{
    PayerInfo, Payment, PaymentDraft, PENDING_AUTHORIZATION_CODE, UPGRADE_AUTHORIZATION_CODE,
};
pub use plan::{Plan, DEFAULT_CURRENCY};
pub use proration::{
    calculate_upgrade_charge, round_money, Proration, UpgradeQuote, DAYS_PER_BILLING_MONTH,
};
pub use reconciliation::{Reconciliation, ReconciliationEngine};
pub use signature::{
    sign_base64, sign_hex, signature_header, verify_signature, WebhookSignatureVerifier,
    SIGNATURE_HEADERS,
};
pub use snapshot::PaymentSnapshot;
pub use status::PaymentStatus;
pub use webhook_errors::WebhookError;

#[cfg(test)]
pub(crate) use payment::fixtures;
