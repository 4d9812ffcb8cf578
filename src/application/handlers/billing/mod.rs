//! Billing handlers.
//!
//! Command and query handlers for the payment lifecycle:
//!
//! ## Commands
//! - Charging a card for a plan
//! - Upgrading to another plan with proration
//! - Ingesting gateway webhooks
//! - Reconciling unsettled payments on a timer
//!
//! ## Queries
//! - Payment status by external reference
//! - Card payment methods
//!
//! Every status change goes through [`PaymentLedger`].

mod get_payment_status;
mod handle_gateway_webhook;
mod list_payment_methods;
mod payment_ledger;
mod process_direct_payment;
mod reconcile_pending_payments;
mod upgrade_plan;

pub use payment_ledger::{LedgerUpdate, PaymentLedger, RecordOutcome, MAX_RECONCILE_ATTEMPTS};

// Commands
pub use handle_gateway_webhook::{WebhookIngestor, WebhookOutcome};
pub use process_direct_payment::{
    CardCharge, ChargeSettings, ProcessDirectPaymentCommand, ProcessDirectPaymentHandler,
    ProcessDirectPaymentResult, MAX_INSTALLMENTS,
};
pub use reconcile_pending_payments::{
    ReconciliationScheduler, ReconciliationSchedulerConfig, SweepReport,
};
pub use upgrade_plan::{UpgradePlanCommand, UpgradePlanHandler, UpgradePlanResult};

// Queries
pub use get_payment_status::GetPaymentStatusHandler;
pub use list_payment_methods::ListPaymentMethodsHandler;
