//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers (write) and query handlers (read) live side by side per
//! bounded context.

pub mod handlers;

pub use handlers::billing::{
    GetPaymentStatusHandler, ListPaymentMethodsHandler, PaymentLedger,
    ProcessDirectPaymentCommand, ProcessDirectPaymentHandler, ReconciliationScheduler,
    UpgradePlanCommand, UpgradePlanHandler, WebhookIngestor, WebhookOutcome,
};
