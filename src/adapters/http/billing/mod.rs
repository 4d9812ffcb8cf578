//! HTTP adapter for billing endpoints.
//!
//! - `POST /webhooks/gateway` - Gateway payment notifications
//! - `POST /payments/process` - Charge a card for a plan
//! - `POST /payments/upgrade-plan` - Switch plans with proration
//! - `GET /payments/status/:external_reference` - Payment status
//! - `GET /payments/methods` - Card payment methods
//! - `GET /payments/health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState, BillingPorts, WebhookApiError};
pub use routes::{billing_app, billing_router, payment_routes, webhook_routes};
