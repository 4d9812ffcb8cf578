//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentRepository` - Payment rows with compare-and-set updates
//! - `PostgresWebhookEventRepository` - Append-only webhook dedup log
//! - `PostgresPlanRepository` - Read access to the plan catalog

mod payment_repository;
mod plan_repository;
mod webhook_event_repository;

pub use payment_repository::PostgresPaymentRepository;
pub use plan_repository::PostgresPlanRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
