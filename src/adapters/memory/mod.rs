//! In-memory adapters.
//!
//! Same constraint semantics as the PostgreSQL adapters (unique external
//! reference, version compare-and-set, primary key on webhook event id).
//! Used by tests and for running the service without a database.

mod payment_repository;
mod plan_repository;
mod webhook_event_repository;

pub use payment_repository::InMemoryPaymentRepository;
pub use plan_repository::InMemoryPlanRepository;
pub use webhook_event_repository::InMemoryWebhookEventRepository;
