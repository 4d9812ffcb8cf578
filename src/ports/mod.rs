//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentGateway` - charge creation and status lookups
//! - `PaymentRepository` - payment rows with compare-and-set updates
//! - `PlanRepository` - read-only plan catalogue
//! - `WebhookEventRepository` - webhook idempotency tracking
//! - `EventPublisher` - outbound domain events

mod event_publisher;
mod payment_gateway;
mod payment_repository;
mod plan_repository;
mod webhook_event_repository;

pub use event_publisher::EventPublisher;
pub use payment_gateway::{
    CreatePaymentRequest, GatewayError, GatewayErrorCode, PaymentGateway, PaymentMethod,
    CARD_PAYMENT_TYPES, FALLBACK_PAYMENT_METHODS,
};
pub use payment_repository::{InsertResult, PaymentRepository, UpdateResult};
pub use plan_repository::PlanRepository;
pub use webhook_event_repository::{SaveResult, WebhookEventRecord, WebhookEventRepository};
