//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `events` - Event publishers (Redis pub/sub, in-memory)
//! - `gateway` - Payment gateway clients (REST, mock)
//! - `http` - Axum REST endpoints
//! - `memory` - In-memory repositories
//! - `postgres` - PostgreSQL repositories

pub mod events;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod postgres;

pub use events::{InMemoryEventBus, RedisEventPublisher};
pub use gateway::{HttpPaymentGateway, MockPaymentGateway};
