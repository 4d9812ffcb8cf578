//! Event publisher adapters.
//!
//! - `RedisEventPublisher` - pub/sub delivery for deployments
//! - `InMemoryEventBus` - capturing bus for tests and local runs

mod in_memory;
mod redis_publisher;

pub use in_memory::InMemoryEventBus;
pub use redis_publisher::{RedisEventPublisher, PAYMENT_APPROVED_CHANNEL};
