//! Payment gateway adapters.
//!
//! - `HttpPaymentGateway` - REST client for the hosted gateway
//! - `MockPaymentGateway` - in-memory gateway for tests and local runs

mod gateway_types;
mod http_gateway;
mod mock_gateway;

pub use gateway_types::{GatewayPaymentRequest, GatewayPaymentResponse};
pub use http_gateway::{HttpGatewayConfig, HttpPaymentGateway, IDEMPOTENCY_HEADER};
pub use mock_gateway::MockPaymentGateway;
