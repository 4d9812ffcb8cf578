//! Axum router configuration for billing endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{
    get_payment_status, health, list_payment_methods, process_payment, receive_gateway_webhook,
    upgrade_plan, BillingAppState,
};

/// Create the payments API router.
///
/// # Routes
/// - `POST /process` - Charge a card for a plan
/// - `POST /upgrade-plan` - Switch plans with proration
/// - `GET /status/:external_reference` - Payment status
/// - `GET /methods` - Card payment methods
/// - `GET /health` - Liveness probe
pub fn payment_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/process", post(process_payment))
        .route("/upgrade-plan", post(upgrade_plan))
        .route("/status/:external_reference", get(get_payment_status))
        .route("/methods", get(list_payment_methods))
        .route("/health", get(health))
}

/// Create the gateway webhook router.
///
/// Separate from the payment routes because the gateway authenticates by
/// signature, not by user.
///
/// # Routes
/// - `POST /gateway` - Gateway payment notifications
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/gateway", post(receive_gateway_webhook))
}

/// Create the complete billing router, mounted at `/payments` and `/webhooks`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/payments", payment_routes())
        .nest("/webhooks", webhook_routes())
}

/// The billing router with state applied and the request layers the server uses.
pub fn billing_app(state: BillingAppState, request_timeout: Duration) -> Router {
    billing_router()
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}
