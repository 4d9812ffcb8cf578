//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    ChargeSettings, GetPaymentStatusHandler, ListPaymentMethodsHandler, PaymentLedger,
    ProcessDirectPaymentHandler, UpgradePlanHandler, WebhookIngestor,
};
use crate::domain::billing::{
    BillingError, EventDeduplicator, WebhookError, WebhookSignatureVerifier,
};
use crate::ports::{
    EventPublisher, PaymentGateway, PaymentRepository, PlanRepository, WebhookEventRepository,
};

use super::dto::{
    ErrorResponse, HealthResponse, PaymentMethodsResponse, PaymentResponse,
    ProcessPaymentRequest, ProcessPaymentResponse, UpgradePlanRequest, UpgradePlanResponse,
    WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every handler is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub ledger: Arc<PaymentLedger>,
    pub webhook_ingestor: Arc<WebhookIngestor>,
    pub direct_payments: Arc<ProcessDirectPaymentHandler>,
    pub upgrades: Arc<UpgradePlanHandler>,
    pub payment_status: Arc<GetPaymentStatusHandler>,
    pub payment_methods: Arc<ListPaymentMethodsHandler>,
}

/// Ports the billing handlers are built from.
#[derive(Clone)]
pub struct BillingPorts {
    pub payments: Arc<dyn PaymentRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub publisher: Arc<dyn EventPublisher>,
}

impl BillingAppState {
    /// Wires every billing handler around one shared ledger.
    pub fn new(ports: BillingPorts, webhook_secret: &str, settings: ChargeSettings) -> Self {
        let ledger = Arc::new(PaymentLedger::new(
            ports.payments.clone(),
            ports.plans.clone(),
            ports.publisher.clone(),
        ));
        let direct_payments = Arc::new(ProcessDirectPaymentHandler::new(
            ledger.clone(),
            ports.plans.clone(),
            ports.gateway.clone(),
            settings,
        ));

        Self {
            webhook_ingestor: Arc::new(WebhookIngestor::new(
                WebhookSignatureVerifier::new(webhook_secret),
                EventDeduplicator::new(ports.webhook_events.clone()),
                ports.gateway.clone(),
                ledger.clone(),
            )),
            upgrades: Arc::new(UpgradePlanHandler::new(
                ledger.clone(),
                ports.plans.clone(),
                direct_payments.clone(),
            )),
            payment_status: Arc::new(GetPaymentStatusHandler::new(
                ledger.clone(),
                ports.gateway.clone(),
            )),
            payment_methods: Arc::new(ListPaymentMethodsHandler::new(ports.gateway)),
            direct_payments,
            ledger,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/gateway - Gateway payment notifications
///
/// The body is taken as raw bytes; the signature covers them exactly.
pub async fn receive_gateway_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let outcome = state.webhook_ingestor.ingest(&headers, &body).await?;
    Ok(Json(WebhookAckResponse {
        status: outcome.as_str(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Commands (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payments/process - Charge a card for a plan
pub async fn process_payment(
    State(state): State<BillingAppState>,
    Json(request): Json<ProcessPaymentRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state.direct_payments.handle(request.into()).await?;
    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let response = ProcessPaymentResponse {
        payment: PaymentResponse::from(&result.payment),
        created: result.created,
    };
    Ok((status, Json(response)))
}

/// POST /payments/upgrade-plan - Switch to another plan with proration
pub async fn upgrade_plan(
    State(state): State<BillingAppState>,
    Json(request): Json<UpgradePlanRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state.upgrades.handle(request.into()).await?;
    Ok((StatusCode::CREATED, Json(UpgradePlanResponse::from(&result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Queries (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /payments/status/:external_reference - Current payment status
pub async fn get_payment_status(
    State(state): State<BillingAppState>,
    Path(external_reference): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let payment = state.payment_status.handle(&external_reference).await?;
    Ok(Json(PaymentResponse::from(&payment)))
}

/// GET /payments/methods - Card payment methods
pub async fn list_payment_methods(State(state): State<BillingAppState>) -> impl IntoResponse {
    Json(PaymentMethodsResponse {
        methods: state.payment_methods.handle().await,
    })
}

/// GET /payments/health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "UP" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            BillingError::PaymentNotFound(_)
            | BillingError::PlanNotFound(_)
            | BillingError::NoActiveSubscription(_) => StatusCode::NOT_FOUND,
            BillingError::PlanNotActive(_)
            | BillingError::AmountMismatch { .. }
            | BillingError::SamePlan(_)
            | BillingError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            BillingError::SubscriptionExpired { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BillingError::InvalidState { .. } | BillingError::ConcurrentModification(_) => {
                StatusCode::CONFLICT
            }
            BillingError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(code = %self.0.code(), error = %self.0.message(), "Billing request failed");
        }

        let body = ErrorResponse::new(self.0.code().to_string(), self.0.message())
            .retryable(self.0.is_retryable());
        (status, Json(body)).into_response()
    }
}

/// API error type for the webhook endpoint. The status code drives the
/// gateway's redelivery.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let code = match &self.0 {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::Database(_) => "PROCESSING_FAILED",
        };
        let body = ErrorResponse::new(code, self.0.to_string()).retryable(self.0.is_retryable());
        (self.0.status_code(), Json(body)).into_response()
    }
}
