//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! Field names are camelCase on the wire. Money is read from either a JSON
//! number or a string and written back as a JSON number.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::handlers::billing::{
    ProcessDirectPaymentCommand, UpgradePlanCommand, UpgradePlanResult,
};
use crate::domain::billing::{PayerInfo, Payment, PaymentStatus, Proration};
use crate::domain::foundation::{PlanId, UserId};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Payer identity as sent by the checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub identification_type: Option<String>,
    #[serde(default)]
    pub identification_number: Option<String>,
}

impl From<PayerRequest> for PayerInfo {
    fn from(req: PayerRequest) -> Self {
        PayerInfo {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            identification_type: req.identification_type,
            identification_number: req.identification_number,
        }
    }
}

/// Request to charge a card for a plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    /// Caller-chosen idempotency key.
    pub external_reference: String,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub amount: Decimal,
    /// Card token produced by the gateway's client SDK.
    pub token: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_installments")]
    pub installments: u32,
    pub payment_method_id: String,
    pub payer: PayerRequest,
}

impl From<ProcessPaymentRequest> for ProcessDirectPaymentCommand {
    fn from(req: ProcessPaymentRequest) -> Self {
        ProcessDirectPaymentCommand {
            external_reference: req.external_reference,
            user_id: UserId::from_uuid(req.user_id),
            plan_id: PlanId::from_uuid(req.plan_id),
            amount: req.amount,
            token: req.token,
            description: req.description,
            installments: req.installments,
            payment_method_id: req.payment_method_id,
            payer: req.payer.into(),
        }
    }
}

/// Request to move the user to another plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePlanRequest {
    pub user_id: Uuid,
    pub new_plan_id: Uuid,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_installments")]
    pub installments: u32,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub identification_type: Option<String>,
    #[serde(default)]
    pub identification_number: Option<String>,
}

impl From<UpgradePlanRequest> for UpgradePlanCommand {
    fn from(req: UpgradePlanRequest) -> Self {
        UpgradePlanCommand {
            user_id: UserId::from_uuid(req.user_id),
            new_plan_id: PlanId::from_uuid(req.new_plan_id),
            token: req.token,
            installments: req.installments,
            payment_method_id: req.payment_method_id,
            identification_type: req.identification_type,
            identification_number: req.identification_number,
        }
    }
}

fn default_installments() -> u32 {
    1
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Payment as returned by every payment endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub external_reference: String,
    pub gateway_payment_id: Option<String>,
    pub user_id: String,
    pub plan_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub installments: u32,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub authorization_code: Option<String>,
    pub payment_method_id: Option<String>,
    pub payment_type_id: Option<String>,
    /// ISO 8601
    pub created_at: String,
    /// ISO 8601
    pub approved_at: Option<String>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            external_reference: payment.external_reference.clone(),
            gateway_payment_id: payment.gateway_payment_id.as_ref().map(|id| id.to_string()),
            user_id: payment.user_id.to_string(),
            plan_id: payment.plan_id.to_string(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            installments: payment.installments,
            status: payment.status,
            status_detail: payment.status_detail.clone(),
            authorization_code: payment.authorization_code.clone(),
            payment_method_id: payment.payment_method_id.clone(),
            payment_type_id: payment.payment_type_id.clone(),
            created_at: payment.created_at.as_datetime().to_rfc3339(),
            approved_at: payment.approved_at.map(|t| t.as_datetime().to_rfc3339()),
        }
    }
}

/// Result of a direct payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
    #[serde(flatten)]
    pub payment: PaymentResponse,
    /// False when the external reference was already on record.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProrationResponse {
    pub days_remaining: i64,
    pub total_days_in_cycle: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_to_charge: Decimal,
    /// ISO 8601
    pub current_period_end: String,
}

impl From<&Proration> for ProrationResponse {
    fn from(p: &Proration) -> Self {
        Self {
            days_remaining: p.days_remaining,
            total_days_in_cycle: p.total_days_in_cycle,
            daily_rate: p.daily_rate,
            remaining_value: p.remaining_value,
            amount_to_charge: p.amount_to_charge,
            current_period_end: p.expires_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePlanResponse {
    pub previous_payment_id: String,
    pub payment: PaymentResponse,
    pub proration: ProrationResponse,
}

impl From<&UpgradePlanResult> for UpgradePlanResponse {
    fn from(result: &UpgradePlanResult) -> Self {
        Self {
            previous_payment_id: result.previous_payment.id.to_string(),
            payment: PaymentResponse::from(&result.payment),
            proration: ProrationResponse::from(&result.proration),
        }
    }
}

/// Acknowledgement body for the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodsResponse {
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Set when repeating the same request may succeed.
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}
