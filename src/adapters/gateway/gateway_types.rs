//! Wire types for the gateway's REST API.
//!
//! Only the fields billing reads are modelled; everything else in the
//! gateway's responses is ignored. Amounts travel as JSON numbers and
//! timestamps carry the gateway's local offset, which is normalized to UTC
//! on the way into a `PaymentSnapshot`.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::billing::{PaymentSnapshot, PaymentStatus};
use crate::domain::foundation::{GatewayPaymentId, Timestamp};
use crate::ports::{CreatePaymentRequest, GatewayError, GatewayErrorCode, PaymentMethod};

/// `POST /v1/payments` body.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayPaymentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub transaction_amount: Decimal,
    pub token: String,
    pub description: String,
    pub installments: u32,
    pub payment_method_id: String,
    pub external_reference: String,
    pub statement_descriptor: String,
    pub binary_mode: bool,
    pub payer: GatewayPayer,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayPayer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identification: Option<GatewayIdentification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayIdentification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

impl From<CreatePaymentRequest> for GatewayPaymentRequest {
    fn from(request: CreatePaymentRequest) -> Self {
        let payer = request.payer;
        let identification = match (payer.identification_type, payer.identification_number) {
            (Some(kind), Some(number)) => Some(GatewayIdentification { kind, number }),
            _ => None,
        };

        Self {
            transaction_amount: request.transaction_amount,
            token: request.token,
            description: request.description,
            installments: request.installments,
            payment_method_id: request.payment_method_id,
            external_reference: request.external_reference,
            statement_descriptor: request.statement_descriptor,
            binary_mode: false,
            payer: GatewayPayer {
                email: payer.email,
                first_name: payer.first_name,
                last_name: payer.last_name,
                identification,
            },
        }
    }
}

/// Payment resource as returned by create and get.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPaymentResponse {
    /// Numeric in practice; accepted as a string too.
    pub id: Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub transaction_amount: Option<Decimal>,
    #[serde(default)]
    pub currency_id: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub payment_type_id: Option<String>,
    #[serde(default)]
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub installments: Option<u32>,
    #[serde(default)]
    pub date_created: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub date_approved: Option<DateTime<FixedOffset>>,
}

fn to_utc(value: DateTime<FixedOffset>) -> Timestamp {
    Timestamp::from_datetime(value.with_timezone(&Utc))
}

impl TryFrom<GatewayPaymentResponse> for PaymentSnapshot {
    type Error = GatewayError;

    fn try_from(response: GatewayPaymentResponse) -> Result<Self, Self::Error> {
        let raw_id = match &response.id {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            other => {
                return Err(GatewayError::new(
                    GatewayErrorCode::InvalidResponse,
                    format!("Unexpected payment id: {}", other),
                ))
            }
        };
        let id = GatewayPaymentId::new(raw_id)
            .map_err(|e| GatewayError::new(GatewayErrorCode::InvalidResponse, e.to_string()))?;

        Ok(PaymentSnapshot {
            id,
            status: response.status.as_deref().map(PaymentStatus::parse),
            status_detail: response.status_detail,
            transaction_amount: response.transaction_amount,
            currency_id: response.currency_id,
            external_reference: response.external_reference,
            payment_method_id: response.payment_method_id,
            payment_type_id: response.payment_type_id,
            authorization_code: response.authorization_code,
            installments: response.installments,
            date_created: response.date_created.map(to_utc),
            date_approved: response.date_approved.map(to_utc),
        })
    }
}

/// Entry of `GET /v1/payment_methods`.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPaymentMethod {
    pub id: String,
    #[serde(default)]
    pub payment_type_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl GatewayPaymentMethod {
    pub fn is_active(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "active")
    }
}

impl From<GatewayPaymentMethod> for PaymentMethod {
    fn from(method: GatewayPaymentMethod) -> Self {
        PaymentMethod {
            id: method.id,
            payment_type_id: method.payment_type_id,
        }
    }
}

/// Error body the gateway returns with 4xx/5xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GatewayErrorBody {
    /// Best human-readable message, falling back to the raw text.
    pub fn describe(raw: &str) -> String {
        serde_json::from_str::<GatewayErrorBody>(raw)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_else(|| raw.to_string())
    }
}
