//! REST adapter for the payment gateway.
//!
//! Every call carries the bearer token and the client-wide timeout. Nothing
//! is retried here: a failed create surfaces to the caller, a failed lookup
//! is left for the next reconciliation sweep.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::domain::billing::PaymentSnapshot;
use crate::domain::foundation::GatewayPaymentId;
use crate::ports::{CreatePaymentRequest, GatewayError, GatewayErrorCode, PaymentGateway, PaymentMethod};

use super::gateway_types::{
    GatewayErrorBody, GatewayPaymentMethod, GatewayPaymentRequest, GatewayPaymentResponse,
};

/// Header the gateway uses to collapse retried creates.
pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

/// Connection settings for [`HttpPaymentGateway`].
#[derive(Clone)]
pub struct HttpGatewayConfig {
    access_token: SecretString,
    base_url: String,
    timeout: Duration,
}

impl HttpGatewayConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            base_url: "https://api.mercadopago.com".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl From<&GatewayConfig> for HttpGatewayConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self::new(config.access_token.clone())
            .with_base_url(config.base_url.clone())
            .with_timeout(config.timeout())
    }
}

pub struct HttpPaymentGateway {
    config: HttpGatewayConfig,
    http_client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn transport_error(err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::timeout(err.to_string())
        } else {
            GatewayError::network(err.to_string())
        }
    }

    async fn error_from_response(operation: &str, response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let raw = response.text().await.unwrap_or_default();
        let error = GatewayError::from_status(status, GatewayErrorBody::describe(&raw));
        tracing::error!(
            operation,
            status,
            code = %error.code,
            error = %error.message,
            "Gateway call failed"
        );
        error
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        response.json::<T>().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorCode::InvalidResponse,
                format!("Failed to parse gateway response: {}", e),
            )
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
        idempotency_key: &str,
    ) -> Result<PaymentSnapshot, GatewayError> {
        let external_reference = request.external_reference.clone();
        let body = GatewayPaymentRequest::from(request);

        tracing::info!(
            external_reference = %external_reference,
            amount = %body.transaction_amount,
            payment_method_id = %body.payment_method_id,
            "Submitting charge to gateway"
        );

        let response = self
            .http_client
            .post(self.url("/v1/payments"))
            .bearer_auth(self.config.access_token.expose_secret())
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("create_payment", response).await);
        }

        let payment: GatewayPaymentResponse = Self::decode(response).await?;
        let snapshot = PaymentSnapshot::try_from(payment)?;

        tracing::info!(
            gateway_payment_id = %snapshot.id,
            status = ?snapshot.status,
            status_detail = snapshot.status_detail.as_deref().unwrap_or(""),
            "Gateway accepted charge"
        );
        Ok(snapshot)
    }

    async fn get_payment(&self, id: &GatewayPaymentId) -> Result<Option<PaymentSnapshot>, GatewayError> {
        let response = self
            .http_client
            .get(self.url(&format!("/v1/payments/{}", id)))
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(gateway_payment_id = %id, "Gateway does not know payment");
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Self::error_from_response("get_payment", response).await);
        }

        let payment: GatewayPaymentResponse = Self::decode(response).await?;
        PaymentSnapshot::try_from(payment).map(Some)
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, GatewayError> {
        let response = self
            .http_client
            .get(self.url("/v1/payment_methods"))
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("list_payment_methods", response).await);
        }

        let methods: Vec<GatewayPaymentMethod> = Self::decode(response).await?;
        Ok(methods
            .into_iter()
            .filter(GatewayPaymentMethod::is_active)
            .map(PaymentMethod::from)
            .collect())
    }
}
