//! Mock payment gateway for testing.
//!
//! Keeps charges in memory so tests can drive the same payment through
//! creation, webhooks and sweeps:
//! - configurable outcome for the next creates
//! - status changes on stored charges (`set_status`)
//! - error injection per operation
//! - call tracking and recorded idempotency keys

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::billing::{PaymentSnapshot, PaymentStatus};
use crate::domain::foundation::{GatewayPaymentId, Timestamp};
use crate::ports::{CreatePaymentRequest, GatewayError, PaymentGateway, PaymentMethod};

/// ```ignore
/// let gateway = MockPaymentGateway::new().with_create_status(PaymentStatus::InProcess);
/// let snapshot = gateway.create_payment(request, "key-1").await?;
/// gateway.set_status(&snapshot.id, PaymentStatus::Approved);
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
    next_id: Arc<AtomicU64>,
}

#[derive(Default)]
struct MockState {
    create_status: Option<PaymentStatus>,
    create_status_detail: Option<String>,
    authorization_code: Option<String>,
    charges: HashMap<GatewayPaymentId, PaymentSnapshot>,
    methods: Option<Vec<PaymentMethod>>,
    create_error: Option<GatewayError>,
    get_error: Option<GatewayError>,
    list_error: Option<GatewayError>,
    create_calls: usize,
    get_calls: usize,
    idempotency_keys: Vec<String>,
    requests: Vec<CreatePaymentRequest>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1_000)),
            ..Default::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    /// Status returned by subsequent creates (default `approved`).
    pub fn with_create_status(self, status: PaymentStatus) -> Self {
        self.state().create_status = Some(status);
        self
    }

    pub fn with_status_detail(self, detail: impl Into<String>) -> Self {
        self.state().create_status_detail = Some(detail.into());
        self
    }

    /// Authorization code attached to approved creates.
    pub fn with_authorization_code(self, code: impl Into<String>) -> Self {
        self.state().authorization_code = Some(code.into());
        self
    }

    pub fn with_methods(self, methods: Vec<PaymentMethod>) -> Self {
        self.state().methods = Some(methods);
        self
    }

    /// Stores a charge as if the gateway had created it elsewhere.
    pub fn insert_snapshot(&self, snapshot: PaymentSnapshot) {
        self.state().charges.insert(snapshot.id.clone(), snapshot);
    }

    /// Moves a stored charge to `status`, stamping approval when relevant.
    pub fn set_status(&self, id: &GatewayPaymentId, status: PaymentStatus) {
        let mut state = self.state();
        let code = state.authorization_code.clone();
        if let Some(snapshot) = state.charges.get_mut(id) {
            snapshot.status = Some(status);
            if status.is_approved() {
                if snapshot.date_approved.is_none() {
                    snapshot.date_approved = Some(Timestamp::now());
                }
                if snapshot.authorization_code.is_none() {
                    snapshot.authorization_code = code;
                }
            }
        }
    }

    pub fn fail_creates(&self, error: GatewayError) {
        self.state().create_error = Some(error);
    }

    pub fn fail_lookups(&self, error: GatewayError) {
        self.state().get_error = Some(error);
    }

    pub fn fail_listing(&self, error: GatewayError) {
        self.state().list_error = Some(error);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.create_error = None;
        state.get_error = None;
        state.list_error = None;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    pub fn get_calls(&self) -> usize {
        self.state().get_calls
    }

    pub fn idempotency_keys(&self) -> Vec<String> {
        self.state().idempotency_keys.clone()
    }

    pub fn last_request(&self) -> Option<CreatePaymentRequest> {
        self.state().requests.last().cloned()
    }

    pub fn snapshot(&self, id: &GatewayPaymentId) -> Option<PaymentSnapshot> {
        self.state().charges.get(id).cloned()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
        idempotency_key: &str,
    ) -> Result<PaymentSnapshot, GatewayError> {
        let mut state = self.state();
        state.create_calls += 1;
        state.idempotency_keys.push(idempotency_key.to_string());
        state.requests.push(request.clone());

        if let Some(error) = state.create_error.clone() {
            return Err(error);
        }

        let raw_id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let id = GatewayPaymentId::new(raw_id)
            .map_err(|e| GatewayError::provider(e.to_string()))?;
        let status = state.create_status.unwrap_or(PaymentStatus::Approved);
        let now = Timestamp::now();

        let mut snapshot = PaymentSnapshot::new(id.clone())
            .with_status(status)
            .with_external_reference(request.external_reference)
            .with_amount(request.transaction_amount, "PEN");
        snapshot.status_detail = state.create_status_detail.clone();
        snapshot.payment_method_id = Some(request.payment_method_id);
        snapshot.payment_type_id = Some("credit_card".to_string());
        snapshot.installments = Some(request.installments);
        snapshot.date_created = Some(now);
        if status.is_approved() {
            snapshot.date_approved = Some(now);
            snapshot.authorization_code = state.authorization_code.clone();
        }

        state.charges.insert(id, snapshot.clone());
        Ok(snapshot)
    }

    async fn get_payment(&self, id: &GatewayPaymentId) -> Result<Option<PaymentSnapshot>, GatewayError> {
        let mut state = self.state();
        state.get_calls += 1;
        if let Some(error) = state.get_error.clone() {
            return Err(error);
        }
        Ok(state.charges.get(id).cloned())
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, GatewayError> {
        let state = self.state();
        if let Some(error) = state.list_error.clone() {
            return Err(error);
        }
        Ok(state.methods.clone().unwrap_or_else(|| {
            vec![
                PaymentMethod {
                    id: "visa".to_string(),
                    payment_type_id: "credit_card".to_string(),
                },
                PaymentMethod {
                    id: "debvisa".to_string(),
                    payment_type_id: "debit_card".to_string(),
                },
                PaymentMethod {
                    id: "pagoefectivo_atm".to_string(),
                    payment_type_id: "atm".to_string(),
                },
            ]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::fixtures;
    use rust_decimal_macros::dec;

    fn request(reference: &str) -> CreatePaymentRequest {
        CreatePaymentRequest {
            transaction_amount: dec!(50.00),
            token: "tok".to_string(),
            description: "Monthly".to_string(),
            installments: 1,
            payment_method_id: "visa".to_string(),
            external_reference: reference.to_string(),
            statement_descriptor: "PLANBILLING".to_string(),
            payer: fixtures::payer(),
        }
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids_and_records_keys() {
        let gateway = MockPaymentGateway::new();
        let a = gateway.create_payment(request("a"), "k1").await.unwrap();
        let b = gateway.create_payment(request("b"), "k2").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.status, Some(PaymentStatus::Approved));
        assert_eq!(gateway.idempotency_keys(), vec!["k1", "k2"]);
        assert_eq!(gateway.create_calls(), 2);
    }

    #[tokio::test]
    async fn set_status_is_visible_to_lookups() {
        let gateway = MockPaymentGateway::new()
            .with_create_status(PaymentStatus::InProcess)
            .with_authorization_code("AUTH9");
        let created = gateway.create_payment(request("a"), "k1").await.unwrap();
        assert!(created.date_approved.is_none());

        gateway.set_status(&created.id, PaymentStatus::Approved);
        let fetched = gateway.get_payment(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched.status, Some(PaymentStatus::Approved));
        assert!(fetched.date_approved.is_some());
        assert_eq!(fetched.authorization_code(), Some("AUTH9"));
    }

    #[tokio::test]
    async fn injected_errors_are_returned() {
        let gateway = MockPaymentGateway::new();
        gateway.fail_creates(GatewayError::invalid_request("bad token"));
        gateway.fail_lookups(GatewayError::timeout("slow"));

        assert!(gateway.create_payment(request("a"), "k").await.is_err());
        let id = GatewayPaymentId::new("1").unwrap();
        assert!(gateway.get_payment(&id).await.unwrap_err().retryable);

        gateway.clear_failures();
        assert!(gateway.get_payment(&id).await.unwrap().is_none());
    }
}
