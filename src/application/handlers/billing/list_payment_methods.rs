//! ListPaymentMethodsHandler - card methods the checkout can offer.

use std::sync::Arc;

use crate::ports::PaymentGateway;

pub struct ListPaymentMethodsHandler {
    gateway: Arc<dyn PaymentGateway>,
}

impl ListPaymentMethodsHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Card method ids. Never fails: a gateway error yields the fallback list.
    pub async fn handle(&self) -> Vec<String> {
        match self.gateway.list_payment_methods().await {
            Ok(methods) => methods
                .into_iter()
                .filter(|m| m.is_card())
                .map(|m| m.id)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Listing payment methods failed, using fallback");
                self.gateway.fallback_payment_methods()
            }
        }
    }
}
