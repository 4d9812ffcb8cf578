//! ProcessDirectPaymentHandler - charges a card for a plan purchase.
//!
//! Idempotent per external reference: a repeated request returns the
//! payment already on record without calling the gateway again. When two
//! identical requests race past that check, the unique reference in the
//! ledger picks the winner.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::billing::{BillingError, PayerInfo, Payment, PaymentDraft, Plan};
use crate::domain::foundation::{PlanId, Timestamp, UserId};
use crate::ports::{CreatePaymentRequest, PaymentGateway, PlanRepository};

use super::payment_ledger::{PaymentLedger, RecordOutcome};

/// Gateway installments accepted for a single charge.
pub const MAX_INSTALLMENTS: u32 = 36;

/// Command to charge a card for a plan.
#[derive(Debug, Clone)]
pub struct ProcessDirectPaymentCommand {
    pub external_reference: String,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub amount: Decimal,
    pub token: String,
    pub description: Option<String>,
    pub installments: u32,
    pub payment_method_id: String,
    pub payer: PayerInfo,
}

/// Result of processing a direct payment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDirectPaymentResult {
    pub payment: Payment,
    /// False when the external reference was already on record.
    pub created: bool,
}

/// Charge text and descriptor applied to every charge.
#[derive(Debug, Clone)]
pub struct ChargeSettings {
    pub statement_descriptor: String,
    pub default_description: String,
}

impl Default for ChargeSettings {
    fn default() -> Self {
        Self {
            statement_descriptor: "PLANBILLING".to_string(),
            default_description: "Subscription plan payment".to_string(),
        }
    }
}

/// Card details for a charge; the token is single-use.
#[derive(Debug, Clone)]
pub struct CardCharge {
    pub token: String,
    pub payment_method_id: String,
    pub description: Option<String>,
}

pub struct ProcessDirectPaymentHandler {
    ledger: Arc<PaymentLedger>,
    plans: Arc<dyn PlanRepository>,
    gateway: Arc<dyn PaymentGateway>,
    settings: ChargeSettings,
}

impl ProcessDirectPaymentHandler {
    pub fn new(
        ledger: Arc<PaymentLedger>,
        plans: Arc<dyn PlanRepository>,
        gateway: Arc<dyn PaymentGateway>,
        settings: ChargeSettings,
    ) -> Self {
        Self {
            ledger,
            plans,
            gateway,
            settings,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessDirectPaymentCommand,
    ) -> Result<ProcessDirectPaymentResult, BillingError> {
        validate(&cmd)?;

        if let Some(existing) = self.ledger.find_by_external_reference(&cmd.external_reference).await? {
            tracing::info!(
                payment_id = %existing.id,
                external_reference = %cmd.external_reference,
                "Payment already exists, returning existing"
            );
            return Ok(ProcessDirectPaymentResult {
                payment: existing,
                created: false,
            });
        }

        let plan = self
            .plans
            .find_by_id(&cmd.plan_id)
            .await?
            .ok_or(BillingError::PlanNotFound(cmd.plan_id))?;
        if !plan.is_active {
            return Err(BillingError::PlanNotActive(plan.id));
        }
        if !plan.accepts_amount(cmd.amount) {
            return Err(BillingError::AmountMismatch {
                expected: plan.price,
                actual: cmd.amount,
            });
        }

        let draft = PaymentDraft {
            external_reference: cmd.external_reference,
            user_id: cmd.user_id,
            plan_id: plan.id,
            amount: cmd.amount,
            currency: plan.currency.clone(),
            installments: cmd.installments,
            payment_method_id: Some(cmd.payment_method_id.clone()),
            payer: cmd.payer,
        };
        let card = CardCharge {
            token: cmd.token,
            payment_method_id: cmd.payment_method_id,
            description: cmd.description,
        };

        let outcome = self.submit_charge(draft, card, &plan).await?;
        Ok(ProcessDirectPaymentResult {
            created: outcome.is_created(),
            payment: outcome.into_payment(),
        })
    }

    /// Sends the charge to the gateway and records whatever it answered.
    ///
    /// A gateway error propagates and nothing is written.
    pub async fn submit_charge(
        &self,
        draft: PaymentDraft,
        card: CardCharge,
        plan: &Plan,
    ) -> Result<RecordOutcome, BillingError> {
        let description = card
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("{} - {}", self.settings.default_description, plan.name));

        let request = CreatePaymentRequest {
            transaction_amount: draft.amount,
            token: card.token,
            description,
            installments: draft.installments,
            payment_method_id: card.payment_method_id,
            external_reference: draft.external_reference.clone(),
            statement_descriptor: self.settings.statement_descriptor.clone(),
            payer: draft.payer.clone(),
        };
        let idempotency_key = Uuid::new_v4().to_string();

        let snapshot = self
            .gateway
            .create_payment(request, &idempotency_key)
            .await
            .map_err(|e| {
                tracing::error!(
                    external_reference = %draft.external_reference,
                    code = %e.code,
                    provider_status = ?e.provider_status,
                    error = %e.message,
                    "Gateway rejected charge"
                );
                BillingError::from(e)
            })?;

        let payment = Payment::from_gateway_charge(draft, &snapshot, Timestamp::now());
        if !payment.status.is_approved() {
            tracing::info!(
                external_reference = %payment.external_reference,
                status = %payment.status,
                "Charge not yet approved, awaiting confirmation"
            );
        }
        self.ledger.record_new(payment).await
    }
}

fn validate(cmd: &ProcessDirectPaymentCommand) -> Result<(), BillingError> {
    if cmd.external_reference.trim().is_empty() {
        return Err(BillingError::validation("external_reference", "must not be empty"));
    }
    if cmd.token.trim().is_empty() {
        return Err(BillingError::validation("token", "must not be empty"));
    }
    if cmd.payment_method_id.trim().is_empty() {
        return Err(BillingError::validation("payment_method_id", "must not be empty"));
    }
    if cmd.amount <= Decimal::ZERO {
        return Err(BillingError::validation("amount", "must be greater than zero"));
    }
    if cmd.installments == 0 || cmd.installments > MAX_INSTALLMENTS {
        return Err(BillingError::validation(
            "installments",
            format!("must be between 1 and {}", MAX_INSTALLMENTS),
        ));
    }
    if cmd.payer.email.trim().is_empty() || !cmd.payer.email.contains('@') {
        return Err(BillingError::validation("payer_email", "must be a valid email"));
    }
    Ok(())
}
