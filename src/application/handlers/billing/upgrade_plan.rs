//! UpgradePlanHandler - moves a subscriber to another plan mid-cycle.
//!
//! The unused part of the current period is credited against the new
//! plan's price. When the credit covers it, the new payment is approved
//! on the spot without a gateway call; otherwise the difference is charged
//! through the regular card path.
//!
//! The current payment is marked `upgraded` before the charge is sent. A
//! failed charge leaves it upgraded; the caller has to retry the upgrade
//! with the same card or buy the new plan directly.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::billing::{
    calculate_upgrade_charge, BillingError, Payment, PaymentDraft, Plan, Proration, UpgradeQuote,
};
use crate::domain::foundation::{PlanId, Timestamp, UserId};
use crate::ports::PlanRepository;

use super::payment_ledger::PaymentLedger;
use super::process_direct_payment::{CardCharge, ProcessDirectPaymentHandler, MAX_INSTALLMENTS};

/// Command to switch the user's active plan.
#[derive(Debug, Clone)]
pub struct UpgradePlanCommand {
    pub user_id: UserId,
    pub new_plan_id: PlanId,
    /// Card token, only used when a charge is due.
    pub token: Option<String>,
    pub installments: u32,
    pub payment_method_id: Option<String>,
    pub identification_type: Option<String>,
    pub identification_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpgradePlanResult {
    /// The payment that granted the old plan, now `upgraded`.
    pub previous_payment: Payment,
    /// The payment for the new plan.
    pub payment: Payment,
    pub proration: Proration,
}

pub struct UpgradePlanHandler {
    ledger: Arc<PaymentLedger>,
    plans: Arc<dyn PlanRepository>,
    charges: Arc<ProcessDirectPaymentHandler>,
}

impl UpgradePlanHandler {
    pub fn new(
        ledger: Arc<PaymentLedger>,
        plans: Arc<dyn PlanRepository>,
        charges: Arc<ProcessDirectPaymentHandler>,
    ) -> Self {
        Self {
            ledger,
            plans,
            charges,
        }
    }

    pub async fn handle(&self, cmd: UpgradePlanCommand) -> Result<UpgradePlanResult, BillingError> {
        self.handle_at(cmd, Timestamp::now()).await
    }

    pub async fn handle_at(
        &self,
        cmd: UpgradePlanCommand,
        now: Timestamp,
    ) -> Result<UpgradePlanResult, BillingError> {
        if cmd.installments == 0 || cmd.installments > MAX_INSTALLMENTS {
            return Err(BillingError::validation(
                "installments",
                format!("must be between 1 and {}", MAX_INSTALLMENTS),
            ));
        }

        let current = self
            .ledger
            .active_subscription(&cmd.user_id)
            .await?
            .ok_or(BillingError::NoActiveSubscription(cmd.user_id))?;

        let new_plan = self.load_plan(cmd.new_plan_id).await?;
        if !new_plan.is_active {
            return Err(BillingError::PlanNotActive(new_plan.id));
        }
        if new_plan.id == current.plan_id {
            return Err(BillingError::SamePlan(new_plan.id));
        }
        let current_plan = self.load_plan(current.plan_id).await?;

        let proration = calculate_upgrade_charge(
            &UpgradeQuote {
                current_price: current_plan.price,
                current_duration_months: current_plan.duration_months,
                current_period_start: current.access_start(),
                new_price: new_plan.price,
            },
            now,
        )?;

        tracing::info!(
            user_id = %cmd.user_id,
            from_plan = %current_plan.id,
            to_plan = %new_plan.id,
            days_remaining = proration.days_remaining,
            remaining_value = %proration.remaining_value,
            amount_to_charge = %proration.amount_to_charge,
            "Computed upgrade proration"
        );

        let card = if proration.is_free() {
            None
        } else {
            Some(card_from(&cmd)?)
        };

        let mut payer = current.payer.clone();
        if cmd.identification_type.is_some() {
            payer.identification_type = cmd.identification_type.clone();
        }
        if cmd.identification_number.is_some() {
            payer.identification_number = cmd.identification_number.clone();
        }
        let draft = PaymentDraft {
            external_reference: format!("upgrade-{}", Uuid::new_v4()),
            user_id: cmd.user_id,
            plan_id: new_plan.id,
            amount: proration.amount_to_charge,
            currency: new_plan.currency.clone(),
            installments: cmd.installments,
            payment_method_id: cmd.payment_method_id.clone(),
            payer,
        };

        let previous_payment = self.ledger.mark_upgraded(current).await?;

        let outcome = match card {
            None => {
                let payment = Payment::approved_without_charge(draft, now);
                self.ledger.record_new(payment).await?
            }
            Some(card) => self
                .charges
                .submit_charge(draft, card, &new_plan)
                .await
                .map_err(|e| {
                    tracing::error!(
                        previous_payment_id = %previous_payment.id,
                        error = %e,
                        "Upgrade charge failed after the current payment was superseded"
                    );
                    e
                })?,
        };

        Ok(UpgradePlanResult {
            previous_payment,
            payment: outcome.into_payment(),
            proration,
        })
    }

    async fn load_plan(&self, plan_id: PlanId) -> Result<Plan, BillingError> {
        self.plans
            .find_by_id(&plan_id)
            .await?
            .ok_or(BillingError::PlanNotFound(plan_id))
    }
}

fn card_from(cmd: &UpgradePlanCommand) -> Result<CardCharge, BillingError> {
    let token = cmd
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| BillingError::validation("token", "required when a charge is due"))?;
    let payment_method_id = cmd
        .payment_method_id
        .clone()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| BillingError::validation("payment_method_id", "required when a charge is due"))?;
    Ok(CardCharge {
        token,
        payment_method_id,
        description: None,
    })
}
