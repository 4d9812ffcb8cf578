//! Read-only view of a subscription plan.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::PlanId;

/// Currency used when a plan row does not name one.
pub const DEFAULT_CURRENCY: &str = "PEN";

/// A purchasable subscription plan.
///
/// Plans are managed elsewhere; billing only reads them to price charges
/// and to enrich approved-payment events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub duration_months: u32,
    pub currency: String,
    pub is_active: bool,
}

impl Plan {
    /// True when a client-submitted amount matches the plan's list price.
    ///
    /// Compares numerically, so `150` and `150.00` are equal.
    pub fn accepts_amount(&self, amount: Decimal) -> bool {
        self.price == amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plan(price: Decimal) -> Plan {
        Plan {
            id: PlanId::new(),
            name: "Monthly".to_string(),
            description: None,
            price,
            duration_months: 1,
            currency: DEFAULT_CURRENCY.to_string(),
            is_active: true,
        }
    }

    #[test]
    fn accepts_amount_ignores_scale() {
        assert!(plan(dec!(150.00)).accepts_amount(dec!(150)));
    }

    #[test]
    fn accepts_amount_rejects_other_values() {
        assert!(!plan(dec!(150.00)).accepts_amount(dec!(149.99)));
    }
}
