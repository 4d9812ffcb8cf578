//! Upgrade charge calculation.
//!
//! The unused part of the current period is credited at a daily rate and
//! subtracted from the new plan's full price. Monthly cycles are assumed to
//! be 30 days for the rate while the expiration itself uses calendar months.

use rust_decimal::{Decimal, RoundingStrategy};

use super::BillingError;
use crate::domain::foundation::Timestamp;

/// Day count per billing month used for the daily rate.
pub const DAYS_PER_BILLING_MONTH: i64 = 30;

/// Inputs for pricing an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeQuote {
    pub current_price: Decimal,
    pub current_duration_months: u32,
    pub current_period_start: Timestamp,
    pub new_price: Decimal,
}

/// Breakdown of an upgrade charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proration {
    pub expires_at: Timestamp,
    pub days_remaining: i64,
    pub total_days_in_cycle: i64,
    pub daily_rate: Decimal,
    pub remaining_value: Decimal,
    pub amount_to_charge: Decimal,
}

impl Proration {
    /// True when the credit covers the new price.
    pub fn is_free(&self) -> bool {
        self.amount_to_charge <= Decimal::ZERO
    }
}

/// Rounds half-up to cents.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes what the user pays to switch plans at `now`.
///
/// Fails with `SubscriptionExpired` when no whole day remains in the
/// current period, whatever the prices are.
pub fn calculate_upgrade_charge(quote: &UpgradeQuote, now: Timestamp) -> Result<Proration, BillingError> {
    if quote.current_duration_months == 0 {
        return Err(BillingError::validation(
            "duration_months",
            "current plan has no billing period",
        ));
    }

    let expires_at = quote
        .current_period_start
        .add_calendar_months(quote.current_duration_months)
        .ok_or_else(|| BillingError::validation("duration_months", "period end out of range"))?;

    let days_remaining = now.whole_days_until(&expires_at);
    if days_remaining <= 0 {
        return Err(BillingError::SubscriptionExpired { expired_at: expires_at });
    }

    let total_days_in_cycle = i64::from(quote.current_duration_months) * DAYS_PER_BILLING_MONTH;
    let daily_rate = round_money(quote.current_price / Decimal::from(total_days_in_cycle));
    let remaining_value = round_money(daily_rate * Decimal::from(days_remaining));
    let amount_to_charge = round_money((quote.new_price - remaining_value).max(Decimal::ZERO));

    Ok(Proration {
        expires_at,
        days_remaining,
        total_days_in_cycle,
        daily_rate,
        remaining_value,
        amount_to_charge,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn ts(month: u32, day: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, month, day, 9, 0, 0).unwrap())
    }

    fn quote(price: Decimal, months: u32, start: Timestamp, new_price: Decimal) -> UpgradeQuote {
        UpgradeQuote {
            current_price: price,
            current_duration_months: months,
            current_period_start: start,
            new_price,
        }
    }

    #[test]
    fn charges_difference_after_credit() {
        // April has 30 days, so ten days in leaves twenty.
        let q = quote(dec!(100.00), 1, ts(4, 1), dec!(150.00));
        let p = calculate_upgrade_charge(&q, ts(4, 11)).unwrap();

        assert_eq!(p.days_remaining, 20);
        assert_eq!(p.total_days_in_cycle, 30);
        assert_eq!(p.daily_rate, dec!(3.33));
        assert_eq!(p.remaining_value, dec!(66.60));
        assert_eq!(p.amount_to_charge, dec!(83.40));
        assert!(!p.is_free());
    }

    #[test]
    fn small_credit_near_period_end() {
        let q = quote(dec!(100.00), 1, ts(4, 1), dec!(95.00));
        let p = calculate_upgrade_charge(&q, ts(4, 29)).unwrap();

        assert_eq!(p.days_remaining, 2);
        assert_eq!(p.remaining_value, dec!(6.66));
        assert_eq!(p.amount_to_charge, dec!(88.34));
    }

    #[test]
    fn credit_exceeding_new_price_is_free() {
        let q = quote(dec!(300.00), 3, ts(4, 1), dec!(50.00));
        let p = calculate_upgrade_charge(&q, ts(4, 2)).unwrap();

        assert_eq!(p.amount_to_charge, dec!(0.00));
        assert!(p.is_free());
    }

    #[test]
    fn multi_month_cycle_uses_thirty_day_months() {
        let q = quote(dec!(270.00), 3, ts(4, 1), dec!(500.00));
        let p = calculate_upgrade_charge(&q, ts(4, 1)).unwrap();

        assert_eq!(p.total_days_in_cycle, 90);
        assert_eq!(p.daily_rate, dec!(3.00));
        assert_eq!(p.expires_at, ts(7, 1));
        assert_eq!(p.days_remaining, 91);
    }

    #[test]
    fn expired_period_is_rejected() {
        let q = quote(dec!(100.00), 1, ts(4, 1), dec!(150.00));
        let err = calculate_upgrade_charge(&q, ts(5, 1)).unwrap_err();
        assert_eq!(err, BillingError::SubscriptionExpired { expired_at: ts(5, 1) });
    }

    #[test]
    fn less_than_one_day_left_is_rejected() {
        let q = quote(dec!(100.00), 1, ts(4, 1), dec!(150.00));
        let almost_end = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 4, 30, 10, 0, 0).unwrap());
        assert!(matches!(
            calculate_upgrade_charge(&q, almost_end),
            Err(BillingError::SubscriptionExpired { .. })
        ));
    }

    #[test]
    fn zero_month_plan_is_invalid() {
        let q = quote(dec!(100.00), 0, ts(4, 1), dec!(150.00));
        assert!(matches!(
            calculate_upgrade_charge(&q, ts(4, 2)),
            Err(BillingError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn round_money_is_half_up() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
    }

    proptest! {
        #[test]
        fn expired_rejection_ignores_prices(
            current in 0u32..100_000,
            new in 0u32..100_000,
            days_after_end in 0i64..400,
            months in 1u32..=12,
        ) {
            let start = ts(1, 15);
            let end = start.add_calendar_months(months).unwrap();
            let q = quote(Decimal::new(current.into(), 2), months, start, Decimal::new(new.into(), 2));
            let result = calculate_upgrade_charge(&q, end.add_days(days_after_end));
            let is_expired = matches!(result, Err(BillingError::SubscriptionExpired { .. }));
            prop_assert!(is_expired);
        }

        #[test]
        fn charge_is_never_negative_and_has_cents_scale(
            current in 0u32..100_000,
            new in 0u32..100_000,
            elapsed in 0i64..28,
        ) {
            let q = quote(Decimal::new(current.into(), 2), 1, ts(2, 1), Decimal::new(new.into(), 2));
            let p = calculate_upgrade_charge(&q, ts(2, 1).add_days(elapsed)).unwrap();
            prop_assert!(p.amount_to_charge >= Decimal::ZERO);
            prop_assert!(p.amount_to_charge.scale() <= 2);
            prop_assert!(p.amount_to_charge <= round_money(q.new_price));
        }
    }
}
