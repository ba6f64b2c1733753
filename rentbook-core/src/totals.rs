//! Line-item amounts and bill totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::BillSnapshot;

/// Money amounts are stored with two decimal places.
const MONEY_SCALE: u32 = 2;

/// Amounts derived from a [`BillSnapshot`]. Disabled lines contribute zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillTotals {
    pub electricity: Decimal,
    pub motor: Decimal,
    pub water: Decimal,
    pub maintenance: Decimal,
    pub expenses: Decimal,
    pub total: Decimal,
    pub payments: Decimal,
    pub pending: Decimal,
}

impl BillTotals {
    pub fn compute(snapshot: &BillSnapshot) -> Self {
        let electricity = if snapshot.electricity.enabled {
            (Decimal::from(snapshot.electricity.units()) * snapshot.electricity.multiplier)
                .round_dp(MONEY_SCALE)
        } else {
            Decimal::ZERO
        };

        // An occupant count of zero splits nothing.
        let motor = if snapshot.motor.enabled {
            Decimal::from(snapshot.motor.units())
                .checked_div(Decimal::from(snapshot.motor.occupants))
                .map(|per_head| (per_head * snapshot.motor.multiplier).round_dp(MONEY_SCALE))
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        let water = if snapshot.water.enabled {
            snapshot.water.amount
        } else {
            Decimal::ZERO
        };
        let maintenance = if snapshot.maintenance.enabled {
            snapshot.maintenance.amount
        } else {
            Decimal::ZERO
        };

        let expenses: Decimal = snapshot.expenses.iter().map(|e| e.amount).sum();
        let payments: Decimal = snapshot.payments.iter().map(|p| p.amount).sum();
        let total = snapshot.rent + electricity + motor + water + maintenance + expenses;

        Self {
            electricity,
            motor,
            water,
            maintenance,
            expenses,
            total,
            payments,
            pending: total - payments,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExpenseEntry, PaymentEntry, PaymentMethod};
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 3).expect("date should be valid")
    }

    fn snapshot() -> BillSnapshot {
        BillSnapshot::placeholder(Decimal::new(9000, 0), today())
    }

    #[test]
    fn test_disabled_lines_contribute_nothing() {
        let mut s = snapshot();
        s.electricity.final_reading = 500;
        s.water.amount = Decimal::new(300, 0);
        let totals = s.totals();
        assert_eq!(totals.electricity, Decimal::ZERO);
        assert_eq!(totals.water, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(9000, 0));
    }

    #[test]
    fn test_electricity_units_times_multiplier() {
        let mut s = snapshot();
        s.electricity.enabled = true;
        s.electricity.initial_reading = 7879;
        s.electricity.final_reading = 7979;
        let totals = s.totals();
        assert_eq!(totals.electricity, Decimal::new(900, 0));
        assert_eq!(totals.total, Decimal::new(9900, 0));
    }

    #[test]
    fn test_motor_split_across_occupants() {
        let mut s = snapshot();
        s.motor.enabled = true;
        s.motor.initial_reading = 100;
        s.motor.final_reading = 130;
        s.motor.occupants = 3;
        // (30 / 3) * 9
        assert_eq!(s.totals().motor, Decimal::new(90, 0));
    }

    #[test]
    fn test_motor_with_zero_occupants_is_zero() {
        let mut s = snapshot();
        s.motor.enabled = true;
        s.motor.final_reading = 40;
        s.motor.occupants = 0;
        assert_eq!(s.totals().motor, Decimal::ZERO);
    }

    #[test]
    fn test_pending_subtracts_payments() {
        let mut s = snapshot();
        s.water = crate::FlatCharge {
            enabled: true,
            amount: Decimal::new(200, 0),
        };
        s.maintenance = crate::FlatCharge {
            enabled: true,
            amount: Decimal::new(15050, 2),
        };
        s.expenses
            .push(ExpenseEntry::new("bulb", Decimal::new(120, 0), today()));
        s.payments
            .push(PaymentEntry::new(Decimal::new(5000, 0), today(), PaymentMethod::Cash));
        let totals = s.totals();
        assert_eq!(totals.expenses, Decimal::new(120, 0));
        assert_eq!(totals.total, Decimal::new(947050, 2));
        assert_eq!(totals.payments, Decimal::new(5000, 0));
        assert_eq!(totals.pending, Decimal::new(447050, 2));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::{PaymentEntry, PaymentMethod};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_pending_is_total_minus_payments(
            rent in 0i64..100_000,
            paid in proptest::collection::vec(0i64..50_000, 0..5),
        ) {
            let today = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date should be valid");
            let mut s = BillSnapshot::placeholder(Decimal::new(rent, 0), today);
            for amount in &paid {
                s.payments.push(PaymentEntry::new(Decimal::new(*amount, 0), today, PaymentMethod::Cash));
            }
            let totals = s.totals();
            prop_assert_eq!(totals.pending, totals.total - totals.payments);
            prop_assert_eq!(totals.payments, Decimal::new(paid.iter().sum::<i64>(), 0));
        }
    }
}
