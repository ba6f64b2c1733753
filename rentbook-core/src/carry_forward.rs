//! Carry-forward derivation for periods that have no stored bill yet.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::BillSnapshot;

/// Final meter readings of the period immediately before the one requested.
///
/// Both readings are zero when that period has no stored bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreviousReadings {
    pub electricity_final: i64,
    pub motor_final: i64,
}

impl PreviousReadings {
    pub fn new(electricity_final: i64, motor_final: i64) -> Self {
        Self {
            electricity_final,
            motor_final,
        }
    }
}

/// Build the snapshot for a period with no stored bill.
///
/// Each meter starts and ends at the previous period's final reading so that
/// consumption reads zero until the user enters a new final reading. The
/// readings must come from the store's answer for the true previous period;
/// a cached snapshot is never used as a template.
pub fn carry_forward(rent: Decimal, previous: PreviousReadings, today: NaiveDate) -> BillSnapshot {
    BillSnapshot::starting_from(rent, previous, today)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).expect("date should be valid")
    }

    #[test]
    fn test_carry_forward_copies_previous_finals() {
        let snapshot = carry_forward(Decimal::new(9000, 0), PreviousReadings::new(7879, 412), today());

        assert_eq!(snapshot.electricity.initial_reading, 7879);
        assert_eq!(snapshot.electricity.final_reading, 7879);
        assert_eq!(snapshot.motor.initial_reading, 412);
        assert_eq!(snapshot.motor.final_reading, 412);
        assert_eq!(snapshot.rent, Decimal::new(9000, 0));
        assert!(!snapshot.electricity.enabled);
        assert!(!snapshot.motor.enabled);
        assert!(snapshot.expenses.is_empty());
        assert!(snapshot.payments.is_empty());
        assert_eq!(snapshot.electricity.reading_date, today());
    }

    #[test]
    fn test_carry_forward_without_previous_bill_is_placeholder() {
        let snapshot = carry_forward(Decimal::new(6500, 0), PreviousReadings::default(), today());
        assert_eq!(snapshot, BillSnapshot::placeholder(Decimal::new(6500, 0), today()));
    }

    #[test]
    fn test_carry_forward_totals_are_rent_only() {
        let snapshot = carry_forward(Decimal::new(9000, 0), PreviousReadings::new(1236, 80), today());
        let totals = snapshot.totals();
        assert_eq!(totals.total, Decimal::new(9000, 0));
        assert_eq!(totals.pending, Decimal::new(9000, 0));
    }
}
