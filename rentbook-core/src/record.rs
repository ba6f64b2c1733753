//! Stored bill records and the mapping between them and [`BillSnapshot`].
//!
//! Field names follow the persisted row layout (snake_case), so the same
//! types serve the in-memory store and the JSON API.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    BillSnapshot, ElectricityCharge, ExpenseEntry, FlatCharge, MotorCharge, PaymentEntry,
    PaymentMethod, PeriodKey, PreviousReadings, RecordId, RenterId, DEFAULT_MOTOR_OCCUPANTS,
    DEFAULT_UNIT_MULTIPLIER,
};

/// One stored monthly bill row, computed amounts included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub renter_id: RenterId,
    pub month: u32,
    pub year: i32,
    pub rent_amount: Decimal,

    pub electricity_enabled: bool,
    pub electricity_initial_reading: i64,
    pub electricity_final_reading: i64,
    pub electricity_multiplier: Decimal,
    #[serde(default)]
    pub electricity_reading_date: Option<NaiveDate>,
    pub electricity_amount: Decimal,

    pub motor_enabled: bool,
    pub motor_initial_reading: i64,
    pub motor_final_reading: i64,
    pub motor_multiplier: Decimal,
    pub motor_number_of_people: u32,
    #[serde(default)]
    pub motor_reading_date: Option<NaiveDate>,
    pub motor_amount: Decimal,

    pub water_enabled: bool,
    pub water_amount: Decimal,

    pub maintenance_enabled: bool,
    pub maintenance_amount: Decimal,

    pub total_amount: Decimal,
    pub total_payments: Decimal,
    pub pending_amount: Decimal,
}

impl BillRecord {
    /// Period this row belongs to, if its month is valid.
    pub fn period(&self) -> Result<PeriodKey, crate::ValidationError> {
        PeriodKey::new(self.renter_id, self.month, self.year)
    }
}

/// Stored expense row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_bill_id: Option<RecordId>,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
}

/// Stored payment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_bill_id: Option<RecordId>,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub payment_type: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Answer to a single-period read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BillWithDetails {
    pub bill: Option<BillRecord>,
    #[serde(default)]
    pub expenses: Vec<ExpenseRecord>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub previous_readings: PreviousReadings,
}

/// The single transactional write: bill fields plus full replacement lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillWrite {
    pub bill: BillRecord,
    pub expenses: Vec<ExpenseRecord>,
    pub payments: Vec<PaymentRecord>,
}

impl BillWrite {
    /// Build the write for `snapshot` at `key`, carrying the computed amounts.
    pub fn from_snapshot(key: PeriodKey, snapshot: &BillSnapshot) -> Self {
        let totals = snapshot.totals();
        let bill = BillRecord {
            id: None,
            renter_id: key.entity_id(),
            month: key.month(),
            year: key.year(),
            rent_amount: snapshot.rent,
            electricity_enabled: snapshot.electricity.enabled,
            electricity_initial_reading: snapshot.electricity.initial_reading,
            electricity_final_reading: snapshot.electricity.final_reading,
            electricity_multiplier: snapshot.electricity.multiplier,
            electricity_reading_date: Some(snapshot.electricity.reading_date),
            electricity_amount: totals.electricity,
            motor_enabled: snapshot.motor.enabled,
            motor_initial_reading: snapshot.motor.initial_reading,
            motor_final_reading: snapshot.motor.final_reading,
            motor_multiplier: snapshot.motor.multiplier,
            motor_number_of_people: snapshot.motor.occupants,
            motor_reading_date: Some(snapshot.motor.reading_date),
            motor_amount: totals.motor,
            water_enabled: snapshot.water.enabled,
            water_amount: snapshot.water.amount,
            maintenance_enabled: snapshot.maintenance.enabled,
            maintenance_amount: snapshot.maintenance.amount,
            total_amount: totals.total,
            total_payments: totals.payments,
            pending_amount: totals.pending,
        };

        let expenses = snapshot
            .expenses
            .iter()
            .map(|e| ExpenseRecord {
                id: e.id,
                monthly_bill_id: None,
                description: e.description.clone(),
                amount: e.amount,
                date: e.date,
            })
            .collect();

        let payments = snapshot
            .payments
            .iter()
            .map(|p| PaymentRecord {
                id: p.id,
                monthly_bill_id: None,
                amount: p.amount,
                payment_date: p.date,
                payment_type: p.method,
                note: p.note.clone(),
            })
            .collect();

        Self {
            bill,
            expenses,
            payments,
        }
    }

    /// Period the write targets.
    pub fn period(&self) -> Result<PeriodKey, crate::ValidationError> {
        self.bill.period()
    }
}

/// Ids assigned by a confirmed write, index-aligned with the submitted lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveBillResult {
    pub bill_id: RecordId,
    pub expense_ids: Vec<RecordId>,
    pub payment_ids: Vec<RecordId>,
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

impl BillSnapshot {
    /// Map a stored row and its children into a snapshot.
    ///
    /// A zero multiplier falls back to the default of 9, a zero occupant
    /// count to 2, and a missing reading date to `today`.
    pub fn from_records(
        bill: &BillRecord,
        expenses: &[ExpenseRecord],
        payments: &[PaymentRecord],
        today: NaiveDate,
    ) -> Self {
        Self {
            rent: bill.rent_amount,
            electricity: ElectricityCharge {
                enabled: bill.electricity_enabled,
                initial_reading: bill.electricity_initial_reading,
                final_reading: bill.electricity_final_reading,
                multiplier: non_zero_or(bill.electricity_multiplier, DEFAULT_UNIT_MULTIPLIER),
                reading_date: bill.electricity_reading_date.unwrap_or(today),
            },
            motor: MotorCharge {
                enabled: bill.motor_enabled,
                initial_reading: bill.motor_initial_reading,
                final_reading: bill.motor_final_reading,
                multiplier: non_zero_or(bill.motor_multiplier, DEFAULT_UNIT_MULTIPLIER),
                occupants: match bill.motor_number_of_people {
                    0 => DEFAULT_MOTOR_OCCUPANTS,
                    n => n,
                },
                reading_date: bill.motor_reading_date.unwrap_or(today),
            },
            water: FlatCharge {
                enabled: bill.water_enabled,
                amount: bill.water_amount,
            },
            maintenance: FlatCharge {
                enabled: bill.maintenance_enabled,
                amount: bill.maintenance_amount,
            },
            expenses: expenses
                .iter()
                .map(|e| ExpenseEntry {
                    id: e.id,
                    description: e.description.clone(),
                    amount: e.amount,
                    date: e.date,
                })
                .collect(),
            payments: payments
                .iter()
                .map(|p| PaymentEntry {
                    id: p.id,
                    amount: p.amount,
                    date: p.payment_date,
                    method: p.payment_type,
                    note: p.note.clone(),
                })
                .collect(),
        }
    }
}

fn non_zero_or(value: Decimal, fallback: Decimal) -> Decimal {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_record_id;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).expect("date should be valid")
    }

    fn key() -> PeriodKey {
        PeriodKey::new(12, 3, 2024).expect("key should be valid")
    }

    fn sample_snapshot() -> BillSnapshot {
        let mut s = BillSnapshot::placeholder(Decimal::new(9000, 0), today());
        s.electricity.enabled = true;
        s.electricity.initial_reading = 7879;
        s.electricity.final_reading = 7950;
        s.expenses
            .push(ExpenseEntry::new("tap washer", Decimal::new(60, 0), today()));
        s.payments.push(
            PaymentEntry::new(Decimal::new(4000, 0), today(), PaymentMethod::Online)
                .with_note("upi"),
        );
        s
    }

    #[test]
    fn test_write_carries_key_and_amounts() {
        let write = BillWrite::from_snapshot(key(), &sample_snapshot());
        assert_eq!(write.bill.renter_id, 12);
        assert_eq!((write.bill.month, write.bill.year), (3, 2024));
        assert_eq!(write.bill.electricity_amount, Decimal::new(639, 0));
        assert_eq!(write.bill.total_amount, Decimal::new(9699, 0));
        assert_eq!(write.bill.pending_amount, Decimal::new(5699, 0));
        assert_eq!(write.expenses.len(), 1);
        assert_eq!(write.payments[0].payment_type, PaymentMethod::Online);
        assert_eq!(write.period().expect("period should be valid"), key());
    }

    #[test]
    fn test_from_records_applies_defaults() {
        let mut write = BillWrite::from_snapshot(key(), &sample_snapshot());
        write.bill.electricity_multiplier = Decimal::ZERO;
        write.bill.motor_number_of_people = 0;
        write.bill.motor_reading_date = None;

        let snapshot = BillSnapshot::from_records(&write.bill, &write.expenses, &write.payments, today());
        assert_eq!(snapshot.electricity.multiplier, DEFAULT_UNIT_MULTIPLIER);
        assert_eq!(snapshot.motor.occupants, DEFAULT_MOTOR_OCCUPANTS);
        assert_eq!(snapshot.motor.reading_date, today());
        assert_eq!(snapshot.payments[0].note.as_deref(), Some("upi"));
    }

    #[test]
    fn test_records_map_back_to_same_snapshot() {
        let mut original = sample_snapshot();
        original.expenses[0].id = Some(new_record_id());
        original.payments[0].id = Some(new_record_id());

        let write = BillWrite::from_snapshot(key(), &original);
        let mapped = BillSnapshot::from_records(&write.bill, &write.expenses, &write.payments, today());
        assert_eq!(mapped, original);
    }

    #[test]
    fn test_bill_with_details_accepts_api_json() {
        let json = r#"{
            "bill": null,
            "expenses": [],
            "payments": [],
            "previous_readings": { "electricity_final": 7879, "motor_final": 0 }
        }"#;
        let details: BillWithDetails = serde_json::from_str(json).expect("deserialize should succeed");
        assert!(details.bill.is_none());
        assert_eq!(details.previous_readings.electricity_final, 7879);
    }

    #[test]
    fn test_payment_record_defaults_to_cash() {
        let json = r#"{ "amount": 500, "payment_date": "2024-03-02" }"#;
        let record: PaymentRecord = serde_json::from_str(json).expect("deserialize should succeed");
        assert_eq!(record.payment_type, PaymentMethod::Cash);
        assert_eq!(record.amount, Decimal::new(500, 0));
    }
}
