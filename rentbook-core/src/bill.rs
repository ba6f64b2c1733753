//! Bill snapshots: the full client-side picture of one month's bill.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BillTotals, PreviousReadings, RecordId, SaveBillResult, ValidationError};

/// Per-unit multiplier applied to metered charges when none is recorded.
pub const DEFAULT_UNIT_MULTIPLIER: Decimal = Decimal::from_parts(9, 0, 0, false, 0);

/// Occupant count the motor charge is split across when none is recorded.
pub const DEFAULT_MOTOR_OCCUPANTS: u32 = 2;

// ============================================================================
// PAYMENT METHOD
// ============================================================================

/// How a payment was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Online,
}

impl PaymentMethod {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, ValidationError> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "online" => Ok(PaymentMethod::Online),
            _ => Err(ValidationError::InvalidValue {
                field: "payment_type".to_string(),
                reason: format!("unknown payment method '{}'", s),
            }),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

// ============================================================================
// CHARGE LINES
// ============================================================================

/// Metered electricity charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricityCharge {
    pub enabled: bool,
    pub initial_reading: i64,
    pub final_reading: i64,
    pub multiplier: Decimal,
    pub reading_date: NaiveDate,
}

impl ElectricityCharge {
    /// Disabled charge whose meter starts and ends at `reading`.
    pub fn idle(reading: i64, today: NaiveDate) -> Self {
        Self {
            enabled: false,
            initial_reading: reading,
            final_reading: reading,
            multiplier: DEFAULT_UNIT_MULTIPLIER,
            reading_date: today,
        }
    }

    /// Units consumed over the period.
    pub fn units(&self) -> i64 {
        self.final_reading - self.initial_reading
    }
}

/// Metered water-pump charge, split across the occupants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorCharge {
    pub enabled: bool,
    pub initial_reading: i64,
    pub final_reading: i64,
    pub multiplier: Decimal,
    pub occupants: u32,
    pub reading_date: NaiveDate,
}

impl MotorCharge {
    /// Disabled charge whose meter starts and ends at `reading`.
    pub fn idle(reading: i64, today: NaiveDate) -> Self {
        Self {
            enabled: false,
            initial_reading: reading,
            final_reading: reading,
            multiplier: DEFAULT_UNIT_MULTIPLIER,
            occupants: DEFAULT_MOTOR_OCCUPANTS,
            reading_date: today,
        }
    }

    pub fn units(&self) -> i64 {
        self.final_reading - self.initial_reading
    }
}

/// Fixed-amount charge (water, maintenance).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlatCharge {
    pub enabled: bool,
    pub amount: Decimal,
}

// ============================================================================
// EXPENSES AND PAYMENTS
// ============================================================================

/// Ad-hoc expense added to a bill. `id` is `None` until the store confirms it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub id: Option<RecordId>,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
}

impl ExpenseEntry {
    pub fn new(description: impl Into<String>, amount: Decimal, date: NaiveDate) -> Self {
        Self {
            id: None,
            description: description.into(),
            amount,
            date,
        }
    }
}

/// Payment received against a bill. `id` is `None` until the store confirms it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub id: Option<RecordId>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub note: Option<String>,
}

impl PaymentEntry {
    pub fn new(amount: Decimal, date: NaiveDate, method: PaymentMethod) -> Self {
        Self {
            id: None,
            amount,
            date,
            method,
            note: None,
        }
    }

    /// Attach a free-text note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

// ============================================================================
// BILL SNAPSHOT
// ============================================================================

/// Everything the client knows about one period's bill.
///
/// Snapshots are plain values: the cache stores them, the view renders them
/// and the write coordinator submits them. Durable ids on expenses and
/// payments are the only part that changes after a confirmed save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillSnapshot {
    pub rent: Decimal,
    pub electricity: ElectricityCharge,
    pub motor: MotorCharge,
    pub water: FlatCharge,
    pub maintenance: FlatCharge,
    pub expenses: Vec<ExpenseEntry>,
    pub payments: Vec<PaymentEntry>,
}

impl BillSnapshot {
    /// Snapshot shown while the real one loads: rent only, every optional
    /// charge disabled, zero readings, no expenses or payments.
    pub fn placeholder(rent: Decimal, today: NaiveDate) -> Self {
        Self::starting_from(rent, PreviousReadings::default(), today)
    }

    /// Fresh snapshot whose meters start where the previous period's ended.
    pub fn starting_from(rent: Decimal, previous: PreviousReadings, today: NaiveDate) -> Self {
        Self {
            rent,
            electricity: ElectricityCharge::idle(previous.electricity_final, today),
            motor: MotorCharge::idle(previous.motor_final, today),
            water: FlatCharge::default(),
            maintenance: FlatCharge::default(),
            expenses: Vec::new(),
            payments: Vec::new(),
        }
    }

    /// Computed line amounts and totals.
    pub fn totals(&self) -> BillTotals {
        BillTotals::compute(self)
    }

    /// True when every expense and payment carries a durable id.
    pub fn is_fully_reconciled(&self) -> bool {
        self.expenses.iter().all(|e| e.id.is_some()) && self.payments.iter().all(|p| p.id.is_some())
    }

    /// Copy of this snapshot with ids taken from a confirmed write.
    ///
    /// Ids are matched by list position. An entry with no returned id keeps
    /// whatever id it already had.
    pub fn reconcile(&self, result: &SaveBillResult) -> Self {
        let mut reconciled = self.clone();
        for (entry, id) in reconciled.expenses.iter_mut().zip(&result.expense_ids) {
            entry.id = Some(*id);
        }
        for (entry, id) in reconciled.payments.iter_mut().zip(&result.payment_ids) {
            entry.id = Some(*id);
        }
        reconciled
    }

    /// Fill in ids this snapshot lacks from `confirmed`, for entries that sit
    /// at the same position and are otherwise identical.
    ///
    /// Used on a draft that kept changing while its save was in flight.
    pub fn adopt_ids(&mut self, confirmed: &BillSnapshot) {
        for (entry, other) in self.expenses.iter_mut().zip(&confirmed.expenses) {
            if entry.id.is_none()
                && entry.description == other.description
                && entry.amount == other.amount
                && entry.date == other.date
            {
                entry.id = other.id;
            }
        }
        for (entry, other) in self.payments.iter_mut().zip(&confirmed.payments) {
            if entry.id.is_none()
                && entry.amount == other.amount
                && entry.date == other.date
                && entry.method == other.method
                && entry.note == other.note
            {
                entry.id = other.id;
            }
        }
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
        NaiveDate::from_ymd_opt(2024, 5, 14).expect("date should be valid")
    }

    #[test]
    fn test_payment_method_db_roundtrip() {
        for method in [PaymentMethod::Cash, PaymentMethod::Online] {
            let parsed = PaymentMethod::from_db_str(method.as_db_str())
                .expect("parsing db string should succeed");
            assert_eq!(parsed, method);
        }
        assert!(PaymentMethod::from_db_str("cheque").is_err());
        assert_eq!(
            "ONLINE".parse::<PaymentMethod>().expect("parse should succeed"),
            PaymentMethod::Online
        );
    }

    #[test]
    fn test_payment_method_serde_lowercase() {
        let json = serde_json::to_string(&PaymentMethod::Online).expect("serialize should succeed");
        assert_eq!(json, "\"online\"");
    }

    #[test]
    fn test_placeholder_has_everything_disabled() {
        let snapshot = BillSnapshot::placeholder(Decimal::new(9000, 0), today());
        assert_eq!(snapshot.rent, Decimal::new(9000, 0));
        assert!(!snapshot.electricity.enabled);
        assert!(!snapshot.motor.enabled);
        assert!(!snapshot.water.enabled);
        assert!(!snapshot.maintenance.enabled);
        assert_eq!(snapshot.electricity.initial_reading, 0);
        assert_eq!(snapshot.motor.final_reading, 0);
        assert_eq!(snapshot.electricity.multiplier, DEFAULT_UNIT_MULTIPLIER);
        assert_eq!(snapshot.motor.occupants, DEFAULT_MOTOR_OCCUPANTS);
        assert!(snapshot.expenses.is_empty());
        assert!(snapshot.payments.is_empty());
    }

    #[test]
    fn test_reconcile_assigns_ids_by_position() {
        let mut snapshot = BillSnapshot::placeholder(Decimal::new(5000, 0), today());
        snapshot
            .expenses
            .push(ExpenseEntry::new("plumber", Decimal::new(450, 0), today()));
        snapshot
            .expenses
            .push(ExpenseEntry::new("paint", Decimal::new(1200, 0), today()));
        snapshot
            .payments
            .push(PaymentEntry::new(Decimal::new(5000, 0), today(), PaymentMethod::Online));
        assert!(!snapshot.is_fully_reconciled());

        let result = SaveBillResult {
            bill_id: new_record_id(),
            expense_ids: vec![new_record_id(), new_record_id()],
            payment_ids: vec![new_record_id()],
            success: true,
        };
        let reconciled = snapshot.reconcile(&result);

        assert!(reconciled.is_fully_reconciled());
        assert_eq!(reconciled.expenses[0].id, Some(result.expense_ids[0]));
        assert_eq!(reconciled.expenses[1].id, Some(result.expense_ids[1]));
        assert_eq!(reconciled.payments[0].id, Some(result.payment_ids[0]));
        assert_eq!(reconciled.expenses[1].description, "paint");
    }

    #[test]
    fn test_reconcile_keeps_existing_id_without_result() {
        let existing = new_record_id();
        let mut snapshot = BillSnapshot::placeholder(Decimal::new(5000, 0), today());
        let mut expense = ExpenseEntry::new("gas", Decimal::new(900, 0), today());
        expense.id = Some(existing);
        snapshot.expenses.push(expense);

        let result = SaveBillResult {
            bill_id: new_record_id(),
            expense_ids: vec![],
            payment_ids: vec![],
            success: true,
        };
        assert_eq!(snapshot.reconcile(&result).expenses[0].id, Some(existing));
    }

    #[test]
    fn test_adopt_ids_skips_changed_entries() {
        let mut confirmed = BillSnapshot::placeholder(Decimal::new(5000, 0), today());
        confirmed
            .expenses
            .push(ExpenseEntry::new("gas", Decimal::new(900, 0), today()));
        confirmed
            .expenses
            .push(ExpenseEntry::new("broom", Decimal::new(80, 0), today()));
        confirmed.expenses[0].id = Some(new_record_id());
        confirmed.expenses[1].id = Some(new_record_id());

        let mut draft = confirmed.clone();
        draft.expenses[0].id = None;
        draft.expenses[1].id = None;
        draft.expenses[1].amount = Decimal::new(95, 0);

        draft.adopt_ids(&confirmed);
        assert_eq!(draft.expenses[0].id, confirmed.expenses[0].id);
        assert_eq!(draft.expenses[1].id, None);
    }
}
