//! In-memory bill record store.
//!
//! Keeps bills keyed by period behind a single lock so each write lands
//! atomically, the same guarantee the database transaction gives.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rentbook_core::{
    new_record_id, BillRecord, BillWithDetails, BillWrite, ExpenseRecord, PaymentRecord,
    PeriodKey, PreviousReadings, RenterId, RentbookResult, SaveBillResult, StoreError,
};

use crate::BillRecordStore;

#[derive(Debug, Clone)]
struct StoredBill {
    record: BillRecord,
    expenses: Vec<ExpenseRecord>,
    payments: Vec<PaymentRecord>,
}

impl StoredBill {
    fn details(&self, previous_readings: PreviousReadings) -> BillWithDetails {
        BillWithDetails {
            bill: Some(self.record.clone()),
            expenses: self.expenses.clone(),
            payments: self.payments.clone(),
            previous_readings,
        }
    }

    fn final_readings(&self) -> PreviousReadings {
        PreviousReadings::new(
            self.record.electricity_final_reading,
            self.record.motor_final_reading,
        )
    }
}

/// Bill store backed by a `HashMap`. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillStore {
    bills: Arc<RwLock<HashMap<PeriodKey, StoredBill>>>,
}

impl InMemoryBillStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every stored bill.
    pub fn clear(&self) -> RentbookResult<()> {
        self.bills
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .clear();
        Ok(())
    }

    /// Number of stored bills across all renters.
    pub fn bill_count(&self) -> RentbookResult<usize> {
        Ok(self.bills.read().map_err(|_| StoreError::LockPoisoned)?.len())
    }

    /// Stored record for `key`, if any.
    pub fn bill(&self, key: PeriodKey) -> RentbookResult<Option<BillRecord>> {
        let bills = self.bills.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(bills.get(&key).map(|stored| stored.record.clone()))
    }
}

#[async_trait]
impl BillRecordStore for InMemoryBillStore {
    async fn read_period(&self, key: PeriodKey) -> RentbookResult<BillWithDetails> {
        let bills = self.bills.read().map_err(|_| StoreError::LockPoisoned)?;
        let previous = bills
            .get(&key.previous())
            .map(StoredBill::final_readings)
            .unwrap_or_default();

        Ok(match bills.get(&key) {
            Some(stored) => stored.details(previous),
            None => BillWithDetails {
                previous_readings: previous,
                ..BillWithDetails::default()
            },
        })
    }

    async fn read_all_periods(&self, renter_id: RenterId) -> RentbookResult<Vec<BillWithDetails>> {
        let bills = self.bills.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut keys: Vec<PeriodKey> = bills
            .keys()
            .filter(|key| key.entity_id() == renter_id)
            .copied()
            .collect();
        keys.sort_by(|a, b| b.cmp(a));

        Ok(keys
            .iter()
            .filter_map(|key| bills.get(key))
            .map(|stored| stored.details(PreviousReadings::default()))
            .collect())
    }

    async fn write_period(&self, write: BillWrite) -> RentbookResult<SaveBillResult> {
        let key = write.period()?;
        let mut bills = self.bills.write().map_err(|_| StoreError::LockPoisoned)?;

        // Upsert on (renter, month, year): an existing bill keeps its id.
        let bill_id = bills
            .get(&key)
            .and_then(|stored| stored.record.id)
            .unwrap_or_else(new_record_id);

        let mut record = write.bill;
        record.id = Some(bill_id);

        let expenses: Vec<ExpenseRecord> = write
            .expenses
            .into_iter()
            .map(|e| ExpenseRecord {
                id: Some(e.id.unwrap_or_else(new_record_id)),
                monthly_bill_id: Some(bill_id),
                ..e
            })
            .collect();
        let payments: Vec<PaymentRecord> = write
            .payments
            .into_iter()
            .map(|p| PaymentRecord {
                id: Some(p.id.unwrap_or_else(new_record_id)),
                monthly_bill_id: Some(bill_id),
                ..p
            })
            .collect();

        let result = SaveBillResult {
            bill_id,
            expense_ids: expenses.iter().filter_map(|e| e.id).collect(),
            payment_ids: payments.iter().filter_map(|p| p.id).collect(),
            success: true,
        };

        bills.insert(
            key,
            StoredBill {
                record,
                expenses,
                payments,
            },
        );
        Ok(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
