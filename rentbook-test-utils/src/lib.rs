//! rentbook Test Utilities
//!
//! Shared test infrastructure for the rentbook workspace:
//! - A scripted bill store with gates, failure injection and call counters
//! - Proptest generators for bill types
//! - Test fixtures for common scenarios
//! - Custom assertions

// Re-export the stores from their source crate
pub use rentbook_storage::{BillCache, BillRecordStore, InMemoryBillStore, ManualClock};

// Re-export core types for convenience
pub use rentbook_core::{
    BillSnapshot, BillWithDetails, BillWrite, ExpenseEntry, PaymentEntry, PaymentMethod,
    PeriodKey, PreviousReadings, RenterId, RenterProfile, RentbookError, RentbookResult,
    SaveBillResult, StoreError, SyncConfig,
};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

// ============================================================================
// SCRIPTED STORE
// ============================================================================

#[derive(Debug, Default)]
struct Script {
    read_gates: HashMap<PeriodKey, Arc<Semaphore>>,
    write_gate: Option<Arc<Semaphore>>,
    bulk_gate: Option<Arc<Semaphore>>,
    failing_reads: HashSet<PeriodKey>,
    failing_bulk_reads: bool,
    write_failures: usize,
    reads_by_key: HashMap<PeriodKey, usize>,
    writes_started: usize,
}

/// Bill store wrapper that lets a test control timing and failures.
///
/// Reads answer from the backing store at the moment they are issued, then
/// wait on the key's gate if one is held. That models a response that is
/// already on the wire while newer local writes happen.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    backing: InMemoryBillStore,
    script: Mutex<Script>,
    read_started: Notify,
    bulk_started: Notify,
    write_started: Notify,
    read_calls: AtomicUsize,
    bulk_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing store. Clones of an in-memory store share data.
    pub fn with_backing(backing: InMemoryBillStore) -> Self {
        Self {
            backing,
            ..Self::default()
        }
    }

    pub fn backing(&self) -> &InMemoryBillStore {
        &self.backing
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a confirmed bill directly, bypassing counters and scripts.
    pub async fn seed(&self, key: PeriodKey, snapshot: &BillSnapshot) -> SaveBillResult {
        self.backing
            .write_period(BillWrite::from_snapshot(key, snapshot))
            .await
            .expect("seeding the in-memory store should succeed")
    }

    // === Gates ===

    /// Hold every read of `key` until [`ScriptedStore::release_reads`].
    pub fn hold_reads(&self, key: PeriodKey) {
        self.script()
            .read_gates
            .insert(key, Arc::new(Semaphore::new(0)));
    }

    pub fn release_reads(&self, key: PeriodKey) {
        if let Some(gate) = self.script().read_gates.remove(&key) {
            gate.close();
        }
    }

    /// Hold every bulk read until [`ScriptedStore::release_bulk_reads`]. The
    /// answer is taken before the hold, like a single-period read.
    pub fn hold_bulk_reads(&self) {
        self.script().bulk_gate = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_bulk_reads(&self) {
        if let Some(gate) = self.script().bulk_gate.take() {
            gate.close();
        }
    }

    /// Hold every write until [`ScriptedStore::release_writes`].
    pub fn hold_writes(&self) {
        self.script().write_gate = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_writes(&self) {
        if let Some(gate) = self.script().write_gate.take() {
            gate.close();
        }
    }

    // === Failures ===

    pub fn fail_reads(&self, key: PeriodKey) {
        self.script().failing_reads.insert(key);
    }

    pub fn restore_reads(&self, key: PeriodKey) {
        self.script().failing_reads.remove(&key);
    }

    pub fn fail_bulk_reads(&self, failing: bool) {
        self.script().failing_bulk_reads = failing;
    }

    /// Reject the next `count` writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.script().write_failures = count;
    }

    // === Counters ===

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn reads_for(&self, key: PeriodKey) -> usize {
        self.script().reads_by_key.get(&key).copied().unwrap_or(0)
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Wait until at least one read of `key` has been issued.
    pub async fn wait_for_read(&self, key: PeriodKey) {
        loop {
            let notified = self.read_started.notified();
            if self.reads_for(key) > 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait until at least one bulk read has been issued.
    pub async fn wait_for_bulk_read(&self) {
        loop {
            let notified = self.bulk_started.notified();
            if self.bulk_calls() > 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait until at least `count` writes have been issued.
    pub async fn wait_for_writes(&self, count: usize) {
        loop {
            let notified = self.write_started.notified();
            if self.script().writes_started >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl BillRecordStore for ScriptedStore {
    async fn read_period(&self, key: PeriodKey) -> RentbookResult<BillWithDetails> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let (gate, failing) = {
            let mut script = self.script();
            *script.reads_by_key.entry(key).or_default() += 1;
            (
                script.read_gates.get(&key).cloned(),
                script.failing_reads.contains(&key),
            )
        };

        let result = if failing {
            Err(StoreError::ReadFailed {
                key,
                reason: "scripted read failure".to_string(),
            }
            .into())
        } else {
            self.backing.read_period(key).await
        };
        self.read_started.notify_waiters();

        if let Some(gate) = gate {
            // A closed gate lets every waiter through.
            let _ = gate.acquire().await;
        }
        result
    }

    async fn read_all_periods(&self, renter_id: RenterId) -> RentbookResult<Vec<BillWithDetails>> {
        let (gate, failing) = {
            let script = self.script();
            (script.bulk_gate.clone(), script.failing_bulk_reads)
        };

        let result = if failing {
            Err(StoreError::Unavailable {
                reason: "scripted bulk read failure".to_string(),
            }
            .into())
        } else {
            self.backing.read_all_periods(renter_id).await
        };
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.bulk_started.notify_waiters();

        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
        result
    }

    async fn write_period(&self, write: BillWrite) -> RentbookResult<SaveBillResult> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let key = write.period()?;
        let (gate, failing) = {
            let mut script = self.script();
            script.writes_started += 1;
            let failing = script.write_failures > 0;
            if failing {
                script.write_failures -= 1;
            }
            (script.write_gate.clone(), failing)
        };
        self.write_started.notify_waiters();

        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
        if failing {
            return Err(StoreError::WriteRejected {
                key,
                reason: "scripted write failure".to_string(),
            }
            .into());
        }
        self.backing.write_period(write).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating rentbook types.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    /// Generate a valid PeriodKey.
    pub fn arb_period_key() -> impl Strategy<Value = PeriodKey> {
        (1i64..1_000, 1u32..=12, 2000i32..2100).prop_map(|(entity, month, year)| {
            PeriodKey::new(entity, month, year).expect("generated month is in range")
        })
    }

    /// Generate a money amount with two decimal places.
    pub fn arb_amount() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (2000i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| {
            NaiveDate::from_ymd_opt(y, m, d).expect("day 1-28 exists in every month")
        })
    }

    pub fn arb_payment_method() -> impl Strategy<Value = PaymentMethod> {
        prop_oneof![Just(PaymentMethod::Cash), Just(PaymentMethod::Online)]
    }

    pub fn arb_expense() -> impl Strategy<Value = ExpenseEntry> {
        ("[a-z ]{1,20}", arb_amount(), arb_date())
            .prop_map(|(description, amount, date)| ExpenseEntry::new(description, amount, date))
    }

    pub fn arb_payment() -> impl Strategy<Value = PaymentEntry> {
        (arb_amount(), arb_date(), arb_payment_method(), proptest::option::of("[a-z]{1,10}"))
            .prop_map(|(amount, date, method, note)| PaymentEntry {
                note,
                ..PaymentEntry::new(amount, date, method)
            })
    }

    /// Generate an unsaved snapshot (no ids) with up to four expenses and payments.
    pub fn arb_snapshot() -> impl Strategy<Value = BillSnapshot> {
        (
            arb_amount(),
            0i64..100_000,
            0i64..5_000,
            arb_date(),
            proptest::collection::vec(arb_expense(), 0..4),
            proptest::collection::vec(arb_payment(), 0..4),
        )
            .prop_map(|(rent, electricity, motor, date, expenses, payments)| {
                let mut snapshot = BillSnapshot::starting_from(
                    rent,
                    PreviousReadings::new(electricity, motor),
                    date,
                );
                snapshot.expenses = expenses;
                snapshot.payments = payments;
                snapshot
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rentbook_core::Timestamp;
    use rust_decimal::Decimal;
    use std::time::Duration;

    /// Renter every fixture bill belongs to.
    pub const RENTER_ID: RenterId = 17;

    /// Fixed "now" for manual clocks: 2024-06-15 10:00 UTC.
    pub fn fixed_now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0)
            .single()
            .expect("fixed timestamp is valid")
    }

    pub fn today() -> NaiveDate {
        fixed_now().date_naive()
    }

    pub fn renter(monthly_rent: i64) -> RenterProfile {
        RenterProfile::new(RENTER_ID, Decimal::new(monthly_rent, 0))
    }

    pub fn key(month: u32, year: i32) -> PeriodKey {
        PeriodKey::new(RENTER_ID, month, year).expect("fixture month is valid")
    }

    pub fn rupees(amount: i64) -> Decimal {
        Decimal::new(amount, 0)
    }

    /// Cache on a manual clock that starts at [`fixed_now`].
    pub fn manual_cache(ttl: Duration) -> (Arc<BillCache>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(fixed_now()));
        let cache = Arc::new(BillCache::with_clock(ttl, clock.clone()));
        (cache, clock)
    }

    /// Confirmed-looking bill with electricity enabled between the given readings.
    pub fn metered_bill(rent: i64, electricity_initial: i64, electricity_final: i64) -> BillSnapshot {
        let mut snapshot = BillSnapshot::starting_from(
            rupees(rent),
            PreviousReadings::new(electricity_initial, 0),
            today(),
        );
        snapshot.electricity.enabled = true;
        snapshot.electricity.final_reading = electricity_final;
        snapshot
    }

    pub fn expense(description: &str, amount: i64) -> ExpenseEntry {
        ExpenseEntry::new(description, rupees(amount), today())
    }

    pub fn payment(amount: i64, method: PaymentMethod) -> PaymentEntry {
        PaymentEntry::new(rupees(amount), today(), method)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for rentbook-specific validation.

    use super::*;
    use std::time::Duration;

    /// Assert every expense and payment carries a durable id.
    #[track_caller]
    pub fn assert_fully_reconciled(snapshot: &BillSnapshot) {
        assert!(
            snapshot.is_fully_reconciled(),
            "Expected every expense and payment to have an id, got: {:?}",
            snapshot
        );
    }

    /// Assert two snapshots are equal apart from expense and payment ids.
    #[track_caller]
    pub fn assert_same_bill_ignoring_ids(left: &BillSnapshot, right: &BillSnapshot) {
        let strip = |s: &BillSnapshot| {
            let mut s = s.clone();
            s.expenses.iter_mut().for_each(|e| e.id = None);
            s.payments.iter_mut().for_each(|p| p.id = None);
            s
        };
        assert_eq!(strip(left), strip(right));
    }

    /// Assert that a RentbookResult is a Store error.
    #[track_caller]
    pub fn assert_store_error<T: std::fmt::Debug>(result: &RentbookResult<T>) {
        match result {
            Err(RentbookError::Store(_)) => {}
            other => panic!("Expected Store error, got: {:?}", other),
        }
    }

    /// Yield to other tasks until `condition` holds, failing after five seconds.
    pub async fn eventually<F: Fn() -> bool>(condition: F) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(waited.is_ok(), "condition not reached within five seconds");
    }
}
