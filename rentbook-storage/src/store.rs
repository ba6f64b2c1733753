//! Bill record store contract.
//!
//! The store is the durable source of truth. Every method may suspend and may
//! fail; callers treat reads as retryable and writes as all-or-nothing.

use async_trait::async_trait;
use rentbook_core::{BillWithDetails, BillWrite, PeriodKey, RenterId, RentbookResult, SaveBillResult};

/// Durable storage for monthly bills.
#[async_trait]
pub trait BillRecordStore: Send + Sync {
    /// Read one period: the bill (if any), its expenses and payments, and the
    /// final readings of the period before it (zero when that has no bill).
    async fn read_period(&self, key: PeriodKey) -> RentbookResult<BillWithDetails>;

    /// Read every stored period of a renter, newest first.
    ///
    /// Previous readings are not populated by this call.
    async fn read_all_periods(&self, renter_id: RenterId) -> RentbookResult<Vec<BillWithDetails>>;

    /// Upsert the bill and replace its expense and payment lists in one
    /// transaction. Returned ids are index-aligned with the submitted lists.
    async fn write_period(&self, write: BillWrite) -> RentbookResult<SaveBillResult>;
}
