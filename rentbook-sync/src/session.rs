//! One renter's billing screen: navigation, edits and saves.

use std::sync::Arc;

use rentbook_core::{BillSnapshot, PeriodKey, RenterProfile, RentbookResult, SyncConfig, SyncError};
use rentbook_storage::{BillCache, BillRecordStore};

use crate::fetch::{FetchCoordinator, Navigation};
use crate::save_state::{SaveLedger, SaveState};
use crate::view::{ApplyOutcome, ViewSnapshot, ViewState};
use crate::write::{SaveOutcome, WriteCoordinator};

/// Wires the cache, store and view together for one renter.
///
/// The cache is passed in rather than owned so several sessions (one per
/// renter) can share it, and so signing out can clear it for all of them.
pub struct BillSession<S> {
    fetch: FetchCoordinator<S>,
    write: WriteCoordinator<S>,
}

impl<S> std::fmt::Debug for BillSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillSession")
            .field("fetch", &self.fetch)
            .finish_non_exhaustive()
    }
}

impl<S: BillRecordStore + 'static> BillSession<S> {
    pub fn new(
        store: Arc<S>,
        cache: Arc<BillCache>,
        renter: RenterProfile,
        config: SyncConfig,
    ) -> RentbookResult<Self> {
        config.validate()?;
        let view = Arc::new(ViewState::new(cache.clock()));
        let ledger = Arc::new(SaveLedger::new());
        let fetch = FetchCoordinator::new(store, cache, view, ledger, renter, config);
        let write = WriteCoordinator::new(fetch.clone());
        Ok(Self { fetch, write })
    }

    pub fn fetch(&self) -> &FetchCoordinator<S> {
        &self.fetch
    }

    pub fn writer(&self) -> &WriteCoordinator<S> {
        &self.write
    }

    pub fn cache(&self) -> &Arc<BillCache> {
        self.fetch.cache()
    }

    pub fn renter(&self) -> &RenterProfile {
        self.fetch.renter()
    }

    /// Current view contents.
    pub fn view(&self) -> ViewSnapshot {
        self.fetch.view().snapshot()
    }

    pub fn save_state(&self, key: PeriodKey) -> SaveState {
        self.fetch.ledger().state(key)
    }

    // === Navigation ===

    /// Open the bill for `month`/`year`.
    pub fn open(&self, month: u32, year: i32) -> RentbookResult<Navigation> {
        let key = PeriodKey::new(self.renter().id, month, year)?;
        self.navigate(key)
    }

    pub fn navigate(&self, key: PeriodKey) -> RentbookResult<Navigation> {
        self.fetch.navigate(key)
    }

    pub fn previous_month(&self) -> RentbookResult<Navigation> {
        let key = self.fetch.view().active().ok_or(SyncError::NoActivePeriod)?;
        self.navigate(key.previous())
    }

    pub fn next_month(&self) -> RentbookResult<Navigation> {
        let key = self.fetch.view().active().ok_or(SyncError::NoActivePeriod)?;
        self.navigate(key.next())
    }

    /// Retry action of a failed load.
    pub async fn retry_load(&self) -> RentbookResult<ApplyOutcome> {
        self.fetch.retry_load().await
    }

    /// Fill the cache with every stored period of this renter.
    pub async fn warm(&self) -> RentbookResult<usize> {
        self.fetch.warm().await
    }

    // === Editing ===

    /// Apply `f` to the active period's draft. Returns the edited period.
    pub fn edit<F>(&self, f: F) -> RentbookResult<PeriodKey>
    where
        F: FnOnce(&mut BillSnapshot),
    {
        self.fetch
            .view()
            .edit(f)
            .ok_or_else(|| SyncError::NoActivePeriod.into())
    }

    /// Save the active period's form fields.
    pub async fn save(&self) -> RentbookResult<SaveOutcome> {
        self.write.save_active().await
    }

    /// Retry action of a failed save: submits the edits the view kept.
    pub async fn retry_save(&self) -> RentbookResult<SaveOutcome> {
        self.fetch.view().dismiss_notice();
        self.write.save_active().await
    }

    /// Drop every cached bill and reset the view. Outstanding responses are
    /// discarded when they arrive.
    pub fn sign_out(&self) {
        self.fetch.cache().clear();
        self.fetch.view().reset();
    }

    /// Wait for every background reload and preload to finish.
    pub async fn settle(&self) {
        self.fetch.settle().await;
    }
}
