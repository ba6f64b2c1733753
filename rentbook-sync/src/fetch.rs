//! Cache-first fetch coordination.
//!
//! Navigation always puts something on screen synchronously: the cached
//! snapshot when there is one (fresh or stale), otherwise a placeholder. The
//! store is consulted afterwards, in the background, and its answer is only
//! applied if no newer request has been issued in the meantime.
//!
//! ```text
//! navigate(K) ──┬── hit, fresh ──→ show cached ──→ preload neighbours
//!               ├── hit, stale ──→ show cached (outdated) ──→ background reload
//!               └── miss ────────→ show placeholder (loading) ──→ foreground reload
//!
//! reload(K) ──→ read store ──→ ticket current? ──→ cache unchanged? ──→ show + cache ──→ preload
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use rentbook_core::{
    carry_forward, BillSnapshot, BillWithDetails, PeriodKey, RenterProfile, RentbookResult,
    SyncConfig, SyncError, ValidationError,
};
use rentbook_storage::{BillCache, BillRecordStore, Revision};

use crate::save_state::{SaveLedger, SaveState};
use crate::tasks::BackgroundTasks;
use crate::token::RequestTicket;
use crate::view::{ApplyOutcome, SnapshotSource, ViewState};

/// What the cache held when a period was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    Fresh,
    Stale,
    Miss,
}

/// Result of a navigation. The view has already been updated when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub key: PeriodKey,
    pub decision: CacheDecision,
    pub ticket: RequestTicket,
}

/// Whether a reload shows a loading indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMode {
    Foreground,
    Background,
}

/// Result of loading one period into the cache without touching the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFill {
    Stored,
    /// Someone wrote the key while the read was in flight; their entry won.
    Skipped,
}

/// Fetches bills for one renter, cache first.
pub struct FetchCoordinator<S> {
    store: Arc<S>,
    cache: Arc<BillCache>,
    view: Arc<ViewState>,
    ledger: Arc<SaveLedger>,
    tasks: Arc<BackgroundTasks>,
    renter: RenterProfile,
    config: SyncConfig,
}

impl<S> Clone for FetchCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            view: Arc::clone(&self.view),
            ledger: Arc::clone(&self.ledger),
            tasks: Arc::clone(&self.tasks),
            renter: self.renter.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S> std::fmt::Debug for FetchCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("renter", &self.renter)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: BillRecordStore + 'static> FetchCoordinator<S> {
    pub fn new(
        store: Arc<S>,
        cache: Arc<BillCache>,
        view: Arc<ViewState>,
        ledger: Arc<SaveLedger>,
        renter: RenterProfile,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            cache,
            view,
            ledger,
            tasks: Arc::new(BackgroundTasks::new()),
            renter,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<BillCache> {
        &self.cache
    }

    pub fn view(&self) -> &Arc<ViewState> {
        &self.view
    }

    pub fn ledger(&self) -> &Arc<SaveLedger> {
        &self.ledger
    }

    pub fn renter(&self) -> &RenterProfile {
        &self.renter
    }

    /// Reject keys that belong to another renter.
    pub fn check_owner(&self, key: PeriodKey) -> RentbookResult<()> {
        if key.entity_id() != self.renter.id {
            return Err(ValidationError::ForeignPeriod {
                key,
                renter_id: self.renter.id,
            }
            .into());
        }
        Ok(())
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    /// Open `key`. The view shows something before this returns; any store
    /// traffic happens on background tasks.
    pub fn navigate(&self, key: PeriodKey) -> RentbookResult<Navigation> {
        self.check_owner(key)?;
        let ticket = self.view.navigate(key);
        let revision = self.cache.revision(&key);

        let decision = match self.cache.lookup(&key) {
            Some(cached) if !cached.is_stale() => {
                self.view
                    .show(&ticket, cached.snapshot, SnapshotSource::Cache, false);
                self.spawn_preload(key);
                CacheDecision::Fresh
            }
            Some(cached) => {
                self.view
                    .show(&ticket, cached.snapshot, SnapshotSource::Cache, true);
                self.spawn_reload(ticket, revision, ReloadMode::Background);
                CacheDecision::Stale
            }
            None => {
                let today = self.cache.clock().today();
                self.view.show(
                    &ticket,
                    BillSnapshot::placeholder(self.renter.monthly_rent, today),
                    SnapshotSource::Placeholder,
                    false,
                );
                self.view.begin_loading(&ticket);
                self.spawn_reload(ticket, revision, ReloadMode::Foreground);
                CacheDecision::Miss
            }
        };

        tracing::debug!(key = %key, decision = ?decision, "Opened bill period");
        Ok(Navigation {
            key,
            decision,
            ticket,
        })
    }

    // ========================================================================
    // RELOAD
    // ========================================================================

    /// Reload `key` from the store into the view and the cache, superseding
    /// any reload already running. Does nothing unless `key` is active.
    pub async fn reload(&self, key: PeriodKey, mode: ReloadMode) -> RentbookResult<ApplyOutcome> {
        let revision = self.cache.revision(&key);
        let Some(ticket) = self.view.issue(key) else {
            return Ok(ApplyOutcome::Superseded);
        };
        self.reload_with(ticket, revision, mode).await
    }

    /// Re-run a foreground reload of the active period.
    pub async fn retry_load(&self) -> RentbookResult<ApplyOutcome> {
        let key = self.view.active().ok_or(SyncError::NoActivePeriod)?;
        self.reload(key, ReloadMode::Foreground).await
    }

    async fn reload_with(
        &self,
        ticket: RequestTicket,
        revision: Revision,
        mode: ReloadMode,
    ) -> RentbookResult<ApplyOutcome> {
        let key = ticket.key();
        if mode == ReloadMode::Foreground {
            self.view.begin_loading(&ticket);
        }

        let details = match self.store.read_period(key).await {
            Ok(details) => details,
            Err(e) => {
                if self.view.fail_load(&ticket, e.to_string()) {
                    tracing::warn!(key = %key, error = %e, "Failed to load bill period");
                } else {
                    tracing::debug!(key = %key, error = %e, "Superseded reload failed");
                }
                return Err(e);
            }
        };

        let snapshot = self.materialize(details);
        let outcome = self.view.apply_reload(&ticket, snapshot, |snapshot| {
            self.ledger.state(key) != SaveState::Saving
                && self
                    .cache
                    .set_if_revision(key, snapshot.clone(), revision)
                    .is_some()
        });

        match outcome {
            ApplyOutcome::Applied => self.spawn_preload(key),
            ApplyOutcome::Superseded => {
                tracing::debug!(key = %key, generation = ticket.generation(), "Discarded superseded reload");
            }
            ApplyOutcome::Conflicted => {
                tracing::debug!(key = %key, "Cache changed during reload, keeping newer entry");
                if let Some(newer) = self.cache.get(&key) {
                    self.view.show(&ticket, newer, SnapshotSource::Cache, false);
                }
            }
        }
        Ok(outcome)
    }

    /// Turn a store answer into a snapshot, carrying readings forward when
    /// the period has no bill yet.
    fn materialize(&self, details: BillWithDetails) -> BillSnapshot {
        let today = self.cache.clock().today();
        match details.bill {
            Some(bill) => {
                BillSnapshot::from_records(&bill, &details.expenses, &details.payments, today)
            }
            None => carry_forward(self.renter.monthly_rent, details.previous_readings, today),
        }
    }

    // ========================================================================
    // CACHE-ONLY LOADS
    // ========================================================================

    /// Load the periods either side of `key` into the cache, skipping any the
    /// cache already holds. Failures are logged and swallowed.
    pub async fn preload(&self, key: PeriodKey) {
        let fills = key.adjacent().map(|neighbour| async move {
            let revision = self.cache.revision(&neighbour);
            if self.cache.contains(&neighbour) {
                return;
            }
            if let Err(e) = self.fill(neighbour, revision).await {
                tracing::warn!(key = %neighbour, error = %e, "Preload failed");
            }
        });
        join_all(fills).await;
    }

    /// Reload `key` into the cache only, whether or not it is present.
    pub async fn refresh_cache(&self, key: PeriodKey) -> RentbookResult<CacheFill> {
        let revision = self.cache.revision(&key);
        self.fill(key, revision).await
    }

    /// Like [`FetchCoordinator::refresh_cache`], but the answer is only stored
    /// if `key` is still at `revision` when it arrives.
    pub async fn refresh_cache_at(
        &self,
        key: PeriodKey,
        revision: Revision,
    ) -> RentbookResult<CacheFill> {
        self.fill(key, revision).await
    }

    async fn fill(&self, key: PeriodKey, revision: Revision) -> RentbookResult<CacheFill> {
        let details = self.store.read_period(key).await?;
        let snapshot = self.materialize(details);
        if self.ledger.state(key) == SaveState::Saving {
            return Ok(CacheFill::Skipped);
        }
        Ok(match self.cache.set_if_revision(key, snapshot, revision) {
            Some(_) => CacheFill::Stored,
            None => CacheFill::Skipped,
        })
    }

    /// Fill the cache with every stored period of this renter in one call.
    /// Periods written, invalidated or cleared while the read was in flight
    /// keep their newer state.
    pub async fn warm(&self) -> RentbookResult<usize> {
        let watermark = self.cache.watermark();
        let all = self.store.read_all_periods(self.renter.id).await?;
        let today = self.cache.clock().today();

        let snapshots: Vec<(PeriodKey, BillSnapshot)> = all
            .into_iter()
            .filter_map(|details| {
                let bill = details.bill.as_ref()?;
                let key = bill.period().ok()?;
                if key.entity_id() != self.renter.id || self.ledger.state(key) == SaveState::Saving {
                    return None;
                }
                let snapshot =
                    BillSnapshot::from_records(bill, &details.expenses, &details.payments, today);
                Some((key, snapshot))
            })
            .collect();

        let offered = snapshots.len();
        let count = self.cache.populate_since(snapshots, watermark);
        if count < offered {
            tracing::debug!(
                renter_id = self.renter.id,
                skipped = offered - count,
                "Kept newer cache entries during warm"
            );
        }
        tracing::info!(renter_id = self.renter.id, periods = count, "Warmed bill cache");
        Ok(count)
    }

    // ========================================================================
    // BACKGROUND WORK
    // ========================================================================

    fn spawn_reload(&self, ticket: RequestTicket, revision: Revision, mode: ReloadMode) {
        let this = self.clone();
        self.tasks.spawn(async move {
            // Failures were already reported to the view.
            let _ = this.reload_with(ticket, revision, mode).await;
        });
    }

    fn spawn_preload(&self, key: PeriodKey) {
        if !self.config.preload_adjacent {
            return;
        }
        let this = self.clone();
        self.tasks.spawn(async move {
            this.preload(key).await;
        });
    }

    /// Wait for every background reload and preload to finish.
    pub async fn settle(&self) {
        self.tasks.settle().await;
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.pending()
    }
}
