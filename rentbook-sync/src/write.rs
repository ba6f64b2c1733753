//! Optimistic write coordination.
//!
//! A save lands in the cache before the store has seen it, so navigating
//! away and back shows the edit immediately. The store write then either
//! confirms it (ids are reconciled into the cache and view) or rejects it
//! (the cache entry is dropped and re-read so it never holds a write the
//! store refused).

use rentbook_core::{BillSnapshot, BillWrite, PeriodKey, RentbookResult, SaveBillResult, SyncError};
use rentbook_storage::BillRecordStore;

use crate::fetch::{FetchCoordinator, ReloadMode};
use crate::save_state::SaveState;

/// How a save ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The store accepted the write; `snapshot` carries the assigned ids.
    Confirmed {
        snapshot: BillSnapshot,
        result: SaveBillResult,
    },
    /// The store rejected the write and the period was reloaded.
    RolledBack { reason: String },
}

impl SaveOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SaveOutcome::Confirmed { .. })
    }
}

/// Saves bills optimistically for one renter.
pub struct WriteCoordinator<S> {
    fetch: FetchCoordinator<S>,
}

impl<S> Clone for WriteCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            fetch: self.fetch.clone(),
        }
    }
}

impl<S> std::fmt::Debug for WriteCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCoordinator")
            .field("fetch", &self.fetch)
            .finish()
    }
}

impl<S: BillRecordStore + 'static> WriteCoordinator<S> {
    pub fn new(fetch: FetchCoordinator<S>) -> Self {
        Self { fetch }
    }

    /// Save `edited` as the bill for `key`.
    ///
    /// Store failures do not surface as `Err`: they roll the period back and
    /// come back as [`SaveOutcome::RolledBack`]. `Err` means the save was
    /// never started (wrong renter, or a save for `key` still in flight).
    pub async fn save(&self, key: PeriodKey, edited: BillSnapshot) -> RentbookResult<SaveOutcome> {
        self.fetch.check_owner(key)?;
        let ledger = self.fetch.ledger();
        let cache = self.fetch.cache();
        let view = self.fetch.view();

        ledger.begin(key)?;
        view.set_saving(key, true);

        let optimistic = cache.set(key, edited.clone());
        let write = BillWrite::from_snapshot(key, &edited);

        match self.fetch.store().write_period(write).await {
            Ok(result) => {
                let reconciled = edited.reconcile(&result);
                if cache
                    .set_if_revision(key, reconciled.clone(), optimistic)
                    .is_none()
                {
                    tracing::debug!(key = %key, "Cache entry replaced during save, not re-setting");
                }
                view.confirm_save(key, &edited, &reconciled);
                ledger.transition(key, SaveState::Confirmed)?;
                view.set_saving(key, false);

                tracing::info!(
                    key = %key,
                    bill_id = %result.bill_id,
                    expenses = result.expense_ids.len(),
                    payments = result.payment_ids.len(),
                    "Saved bill"
                );
                Ok(SaveOutcome::Confirmed {
                    snapshot: reconciled,
                    result,
                })
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Save rejected, rolling back");
                ledger.transition(key, SaveState::RolledBack)?;
                // A changed revision means the optimistic entry was already
                // dropped, e.g. by a sign-out; the cache must stay as it is.
                let dropped = cache.invalidate_if_revision(&key, optimistic);

                let reloaded = match dropped {
                    _ if view.active() == Some(key) => self
                        .fetch
                        .reload(key, ReloadMode::Foreground)
                        .await
                        .map(|_| ()),
                    Some(revision) => self.fetch.refresh_cache_at(key, revision).await.map(|_| ()),
                    None => {
                        tracing::debug!(key = %key, "Cache entry discarded during save, skipping refresh");
                        Ok(())
                    }
                };
                if let Err(reload_err) = reloaded {
                    tracing::error!(key = %key, error = %reload_err, "Reload after rejected save failed");
                }

                ledger.transition(key, SaveState::Idle)?;
                view.set_saving(key, false);
                let reason = e.to_string();
                view.reject_save(key, edited, format!("Could not save bill: {}", reason));
                Ok(SaveOutcome::RolledBack { reason })
            }
        }
    }

    /// Save whatever the active period's form fields show.
    pub async fn save_active(&self) -> RentbookResult<SaveOutcome> {
        let (key, edited) = self
            .fetch
            .view()
            .editing()
            .ok_or(SyncError::NoActivePeriod)?;
        self.save(key, edited).await
    }
}
