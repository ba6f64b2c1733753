//! View state: what the screen shows for the active period.
//!
//! The view holds two snapshots. `bill` is the last one loaded or confirmed;
//! `draft` is the user's in-progress edits on top of it. Reloads replace
//! `bill` and leave `draft` alone, so a failed save never throws away what
//! the user typed.
//!
//! Every mutation that originates from an async response goes through a
//! [`RequestTicket`] check under the view lock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rentbook_core::{BillSnapshot, PeriodKey, Timestamp};
use rentbook_storage::Clock;
use serde::Serialize;

use crate::token::{RequestGeneration, RequestTicket};

/// Where the displayed bill came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    Placeholder,
    Cache,
    Store,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    LoadFailed,
    SaveFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeAction {
    Retry,
}

/// User-visible error with an optional follow-up action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNotice {
    pub kind: NoticeKind,
    pub key: PeriodKey,
    pub message: String,
    pub action: Option<NoticeAction>,
    pub raised_at: Timestamp,
}

impl ViewNotice {
    pub fn new(kind: NoticeKind, key: PeriodKey, message: impl Into<String>, raised_at: Timestamp) -> Self {
        Self {
            kind,
            key,
            message: message.into(),
            action: None,
            raised_at,
        }
    }

    pub fn with_action(mut self, action: NoticeAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Copy of the view handed to renderers and tests.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ViewSnapshot {
    pub period: Option<PeriodKey>,
    pub bill: Option<BillSnapshot>,
    pub source: Option<SnapshotSource>,
    pub draft: Option<BillSnapshot>,
    pub loading: bool,
    /// Shown data may be out of date; a background refresh is running.
    pub outdated: bool,
    pub saving: bool,
    pub notice: Option<ViewNotice>,
}

impl ViewSnapshot {
    /// The snapshot the form fields show: the draft if any, else the bill.
    pub fn editing(&self) -> Option<&BillSnapshot> {
        self.draft.as_ref().or(self.bill.as_ref())
    }
}

/// Result of trying to apply a reload response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A newer request was issued; nothing changed.
    Superseded,
    /// The cache moved on while the read was in flight; the response was dropped.
    Conflicted,
}

#[derive(Debug, Default)]
struct ViewInner {
    generation: RequestGeneration,
    active: Option<PeriodKey>,
    bill: Option<BillSnapshot>,
    source: Option<SnapshotSource>,
    draft: Option<BillSnapshot>,
    loading: bool,
    outdated: bool,
    saving: HashSet<PeriodKey>,
    notice: Option<ViewNotice>,
}

impl ViewInner {
    fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.active == Some(ticket.key()) && self.generation.is_current(ticket)
    }

    fn is_active(&self, key: PeriodKey) -> bool {
        self.active == Some(key)
    }
}

/// Shared, lock-protected view of the active period.
#[derive(Debug)]
pub struct ViewState {
    inner: Mutex<ViewInner>,
    clock: Arc<dyn Clock>,
}

impl ViewState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(ViewInner::default()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // NAVIGATION AND TICKETS
    // ========================================================================

    /// Make `key` the active period and supersede every outstanding request.
    pub fn navigate(&self, key: PeriodKey) -> RequestTicket {
        let mut inner = self.lock();
        let ticket = inner.generation.issue(key);
        inner.active = Some(key);
        inner.bill = None;
        inner.source = None;
        inner.draft = None;
        inner.loading = false;
        inner.outdated = false;
        inner.notice = None;
        ticket
    }

    /// Issue a new ticket for `key` if it is still the active period.
    pub fn issue(&self, key: PeriodKey) -> Option<RequestTicket> {
        let mut inner = self.lock();
        if !inner.is_active(key) {
            return None;
        }
        Some(inner.generation.issue(key))
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.lock().is_current(ticket)
    }

    pub fn active(&self) -> Option<PeriodKey> {
        self.lock().active
    }

    // ========================================================================
    // RESPONSE APPLICATION
    // ========================================================================

    /// Show `snapshot` if `ticket` is current.
    pub fn show(
        &self,
        ticket: &RequestTicket,
        snapshot: BillSnapshot,
        source: SnapshotSource,
        outdated: bool,
    ) -> bool {
        let mut inner = self.lock();
        if !inner.is_current(ticket) {
            return false;
        }
        inner.bill = Some(snapshot);
        inner.source = Some(source);
        inner.outdated = outdated;
        inner.loading = false;
        true
    }

    /// Apply a reload response, running `commit` (the cache write) under the
    /// view lock so the currency check and the cache write cannot interleave
    /// with a navigation.
    pub fn apply_reload<F>(&self, ticket: &RequestTicket, snapshot: BillSnapshot, commit: F) -> ApplyOutcome
    where
        F: FnOnce(&BillSnapshot) -> bool,
    {
        let mut inner = self.lock();
        if !inner.is_current(ticket) {
            return ApplyOutcome::Superseded;
        }
        inner.loading = false;
        inner.outdated = false;
        if !commit(&snapshot) {
            return ApplyOutcome::Conflicted;
        }
        inner.bill = Some(snapshot);
        inner.source = Some(SnapshotSource::Store);
        if inner
            .notice
            .as_ref()
            .is_some_and(|n| n.kind == NoticeKind::LoadFailed)
        {
            inner.notice = None;
        }
        ApplyOutcome::Applied
    }

    pub fn begin_loading(&self, ticket: &RequestTicket) -> bool {
        let mut inner = self.lock();
        if !inner.is_current(ticket) {
            return false;
        }
        inner.loading = true;
        true
    }

    /// Record a failed read of the active period. The outdated marker stays
    /// set because whatever is shown was not refreshed.
    pub fn fail_load(&self, ticket: &RequestTicket, message: impl Into<String>) -> bool {
        let raised_at = self.clock.now();
        let mut inner = self.lock();
        if !inner.is_current(ticket) {
            return false;
        }
        inner.loading = false;
        inner.notice = Some(
            ViewNotice::new(NoticeKind::LoadFailed, ticket.key(), message, raised_at)
                .with_action(NoticeAction::Retry),
        );
        true
    }

    // ========================================================================
    // EDITING AND SAVING
    // ========================================================================

    /// Edit the active period's draft, starting it from the shown bill.
    /// Returns the period edited, or `None` when nothing is shown yet.
    pub fn edit<F>(&self, f: F) -> Option<PeriodKey>
    where
        F: FnOnce(&mut BillSnapshot),
    {
        let mut inner = self.lock();
        let key = inner.active?;
        if inner.draft.is_none() {
            inner.draft = inner.bill.clone();
        }
        let draft = inner.draft.as_mut()?;
        f(draft);
        Some(key)
    }

    /// Active period and the snapshot its form fields show.
    pub fn editing(&self) -> Option<(PeriodKey, BillSnapshot)> {
        let inner = self.lock();
        let key = inner.active?;
        let snapshot = inner.draft.clone().or_else(|| inner.bill.clone())?;
        Some((key, snapshot))
    }

    pub fn set_saving(&self, key: PeriodKey, saving: bool) {
        let mut inner = self.lock();
        if saving {
            inner.saving.insert(key);
        } else {
            inner.saving.remove(&key);
        }
    }

    /// A save of `submitted` was confirmed as `reconciled`.
    pub fn confirm_save(&self, key: PeriodKey, submitted: &BillSnapshot, reconciled: &BillSnapshot) {
        let mut inner = self.lock();
        if !inner.is_active(key) {
            return;
        }
        inner.bill = Some(reconciled.clone());
        inner.source = Some(SnapshotSource::Saved);
        if inner.draft.as_ref() == Some(submitted) {
            inner.draft = None;
        } else if let Some(draft) = inner.draft.as_mut() {
            draft.adopt_ids(reconciled);
        }
        if inner
            .notice
            .as_ref()
            .is_some_and(|n| n.kind == NoticeKind::SaveFailed && n.key == key)
        {
            inner.notice = None;
        }
    }

    /// A save of `edited` was rejected. The edits are kept as the draft so a
    /// retry submits them again.
    pub fn reject_save(&self, key: PeriodKey, edited: BillSnapshot, message: impl Into<String>) {
        let raised_at = self.clock.now();
        let mut inner = self.lock();
        if !inner.is_active(key) {
            return;
        }
        if inner.draft.is_none() {
            inner.draft = Some(edited);
        }
        inner.notice = Some(
            ViewNotice::new(NoticeKind::SaveFailed, key, message, raised_at)
                .with_action(NoticeAction::Retry),
        );
    }

    pub fn dismiss_notice(&self) {
        self.lock().notice = None;
    }

    /// Forget everything and supersede every outstanding request.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation.advance();
        inner.active = None;
        inner.bill = None;
        inner.source = None;
        inner.draft = None;
        inner.loading = false;
        inner.outdated = false;
        inner.saving.clear();
        inner.notice = None;
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let inner = self.lock();
        ViewSnapshot {
            period: inner.active,
            bill: inner.bill.clone(),
            source: inner.source,
            draft: inner.draft.clone(),
            loading: inner.loading,
            outdated: inner.outdated,
            saving: inner.active.is_some_and(|key| inner.saving.contains(&key)),
            notice: inner.notice.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
