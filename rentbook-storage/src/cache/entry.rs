//! Cache entries, revisions and the read view handed to callers.

use std::time::Duration;

use rentbook_core::{BillSnapshot, Timestamp};

/// A snapshot together with the moment it was captured.
///
/// Staleness is never stored; it is derived from `captured_at` at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub snapshot: BillSnapshot,
    pub captured_at: Timestamp,
}

impl CacheEntry {
    pub fn new(snapshot: BillSnapshot, captured_at: Timestamp) -> Self {
        Self {
            snapshot,
            captured_at,
        }
    }

    /// Age of the entry at `now`. Clock skew backwards reads as zero.
    pub fn age_at(&self, now: Timestamp) -> Duration {
        now.signed_duration_since(self.captured_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// True iff the entry is strictly older than `ttl` at `now`.
    pub fn is_stale_at(&self, now: Timestamp, ttl: Duration) -> bool {
        self.age_at(now) > ttl
    }
}

/// Position of a key in the cache's mutation history.
///
/// Every `set`, `invalidate` and `clear` moves the affected keys to a new,
/// strictly larger revision. A writer that captured a revision before a slow
/// read can therefore tell whether anyone touched the key in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(u64);

impl Revision {
    pub fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    pub fn sequence(&self) -> u64 {
        self.0
    }

    /// Check if this revision is newer than another.
    pub fn is_newer_than(&self, other: &Revision) -> bool {
        self.0 > other.0
    }
}

/// What a cache lookup returns: the snapshot plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedBill {
    pub snapshot: BillSnapshot,
    pub captured_at: Timestamp,
    pub stale: bool,
    pub revision: Revision,
}

impl CachedBill {
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn into_snapshot(self) -> BillSnapshot {
        self.snapshot
    }
}
