//! Session-scoped bill cache keyed by period.
//!
//! Entries are never evicted by age. A stale entry is still returned; the
//! caller decides whether to refresh it. All operations are synchronous and
//! complete under one short lock, so they never interleave with each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use rentbook_core::{BillSnapshot, PeriodKey, RenterId, SyncConfig};

use super::clock::{Clock, SystemClock};
use super::entry::{CacheEntry, CachedBill, Revision};
use super::stats::CacheStats;

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<PeriodKey, CacheEntry>,
    /// Last revision assigned to each key touched since the last `clear`.
    stamps: HashMap<PeriodKey, Revision>,
    sequence: u64,
    cleared_at: Revision,
}

impl CacheInner {
    fn bump(&mut self, key: PeriodKey) -> Revision {
        self.sequence += 1;
        let revision = Revision::new(self.sequence);
        self.stamps.insert(key, revision);
        revision
    }

    fn revision(&self, key: &PeriodKey) -> Revision {
        self.stamps.get(key).copied().unwrap_or(self.cleared_at)
    }
}

/// Client-side cache of [`BillSnapshot`]s.
#[derive(Debug)]
pub struct BillCache {
    inner: RwLock<CacheInner>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl BillCache {
    /// Create a cache on the wall clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Create a cache using the TTL from `config`.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.cache_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Snapshot for `key`, stale or not. Records a hit or a miss.
    pub fn get(&self, key: &PeriodKey) -> Option<BillSnapshot> {
        self.lookup(key).map(CachedBill::into_snapshot)
    }

    /// Snapshot plus capture time, staleness and revision, read atomically.
    /// Records a hit or a miss.
    pub fn lookup(&self, key: &PeriodKey) -> Option<CachedBill> {
        let now = self.clock.now();
        let found = {
            let inner = self.read();
            inner.entries.get(key).map(|entry| CachedBill {
                snapshot: entry.snapshot.clone(),
                captured_at: entry.captured_at,
                stale: entry.is_stale_at(now, self.ttl),
                revision: inner.revision(key),
            })
        };

        match &found {
            Some(cached) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                if cached.stale {
                    self.stale_hits.fetch_add(1, Ordering::Relaxed);
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
        found
    }

    /// Whether an entry exists. Does not touch the statistics.
    pub fn contains(&self, key: &PeriodKey) -> bool {
        self.read().entries.contains_key(key)
    }

    /// True iff an entry exists and is older than the TTL.
    pub fn is_stale(&self, key: &PeriodKey) -> bool {
        let now = self.clock.now();
        self.read()
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_stale_at(now, self.ttl))
    }

    /// Current revision of `key`. Keys never written share the revision of
    /// the last `clear`.
    pub fn revision(&self, key: &PeriodKey) -> Revision {
        self.read().revision(key)
    }

    /// Latest revision assigned to any key. A key whose revision is still at
    /// or below a watermark has not been touched since it was taken.
    pub fn watermark(&self) -> Revision {
        Revision::new(self.read().sequence)
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Insert or overwrite the entry, captured now.
    pub fn set(&self, key: PeriodKey, snapshot: BillSnapshot) -> Revision {
        let entry = CacheEntry::new(snapshot, self.clock.now());
        let mut inner = self.write();
        inner.entries.insert(key, entry);
        inner.bump(key)
    }

    /// Insert only if nobody has touched `key` since `expected` was read.
    ///
    /// Returns the new revision, or `None` when the key moved on and the
    /// snapshot was dropped.
    pub fn set_if_revision(
        &self,
        key: PeriodKey,
        snapshot: BillSnapshot,
        expected: Revision,
    ) -> Option<Revision> {
        let entry = CacheEntry::new(snapshot, self.clock.now());
        let mut inner = self.write();
        if inner.revision(&key) != expected {
            return None;
        }
        inner.entries.insert(key, entry);
        Some(inner.bump(key))
    }

    /// Remove the entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &PeriodKey) -> bool {
        let mut inner = self.write();
        inner.bump(*key);
        let removed = inner.entries.remove(key).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Remove the entry for `key` only if nobody has touched it since
    /// `expected`. Returns the revision after removal, or `None` when the
    /// key moved on and was left alone.
    pub fn invalidate_if_revision(&self, key: &PeriodKey, expected: Revision) -> Option<Revision> {
        let mut inner = self.write();
        if inner.revision(key) != expected {
            return None;
        }
        if inner.entries.remove(key).is_some() {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        Some(inner.bump(*key))
    }

    /// Remove every period of one renter. Returns how many entries went.
    pub fn invalidate_entity(&self, entity_id: RenterId) -> usize {
        let mut inner = self.write();
        let keys: Vec<PeriodKey> = inner
            .entries
            .keys()
            .filter(|key| key.entity_id() == entity_id)
            .copied()
            .collect();
        for key in &keys {
            inner.entries.remove(key);
            inner.bump(*key);
        }
        self.invalidations
            .fetch_add(keys.len() as u64, Ordering::Relaxed);
        keys.len()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.entries.clear();
        inner.stamps.clear();
        inner.sequence += 1;
        inner.cleared_at = Revision::new(inner.sequence);
    }

    /// Insert many snapshots at once, all captured now.
    pub fn populate<I>(&self, snapshots: I) -> usize
    where
        I: IntoIterator<Item = (PeriodKey, BillSnapshot)>,
    {
        let now = self.clock.now();
        let mut inner = self.write();
        let mut count = 0;
        for (key, snapshot) in snapshots {
            inner.entries.insert(key, CacheEntry::new(snapshot, now));
            inner.bump(key);
            count += 1;
        }
        count
    }

    /// Like [`BillCache::populate`], but skips every key touched after
    /// `watermark`. After a `clear` every key counts as touched.
    pub fn populate_since<I>(&self, snapshots: I, watermark: Revision) -> usize
    where
        I: IntoIterator<Item = (PeriodKey, BillSnapshot)>,
    {
        let now = self.clock.now();
        let mut inner = self.write();
        let mut count = 0;
        for (key, snapshot) in snapshots {
            if inner.revision(&key).is_newer_than(&watermark) {
                continue;
            }
            inner.entries.insert(key, CacheEntry::new(snapshot, now));
            inner.bump(key);
            count += 1;
        }
        count
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.len() as u64,
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    const TTL: Duration = Duration::from_secs(15 * 60);

    fn key(entity: RenterId, month: u32) -> PeriodKey {
        PeriodKey::new(entity, month, 2024).expect("key should be valid")
    }

    fn snapshot(rent: i64) -> BillSnapshot {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).expect("date should be valid");
        BillSnapshot::placeholder(Decimal::new(rent, 0), today)
    }

    fn cache() -> (BillCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (BillCache::with_clock(TTL, clock.clone()), clock)
    }

    #[test]
    fn test_get_miss_then_hit() {
        let (cache, _) = cache();
        assert!(cache.get(&key(1, 6)).is_none());

        cache.set(key(1, 6), snapshot(9000));
        assert_eq!(cache.get(&key(1, 6)), Some(snapshot(9000)));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn test_stale_entry_still_returned() {
        let (cache, clock) = cache();
        cache.set(key(1, 6), snapshot(9000));
        clock.advance(chrono::Duration::hours(3));

        assert!(cache.is_stale(&key(1, 6)));
        let cached = cache.lookup(&key(1, 6)).expect("stale entry should be returned");
        assert!(cached.is_stale());
        assert_eq!(cached.snapshot, snapshot(9000));
        assert_eq!(cache.stats().stale_hits, 1);
    }

    #[test]
    fn test_is_stale_false_for_missing_key() {
        let (cache, _) = cache();
        assert!(!cache.is_stale(&key(1, 6)));
    }

    #[test]
    fn test_set_refreshes_capture_time() {
        let (cache, clock) = cache();
        cache.set(key(1, 6), snapshot(9000));
        clock.advance(chrono::Duration::minutes(20));
        assert!(cache.is_stale(&key(1, 6)));

        cache.set(key(1, 6), snapshot(9100));
        assert!(!cache.is_stale(&key(1, 6)));
    }

    #[test]
    fn test_set_if_revision_rejects_after_intervening_set() {
        let (cache, _) = cache();
        let before = cache.revision(&key(1, 6));
        cache.set(key(1, 6), snapshot(9500));

        assert!(cache
            .set_if_revision(key(1, 6), snapshot(9000), before)
            .is_none());
        assert_eq!(cache.get(&key(1, 6)), Some(snapshot(9500)));
    }

    #[test]
    fn test_set_if_revision_rejects_after_invalidate() {
        let (cache, _) = cache();
        cache.set(key(1, 6), snapshot(9000));
        let before = cache.revision(&key(1, 6));
        assert!(cache.invalidate(&key(1, 6)));

        assert!(cache
            .set_if_revision(key(1, 6), snapshot(9000), before)
            .is_none());
        assert!(!cache.contains(&key(1, 6)));
    }

    #[test]
    fn test_set_if_revision_accepts_untouched_key() {
        let (cache, _) = cache();
        let before = cache.revision(&key(1, 6));
        cache.set(key(1, 7), snapshot(1));

        let after = cache
            .set_if_revision(key(1, 6), snapshot(9000), before)
            .expect("untouched key should accept");
        assert!(after.is_newer_than(&before));
    }

    #[test]
    fn test_clear_moves_every_revision() {
        let (cache, _) = cache();
        let never_written = cache.revision(&key(2, 1));
        cache.set(key(1, 6), snapshot(9000));
        let written = cache.revision(&key(1, 6));

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.revision(&key(2, 1)).is_newer_than(&never_written));
        assert!(cache.revision(&key(1, 6)).is_newer_than(&written));
    }

    #[test]
    fn test_invalidate_entity_only_touches_that_renter() {
        let (cache, _) = cache();
        cache.set(key(1, 5), snapshot(1));
        cache.set(key(1, 6), snapshot(1));
        cache.set(key(2, 6), snapshot(2));

        assert_eq!(cache.invalidate_entity(1), 2);
        assert!(!cache.contains(&key(1, 5)));
        assert!(cache.contains(&key(2, 6)));
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[test]
    fn test_populate_inserts_all() {
        let (cache, _) = cache();
        let count = cache.populate([(key(1, 1), snapshot(1)), (key(1, 2), snapshot(2))]);
        assert_eq!(count, 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_populate_since_skips_keys_touched_after_watermark() {
        let (cache, _) = cache();
        cache.set(key(1, 1), snapshot(1));
        let watermark = cache.watermark();
        cache.set(key(1, 2), snapshot(9500));

        let count = cache.populate_since(
            [(key(1, 1), snapshot(10)), (key(1, 2), snapshot(9000)), (key(1, 3), snapshot(30))],
            watermark,
        );
        assert_eq!(count, 2);
        assert_eq!(cache.get(&key(1, 1)), Some(snapshot(10)));
        assert_eq!(cache.get(&key(1, 2)), Some(snapshot(9500)));
        assert_eq!(cache.get(&key(1, 3)), Some(snapshot(30)));
    }

    #[test]
    fn test_populate_since_after_clear_stores_nothing() {
        let (cache, _) = cache();
        let watermark = cache.watermark();
        cache.clear();

        let count = cache.populate_since([(key(1, 1), snapshot(1))], watermark);
        assert_eq!(count, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_if_revision() {
        let (cache, _) = cache();
        let written = cache.set(key(1, 6), snapshot(9500));
        let after = cache
            .invalidate_if_revision(&key(1, 6), written)
            .expect("untouched key should be invalidated");
        assert!(after.is_newer_than(&written));
        assert!(!cache.contains(&key(1, 6)));

        let written = cache.set(key(1, 6), snapshot(9500));
        cache.clear();
        assert!(cache.invalidate_if_revision(&key(1, 6), written).is_none());
        assert_eq!(cache.revision(&key(1, 6)), cache.watermark());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::cache::ManualClock;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    proptest! {
        #[test]
        fn prop_staleness_threshold(ttl_ms in 1u64..3_600_000, before in 1u64..1_000, after in 1u64..1_000) {
            let clock = Arc::new(ManualClock::default());
            let cache = BillCache::with_clock(Duration::from_millis(ttl_ms), clock.clone());
            let key = PeriodKey::new(1, 1, 2024).expect("key should be valid");
            let today = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date should be valid");
            cache.set(key, BillSnapshot::placeholder(Decimal::ONE, today));

            let under = ttl_ms.saturating_sub(before.min(ttl_ms)) as i64;
            clock.advance(chrono::Duration::milliseconds(under));
            prop_assert!(!cache.is_stale(&key));

            clock.advance(chrono::Duration::milliseconds((ttl_ms as i64 - under) + after as i64));
            prop_assert!(cache.is_stale(&key));
            prop_assert!(cache.get(&key).is_some());
        }
    }
}
