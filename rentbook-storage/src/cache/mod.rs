//! Client-side bill cache.
//!
//! Snapshots are keyed by [`rentbook_core::PeriodKey`] and stamped with the
//! time they were captured. Staleness is computed on read against a TTL, and
//! a stale snapshot is still handed out so the UI can render it while a
//! refresh runs.
//!
//! Each key also carries a [`Revision`]. Reloads capture it before going to
//! the store and write back with [`BillCache::set_if_revision`], which keeps
//! a slow read from overwriting an optimistic write that landed meanwhile.

pub mod bill_cache;
pub mod clock;
pub mod entry;
pub mod stats;

pub use bill_cache::BillCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CachedBill, Revision};
pub use stats::CacheStats;
