//! rentbook Storage - Bill Store and Cache
//!
//! The [`BillRecordStore`] contract the sync engine reads and writes through,
//! an in-memory implementation of it, and the [`BillCache`] that sits in
//! front of it on the client.

pub mod cache;
pub mod memory;
pub mod store;

pub use cache::{
    BillCache, CacheEntry, CacheStats, CachedBill, Clock, ManualClock, Revision, SystemClock,
};
pub use memory::InMemoryBillStore;
pub use store::BillRecordStore;
