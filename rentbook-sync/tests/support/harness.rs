#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rentbook_core::SyncConfig;
use rentbook_storage::{BillCache, ManualClock};
use rentbook_sync::BillSession;
use rentbook_test_utils::fixtures::{manual_cache, renter};
use rentbook_test_utils::ScriptedStore;

/// Monthly rent of the fixture renter.
pub const RENT: i64 = 9000;

pub struct Harness {
    pub store: Arc<ScriptedStore>,
    pub cache: Arc<BillCache>,
    pub clock: Arc<ManualClock>,
    pub session: BillSession<ScriptedStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        let store = Arc::new(ScriptedStore::new());
        let (cache, clock) = manual_cache(config.cache_ttl);
        let session = BillSession::new(Arc::clone(&store), Arc::clone(&cache), renter(RENT), config)
            .expect("default config should be valid");
        Self {
            store,
            cache,
            clock,
            session,
        }
    }

    /// Move the manual clock past the cache TTL.
    pub fn expire_cache(&self) {
        let past_ttl = self.cache.ttl() + Duration::from_secs(1);
        self.clock
            .advance(chrono::Duration::from_std(past_ttl).expect("ttl fits in chrono"));
    }
}
