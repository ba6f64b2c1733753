//! Synchronization engine configuration

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, RenterId, RentbookError, RentbookResult};

/// How long a cached snapshot counts as fresh.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Configuration for the cache and the fetch coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Age after which a cached snapshot is reported stale.
    pub cache_ttl: Duration,
    /// Whether navigation pre-fetches the previous and next periods.
    pub preload_adjacent: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            preload_adjacent: true,
        }
    }
}

impl SyncConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Enable or disable adjacent-period preloading.
    pub fn with_preload(mut self, enabled: bool) -> Self {
        self.preload_adjacent = enabled;
        self
    }

    pub fn validate(&self) -> RentbookResult<()> {
        if self.cache_ttl.is_zero() {
            return Err(RentbookError::Config(ConfigError::InvalidValue {
                field: "cache_ttl".to_string(),
                value: format!("{:?}", self.cache_ttl),
                reason: "cache_ttl must be positive".to_string(),
            }));
        }
        Ok(())
    }
}

/// The renter a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenterProfile {
    pub id: RenterId,
    /// Base amount a fresh bill starts from.
    pub monthly_rent: Decimal,
}

impl RenterProfile {
    pub fn new(id: RenterId, monthly_rent: Decimal) -> Self {
        Self { id, monthly_rent }
    }
}

// =============================================================================
// TESTS
// =============================================================================
