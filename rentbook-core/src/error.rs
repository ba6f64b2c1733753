//! Error types for rentbook operations

use thiserror::Error;

use crate::{PeriodKey, RenterId};

/// Bill record store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Bill store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Read failed for period {key}: {reason}")]
    ReadFailed { key: PeriodKey, reason: String },

    #[error("Write rejected for period {key}: {reason}")]
    WriteRejected { key: PeriodKey, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Month out of range: {month} (expected 1-12)")]
    MonthOutOfRange { month: u32 },

    #[error("Year out of range: {year} (expected 1-9999)")]
    YearOutOfRange { year: i32 },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Period {key} does not belong to renter {renter_id}")]
    ForeignPeriod { key: PeriodKey, renter_id: RenterId },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Synchronization errors raised by the coordinators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("A save is already in flight for period {key}")]
    SaveInProgress { key: PeriodKey },

    #[error("Invalid save transition for period {key}: {from} -> {to}")]
    InvalidTransition {
        key: PeriodKey,
        from: String,
        to: String,
    },

    #[error("No period is currently active")]
    NoActivePeriod,
}

/// Master error type for all rentbook errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RentbookError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Result type alias for rentbook operations.
pub type RentbookResult<T> = Result<T, RentbookError>;

// =============================================================================
// TESTS
// =============================================================================
