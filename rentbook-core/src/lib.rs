//! rentbook Core - Bill Types
//!
//! Period keys, bill snapshots, stored record shapes and the error types every
//! other rentbook crate builds on. Nothing in here performs I/O.

pub mod bill;
pub mod carry_forward;
pub mod config;
pub mod error;
pub mod identity;
pub mod period;
pub mod record;
pub mod totals;

pub use bill::{
    BillSnapshot, ElectricityCharge, ExpenseEntry, FlatCharge, MotorCharge, PaymentEntry,
    PaymentMethod, DEFAULT_MOTOR_OCCUPANTS, DEFAULT_UNIT_MULTIPLIER,
};
pub use carry_forward::{carry_forward, PreviousReadings};
pub use config::{RenterProfile, SyncConfig, DEFAULT_CACHE_TTL};
pub use error::{ConfigError, RentbookError, RentbookResult, StoreError, SyncError, ValidationError};
pub use identity::{new_record_id, RecordId, RenterId, Timestamp};
pub use period::PeriodKey;
pub use record::{
    BillRecord, BillWithDetails, BillWrite, ExpenseRecord, PaymentRecord, SaveBillResult,
};
pub use totals::BillTotals;
