//! Identity types for rentbook records

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Renter identifier, assigned by the backing database.
pub type RenterId = i64;

/// Durable identifier of a bill, expense or payment row.
/// UUIDv7 keeps ids sortable by creation time.
pub type RecordId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 RecordId (timestamp-sortable).
pub fn new_record_id() -> RecordId {
    Uuid::now_v7()
}
