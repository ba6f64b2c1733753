//! Period keys: the `(renter, month, year)` triple every bill is addressed by.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{RenterId, ValidationError};

/// Identifies one renter's bill for one calendar month.
///
/// The month is guaranteed to lie in `1..=12` and the year in
/// [`PeriodKey::MIN_YEAR`]`..=`[`PeriodKey::MAX_YEAR`]; construction goes
/// through [`PeriodKey::new`] so an out-of-range key can never address the
/// cache, and stepping a month either way never overflows the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPeriodKey", into = "RawPeriodKey")]
pub struct PeriodKey {
    entity_id: RenterId,
    year: i32,
    month: u32,
}

#[derive(Serialize, Deserialize)]
struct RawPeriodKey {
    entity_id: RenterId,
    month: u32,
    year: i32,
}

impl TryFrom<RawPeriodKey> for PeriodKey {
    type Error = ValidationError;

    fn try_from(raw: RawPeriodKey) -> Result<Self, Self::Error> {
        PeriodKey::new(raw.entity_id, raw.month, raw.year)
    }
}

impl From<PeriodKey> for RawPeriodKey {
    fn from(key: PeriodKey) -> Self {
        Self {
            entity_id: key.entity_id,
            month: key.month,
            year: key.year,
        }
    }
}

impl PeriodKey {
    pub const MIN_YEAR: i32 = 1;
    pub const MAX_YEAR: i32 = 9999;

    /// Create a key, rejecting months outside `1..=12` and years outside
    /// `MIN_YEAR..=MAX_YEAR`.
    pub fn new(entity_id: RenterId, month: u32, year: i32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::MonthOutOfRange { month });
        }
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(ValidationError::YearOutOfRange { year });
        }
        Ok(Self {
            entity_id,
            year,
            month,
        })
    }

    /// Key for the month containing `date`. Calendar dates stay far inside
    /// `i32`, so month stepping is safe for these keys too.
    pub fn from_date(entity_id: RenterId, date: NaiveDate) -> Self {
        Self {
            entity_id,
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn entity_id(&self) -> RenterId {
        self.entity_id
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The calendar month before this one (January wraps to December of the prior year).
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
                ..*self
            }
        } else {
            Self {
                month: self.month - 1,
                ..*self
            }
        }
    }

    /// The calendar month after this one (December wraps to January of the next year).
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
                ..*self
            }
        } else {
            Self {
                month: self.month + 1,
                ..*self
            }
        }
    }

    /// Previous and next period, in that order.
    pub fn adjacent(&self) -> [Self; 2] {
        [self.previous(), self.next()]
    }

    /// String form used as the legacy cache key: `"{entity}-{year}-{month}"`.
    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.entity_id, self.year, self.month)
    }
}

// =============================================================================
// TESTS
// =============================================================================
