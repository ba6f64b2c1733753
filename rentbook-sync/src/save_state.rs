//! Per-period save state machine.
//!
//! # State Transition Diagram
//!
//! ```text
//! Idle ──┬── save() ──→ Saving ──┬── write ok ───→ Confirmed ── save() → Saving
//!        │                       └── write error → RolledBack ── reload → Idle
//! ```
//!
//! A period in `Saving` or `RolledBack` rejects a new save until the
//! outstanding write (or its rollback reload) has finished.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use rentbook_core::{PeriodKey, SyncError};
use serde::{Deserialize, Serialize};

/// Where a period's latest save stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Confirmed,
    RolledBack,
}

impl SaveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveState::Idle => "idle",
            SaveState::Saving => "saving",
            SaveState::Confirmed => "confirmed",
            SaveState::RolledBack => "rolled_back",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: SaveState) -> bool {
        matches!(
            (self, next),
            (SaveState::Idle, SaveState::Saving)
                | (SaveState::Confirmed, SaveState::Saving)
                | (SaveState::Saving, SaveState::Confirmed)
                | (SaveState::Saving, SaveState::RolledBack)
                | (SaveState::RolledBack, SaveState::Idle)
        )
    }

    /// A write or its rollback is still outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SaveState::Saving | SaveState::RolledBack)
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Save states of every period touched this session.
#[derive(Debug, Default)]
pub struct SaveLedger {
    states: Mutex<HashMap<PeriodKey, SaveState>>,
}

impl SaveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: PeriodKey) -> SaveState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
            .unwrap_or_default()
    }

    /// Start a save for `key`.
    pub fn begin(&self, key: PeriodKey) -> Result<(), SyncError> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let current = states.get(&key).copied().unwrap_or_default();
        if current.is_in_flight() {
            return Err(SyncError::SaveInProgress { key });
        }
        states.insert(key, SaveState::Saving);
        Ok(())
    }

    /// Move `key` to `next`, returning the state it left.
    pub fn transition(&self, key: PeriodKey, next: SaveState) -> Result<SaveState, SyncError> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let current = states.get(&key).copied().unwrap_or_default();
        if !current.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                key,
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        states.insert(key, next);
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PeriodKey {
        PeriodKey::new(2, 9, 2024).expect("key should be valid")
    }

    #[test]
    fn test_happy_path() {
        let ledger = SaveLedger::new();
        assert_eq!(ledger.state(key()), SaveState::Idle);
        ledger.begin(key()).expect("begin should succeed");
        ledger
            .transition(key(), SaveState::Confirmed)
            .expect("confirm should succeed");
        ledger.begin(key()).expect("confirmed period can save again");
    }

    #[test]
    fn test_rollback_path_returns_to_idle() {
        let ledger = SaveLedger::new();
        ledger.begin(key()).expect("begin should succeed");
        ledger
            .transition(key(), SaveState::RolledBack)
            .expect("rollback should succeed");
        assert!(matches!(
            ledger.begin(key()),
            Err(SyncError::SaveInProgress { .. })
        ));
        let left = ledger
            .transition(key(), SaveState::Idle)
            .expect("reload should return to idle");
        assert_eq!(left, SaveState::RolledBack);
    }

    #[test]
    fn test_second_save_rejected_while_saving() {
        let ledger = SaveLedger::new();
        ledger.begin(key()).expect("begin should succeed");
        assert_eq!(
            ledger.begin(key()),
            Err(SyncError::SaveInProgress { key: key() })
        );
    }

    #[test]
    fn test_invalid_transition_reported() {
        let ledger = SaveLedger::new();
        let err = ledger
            .transition(key(), SaveState::Confirmed)
            .expect_err("idle cannot confirm");
        assert_eq!(
            err,
            SyncError::InvalidTransition {
                key: key(),
                from: "idle".to_string(),
                to: "confirmed".to_string(),
            }
        );
    }
}
