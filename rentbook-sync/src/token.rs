//! Request generations.
//!
//! Every navigation and every reload takes a fresh generation. A response is
//! allowed to touch the view only while the generation it was issued under is
//! still the latest one, so whichever request was issued last wins.

use rentbook_core::PeriodKey;

/// Proof that a request was issued, carried into the response handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    key: PeriodKey,
    generation: u64,
}

impl RequestTicket {
    pub fn key(&self) -> PeriodKey {
        self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Monotonic counter behind [`RequestTicket`]s.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: u64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for `key`, superseding every earlier ticket.
    pub fn issue(&mut self, key: PeriodKey) -> RequestTicket {
        self.current += 1;
        RequestTicket {
            key,
            generation: self.current,
        }
    }

    /// Supersede every outstanding ticket without issuing a new one.
    pub fn advance(&mut self) {
        self.current += 1;
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        ticket.generation == self.current
    }

    pub fn current(&self) -> u64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(month: u32) -> PeriodKey {
        PeriodKey::new(1, month, 2024).expect("key should be valid")
    }

    #[test]
    fn test_latest_ticket_wins() {
        let mut generation = RequestGeneration::new();
        let first = generation.issue(key(3));
        assert!(generation.is_current(&first));

        let second = generation.issue(key(4));
        assert!(!generation.is_current(&first));
        assert!(generation.is_current(&second));
        assert_eq!(second.key(), key(4));
    }

    #[test]
    fn test_same_key_reissue_supersedes() {
        let mut generation = RequestGeneration::new();
        let first = generation.issue(key(3));
        let second = generation.issue(key(3));
        assert!(!generation.is_current(&first));
        assert!(generation.is_current(&second));
    }

    #[test]
    fn test_advance_supersedes_all() {
        let mut generation = RequestGeneration::new();
        let ticket = generation.issue(key(3));
        generation.advance();
        assert!(!generation.is_current(&ticket));
        assert_eq!(generation.current(), 2);
    }
}
