//! Time slot model.
//!
//! Slots are the atomic, indivisible units of schedulable time. All rooms
//! share one global total order of slots, given by `ordinal`.
//!
//! # Time Model
//! All times are in milliseconds relative to an event epoch chosen by the
//! consumer. A slot is the half-open interval `[start_ms, end_ms)`.

use serde::{Deserialize, Serialize};

/// A schedulable time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Unique slot identifier.
    pub id: String,
    /// Slot start (ms, inclusive).
    pub start_ms: i64,
    /// Slot end (ms, exclusive).
    pub end_ms: i64,
    /// Position in the global slot order.
    pub ordinal: u32,
}

impl Slot {
    /// Creates a new slot.
    pub fn new(id: impl Into<String>, ordinal: u32, start_ms: i64, end_ms: i64) -> Self {
        Self {
            id: id.into(),
            start_ms,
            end_ms,
            ordinal,
        }
    }

    /// Length of the slot (ms).
    #[inline]
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Whether `next` starts exactly when this slot ends.
    ///
    /// Sessions spanning several slots may only run across back-to-back
    /// slots; a gap (lunch, overnight) breaks the run.
    #[inline]
    pub fn is_followed_by(&self, next: &Slot) -> bool {
        self.end_ms == next.start_ms
    }
}

/// Builds `count` back-to-back slots of `length_ms` starting at `start_ms`.
///
/// Slot ids are `"{prefix}{ordinal}"`.
pub fn contiguous_slots(prefix: &str, count: u32, start_ms: i64, length_ms: i64) -> Vec<Slot> {
    (0..count)
        .map(|i| {
            let start = start_ms + i64::from(i) * length_ms;
            Slot::new(format!("{prefix}{i}"), i, start, start + length_ms)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_duration() {
        let s = Slot::new("t0", 0, 0, 3_600_000);
        assert_eq!(s.duration_ms(), 3_600_000);
    }

    #[test]
    fn test_followed_by() {
        let a = Slot::new("a", 0, 0, 100);
        let b = Slot::new("b", 1, 100, 200);
        let c = Slot::new("c", 2, 300, 400);
        assert!(a.is_followed_by(&b));
        assert!(!b.is_followed_by(&c));
    }

    #[test]
    fn test_contiguous_slots() {
        let slots = contiguous_slots("t", 3, 1000, 60);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2].id, "t2");
        assert_eq!(slots[2].ordinal, 2);
        assert_eq!(slots[2].start_ms, 1120);
        assert!(slots[0].is_followed_by(&slots[1]));
    }
}
