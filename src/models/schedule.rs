//! Schedule (solution) model.
//!
//! A schedule maps each session id to the room and run of slots it
//! occupies. Schedules are immutable result values: the engine publishes a
//! new one on every run and never edits a published one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A session-room-slot assignment.
///
/// The session occupies `duration` consecutive slots starting at
/// `start_slot_id` and ending with `end_slot_id` (inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned session.
    pub session_id: String,
    /// Hosting room.
    pub room_id: String,
    /// First occupied slot.
    pub start_slot_id: String,
    /// Last occupied slot.
    pub end_slot_id: String,
    /// Start time of the first slot (ms).
    pub start_ms: i64,
    /// End time of the last slot (ms).
    pub end_ms: i64,
    /// Number of slots occupied.
    pub duration: u32,
}

impl Assignment {
    /// Creates a single-slot assignment with zero-length timing.
    ///
    /// Mostly useful for hand-built prior schedules; the engine always
    /// fills in slot ends and timestamps.
    pub fn new(
        session_id: impl Into<String>,
        room_id: impl Into<String>,
        start_slot_id: impl Into<String>,
    ) -> Self {
        let start_slot_id = start_slot_id.into();
        Self {
            session_id: session_id.into(),
            room_id: room_id.into(),
            end_slot_id: start_slot_id.clone(),
            start_slot_id,
            start_ms: 0,
            end_ms: 0,
            duration: 1,
        }
    }

    /// Sets the last occupied slot and run length.
    pub fn with_span(mut self, end_slot_id: impl Into<String>, duration: u32) -> Self {
        self.end_slot_id = end_slot_id.into();
        self.duration = duration;
        self
    }

    /// Sets wall-clock timing.
    pub fn with_times(mut self, start_ms: i64, end_ms: i64) -> Self {
        self.start_ms = start_ms;
        self.end_ms = end_ms;
        self
    }

    /// Whether both assignments use the same room and start slot.
    #[inline]
    pub fn same_placement(&self, other: &Assignment) -> bool {
        self.room_id == other.room_id && self.start_slot_id == other.start_slot_id
    }
}

/// A complete timetable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Assignments keyed by session id.
    pub assignments: BTreeMap<String, Assignment>,
}

/// A hard-constraint violation found by [`crate::validation::check_schedule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Sessions involved.
    pub session_ids: Vec<String>,
    /// Human-readable description.
    pub message: String,
}

/// Classification of schedule violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Two sessions share a room over overlapping slots.
    RoomDoubleBooked,
    /// A speaker presents two overlapping sessions.
    SpeakerDoubleBooked,
    /// Room too small for the expected audience.
    CapacityExceeded,
    /// The slot run leaves the slot universe or is not back-to-back.
    OutsideSlotUniverse,
    /// A session, room or slot id that the model does not know.
    UnknownReference,
    /// A session of the model has no assignment.
    MissingSession,
    /// A pin is not honored.
    PinViolated,
    /// A speaker presents during a declared unavailable slot.
    SpeakerUnavailable,
}

impl Violation {
    pub(crate) fn new(
        violation_type: ViolationType,
        session_ids: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            session_ids,
            message: message.into(),
        }
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an assignment, replacing any previous one for the session.
    pub fn insert(&mut self, assignment: Assignment) {
        self.assignments
            .insert(assignment.session_id.clone(), assignment);
    }

    /// Builder variant of [`Schedule::insert`].
    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.insert(assignment);
        self
    }

    /// Looks up a session's assignment.
    pub fn get(&self, session_id: &str) -> Option<&Assignment> {
        self.assignments.get(session_id)
    }

    /// Iterates assignments in session id order.
    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the schedule is empty.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assignments in a room, ordered by start time.
    pub fn assignments_for_room(&self, room_id: &str) -> Vec<&Assignment> {
        let mut out: Vec<&Assignment> = self
            .assignments
            .values()
            .filter(|a| a.room_id == room_id)
            .collect();
        out.sort_by(|a, b| a.start_ms.cmp(&b.start_ms).then_with(|| a.session_id.cmp(&b.session_id)));
        out
    }

    /// Latest end time across all assignments (ms).
    pub fn makespan_ms(&self) -> i64 {
        self.assignments.values().map(|a| a.end_ms).max().unwrap_or(0)
    }

    /// Session ids whose placement differs from `other`, or that only one
    /// of the two schedules contains.
    pub fn diff(&self, other: &Schedule) -> Vec<String> {
        let mut changed: Vec<String> = self
            .assignments
            .iter()
            .filter(|(id, a)| other.get(id).map_or(true, |b| !a.same_placement(b)))
            .map(|(id, _)| id.clone())
            .collect();
        changed.extend(
            other
                .assignments
                .keys()
                .filter(|id| !self.assignments.contains_key(*id))
                .cloned(),
        );
        changed.sort();
        changed
    }
}
