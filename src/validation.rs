//! Input validation and schedule checking.
//!
//! [`validate_model`] checks structural integrity of a domain model before
//! compilation. It detects:
//! - Duplicate IDs (sessions, rooms, slots, speakers, tracks, ordinals)
//! - Pins and registry references to unknown rooms, slots, speakers, tracks
//! - Zero durations and durations longer than the slot universe
//! - Inverted slot times and an empty slot universe
//!
//! [`check_schedule`] re-verifies a finished schedule against the hard
//! constraints by exhaustive pairwise comparison. It is independent of the
//! search engine and is what tests use to audit engine output.

use crate::config::KeynoteConfig;
use crate::models::{DomainModel, HardConstraint, Schedule, Violation, ViolationType};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID (or two slots the same ordinal).
    DuplicateId,
    /// Reference to a room that doesn't exist.
    UnknownRoom,
    /// Reference to a slot that doesn't exist.
    UnknownSlot,
    /// Reference to a speaker outside the speaker registry.
    UnknownSpeaker,
    /// Reference to a track outside the track registry.
    UnknownTrack,
    /// Reference to a session that doesn't exist.
    UnknownSession,
    /// Session duration is zero.
    InvalidDuration,
    /// Session duration exceeds the number of slots.
    DurationExceedsHorizon,
    /// Slot ends before (or when) it starts.
    InvalidSlot,
    /// No slots at all while sessions exist.
    EmptySlotUniverse,
    /// Soft weight negative or not finite.
    InvalidWeight,
    /// Budget limit of zero.
    InvalidBudget,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a domain model.
///
/// Checks:
/// 1. No duplicate session, room, slot, speaker or track IDs
/// 2. No two slots share an ordinal
/// 3. Every slot has `end_ms > start_ms`
/// 4. A non-empty slot universe when sessions exist
/// 5. Every session has `duration > 0` and `duration <= slot count`
/// 6. Pins reference existing rooms and slots
/// 7. Speaker/track ids are registered (when the registry is non-empty)
/// 8. Speaker unavailability references existing slots
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_model(model: &DomainModel) -> ValidationResult {
    let mut errors = Vec::new();

    let room_ids = collect_unique(model.rooms.iter().map(|r| r.id.as_str()), "room", &mut errors);
    let slot_ids = collect_unique(model.slots.iter().map(|s| s.id.as_str()), "slot", &mut errors);
    collect_unique(model.sessions.iter().map(|s| s.id.as_str()), "session", &mut errors);
    let speaker_ids =
        collect_unique(model.speakers.iter().map(|s| s.id.as_str()), "speaker", &mut errors);
    let track_ids = collect_unique(model.tracks.iter().map(|t| t.id.as_str()), "track", &mut errors);

    let mut ordinals: HashMap<u32, &str> = HashMap::new();
    for slot in &model.slots {
        if let Some(other) = ordinals.insert(slot.ordinal, slot.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!(
                    "Slots '{}' and '{}' share ordinal {}",
                    other, slot.id, slot.ordinal
                ),
            ));
        }
        if slot.end_ms <= slot.start_ms {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidSlot,
                format!("Slot '{}' ends at or before its start", slot.id),
            ));
        }
    }

    if model.slots.is_empty() && !model.sessions.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptySlotUniverse,
            "Sessions exist but the slot universe is empty",
        ));
    }

    let horizon = model.slots.len() as u64;
    for session in &model.sessions {
        if session.duration == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                format!("Session '{}' has zero duration", session.id),
            ));
        } else if u64::from(session.duration) > horizon && horizon > 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::DurationExceedsHorizon,
                format!(
                    "Session '{}' lasts {} slots but the slot universe has only {}",
                    session.id, session.duration, horizon
                ),
            ));
        }

        if let Some(room) = &session.pinned_room {
            if !room_ids.contains(room.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownRoom,
                    format!("Session '{}' is pinned to unknown room '{}'", session.id, room),
                ));
            }
        }
        if let Some(slot) = &session.pinned_slot {
            if !slot_ids.contains(slot.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownSlot,
                    format!("Session '{}' is pinned to unknown slot '{}'", session.id, slot),
                ));
            }
        }
        if !session.speaker_id.is_empty()
            && !speaker_ids.is_empty()
            && !speaker_ids.contains(session.speaker_id.as_str())
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownSpeaker,
                format!(
                    "Session '{}' references unknown speaker '{}'",
                    session.id, session.speaker_id
                ),
            ));
        }
        if !session.track_id.is_empty()
            && !track_ids.is_empty()
            && !track_ids.contains(session.track_id.as_str())
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTrack,
                format!(
                    "Session '{}' references unknown track '{}'",
                    session.id, session.track_id
                ),
            ));
        }
    }

    for speaker in &model.speakers {
        for slot in &speaker.unavailable_slots {
            if !slot_ids.contains(slot.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownSlot,
                    format!(
                        "Speaker '{}' is unavailable at unknown slot '{}'",
                        speaker.id, slot
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates keynote designations against a model.
pub fn validate_keynotes(model: &DomainModel, keynotes: &KeynoteConfig) -> ValidationResult {
    let mut errors = Vec::new();

    for id in &keynotes.sessions {
        if model.session(id).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownSession,
                format!("Keynote designation references unknown session '{id}'"),
            ));
        }
    }
    for id in &keynotes.preferred_slots {
        if model.slot(id).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownSlot,
                format!("Preferred keynote slot '{id}' does not exist"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_unique<'a>(
    ids: impl Iterator<Item = &'a str>,
    what: &str,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {what} ID: {id}"),
            ));
        }
    }
    seen
}

/// Checks a schedule against the model and the active hard constraints.
///
/// Every session of the model must be assigned exactly once. Returns all
/// violations found; an empty vector means the schedule is acceptable.
pub fn check_schedule(
    schedule: &Schedule,
    model: &DomainModel,
    hard_constraints: &BTreeSet<HardConstraint>,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let slots = model.ordered_slots();
    let position: HashMap<&str, usize> = slots
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    // (session index, first position, end position exclusive)
    let mut placed: Vec<(usize, usize, usize)> = Vec::new();

    for (key, assignment) in &schedule.assignments {
        let ids = vec![key.clone()];
        let Some(session_idx) = model.sessions.iter().position(|s| s.id == *key) else {
            violations.push(Violation::new(
                ViolationType::UnknownReference,
                ids,
                format!("Assignment for unknown session '{key}'"),
            ));
            continue;
        };
        let session = &model.sessions[session_idx];
        if assignment.session_id != *key {
            violations.push(Violation::new(
                ViolationType::UnknownReference,
                ids.clone(),
                format!(
                    "Assignment keyed '{}' names session '{}'",
                    key, assignment.session_id
                ),
            ));
        }
        let Some(room) = model.room(&assignment.room_id) else {
            violations.push(Violation::new(
                ViolationType::UnknownReference,
                ids,
                format!("Session '{key}' uses unknown room '{}'", assignment.room_id),
            ));
            continue;
        };
        let Some(&start) = position.get(assignment.start_slot_id.as_str()) else {
            violations.push(Violation::new(
                ViolationType::UnknownReference,
                ids,
                format!("Session '{key}' starts at unknown slot '{}'", assignment.start_slot_id),
            ));
            continue;
        };

        let end = start + session.duration as usize;
        let in_universe = end <= slots.len()
            && (start + 1..end).all(|p| slots[p - 1].is_followed_by(slots[p]))
            && slots[end - 1].id == assignment.end_slot_id;
        if !in_universe {
            violations.push(Violation::new(
                ViolationType::OutsideSlotUniverse,
                ids.clone(),
                format!(
                    "Session '{key}' does not fit {} back-to-back slots from '{}'",
                    session.duration, assignment.start_slot_id
                ),
            ));
            continue;
        }

        if hard_constraints.contains(&HardConstraint::Capacity)
            && !room.fits(session.expected_attendance)
        {
            violations.push(Violation::new(
                ViolationType::CapacityExceeded,
                ids.clone(),
                format!(
                    "Session '{key}' expects {} attendees but room '{}' seats {}",
                    session.expected_attendance, room.id, room.capacity
                ),
            ));
        }

        let room_pin_broken = session
            .pinned_room
            .as_ref()
            .is_some_and(|r| *r != assignment.room_id);
        let slot_pin_broken = session
            .pinned_slot
            .as_ref()
            .is_some_and(|s| *s != assignment.start_slot_id);
        if room_pin_broken || slot_pin_broken {
            violations.push(Violation::new(
                ViolationType::PinViolated,
                ids.clone(),
                format!("Session '{key}' is not at its pinned placement"),
            ));
        }

        if let Some(speaker) = model.speaker(&session.speaker_id) {
            if slots[start..end]
                .iter()
                .any(|s| speaker.unavailable_slots.contains(&s.id))
            {
                violations.push(Violation::new(
                    ViolationType::SpeakerUnavailable,
                    ids.clone(),
                    format!("Speaker '{}' is unavailable during '{key}'", speaker.id),
                ));
            }
        }

        placed.push((session_idx, start, end));
    }

    for session in &model.sessions {
        if !schedule.assignments.contains_key(&session.id) {
            violations.push(Violation::new(
                ViolationType::MissingSession,
                vec![session.id.clone()],
                format!("Session '{}' is not scheduled", session.id),
            ));
        }
    }

    let rooms_exclusive = hard_constraints.contains(&HardConstraint::RoomExclusivity);
    let speakers_exclusive = hard_constraints.contains(&HardConstraint::SpeakerExclusivity);
    for i in 0..placed.len() {
        for j in (i + 1)..placed.len() {
            let (si, a_start, a_end) = placed[i];
            let (sj, b_start, b_end) = placed[j];
            if a_start >= b_end || b_start >= a_end {
                continue;
            }
            let (a, b) = (&model.sessions[si], &model.sessions[sj]);
            let pair = vec![a.id.clone(), b.id.clone()];
            if rooms_exclusive && schedule.assignments[&a.id].room_id == schedule.assignments[&b.id].room_id {
                violations.push(Violation::new(
                    ViolationType::RoomDoubleBooked,
                    pair.clone(),
                    format!("Sessions '{}' and '{}' overlap in the same room", a.id, b.id),
                ));
            }
            if speakers_exclusive && !a.speaker_id.is_empty() && a.speaker_id == b.speaker_id {
                violations.push(Violation::new(
                    ViolationType::SpeakerDoubleBooked,
                    pair,
                    format!(
                        "Speaker '{}' presents '{}' and '{}' at the same time",
                        a.speaker_id, a.id, b.id
                    ),
                ));
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Room, Session, Slot, Speaker, Track};

    fn all_hard() -> BTreeSet<HardConstraint> {
        HardConstraint::ALL.into_iter().collect()
    }

    fn sample_model() -> DomainModel {
        DomainModel::new()
            .with_session(Session::new("A").with_speaker("x").with_attendance(50))
            .with_session(Session::new("B").with_speaker("y").with_attendance(80).with_duration(2))
            .with_rooms([Room::new("R1", 100), Room::new("R2", 60)])
            .with_slots([
                Slot::new("t0", 0, 0, 100),
                Slot::new("t1", 1, 100, 200),
                Slot::new("t2", 2, 300, 400),
            ])
    }

    #[test]
    fn test_valid_model() {
        assert!(validate_model(&sample_model()).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let model = sample_model()
            .with_room(Room::new("R1", 10))
            .with_session(Session::new("A"))
            .with_slot(Slot::new("t9", 0, 500, 600));
        let errors = validate_model(&model).unwrap_err();
        let dupes = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::DuplicateId)
            .count();
        assert_eq!(dupes, 3); // room, session, ordinal
    }

    #[test]
    fn test_duration_checks() {
        let model = sample_model()
            .with_session(Session::new("Z").with_duration(0))
            .with_session(Session::new("L").with_duration(4));
        let errors = validate_model(&model).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::InvalidDuration));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DurationExceedsHorizon));
    }

    #[test]
    fn test_unknown_pins() {
        let model = sample_model()
            .with_session(Session::new("P").pinned_to_room("R9").pinned_to_slot("t9"));
        let errors = validate_model(&model).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::UnknownRoom));
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::UnknownSlot));
    }

    #[test]
    fn test_registries() {
        let model = sample_model()
            .with_speaker(Speaker::new("x").unavailable_at("t7"))
            .with_track(Track::new("general"));
        let errors = validate_model(&model).unwrap_err();
        // speaker 'y' unregistered, both sessions have track "" unregistered, t7 unknown
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::UnknownSpeaker));
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::UnknownTrack)
                .count(),
            2
        );
        assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::UnknownSlot));
    }

    #[test]
    fn test_invalid_slot_and_empty_universe() {
        let model = DomainModel::new().with_slot(Slot::new("bad", 0, 100, 100));
        let errors = validate_model(&model).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidSlot);

        let model = DomainModel::new().with_session(Session::new("A"));
        let errors = validate_model(&model).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::EmptySlotUniverse));
    }

    #[test]
    fn test_validate_keynotes() {
        let model = sample_model();
        let keynotes = KeynoteConfig {
            sessions: vec!["A".into(), "nope".into()],
            preferred_slots: vec!["t0".into(), "t8".into()],
            detect_by_title: false,
        };
        let errors = validate_keynotes(&model, &keynotes).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ValidationErrorKind::UnknownSession);
        assert_eq!(errors[1].kind, ValidationErrorKind::UnknownSlot);
    }

    fn assign(session: &str, room: &str, start: &str, end: &str, duration: u32) -> Assignment {
        Assignment::new(session, room, start).with_span(end, duration)
    }

    #[test]
    fn test_check_valid_schedule() {
        let schedule = Schedule::new()
            .with_assignment(assign("A", "R2", "t0", "t0", 1))
            .with_assignment(assign("B", "R1", "t0", "t1", 2));
        assert!(check_schedule(&schedule, &sample_model(), &all_hard()).is_empty());
    }

    #[test]
    fn test_check_room_double_booking() {
        let schedule = Schedule::new()
            .with_assignment(assign("A", "R1", "t1", "t1", 1))
            .with_assignment(assign("B", "R1", "t0", "t1", 2));
        let v = check_schedule(&schedule, &sample_model(), &all_hard());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::RoomDoubleBooked);

        let relaxed: BTreeSet<HardConstraint> = [HardConstraint::Capacity].into_iter().collect();
        assert!(check_schedule(&schedule, &sample_model(), &relaxed).is_empty());
    }

    #[test]
    fn test_check_speaker_double_booking() {
        let model = DomainModel::new()
            .with_sessions([
                Session::new("A").with_speaker("x"),
                Session::new("B").with_speaker("x"),
            ])
            .with_rooms([Room::new("R1", 10), Room::new("R2", 10)])
            .with_slot(Slot::new("t0", 0, 0, 100));
        let schedule = Schedule::new()
            .with_assignment(assign("A", "R1", "t0", "t0", 1))
            .with_assignment(assign("B", "R2", "t0", "t0", 1));
        let v = check_schedule(&schedule, &model, &all_hard());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::SpeakerDoubleBooked);
    }

    #[test]
    fn test_check_capacity_and_break() {
        // B needs 80 seats (R2 has 60) and t1→t2 crosses a break
        let schedule = Schedule::new()
            .with_assignment(assign("A", "R1", "t0", "t0", 1))
            .with_assignment(assign("B", "R2", "t1", "t2", 2));
        let v = check_schedule(&schedule, &sample_model(), &all_hard());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::OutsideSlotUniverse);

        let schedule = Schedule::new()
            .with_assignment(assign("A", "R1", "t2", "t2", 1))
            .with_assignment(assign("B", "R2", "t0", "t1", 2));
        let v = check_schedule(&schedule, &sample_model(), &all_hard());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::CapacityExceeded);
    }

    #[test]
    fn test_check_missing_and_unknown() {
        let schedule = Schedule::new()
            .with_assignment(assign("A", "R9", "t0", "t0", 1))
            .with_assignment(assign("Q", "R1", "t0", "t0", 1));
        let v = check_schedule(&schedule, &sample_model(), &all_hard());
        assert!(v.iter().any(|x| x.violation_type == ViolationType::MissingSession));
        assert_eq!(
            v.iter()
                .filter(|x| x.violation_type == ViolationType::UnknownReference)
                .count(),
            2
        );
    }
}
