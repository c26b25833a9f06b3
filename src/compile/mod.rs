//! Constraint compiler.
//!
//! Turns a [`DomainModel`] and a [`SolverConfig`] into a [`CompiledModel`]:
//! per-session candidate domains of (room, start position) pairs, already
//! pruned by capacity, duration, contiguity, pins and speaker availability,
//! plus cover indexes the search engine uses for propagation.
//!
//! # Canonical Order
//! Sessions are indexed by ascending id and slots by ascending ordinal, so
//! index order is the tie-break order of the search and compilation is
//! independent of input permutation for sessions and slots.
//!
//! # Reference
//! Baptiste et al. (2001), "Constraint-Based Scheduling", Ch. 1

use std::ops::Range;

use tracing::debug;

use crate::config::SolverConfig;
use crate::error::ConfigurationError;
use crate::models::{ConstraintKind, DomainModel, HardConstraint, Session, Slot};
use crate::objective::ObjectiveContext;
use crate::validation::{validate_keynotes, validate_model};

/// A concrete placement: session `session` in room `room` over slot
/// positions `[start, end)`.
///
/// Indexes are compiled indexes (see [`CompiledModel`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Compiled session index.
    pub session: usize,
    /// Room index (model order).
    pub room: usize,
    /// First slot position.
    pub start: usize,
    /// One past the last slot position.
    pub end: usize,
}

impl Placement {
    /// Whether two placements share at least one slot position.
    #[inline]
    pub fn overlaps(&self, other: &Placement) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Idle positions between two placements (0 if adjacent or overlapping).
    #[inline]
    pub fn gap_to(&self, other: &Placement) -> usize {
        other
            .start
            .saturating_sub(self.end)
            .max(self.start.saturating_sub(other.end))
    }
}

/// A session whose candidate domain is empty after compilation, with the
/// constraints that emptied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyDomain {
    /// Compiled session index.
    pub session: usize,
    /// Causes (each one, if lifted, would leave some candidate), or every
    /// contributing filter when no single one suffices.
    pub causes: Vec<ConstraintKind>,
}

/// The run-scoped solvable model.
///
/// Borrows the domain model; never outlives the run that compiled it.
#[derive(Debug, Clone)]
pub struct CompiledModel<'a> {
    model: &'a DomainModel,
    config: SolverConfig,
    /// Compiled session index → index in `model.sessions`.
    session_order: Vec<usize>,
    /// Slot position → index in `model.slots`.
    slot_order: Vec<usize>,
    candidates: Vec<Placement>,
    domains: Vec<Range<usize>>,
    /// Speaker group per compiled session (`None` = no speaker).
    speaker_of: Vec<Option<usize>>,
    speaker_count: usize,
    /// `room * slot_count + position` → candidates covering that cell.
    room_cover: Vec<Vec<u32>>,
    /// `speaker * slot_count + position` → candidates covering that cell.
    speaker_cover: Vec<Vec<u32>>,
    empty_domains: Vec<EmptyDomain>,
    objective: ObjectiveContext,
}

#[derive(Clone, Copy)]
struct Filters {
    capacity: bool,
    pins: bool,
    availability: bool,
    contiguity: bool,
}

impl Filters {
    const ALL: Filters = Filters {
        capacity: true,
        pins: true,
        availability: true,
        contiguity: true,
    };
}

/// Compiles a model.
///
/// Fails with a [`ConfigurationError`] (before any search) when the model
/// or configuration references unknown entities, a duration is zero or
/// exceeds the slot universe, or a weight/budget is invalid.
pub fn compile<'a>(
    model: &'a DomainModel,
    config: &SolverConfig,
) -> Result<CompiledModel<'a>, ConfigurationError> {
    let mut issues = Vec::new();
    if let Err(e) = config.validate() {
        issues.extend(e);
    }
    if let Err(e) = validate_model(model) {
        issues.extend(e);
    }
    if let Err(e) = validate_keynotes(model, &config.keynotes) {
        issues.extend(e);
    }
    if !issues.is_empty() {
        return Err(ConfigurationError::new(issues));
    }

    let session_order = canonical_session_order(model);
    let slot_order = canonical_slot_order(model);
    let slots: Vec<&Slot> = slot_order.iter().map(|&i| &model.slots[i]).collect();
    let slot_count = slots.len();
    let run_length = back_to_back_run_lengths(&slots);

    let mut speaker_ids: Vec<&str> = Vec::new();
    let speaker_of: Vec<Option<usize>> = session_order
        .iter()
        .map(|&i| {
            let id = model.sessions[i].speaker_id.as_str();
            if id.is_empty() {
                return None;
            }
            Some(match speaker_ids.iter().position(|s| *s == id) {
                Some(pos) => pos,
                None => {
                    speaker_ids.push(id);
                    speaker_ids.len() - 1
                }
            })
        })
        .collect();

    let capacity_on = config.enforces(HardConstraint::Capacity);
    let mut candidates = Vec::new();
    let mut domains = Vec::with_capacity(session_order.len());
    let mut empty_domains = Vec::new();

    for (idx, &model_idx) in session_order.iter().enumerate() {
        let session = &model.sessions[model_idx];
        let first = candidates.len();
        let filters = Filters {
            capacity: capacity_on,
            ..Filters::ALL
        };
        enumerate_candidates(model, session, idx, &slots, &run_length, filters, &mut candidates);
        domains.push(first..candidates.len());

        if candidates.len() == first {
            let causes = explain_empty_domain(model, session, idx, &slots, &run_length, capacity_on);
            debug!(session = %session.id, ?causes, "empty candidate domain");
            empty_domains.push(EmptyDomain {
                session: idx,
                causes,
            });
        }
    }

    let room_count = model.rooms.len();
    let mut room_cover = Vec::new();
    if config.enforces(HardConstraint::RoomExclusivity) {
        room_cover = vec![Vec::new(); room_count * slot_count];
        for (id, c) in candidates.iter().enumerate() {
            for pos in c.start..c.end {
                room_cover[c.room * slot_count + pos].push(id as u32);
            }
        }
    }

    let speaker_count = speaker_ids.len();
    let mut speaker_cover = Vec::new();
    if config.enforces(HardConstraint::SpeakerExclusivity) {
        speaker_cover = vec![Vec::new(); speaker_count * slot_count];
        for (id, c) in candidates.iter().enumerate() {
            if let Some(spk) = speaker_of[c.session] {
                for pos in c.start..c.end {
                    speaker_cover[spk * slot_count + pos].push(id as u32);
                }
            }
        }
    }

    let objective = ObjectiveContext::new(model, config);

    debug!(
        sessions = session_order.len(),
        rooms = room_count,
        slots = slot_count,
        candidates = candidates.len(),
        "compiled model"
    );

    Ok(CompiledModel {
        model,
        config: config.clone(),
        session_order,
        slot_order,
        candidates,
        domains,
        speaker_of,
        speaker_count,
        room_cover,
        speaker_cover,
        empty_domains,
        objective,
    })
}

/// Model session indexes sorted by session id.
pub(crate) fn canonical_session_order(model: &DomainModel) -> Vec<usize> {
    let mut order: Vec<usize> = (0..model.sessions.len()).collect();
    order.sort_by(|&a, &b| model.sessions[a].id.cmp(&model.sessions[b].id));
    order
}

/// Model slot indexes sorted by ordinal (then id).
pub(crate) fn canonical_slot_order(model: &DomainModel) -> Vec<usize> {
    let mut order: Vec<usize> = (0..model.slots.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (&model.slots[a], &model.slots[b]);
        x.ordinal.cmp(&y.ordinal).then_with(|| x.id.cmp(&y.id))
    });
    order
}

/// `run[p]` = number of back-to-back slots starting at position `p`.
fn back_to_back_run_lengths(slots: &[&Slot]) -> Vec<usize> {
    let mut run = vec![1; slots.len()];
    for p in (0..slots.len().saturating_sub(1)).rev() {
        if slots[p].is_followed_by(slots[p + 1]) {
            run[p] = run[p + 1] + 1;
        }
    }
    run
}

fn enumerate_candidates(
    model: &DomainModel,
    session: &Session,
    idx: usize,
    slots: &[&Slot],
    run_length: &[usize],
    filters: Filters,
    out: &mut Vec<Placement>,
) {
    let duration = session.duration as usize;
    if duration == 0 || duration > slots.len() {
        return;
    }
    let unavailable: &[String] = match (filters.availability, model.speaker(&session.speaker_id)) {
        (true, Some(speaker)) => speaker.unavailable_slots.as_slice(),
        _ => &[],
    };

    for start in 0..=(slots.len() - duration) {
        if filters.contiguity && run_length[start] < duration {
            continue;
        }
        if filters.pins {
            if let Some(pin) = &session.pinned_slot {
                if slots[start].id != *pin {
                    continue;
                }
            }
        }
        let end = start + duration;
        if slots[start..end].iter().any(|s| unavailable.contains(&s.id)) {
            continue;
        }
        for (room_idx, room) in model.rooms.iter().enumerate() {
            if filters.pins && session.pinned_room.as_ref().is_some_and(|r| *r != room.id) {
                continue;
            }
            if filters.capacity && !room.fits(session.expected_attendance) {
                continue;
            }
            out.push(Placement {
                session: idx,
                room: room_idx,
                start,
                end,
            });
        }
    }
}

fn explain_empty_domain(
    model: &DomainModel,
    session: &Session,
    idx: usize,
    slots: &[&Slot],
    run_length: &[usize],
    capacity_on: bool,
) -> Vec<ConstraintKind> {
    let base = Filters {
        capacity: capacity_on,
        ..Filters::ALL
    };
    let mut lifts: Vec<(ConstraintKind, Filters)> = Vec::new();
    if capacity_on {
        lifts.push((ConstraintKind::Capacity, Filters { capacity: false, ..base }));
    }
    if session.is_pinned() {
        lifts.push((ConstraintKind::FixedPin, Filters { pins: false, ..base }));
    }
    if model
        .speaker(&session.speaker_id)
        .is_some_and(|s| !s.unavailable_slots.is_empty())
    {
        lifts.push((ConstraintKind::SpeakerAvailability, Filters { availability: false, ..base }));
    }
    if session.duration > 1 {
        lifts.push((ConstraintKind::SlotContiguity, Filters { contiguity: false, ..base }));
    }

    let mut scratch = Vec::new();
    let mut sufficient = Vec::new();
    for (kind, filters) in &lifts {
        scratch.clear();
        enumerate_candidates(model, session, idx, slots, run_length, *filters, &mut scratch);
        if !scratch.is_empty() {
            sufficient.push(*kind);
        }
    }

    if sufficient.is_empty() {
        lifts.into_iter().map(|(kind, _)| kind).collect()
    } else {
        sufficient
    }
}

impl<'a> CompiledModel<'a> {
    /// The source domain model.
    #[inline]
    pub fn model(&self) -> &'a DomainModel {
        self.model
    }

    /// The configuration this model was compiled with.
    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Number of sessions.
    #[inline]
    pub fn session_count(&self) -> usize {
        self.session_order.len()
    }

    /// Number of slot positions.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_order.len()
    }

    /// Number of rooms.
    #[inline]
    pub fn room_count(&self) -> usize {
        self.model.rooms.len()
    }

    /// Number of distinct speakers.
    #[inline]
    pub fn speaker_count(&self) -> usize {
        self.speaker_count
    }

    /// Total number of candidates across all domains.
    #[inline]
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// A candidate by global id.
    #[inline]
    pub fn candidate(&self, id: usize) -> Placement {
        self.candidates[id]
    }

    /// Global candidate ids of a session's domain.
    #[inline]
    pub fn domain(&self, session: usize) -> Range<usize> {
        self.domains[session].clone()
    }

    /// The session at a compiled index.
    #[inline]
    pub fn session(&self, session: usize) -> &'a Session {
        &self.model.sessions[self.session_order[session]]
    }

    /// Compiled index of a session id.
    pub fn session_index(&self, id: &str) -> Option<usize> {
        self.session_order
            .binary_search_by(|&i| self.model.sessions[i].id.as_str().cmp(id))
            .ok()
    }

    /// The slot at a position.
    #[inline]
    pub fn slot(&self, position: usize) -> &'a Slot {
        &self.model.slots[self.slot_order[position]]
    }

    /// Position of a slot id.
    pub fn slot_position(&self, id: &str) -> Option<usize> {
        self.slot_order
            .iter()
            .position(|&i| self.model.slots[i].id == id)
    }

    /// Room index of a room id.
    pub fn room_index(&self, id: &str) -> Option<usize> {
        self.model.rooms.iter().position(|r| r.id == id)
    }

    /// Speaker group of a session.
    #[inline]
    pub fn speaker_of(&self, session: usize) -> Option<usize> {
        self.speaker_of[session]
    }

    /// Candidates occupying `room` at `position` (empty when room
    /// exclusivity is off).
    #[inline]
    pub fn room_cover(&self, room: usize, position: usize) -> &[u32] {
        self.room_cover
            .get(room * self.slot_count() + position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Candidates of `speaker`'s sessions occupying `position` (empty when
    /// speaker exclusivity is off).
    #[inline]
    pub fn speaker_cover(&self, speaker: usize, position: usize) -> &[u32] {
        self.speaker_cover
            .get(speaker * self.slot_count() + position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sessions left without any candidate.
    #[inline]
    pub fn empty_domains(&self) -> &[EmptyDomain] {
        &self.empty_domains
    }

    /// Objective scoring context.
    #[inline]
    pub fn objective(&self) -> &ObjectiveContext {
        &self.objective
    }

    /// Finds the candidate id of a concrete placement in a session's domain.
    pub fn find_candidate(&self, session: usize, room: usize, start: usize) -> Option<usize> {
        self.domain(session).find(|&id| {
            let c = self.candidates[id];
            c.room == room && c.start == start
        })
    }
}
