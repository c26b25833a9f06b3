//! Objective evaluation.
//!
//! The score of a (partial) schedule is a weighted sum of independent soft
//! terms, each normalized to `[0, 1]` (1 = best) before weighting:
//!
//! | Term | Rewards |
//! |------|---------|
//! | `track_clustering` | same-track sessions in the same or adjacent time block |
//! | `keynote_positioning` | keynotes in preferred (or earliest) slots |
//! | `gap_minimization` | few idle slots between sessions sharing a room or speaker |
//! | `room_fit` | rooms at most twice the expected audience |
//! | `late_slots` | sessions starting in the first half of the slot sequence |
//!
//! Evaluation is pure: the same placements always score the same, and
//! scoring never touches search state.
//!
//! # Bounding
//! Track, keynote, room-fit and late-slot penalties only grow as sessions are placed,
//! so [`ObjectiveContext::upper_bound`] over the penalties accumulated so
//! far bounds every completion of a partial schedule. The gap term is not
//! monotone and is bounded by its maximum.

mod terms;

pub use terms::{
    evaluate, gap_minimization_score, keynote_positioning_score, late_slot_score,
    room_fit_score, track_clustering_score,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::compile::{canonical_session_order, canonical_slot_order, Placement};
use crate::config::{SoftWeights, SolverConfig};
use crate::error::ConfigurationError;
use crate::models::{DomainModel, Schedule};
use crate::validation::{ValidationError, ValidationErrorKind};

/// Per-term scores of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Normalized track clustering term.
    pub track_clustering: f64,
    /// Normalized keynote positioning term.
    pub keynote_positioning: f64,
    /// Normalized gap minimization term.
    pub gap_minimization: f64,
    /// Normalized room fit term.
    pub room_fit: f64,
    /// Normalized late-slot term.
    #[serde(default = "full_score")]
    pub late_slots: f64,
    /// Weighted sum.
    pub total: f64,
}

/// Penalties accumulated by the monotone terms over a partial schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialPenalties {
    /// Sum of same-track pair penalties.
    pub track: f64,
    /// Sum of keynote penalties.
    pub keynote: f64,
    /// Count of oversized-room placements.
    pub fit: f64,
    /// Count of placements starting in the second half of the day.
    pub late: f64,
}

fn full_score() -> f64 {
    1.0
}

/// Everything the soft terms need, indexed like a compiled model.
#[derive(Debug, Clone)]
pub struct ObjectiveContext {
    weights: SoftWeights,
    slot_count: usize,
    room_count: usize,
    speaker_count: usize,
    track_of: Vec<Option<usize>>,
    speaker_of: Vec<Option<usize>>,
    track_members: Vec<Vec<usize>>,
    keynote: Vec<bool>,
    preferred: Option<Vec<bool>>,
    attendance: Vec<u32>,
    capacity: Vec<u32>,
    track_pairs: usize,
    keynote_count: usize,
}

fn group_ids<'m>(ids: impl Iterator<Item = &'m str>) -> (Vec<Option<usize>>, usize) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let groups = ids
        .map(|id| {
            if id.is_empty() {
                return None;
            }
            let next = seen.len();
            Some(*seen.entry(id).or_insert(next))
        })
        .collect();
    (groups, seen.len())
}

impl ObjectiveContext {
    /// Builds the context for a model under a configuration.
    ///
    /// Assumes the keynote configuration has been validated; unknown
    /// keynote ids are ignored here.
    pub fn new(model: &DomainModel, config: &SolverConfig) -> Self {
        let order = canonical_session_order(model);
        let sessions: Vec<_> = order.iter().map(|&i| &model.sessions[i]).collect();
        let slots: Vec<_> = canonical_slot_order(model)
            .into_iter()
            .map(|i| &model.slots[i])
            .collect();

        let (track_of, track_count) = group_ids(sessions.iter().map(|s| s.track_id.as_str()));
        let (speaker_of, speaker_count) =
            group_ids(sessions.iter().map(|s| s.speaker_id.as_str()));

        let mut track_members = vec![Vec::new(); track_count];
        for (idx, track) in track_of.iter().enumerate() {
            if let Some(t) = track {
                track_members[*t].push(idx);
            }
        }
        let track_pairs = track_members
            .iter()
            .map(|m| m.len() * m.len().saturating_sub(1) / 2)
            .sum();

        let keynotes = &config.keynotes;
        let keynote: Vec<bool> = sessions
            .iter()
            .map(|s| {
                keynotes.sessions.iter().any(|k| *k == s.id)
                    || (keynotes.detect_by_title && s.looks_like_keynote())
            })
            .collect();
        let keynote_count = keynote.iter().filter(|k| **k).count();

        let preferred = if keynotes.preferred_slots.is_empty() {
            None
        } else {
            Some(
                slots
                    .iter()
                    .map(|s| keynotes.preferred_slots.contains(&s.id))
                    .collect(),
            )
        };

        Self {
            weights: config.soft_weights.clone(),
            slot_count: slots.len(),
            room_count: model.rooms.len(),
            speaker_count,
            track_of,
            speaker_of,
            track_members,
            keynote,
            preferred,
            attendance: sessions.iter().map(|s| s.expected_attendance).collect(),
            capacity: model.rooms.iter().map(|r| r.capacity).collect(),
            track_pairs,
            keynote_count,
        }
    }

    /// The soft weights.
    #[inline]
    pub fn weights(&self) -> &SoftWeights {
        &self.weights
    }

    /// Number of sessions.
    #[inline]
    pub fn session_count(&self) -> usize {
        self.keynote.len()
    }

    /// Number of slot positions.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Whether a session counts as a keynote.
    #[inline]
    pub fn is_keynote(&self, session: usize) -> bool {
        self.keynote[session]
    }

    /// Sessions sharing a track with `session` (including itself).
    pub fn track_mates(&self, session: usize) -> &[usize] {
        match self.track_of[session] {
            Some(t) => &self.track_members[t],
            None => &[],
        }
    }

    /// Penalty of a same-track pair: idle distance relative to the widest
    /// possible distance.
    pub fn pair_penalty(&self, a: &Placement, b: &Placement) -> f64 {
        if self.slot_count <= 1 {
            return 0.0;
        }
        let span = (self.slot_count - 1) as f64;
        (a.gap_to(b) as f64 / span).min(1.0)
    }

    /// Penalty of a placement under the keynote term (0 for non-keynotes).
    pub fn keynote_penalty(&self, p: &Placement) -> f64 {
        if !self.keynote[p.session] {
            return 0.0;
        }
        match &self.preferred {
            Some(preferred) => {
                if preferred.get(p.start).copied().unwrap_or(false) {
                    0.0
                } else {
                    1.0
                }
            }
            None if self.slot_count <= 1 => 0.0,
            None => p.start as f64 / (self.slot_count - 1) as f64,
        }
    }

    /// Penalty of a placement under the room-fit term.
    pub fn fit_penalty(&self, p: &Placement) -> f64 {
        let attendance = u64::from(self.attendance[p.session]);
        let capacity = u64::from(self.capacity[p.room]);
        if attendance > 0 && capacity > 2 * attendance {
            1.0
        } else {
            0.0
        }
    }

    /// Penalty of a placement under the late-slot term: 1 when it starts
    /// in the second half of the slot sequence.
    pub fn late_penalty(&self, p: &Placement) -> f64 {
        if p.start >= self.slot_count / 2 {
            1.0
        } else {
            0.0
        }
    }

    /// Weighted score from monotone penalties, with the gap term at its
    /// maximum. Bounds the score of every completion.
    pub fn upper_bound(&self, partial: &PartialPenalties) -> f64 {
        let w = &self.weights;
        w.track_clustering * self.track_term(partial.track)
            + w.keynote_positioning * self.keynote_term(partial.keynote)
            + w.gap_minimization
            + w.room_fit * self.fit_term(partial.fit)
            + w.late_slots * self.late_term(partial.late)
    }

    fn track_term(&self, penalty: f64) -> f64 {
        normalized(penalty, self.track_pairs)
    }

    fn keynote_term(&self, penalty: f64) -> f64 {
        normalized(penalty, self.keynote_count)
    }

    fn fit_term(&self, penalty: f64) -> f64 {
        normalized(penalty, self.session_count())
    }

    fn late_term(&self, penalty: f64) -> f64 {
        normalized(penalty, self.session_count())
    }

    fn weighted(&self, track: f64, keynote: f64, gap: f64, fit: f64, late: f64) -> ScoreBreakdown {
        let w = &self.weights;
        ScoreBreakdown {
            track_clustering: track,
            keynote_positioning: keynote,
            gap_minimization: gap,
            room_fit: fit,
            late_slots: late,
            total: w.track_clustering * track
                + w.keynote_positioning * keynote
                + w.gap_minimization * gap
                + w.room_fit * fit
                + w.late_slots * late,
        }
    }
}

/// `1 - penalty / count`, clamped to `[0, 1]`; 1 when there is nothing to
/// measure.
fn normalized(penalty: f64, count: usize) -> f64 {
    if count == 0 {
        1.0
    } else {
        (1.0 - penalty / count as f64).clamp(0.0, 1.0)
    }
}

/// Scores a schedule (possibly partial) against a model.
///
/// Fails when the configuration's weights are invalid or the schedule
/// references sessions, rooms or slots the model does not contain.
pub fn evaluate_schedule(
    schedule: &Schedule,
    model: &DomainModel,
    config: &SolverConfig,
) -> Result<ScoreBreakdown, ConfigurationError> {
    config.validate()?;
    let ctx = ObjectiveContext::new(model, config);
    let order = canonical_session_order(model);
    let slots = canonical_slot_order(model);

    let mut issues = Vec::new();
    let mut placements = Vec::with_capacity(schedule.len());
    for a in schedule.iter() {
        let session = order
            .binary_search_by(|&i| model.sessions[i].id.as_str().cmp(a.session_id.as_str()))
            .ok();
        let room = model.rooms.iter().position(|r| r.id == a.room_id);
        let start = slots.iter().position(|&i| model.slots[i].id == a.start_slot_id);
        match (session, room, start) {
            (Some(session), Some(room), Some(start)) => {
                let duration = model.sessions[order[session]].duration as usize;
                placements.push(Placement {
                    session,
                    room,
                    start,
                    end: (start + duration).min(ctx.slot_count()),
                });
            }
            _ => issues.push(ValidationError::new(
                ValidationErrorKind::UnknownSession,
                format!(
                    "Assignment of '{}' references an unknown session, room or slot",
                    a.session_id
                ),
            )),
        }
    }

    if !issues.is_empty() {
        return Err(ConfigurationError::new(issues));
    }
    Ok(evaluate(&ctx, &placements))
}
