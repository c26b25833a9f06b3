//! Individual soft terms.

use std::collections::BTreeMap;

use super::{normalized, ObjectiveContext, ScoreBreakdown};
use crate::compile::Placement;

/// Same-track sessions in the same or adjacent time block.
///
/// Averages a per-pair penalty (idle distance over the widest possible
/// distance) over every placed same-track pair. 1.0 when no such pair is
/// placed.
pub fn track_clustering_score(ctx: &ObjectiveContext, placements: &[Placement]) -> f64 {
    let mut pairs = 0usize;
    let mut penalty = 0.0;
    for (i, a) in placements.iter().enumerate() {
        for b in &placements[i + 1..] {
            if ctx.track_of[a.session].is_some() && ctx.track_of[a.session] == ctx.track_of[b.session] {
                pairs += 1;
                penalty += ctx.pair_penalty(a, b);
            }
        }
    }
    normalized(penalty, pairs)
}

/// Keynotes in preferred slots, or as early as possible when no preference
/// is configured. 1.0 when no keynote is placed.
pub fn keynote_positioning_score(ctx: &ObjectiveContext, placements: &[Placement]) -> f64 {
    let keynotes: Vec<&Placement> = placements.iter().filter(|p| ctx.is_keynote(p.session)).collect();
    let penalty: f64 = keynotes.iter().map(|p| ctx.keynote_penalty(p)).sum();
    normalized(penalty, keynotes.len())
}

/// Few idle slots between consecutive sessions of the same room or speaker.
///
/// Groups with fewer than two placements are ignored. Idle positions are
/// counted between the first and last placement of a group and divided by
/// the group's free positions. 1.0 when no group has any free position.
pub fn gap_minimization_score(ctx: &ObjectiveContext, placements: &[Placement]) -> f64 {
    let mut groups: BTreeMap<(u8, usize), Vec<Placement>> = BTreeMap::new();
    for p in placements {
        groups.entry((0, p.room)).or_default().push(*p);
        if let Some(spk) = ctx.speaker_of[p.session] {
            groups.entry((1, spk)).or_default().push(*p);
        }
    }

    let mut idle = 0usize;
    let mut free = 0usize;
    for (_, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        let (group_idle, busy) = idle_and_busy(&mut members);
        idle += group_idle;
        free += ctx.slot_count.saturating_sub(busy);
    }
    if free == 0 {
        1.0
    } else {
        (1.0 - idle as f64 / free as f64).clamp(0.0, 1.0)
    }
}

/// Share of placements whose room is at most twice the expected audience.
pub fn room_fit_score(ctx: &ObjectiveContext, placements: &[Placement]) -> f64 {
    let oversized: f64 = placements.iter().map(|p| ctx.fit_penalty(p)).sum();
    normalized(oversized, placements.len())
}

/// Share of sessions starting in the first half of the slot sequence.
///
/// Normalized over every session of the model, like the room-fit term.
pub fn late_slot_score(ctx: &ObjectiveContext, placements: &[Placement]) -> f64 {
    let late: f64 = placements.iter().map(|p| ctx.late_penalty(p)).sum();
    normalized(late, ctx.session_count())
}

/// Scores placements under every term.
pub fn evaluate(ctx: &ObjectiveContext, placements: &[Placement]) -> ScoreBreakdown {
    ctx.weighted(
        track_clustering_score(ctx, placements),
        keynote_positioning_score(ctx, placements),
        gap_minimization_score(ctx, placements),
        room_fit_score(ctx, placements),
        late_slot_score(ctx, placements),
    )
}

/// Idle positions inside the span of `members` and positions they occupy.
fn idle_and_busy(members: &mut [Placement]) -> (usize, usize) {
    members.sort_by_key(|p| (p.start, p.end, p.session));
    let mut idle = 0;
    let mut busy = 0;
    let mut cover_end = members[0].start;
    for p in members.iter() {
        if p.start > cover_end {
            idle += p.start - cover_end;
        }
        if p.end > cover_end {
            busy += p.end - p.start.max(cover_end);
            cover_end = p.end;
        }
    }
    (idle, busy)
}
