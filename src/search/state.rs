//! Per-run search state.
//!
//! An arena indexed by compiled session index plus an undo trail. Every
//! candidate removal and assignment made after [`SearchState::push_frame`]
//! is reverted by the matching [`SearchState::pop_frame`]; changes made
//! before the first frame (restrictions, fixings) are permanent for the run.

use crate::compile::{CompiledModel, Placement};
use crate::objective::PartialPenalties;

use super::cancel::CancellationToken;

/// Result of assigning and propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Propagation {
    /// Fixpoint reached without conflict.
    Stable,
    /// The given session lost every candidate.
    Wipeout(usize),
    /// Cancellation observed mid-propagation.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    removed: usize,
    assigned: usize,
    penalties: PartialPenalties,
    changes: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct SearchState {
    assigned: Vec<Option<u32>>,
    alive: Vec<bool>,
    alive_count: Vec<u32>,
    active: Vec<bool>,
    prior: Vec<Option<u32>>,
    removed: Vec<u32>,
    assigned_trail: Vec<u32>,
    frames: Vec<Frame>,
    pending: Vec<usize>,
    penalties: PartialPenalties,
    changes: usize,
    propagations: u64,
}

impl SearchState {
    pub fn new(compiled: &CompiledModel<'_>) -> Self {
        let n = compiled.session_count();
        Self {
            assigned: vec![None; n],
            alive: vec![true; compiled.candidate_count()],
            alive_count: (0..n).map(|s| compiled.domain(s).len() as u32).collect(),
            active: vec![true; n],
            prior: vec![None; n],
            removed: Vec::new(),
            assigned_trail: Vec::new(),
            frames: Vec::new(),
            pending: Vec::new(),
            penalties: PartialPenalties::default(),
            changes: 0,
            propagations: 0,
        }
    }

    /// Drops a session from the run: it is neither branched on nor
    /// constrains anyone.
    pub fn deactivate(&mut self, compiled: &CompiledModel<'_>, session: usize) {
        self.active[session] = false;
        for id in compiled.domain(session) {
            self.alive[id] = false;
        }
        self.alive_count[session] = 0;
    }

    /// Restricts a session to a single candidate.
    pub fn restrict_to(&mut self, compiled: &CompiledModel<'_>, session: usize, candidate: usize) {
        for id in compiled.domain(session) {
            if id != candidate && self.alive[id] {
                self.kill(compiled, id);
            }
        }
    }

    /// Sets the preferred candidate of a session. A session assigned to
    /// anything else counts as changed.
    pub fn set_prior(&mut self, session: usize, candidate: usize) {
        self.prior[session] = Some(candidate as u32);
    }

    #[inline]
    pub fn prior(&self, session: usize) -> Option<usize> {
        self.prior[session].map(|c| c as usize)
    }

    #[inline]
    pub fn is_active(&self, session: usize) -> bool {
        self.active[session]
    }

    #[inline]
    pub fn is_assigned(&self, session: usize) -> bool {
        self.assigned[session].is_some()
    }

    #[inline]
    pub fn is_alive(&self, candidate: usize) -> bool {
        self.alive[candidate]
    }

    #[inline]
    pub fn alive_count(&self, session: usize) -> usize {
        self.alive_count[session] as usize
    }

    #[inline]
    pub fn penalties(&self) -> &PartialPenalties {
        &self.penalties
    }

    #[inline]
    pub fn changes(&self) -> usize {
        self.changes
    }

    #[inline]
    pub fn propagations(&self) -> u64 {
        self.propagations
    }

    /// First surviving candidate of a session (earliest start).
    pub fn first_alive(&self, compiled: &CompiledModel<'_>, session: usize) -> Option<usize> {
        compiled.domain(session).find(|&id| self.alive[id])
    }

    /// Placements of every assigned active session, by session index.
    pub fn placements(&self, compiled: &CompiledModel<'_>) -> Vec<Placement> {
        self.assigned
            .iter()
            .enumerate()
            .filter(|(s, _)| self.active[*s])
            .filter_map(|(_, c)| c.map(|c| compiled.candidate(c as usize)))
            .collect()
    }

    /// Queues every active session already down to one candidate.
    pub fn seed_units(&mut self) {
        for s in (0..self.assigned.len()).rev() {
            if self.active[s] && self.assigned[s].is_none() && self.alive_count[s] <= 1 {
                self.pending.push(s);
            }
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame {
            removed: self.removed.len(),
            assigned: self.assigned_trail.len(),
            penalties: self.penalties,
            changes: self.changes,
        });
    }

    pub fn pop_frame(&mut self, compiled: &CompiledModel<'_>) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        for &id in &self.removed[frame.removed..] {
            let id = id as usize;
            self.alive[id] = true;
            self.alive_count[compiled.candidate(id).session] += 1;
        }
        self.removed.truncate(frame.removed);
        for &s in &self.assigned_trail[frame.assigned..] {
            self.assigned[s as usize] = None;
        }
        self.assigned_trail.truncate(frame.assigned);
        self.penalties = frame.penalties;
        self.changes = frame.changes;
        self.pending.clear();
    }

    /// Assigns `candidate` to `session` and propagates to a fixpoint.
    pub fn decide(
        &mut self,
        compiled: &CompiledModel<'_>,
        session: usize,
        candidate: usize,
        cancel: &CancellationToken,
    ) -> Propagation {
        if let Err(wiped) = self.assign(compiled, session, candidate) {
            return Propagation::Wipeout(wiped);
        }
        self.propagate(compiled, cancel)
    }

    /// Assigns every queued single-candidate session until none is left.
    pub fn propagate(&mut self, compiled: &CompiledModel<'_>, cancel: &CancellationToken) -> Propagation {
        while let Some(s) = self.pending.pop() {
            if cancel.is_cancelled() {
                return Propagation::Cancelled;
            }
            if self.assigned[s].is_some() || !self.active[s] {
                continue;
            }
            let Some(only) = self.first_alive(compiled, s) else {
                return Propagation::Wipeout(s);
            };
            self.propagations += 1;
            if let Err(wiped) = self.assign(compiled, s, only) {
                return Propagation::Wipeout(wiped);
            }
        }
        Propagation::Stable
    }

    fn assign(&mut self, compiled: &CompiledModel<'_>, session: usize, candidate: usize) -> Result<(), usize> {
        self.assigned[session] = Some(candidate as u32);
        self.assigned_trail.push(session as u32);
        for id in compiled.domain(session) {
            if id != candidate && self.alive[id] {
                self.kill(compiled, id);
            }
        }

        let placed = compiled.candidate(candidate);
        let ctx = compiled.objective();
        for &mate in ctx.track_mates(session) {
            if mate == session {
                continue;
            }
            if let Some(other) = self.assigned[mate] {
                self.penalties.track += ctx.pair_penalty(&placed, &compiled.candidate(other as usize));
            }
        }
        self.penalties.keynote += ctx.keynote_penalty(&placed);
        self.penalties.fit += ctx.fit_penalty(&placed);
        self.penalties.late += ctx.late_penalty(&placed);
        if self.prior[session].is_some_and(|p| p as usize != candidate) {
            self.changes += 1;
        }

        let speaker = compiled.speaker_of(session);
        for pos in placed.start..placed.end {
            for &id in compiled.room_cover(placed.room, pos) {
                self.eliminate(compiled, session, id as usize)?;
            }
            if let Some(spk) = speaker {
                for &id in compiled.speaker_cover(spk, pos) {
                    self.eliminate(compiled, session, id as usize)?;
                }
            }
        }
        Ok(())
    }

    /// Removes a candidate conflicting with `owner`'s new assignment.
    fn eliminate(&mut self, compiled: &CompiledModel<'_>, owner: usize, id: usize) -> Result<(), usize> {
        if !self.alive[id] {
            return Ok(());
        }
        let other = compiled.candidate(id).session;
        if other == owner {
            return Ok(());
        }
        self.kill(compiled, id);
        match self.alive_count[other] {
            0 => Err(other),
            1 => {
                self.pending.push(other);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    #[inline]
    fn kill(&mut self, compiled: &CompiledModel<'_>, id: usize) {
        self.alive[id] = false;
        self.alive_count[compiled.candidate(id).session] -= 1;
        self.removed.push(id as u32);
    }
}
