//! Depth-first branch-and-bound over a compiled model.
//!
//! # Algorithm
//!
//! 1. Propagate root units (sessions with a single candidate).
//! 2. Pick the unassigned session with the fewest surviving candidates,
//!    breaking ties by earliest surviving start, then by session id.
//! 3. Try its candidates in order (preferred candidate first, then
//!    start/room order), propagating each; a wipeout is a dead end.
//! 4. At a leaf, score the schedule and keep it if it beats the incumbent
//!    (or ties it with fewer changes against the preferred candidates).
//! 5. Cut any subtree whose optimistic bound cannot beat the incumbent.
//!
//! The search is an explicit choice-point stack, so depth is bounded by
//! the number of sessions and never by the call stack.
//!
//! # Reference
//! Haralick & Elliott (1980), "Increasing tree search efficiency for
//! constraint satisfaction problems"

use std::time::Instant;

use tracing::debug;

use super::cancel::CancellationToken;
use super::state::{Propagation, SearchState};
use super::stats::SearchStatistics;
use crate::compile::{CompiledModel, Placement};
use crate::config::Budget;
use crate::objective::{evaluate, ScoreBreakdown};

/// Score tolerance when comparing incumbents.
const EPS: f64 = 1e-9;

/// Wall clock is read once every this many nodes.
const CLOCK_CHECK_INTERVAL: u64 = 256;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Termination {
    /// Every branch was explored or pruned.
    Exhausted,
    /// Node or wall-clock budget ran out.
    Budget,
    /// Cancellation observed.
    Cancelled,
    /// First solution found in first-solution mode.
    Stopped,
}

/// Best schedule found so far.
#[derive(Debug, Clone)]
pub(crate) struct Incumbent {
    pub placements: Vec<Placement>,
    pub score: ScoreBreakdown,
    pub changes: usize,
}

#[derive(Debug)]
pub(crate) struct SearchRun {
    pub termination: Termination,
    pub incumbent: Option<Incumbent>,
    pub stats: SearchStatistics,
}

#[derive(Debug)]
struct ChoicePoint {
    session: usize,
    candidates: Vec<usize>,
    next: usize,
}

pub(crate) struct SearchEngine<'c, 'a> {
    compiled: &'c CompiledModel<'a>,
    state: SearchState,
    budget: Budget,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    first_solution: bool,
    stack: Vec<ChoicePoint>,
    incumbent: Option<Incumbent>,
    stats: SearchStatistics,
}

impl<'c, 'a> SearchEngine<'c, 'a> {
    pub fn new(compiled: &'c CompiledModel<'a>, budget: Budget, cancel: CancellationToken) -> Self {
        Self {
            compiled,
            state: SearchState::new(compiled),
            budget,
            deadline: None,
            cancel,
            first_solution: false,
            stack: Vec::new(),
            incumbent: None,
            stats: SearchStatistics::default(),
        }
    }

    /// Preferred candidates: tried first, and departures from them are
    /// counted as changes.
    pub fn with_preferred(mut self, preferred: &[(usize, usize)]) -> Self {
        for &(session, candidate) in preferred {
            self.state.set_prior(session, candidate);
        }
        self
    }

    /// Pins sessions to a single candidate for the whole run.
    pub fn with_fixed(mut self, fixed: &[(usize, usize)]) -> Self {
        for &(session, candidate) in fixed {
            self.state.restrict_to(self.compiled, session, candidate);
        }
        self
    }

    /// Solves only the sessions flagged `true`.
    pub fn with_active(mut self, active: &[bool]) -> Self {
        for (session, &on) in active.iter().enumerate() {
            if !on {
                self.state.deactivate(self.compiled, session);
            }
        }
        self
    }

    /// Stops at this instant at the latest, whatever the budget's own
    /// wall-clock limit says.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = earliest(self.deadline, deadline);
        self
    }

    /// Starts from a known schedule: only strictly better scores, or equal
    /// scores with fewer changes, replace it.
    pub fn with_incumbent(mut self, incumbent: Option<Incumbent>) -> Self {
        self.incumbent = incumbent;
        self
    }

    /// Stops at the first feasible schedule.
    pub fn first_solution_only(mut self) -> Self {
        self.first_solution = true;
        self
    }

    pub fn run(mut self) -> SearchRun {
        let started = Instant::now();
        self.deadline = earliest(self.deadline, self.budget.deadline(started));
        let termination = self.search();
        self.stats.propagations = self.state.propagations();
        self.stats.elapsed = started.elapsed();
        SearchRun {
            termination,
            incumbent: self.incumbent,
            stats: self.stats,
        }
    }

    fn search(&mut self) -> Termination {
        let compiled = self.compiled;
        self.state.seed_units();
        match self.state.propagate(compiled, &self.cancel) {
            Propagation::Stable => {}
            Propagation::Wipeout(_) => return Termination::Exhausted,
            Propagation::Cancelled => return Termination::Cancelled,
        }

        loop {
            match self.select() {
                None => {
                    self.on_leaf();
                    if self.first_solution && self.incumbent.is_some() {
                        return Termination::Stopped;
                    }
                }
                Some(session) => {
                    let candidates = self.ordered_candidates(session);
                    self.stack.push(ChoicePoint {
                        session,
                        candidates,
                        next: 0,
                    });
                }
            }

            if let Some(stop) = self.advance() {
                return stop;
            }
        }
    }

    /// Moves to the next untried alternative, backtracking as needed.
    /// Returns `Some` when the run must stop.
    fn advance(&mut self) -> Option<Termination> {
        let compiled = self.compiled;
        loop {
            let Some(top) = self.stack.last() else {
                return Some(Termination::Exhausted);
            };
            let (session, next, len) = (top.session, top.next, top.candidates.len());
            if next > 0 {
                self.state.pop_frame(compiled);
            }
            if next == len {
                self.stack.pop();
                self.stats.on_backtrack();
                continue;
            }
            if self.cancel.is_cancelled() {
                return Some(Termination::Cancelled);
            }
            if self.budget_expired() {
                return Some(Termination::Budget);
            }

            let Some(top) = self.stack.last_mut() else {
                return Some(Termination::Exhausted);
            };
            let candidate = top.candidates[next];
            top.next += 1;
            self.stats.on_node();

            self.state.push_frame();
            match self.state.decide(compiled, session, candidate, &self.cancel) {
                Propagation::Stable => {}
                Propagation::Wipeout(_) => {
                    self.stats.on_pruning_infeasible();
                    continue;
                }
                Propagation::Cancelled => return Some(Termination::Cancelled),
            }
            if self.bound_prunes() {
                self.stats.on_pruning_bound();
                continue;
            }
            self.stats.on_depth(self.stack.len());
            return None;
        }
    }

    fn budget_expired(&self) -> bool {
        if self
            .budget
            .max_nodes
            .is_some_and(|max| self.stats.nodes >= max)
        {
            return true;
        }
        match self.deadline {
            Some(at) if self.stats.nodes % CLOCK_CHECK_INTERVAL == 0 => Instant::now() >= at,
            _ => false,
        }
    }

    /// Minimum-remaining-values; ties by earliest surviving start, then by
    /// session index (ascending id).
    fn select(&self) -> Option<usize> {
        let compiled = self.compiled;
        let mut best: Option<(usize, usize, usize)> = None;
        for s in 0..compiled.session_count() {
            if !self.state.is_active(s) || self.state.is_assigned(s) {
                continue;
            }
            let count = self.state.alive_count(s);
            if best.is_some_and(|(c, _, _)| count > c) {
                continue;
            }
            let earliest = self
                .state
                .first_alive(compiled, s)
                .map_or(usize::MAX, |id| compiled.candidate(id).start);
            let key = (count, earliest, s);
            if best.map_or(true, |b| key < b) {
                best = Some(key);
            }
        }
        best.map(|(_, _, s)| s)
    }

    fn ordered_candidates(&self, session: usize) -> Vec<usize> {
        let preferred = self
            .state
            .prior(session)
            .filter(|&c| self.state.is_alive(c));
        let mut ordered = Vec::with_capacity(self.state.alive_count(session));
        ordered.extend(preferred);
        ordered.extend(
            self.compiled
                .domain(session)
                .filter(|&id| self.state.is_alive(id) && Some(id) != preferred),
        );
        ordered
    }

    fn bound_prunes(&self) -> bool {
        let Some(best) = &self.incumbent else {
            return false;
        };
        if self.first_solution {
            return false;
        }
        let bound = self.compiled.objective().upper_bound(self.state.penalties());
        bound < best.score.total - EPS
            || (bound <= best.score.total + EPS && self.state.changes() >= best.changes)
    }

    fn on_leaf(&mut self) {
        let placements = self.state.placements(self.compiled);
        let score = evaluate(self.compiled.objective(), &placements);
        let changes = self.state.changes();
        let improves = match &self.incumbent {
            None => true,
            Some(best) => {
                score.total > best.score.total + EPS
                    || (score.total >= best.score.total - EPS && changes < best.changes)
            }
        };
        if improves {
            self.stats.on_solution();
            debug!(
                score = score.total,
                changes,
                nodes = self.stats.nodes,
                "new incumbent"
            );
            self.incumbent = Some(Incumbent {
                placements,
                score,
                changes,
            });
        }
    }
}

/// The sooner of two optional instants.
pub(crate) fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::config::{Budget, SoftWeights, SolverConfig};
    use crate::models::{contiguous_slots, DomainModel, Room, Session};

    fn run(model: &DomainModel, config: &SolverConfig) -> SearchRun {
        let compiled = compile(model, config).unwrap();
        SearchEngine::new(&compiled, config.budget, CancellationToken::new()).run()
    }

    #[test]
    fn test_finds_feasible_assignment() {
        let model = DomainModel::new()
            .with_sessions((0..4).map(|i| Session::new(format!("S{i}")).with_speaker("x")))
            .with_room(Room::new("R", 10))
            .with_slots(contiguous_slots("t", 4, 0, 60));
        let result = run(&model, &SolverConfig::default());
        assert_eq!(result.termination, Termination::Exhausted);
        let incumbent = result.incumbent.unwrap();
        assert_eq!(incumbent.placements.len(), 4);
        for (i, a) in incumbent.placements.iter().enumerate() {
            for b in &incumbent.placements[i + 1..] {
                assert!(!a.overlaps(b));
            }
        }
    }

    #[test]
    fn test_proves_infeasibility() {
        let model = DomainModel::new()
            .with_sessions((0..3).map(|i| Session::new(format!("S{i}")).with_speaker("x")))
            .with_rooms([Room::new("R1", 10), Room::new("R2", 10)])
            .with_slots(contiguous_slots("t", 2, 0, 60));
        let result = run(&model, &SolverConfig::default());
        assert_eq!(result.termination, Termination::Exhausted);
        assert!(result.incumbent.is_none());
    }

    #[test]
    fn test_keynote_goes_first() {
        let model = DomainModel::new()
            .with_sessions([
                Session::new("a"),
                Session::new("b"),
                Session::new("z").with_title("Closing keynote"),
            ])
            .with_room(Room::new("R", 10))
            .with_slots(contiguous_slots("t", 3, 0, 60));
        let result = run(&model, &SolverConfig::default());
        let incumbent = result.incumbent.unwrap();
        let keynote = incumbent.placements.iter().find(|p| p.session == 2).unwrap();
        assert_eq!(keynote.start, 0);
        assert_eq!(result.termination, Termination::Exhausted);
    }

    #[test]
    fn test_node_budget_stops_search() {
        let model = DomainModel::new()
            .with_sessions((0..6).map(|i| Session::new(format!("S{i}")).with_track(format!("k{}", i % 2))))
            .with_rooms([Room::new("R1", 10), Room::new("R2", 10)])
            .with_slots(contiguous_slots("t", 6, 0, 60));
        let config = SolverConfig::default().with_max_nodes(3);
        let result = run(&model, &config);
        assert_eq!(result.termination, Termination::Budget);
        assert_eq!(result.stats.nodes, 3);
    }

    #[test]
    fn test_past_deadline_stops_before_first_node() {
        let model = DomainModel::new()
            .with_sessions((0..6).map(|i| Session::new(format!("S{i}"))))
            .with_rooms([Room::new("R1", 10), Room::new("R2", 10)])
            .with_slots(contiguous_slots("t", 6, 0, 60));
        let config = SolverConfig::default().with_budget(Budget::unbounded());
        let compiled = compile(&model, &config).unwrap();
        let result = SearchEngine::new(&compiled, config.budget, CancellationToken::new())
            .with_deadline(Some(Instant::now()))
            .run();
        assert_eq!(result.termination, Termination::Budget);
        assert_eq!(result.stats.nodes, 0);
        assert!(result.incumbent.is_none());
    }

    #[test]
    fn test_seeded_incumbent_survives_unless_beaten() {
        let model = DomainModel::new()
            .with_sessions([
                Session::new("a"),
                Session::new("b"),
                Session::new("z").with_title("Closing keynote"),
            ])
            .with_room(Room::new("R", 10))
            .with_slots(contiguous_slots("t", 3, 0, 60));
        let config = SolverConfig::default();
        let compiled = compile(&model, &config).unwrap();
        let best = SearchEngine::new(&compiled, config.budget, CancellationToken::new())
            .run()
            .incumbent
            .unwrap();

        let again = SearchEngine::new(&compiled, config.budget, CancellationToken::new())
            .with_incumbent(Some(best.clone()))
            .run();
        assert_eq!(again.termination, Termination::Exhausted);
        assert_eq!(again.stats.solutions_found, 0);
        assert_eq!(again.incumbent.unwrap().placements, best.placements);

        // a keynote-last seed is replaced by the optimum
        let late = vec![
            compiled.candidate(compiled.find_candidate(0, 0, 0).unwrap()),
            compiled.candidate(compiled.find_candidate(1, 0, 1).unwrap()),
            compiled.candidate(compiled.find_candidate(2, 0, 2).unwrap()),
        ];
        let seed = Incumbent {
            score: evaluate(compiled.objective(), &late),
            placements: late,
            changes: 0,
        };
        let improved = SearchEngine::new(&compiled, config.budget, CancellationToken::new())
            .with_incumbent(Some(seed))
            .run();
        assert!(improved.stats.solutions_found >= 1);
        let incumbent = improved.incumbent.unwrap();
        assert!((incumbent.score.total - best.score.total).abs() < EPS);
    }

    #[test]
    fn test_feasibility_only_stops_improving_after_first() {
        let model = DomainModel::new()
            .with_sessions((0..3).map(|i| Session::new(format!("S{i}"))))
            .with_rooms([Room::new("R1", 10), Room::new("R2", 10)])
            .with_slots(contiguous_slots("t", 3, 0, 60));
        let config = SolverConfig::default().with_weights(SoftWeights::feasibility_only());
        let result = run(&model, &config);
        assert_eq!(result.termination, Termination::Exhausted);
        assert_eq!(result.stats.solutions_found, 1);
    }

    #[test]
    fn test_preferred_candidates_kept() {
        let model = DomainModel::new()
            .with_sessions([Session::new("a"), Session::new("b")])
            .with_rooms([Room::new("R1", 10), Room::new("R2", 10)])
            .with_slots(contiguous_slots("t", 2, 0, 60));
        let config = SolverConfig::default().with_weights(SoftWeights::feasibility_only());
        let compiled = compile(&model, &config).unwrap();
        let a = compiled.find_candidate(0, 1, 1).unwrap();
        let b = compiled.find_candidate(1, 0, 1).unwrap();
        let result = SearchEngine::new(&compiled, config.budget, CancellationToken::new())
            .with_preferred(&[(0, a), (1, b)])
            .run();
        let incumbent = result.incumbent.unwrap();
        assert_eq!(incumbent.changes, 0);
        assert_eq!(incumbent.placements[0], compiled.candidate(a));
        assert_eq!(incumbent.placements[1], compiled.candidate(b));
    }
}
