//! Stateful planner enforcing the run state machine.
//!
//! ```text
//! INIT -> COMPILING -> SEARCHING -> { SOLVED | INFEASIBLE | TIMEOUT | CANCELLED }
//! SOLVED -- change-set --> RE-SEARCHING -> { SOLVED | INFEASIBLE | TIMEOUT | CANCELLED }
//! ```
//!
//! Schedules are published as `Arc<Schedule>`: readers keep the value they
//! were handed, and a later run never mutates it.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::change::ChangeSet;
use super::reoptimizer::{ReoptimizeOutcome, Reoptimizer};
use crate::compile::compile;
use crate::config::SolverConfig;
use crate::error::{Error, Result};
use crate::models::{DomainModel, Schedule};
use crate::search::{solve_compiled, CancellationToken, SolveOutcome, SolveStatus};

/// Phase of the planner's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RunPhase {
    Init,
    Compiling,
    Searching,
    Solved,
    Infeasible,
    Timeout,
    Cancelled,
    ReSearching,
}

impl RunPhase {
    /// Phase reached by a run ending with `status`.
    pub fn from_status(status: SolveStatus) -> Self {
        match status {
            SolveStatus::FeasibleOptimal | SolveStatus::FeasibleSuboptimal => Self::Solved,
            SolveStatus::Infeasible => Self::Infeasible,
            SolveStatus::TimeoutNoSolution => Self::Timeout,
            SolveStatus::Cancelled => Self::Cancelled,
        }
    }

    /// Whether a run in this phase has finished.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Solved | Self::Infeasible | Self::Timeout | Self::Cancelled
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Init => "INIT",
            Self::Compiling => "COMPILING",
            Self::Searching => "SEARCHING",
            Self::Solved => "SOLVED",
            Self::Infeasible => "INFEASIBLE",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::ReSearching => "RE-SEARCHING",
        };
        f.write_str(text)
    }
}

/// Owns the current model snapshot, configuration and published schedule.
#[derive(Debug)]
pub struct Planner {
    model: DomainModel,
    config: SolverConfig,
    phase: RunPhase,
    published: Option<Arc<Schedule>>,
    last_outcome: Option<SolveOutcome>,
    transitions: Vec<RunPhase>,
}

impl Planner {
    pub fn new(model: DomainModel, config: SolverConfig) -> Self {
        Self {
            model,
            config,
            phase: RunPhase::Init,
            published: None,
            last_outcome: None,
            transitions: vec![RunPhase::Init],
        }
    }

    #[inline]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[inline]
    pub fn model(&self) -> &DomainModel {
        &self.model
    }

    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The last published schedule, if the last run was feasible.
    pub fn published(&self) -> Option<Arc<Schedule>> {
        self.published.clone()
    }

    pub fn last_outcome(&self) -> Option<&SolveOutcome> {
        self.last_outcome.as_ref()
    }

    /// Every phase entered so far, in order.
    pub fn transitions(&self) -> &[RunPhase] {
        &self.transitions
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!(from = %self.phase, to = %phase, "planner transition");
        self.phase = phase;
        self.transitions.push(phase);
    }

    /// Restores a phase after a rejected input, without recording a
    /// transition.
    fn revert(&mut self, phase: RunPhase) {
        self.transitions.pop();
        self.phase = phase;
    }

    fn finish(&mut self, outcome: &SolveOutcome) {
        self.published = match (&outcome.schedule, outcome.status.is_feasible()) {
            (Some(schedule), true) => Some(Arc::new(schedule.clone())),
            _ => None,
        };
        self.enter(RunPhase::from_status(outcome.status));
    }

    /// Solves the current model from scratch.
    ///
    /// A configuration error leaves the planner exactly as it was.
    pub fn solve(&mut self, cancel: &CancellationToken) -> Result<&SolveOutcome> {
        let before = self.phase;
        self.enter(RunPhase::Compiling);
        let model = self.model.clone();
        let compiled = match compile(&model, &self.config) {
            Ok(compiled) => compiled,
            Err(err) => {
                self.revert(before);
                return Err(err.into());
            }
        };
        self.enter(RunPhase::Searching);
        let outcome = solve_compiled(&compiled, cancel);
        self.finish(&outcome);
        let outcome: &SolveOutcome = self.last_outcome.insert(outcome);
        Ok(outcome)
    }

    /// Applies a change-set to a solved planner and re-optimizes.
    ///
    /// Fails with [`Error::NoPublishedSchedule`] unless the planner is
    /// `SOLVED`. A configuration error leaves the planner as it was.
    pub fn apply_changes(
        &mut self,
        changes: &ChangeSet,
        cancel: &CancellationToken,
    ) -> Result<ReoptimizeOutcome> {
        let prior = match (&self.published, self.phase) {
            (Some(prior), RunPhase::Solved) => Arc::clone(prior),
            _ => return Err(Error::NoPublishedSchedule { phase: self.phase }),
        };

        self.enter(RunPhase::ReSearching);
        let reoptimizer = Reoptimizer::new(self.config.clone());
        let result = match reoptimizer.reoptimize(&prior, &self.model, changes, cancel) {
            Ok(result) => result,
            Err(err) => {
                self.revert(RunPhase::Solved);
                return Err(err.into());
            }
        };

        self.model = result.model.clone();
        self.config = result.config.clone();
        self.finish(&result.outcome);
        self.last_outcome = Some(result.outcome.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{contiguous_slots, Room, Session};

    fn planner() -> Planner {
        let model = DomainModel::new()
            .with_sessions([
                Session::new("A").with_attendance(200),
                Session::new("B").with_attendance(80),
                Session::new("C").with_attendance(500),
            ])
            .with_rooms([Room::new("R1", 600), Room::new("R2", 100)])
            .with_slots(contiguous_slots("t", 2, 0, 3_600_000));
        Planner::new(model, SolverConfig::default())
    }

    #[test]
    fn test_solve_transitions() {
        let mut planner = planner();
        let status = planner.solve(&CancellationToken::new()).unwrap().status;
        assert_eq!(status, SolveStatus::FeasibleOptimal);
        assert_eq!(planner.phase(), RunPhase::Solved);
        assert_eq!(
            planner.transitions(),
            &[RunPhase::Init, RunPhase::Compiling, RunPhase::Searching, RunPhase::Solved]
        );
        assert!(planner.published().is_some());
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_every_transition_is_traced() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut planner = planner();
        tracing::subscriber::with_default(subscriber, || {
            planner.solve(&CancellationToken::new()).unwrap();
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let traced = logs.lines().filter(|l| l.contains("planner transition")).count();
        assert_eq!(traced, planner.transitions().len() - 1);
        assert!(logs.contains("to=SEARCHING"));
    }

    #[test]
    fn test_changes_require_solved_state() {
        let mut planner = planner();
        let err = planner
            .apply_changes(&ChangeSet::new(), &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err, Error::NoPublishedSchedule { phase: RunPhase::Init });
        assert!(err.to_string().contains("INIT"));
    }

    #[test]
    fn test_re_search_to_infeasible() {
        let mut planner = planner();
        planner.solve(&CancellationToken::new()).unwrap();
        let first = planner.published().unwrap();

        let result = planner
            .apply_changes(&ChangeSet::new().remove_room("R1"), &CancellationToken::new())
            .unwrap();
        assert_eq!(result.outcome.status, SolveStatus::Infeasible);
        assert_eq!(planner.phase(), RunPhase::Infeasible);
        assert!(planner.published().is_none());
        assert_eq!(planner.transitions().last(), Some(&RunPhase::Infeasible));
        assert!(planner.transitions().contains(&RunPhase::ReSearching));
        // earlier readers keep their snapshot
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_configuration_error_leaves_state() {
        let mut planner = planner();
        planner.solve(&CancellationToken::new()).unwrap();
        let before = planner.transitions().len();
        let err = planner
            .apply_changes(&ChangeSet::new().remove_room("R9"), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(planner.phase(), RunPhase::Solved);
        assert_eq!(planner.transitions().len(), before);
        assert_eq!(planner.model().rooms.len(), 2);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RunPhase::ReSearching.to_string(), "RE-SEARCHING");
        assert!(RunPhase::Timeout.is_terminal());
        assert!(!RunPhase::Searching.is_terminal());
    }
}
