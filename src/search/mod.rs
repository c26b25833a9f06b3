//! Search and propagation engine.
//!
//! Explores the compiled candidate domains for an assignment satisfying
//! every active hard constraint, maximizing the weighted objective within
//! an explicit node/wall-clock budget.
//!
//! # Outcomes
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `FeasibleOptimal` | tree exhausted, best schedule returned |
//! | `FeasibleSuboptimal` | budget expired, incumbent returned |
//! | `Infeasible` | tree exhausted without a schedule (conflict core attached) |
//! | `TimeoutNoSolution` | budget expired before any schedule |
//! | `Cancelled` | caller cancelled, incumbent (if any) returned |
//!
//! All search state lives in the run; concurrent runs share nothing
//! mutable. Identical inputs and node budgets give identical schedules.
//!
//! # Example
//!
//! ```
//! use u_timetable::models::{contiguous_slots, DomainModel, Room, Session};
//! use u_timetable::config::SolverConfig;
//! use u_timetable::search::{solve, CancellationToken, SolveStatus};
//!
//! let model = DomainModel::new()
//!     .with_sessions([Session::new("A").with_attendance(40), Session::new("B").with_attendance(40)])
//!     .with_room(Room::new("R1", 50))
//!     .with_slots(contiguous_slots("t", 2, 0, 3_600_000));
//!
//! let outcome = solve(&model, &SolverConfig::default(), &CancellationToken::new()).unwrap();
//! assert_eq!(outcome.status, SolveStatus::FeasibleOptimal);
//! assert_eq!(outcome.schedule.unwrap().len(), 2);
//! ```

mod cancel;
pub(crate) mod engine;
mod explain;
mod result;
mod state;
mod stats;

pub use cancel::CancellationToken;
pub use result::{ConflictCore, SolveOutcome, SolveStatus};
pub use stats::SearchStatistics;

use std::time::Instant;

use tracing::{info, warn};

use crate::compile::{compile, CompiledModel, Placement};
use crate::config::SolverConfig;
use crate::error::ConfigurationError;
use crate::models::{Assignment, DomainModel, Schedule};
use engine::{SearchEngine, SearchRun, Termination};

/// Compiles and solves a model.
///
/// Only malformed input is an `Err`; every search result, including
/// infeasibility and budget expiry, is an `Ok` outcome.
pub fn solve(
    model: &DomainModel,
    config: &SolverConfig,
    cancel: &CancellationToken,
) -> Result<SolveOutcome, ConfigurationError> {
    let compiled = compile(model, config)?;
    Ok(solve_compiled(&compiled, cancel))
}

/// Solves an already compiled model.
pub fn solve_compiled(compiled: &CompiledModel<'_>, cancel: &CancellationToken) -> SolveOutcome {
    let deadline = compiled.config().budget.deadline(Instant::now());
    solve_until(compiled, deadline, cancel)
}

/// Solves an already compiled model, search and explanation both stopping
/// at `deadline`.
pub(crate) fn solve_until(
    compiled: &CompiledModel<'_>,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> SolveOutcome {
    info!(
        sessions = compiled.session_count(),
        rooms = compiled.room_count(),
        slots = compiled.slot_count(),
        "search started"
    );
    if !compiled.empty_domains().is_empty() {
        let outcome = SolveOutcome {
            status: SolveStatus::Infeasible,
            schedule: None,
            score: None,
            conflict: compiled
                .config()
                .diagnostics
                .explain_infeasibility
                .then(|| explain::core_from_empty_domains(compiled)),
            stats: SearchStatistics::default(),
        };
        info!(status = %outcome.status, "search finished before branching");
        return outcome;
    }

    let run = SearchEngine::new(compiled, compiled.config().budget, cancel.clone())
        .with_deadline(deadline)
        .run();
    conclude(compiled, run, deadline, cancel)
}

/// Maps a finished run to an outcome, explaining infeasibility when
/// diagnostics are on and `deadline` has not passed.
pub(crate) fn conclude(
    compiled: &CompiledModel<'_>,
    run: SearchRun,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> SolveOutcome {
    let SearchRun {
        termination,
        incumbent,
        stats,
    } = run;

    let status = match (termination, incumbent.is_some()) {
        (Termination::Cancelled, _) => SolveStatus::Cancelled,
        (Termination::Exhausted, true) => SolveStatus::FeasibleOptimal,
        (Termination::Exhausted, false) => SolveStatus::Infeasible,
        (Termination::Budget | Termination::Stopped, true) => SolveStatus::FeasibleSuboptimal,
        (Termination::Budget | Termination::Stopped, false) => SolveStatus::TimeoutNoSolution,
    };

    match status {
        SolveStatus::FeasibleSuboptimal => warn!(
            nodes = stats.nodes,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "budget expired; returning best incumbent"
        ),
        SolveStatus::TimeoutNoSolution => warn!(
            nodes = stats.nodes,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "budget expired before any feasible schedule"
        ),
        _ => {}
    }

    let conflict = if status == SolveStatus::Infeasible
        && compiled.config().diagnostics.explain_infeasibility
    {
        explain::explain(compiled, deadline, cancel)
    } else {
        None
    };

    let (schedule, score) = match incumbent {
        Some(best) => (Some(to_schedule(compiled, &best.placements)), Some(best.score)),
        None => (None, None),
    };

    info!(
        %status,
        score = score.map(|s| s.total),
        nodes = stats.nodes,
        backtracks = stats.backtracks,
        "search finished"
    );

    SolveOutcome {
        status,
        schedule,
        score,
        conflict,
        stats,
    }
}

/// Converts compiled placements to a public schedule.
pub(crate) fn to_schedule(compiled: &CompiledModel<'_>, placements: &[Placement]) -> Schedule {
    let model = compiled.model();
    let mut schedule = Schedule::new();
    for p in placements {
        let session = compiled.session(p.session);
        let first = compiled.slot(p.start);
        let last = compiled.slot(p.end - 1);
        schedule.insert(
            Assignment::new(&session.id, &model.rooms[p.room].id, &first.id)
                .with_span(&last.id, session.duration)
                .with_times(first.start_ms, last.end_ms),
        );
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{contiguous_slots, HardConstraint, Room, Session, Slot};
    use crate::validation::check_schedule;

    fn scenario() -> DomainModel {
        DomainModel::new()
            .with_sessions([
                Session::new("A").with_attendance(200),
                Session::new("B").with_attendance(80),
                Session::new("C").with_attendance(500),
            ])
            .with_rooms([Room::new("R1", 600), Room::new("R2", 100)])
            .with_slots([
                Slot::new("09:00", 0, 0, 3_600_000),
                Slot::new("10:00", 1, 3_600_000, 7_200_000),
            ])
    }

    #[test]
    fn test_scenario_is_solved_optimally() {
        let model = scenario();
        let config = SolverConfig::default();
        let outcome = solve(&model, &config, &CancellationToken::new()).unwrap();
        assert_eq!(outcome.status, SolveStatus::FeasibleOptimal);
        let schedule = outcome.schedule.unwrap();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule.get("C").unwrap().room_id, "R1");
        assert!(check_schedule(&schedule, &model, &config.hard_constraints).is_empty());
    }

    #[test]
    fn test_removing_only_large_room_is_infeasible() {
        let mut model = scenario();
        model.rooms.retain(|r| r.id != "R1");
        let outcome = solve(&model, &SolverConfig::default(), &CancellationToken::new()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.schedule.is_none());
        let core = outcome.conflict.unwrap();
        assert!(core.sessions.contains(&"C".to_string()));
    }

    #[test]
    fn test_schedule_has_timing() {
        let model = DomainModel::new()
            .with_session(Session::new("W").with_duration(2))
            .with_room(Room::new("R", 10))
            .with_slots(contiguous_slots("t", 3, 0, 100));
        let outcome = solve(&model, &SolverConfig::default(), &CancellationToken::new()).unwrap();
        let a = outcome.schedule.unwrap().get("W").cloned().unwrap();
        assert_eq!(a.start_slot_id, "t0");
        assert_eq!(a.end_slot_id, "t1");
        assert_eq!((a.start_ms, a.end_ms), (0, 200));
        assert_eq!(a.duration, 2);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = solve(&scenario(), &SolverConfig::default(), &cancel).unwrap();
        assert_eq!(outcome.status, SolveStatus::Cancelled);
    }

    #[test]
    fn test_timeout_without_solution() {
        let model = DomainModel::new()
            .with_sessions((0..8).map(|i| Session::new(format!("S{i:02}"))))
            .with_rooms([Room::new("R1", 10), Room::new("R2", 10)])
            .with_slots(contiguous_slots("t", 4, 0, 60));
        let config = SolverConfig::default().with_max_nodes(2);
        let outcome = solve(&model, &config, &CancellationToken::new()).unwrap();
        assert_eq!(outcome.status, SolveStatus::TimeoutNoSolution);
        assert!(outcome.schedule.is_none());
    }

    #[test]
    fn test_disabled_room_exclusivity_allows_sharing() {
        let model = DomainModel::new()
            .with_sessions([Session::new("A"), Session::new("B")])
            .with_room(Room::new("R", 10))
            .with_slot(Slot::new("t0", 0, 0, 60));
        let strict = solve(&model, &SolverConfig::default(), &CancellationToken::new()).unwrap();
        assert_eq!(strict.status, SolveStatus::Infeasible);

        let relaxed = SolverConfig::default().without_hard_constraint(HardConstraint::RoomExclusivity);
        let outcome = solve(&model, &relaxed, &CancellationToken::new()).unwrap();
        assert_eq!(outcome.status, SolveStatus::FeasibleOptimal);
    }
}
