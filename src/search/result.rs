use serde::Serialize;
use std::fmt;

use super::stats::SearchStatistics;
use crate::models::{ConstraintKind, Schedule};
use crate::objective::ScoreBreakdown;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Search space exhausted; the returned schedule is optimal.
    FeasibleOptimal,
    /// Budget expired after a feasible schedule was found.
    FeasibleSuboptimal,
    /// Proven that no schedule satisfies the hard constraints.
    Infeasible,
    /// Budget expired before any feasible schedule was found.
    TimeoutNoSolution,
    /// The caller cancelled the run.
    Cancelled,
}

impl SolveStatus {
    /// Whether the status carries a feasible schedule.
    pub fn is_feasible(self) -> bool {
        matches!(self, Self::FeasibleOptimal | Self::FeasibleSuboptimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::FeasibleOptimal => "FEASIBLE_OPTIMAL",
            Self::FeasibleSuboptimal => "FEASIBLE_SUBOPTIMAL",
            Self::Infeasible => "INFEASIBLE",
            Self::TimeoutNoSolution => "TIMEOUT_NO_SOLUTION",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(text)
    }
}

/// Sessions and constraints that cannot be satisfied together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictCore {
    /// Session ids in the conflicting subset, ascending.
    pub sessions: Vec<String>,
    /// Constraint kinds whose relaxation makes the subset schedulable
    /// (or every kind involved when no single relaxation suffices).
    pub constraints: Vec<ConstraintKind>,
    /// False when some probe ran out of budget, so the subset may contain
    /// sessions that are not needed for the conflict.
    pub minimal: bool,
}

/// Everything a run returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveOutcome {
    /// Terminal status.
    pub status: SolveStatus,
    /// Best schedule found (present for feasible statuses, and for
    /// `Cancelled` when an incumbent existed).
    pub schedule: Option<Schedule>,
    /// Score of `schedule`.
    pub score: Option<ScoreBreakdown>,
    /// Conflict explanation for `Infeasible`, when diagnostics are enabled.
    pub conflict: Option<ConflictCore>,
    /// Search counters.
    pub stats: SearchStatistics,
}

impl SolveOutcome {
    /// Whether a feasible schedule was returned.
    pub fn is_feasible(&self) -> bool {
        self.status.is_feasible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(SolveStatus::FeasibleOptimal.to_string(), "FEASIBLE_OPTIMAL");
        assert_eq!(SolveStatus::TimeoutNoSolution.to_string(), "TIMEOUT_NO_SOLUTION");
        assert!(SolveStatus::FeasibleSuboptimal.is_feasible());
        assert!(!SolveStatus::Cancelled.is_feasible());
    }
}
