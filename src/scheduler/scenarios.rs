//! Batch "what-if" evaluation.
//!
//! Each scenario is an independent model snapshot with its own
//! configuration. Runs share nothing mutable, so with the `parallel`
//! feature they are spread over rayon's pool; results are identical
//! either way and come back in input order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::kpi::ScheduleKpi;
use crate::config::SolverConfig;
use crate::error::ConfigurationError;
use crate::models::DomainModel;
use crate::search::{solve, CancellationToken, SolveOutcome};

/// One named what-if input.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub model: DomainModel,
    pub config: SolverConfig,
}

impl Scenario {
    pub fn new(name: impl Into<String>, model: DomainModel, config: SolverConfig) -> Self {
        Self {
            name: name.into(),
            model,
            config,
        }
    }
}

/// Result of one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub result: Result<SolveOutcome, ConfigurationError>,
    /// KPIs of the returned schedule, if any.
    pub kpi: Option<ScheduleKpi>,
}

fn evaluate_one(scenario: &Scenario, cancel: &CancellationToken) -> ScenarioReport {
    let result = solve(&scenario.model, &scenario.config, cancel);
    let kpi = result
        .as_ref()
        .ok()
        .and_then(|outcome| outcome.schedule.as_ref())
        .map(|schedule| ScheduleKpi::calculate(schedule, &scenario.model));
    ScenarioReport {
        name: scenario.name.clone(),
        result,
        kpi,
    }
}

/// Solves every scenario. One token cancels the whole batch.
pub fn evaluate_scenarios(scenarios: &[Scenario], cancel: &CancellationToken) -> Vec<ScenarioReport> {
    #[cfg(feature = "parallel")]
    {
        scenarios
            .par_iter()
            .map(|scenario| evaluate_one(scenario, cancel))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        scenarios
            .iter()
            .map(|scenario| evaluate_one(scenario, cancel))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{contiguous_slots, Room, Session};
    use crate::search::SolveStatus;

    fn base() -> DomainModel {
        DomainModel::new()
            .with_sessions([
                Session::new("A").with_attendance(200),
                Session::new("B").with_attendance(80),
                Session::new("C").with_attendance(500),
            ])
            .with_rooms([Room::new("R1", 600), Room::new("R2", 100)])
            .with_slots(contiguous_slots("t", 2, 0, 3_600_000))
    }

    #[test]
    fn test_scenarios_in_input_order() {
        let mut shrunk = base();
        shrunk.rooms.retain(|r| r.id != "R1");
        let mut broken = base();
        broken.sessions[0].duration = 5;

        let reports = evaluate_scenarios(
            &[
                Scenario::new("baseline", base(), SolverConfig::default()),
                Scenario::new("no hall", shrunk, SolverConfig::default()),
                Scenario::new("broken", broken, SolverConfig::default()),
            ],
            &CancellationToken::new(),
        );

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].name, "baseline");
        let baseline = reports[0].result.as_ref().unwrap();
        assert_eq!(baseline.status, SolveStatus::FeasibleOptimal);
        assert!(reports[0].kpi.as_ref().unwrap().is_complete());

        let no_hall = reports[1].result.as_ref().unwrap();
        assert_eq!(no_hall.status, SolveStatus::Infeasible);
        assert!(reports[1].kpi.is_none());

        assert!(reports[2].result.is_err());
    }

    #[test]
    fn test_same_results_on_repeat() {
        let scenarios = vec![Scenario::new("a", base(), SolverConfig::default()); 4];
        let reports = evaluate_scenarios(&scenarios, &CancellationToken::new());
        let first = reports[0].result.as_ref().unwrap().schedule.clone();
        assert!(reports
            .iter()
            .all(|r| r.result.as_ref().unwrap().schedule == first));
    }
}
