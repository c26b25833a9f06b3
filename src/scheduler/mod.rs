//! Reporting and batch evaluation.
//!
//! # KPI
//!
//! `ScheduleKpi` computes timetable metrics: makespan, coverage, per-room
//! utilization, oversized placements and a room × slot grid.
//!
//! # Scenarios
//!
//! `evaluate_scenarios` solves independent what-if snapshots, concurrently
//! when the `parallel` feature is enabled.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1.2
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"

mod kpi;
mod scenarios;

pub use kpi::{RoomSlotGrid, ScheduleKpi};
pub use scenarios::{evaluate_scenarios, Scenario, ScenarioReport};
