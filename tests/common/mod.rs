// ==========================================
// Shared helpers for integration tests
// ==========================================

#![allow(dead_code)]

use tracing_subscriber::{fmt, EnvFilter};
use u_timetable::prelude::*;

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

/// Sessions A(200), B(80), C(500); rooms R1(600), R2(100); two one-hour slots.
pub fn abc_scenario() -> DomainModel {
    DomainModel::new()
        .with_sessions([
            Session::new("A").with_title("Opening talk").with_attendance(200),
            Session::new("B").with_title("Workshop").with_attendance(80),
            Session::new("C").with_title("Plenary").with_attendance(500),
        ])
        .with_rooms([Room::new("R1", 600), Room::new("R2", 100)])
        .with_slots([
            Slot::new("09:00", 0, 9 * 3_600_000, 10 * 3_600_000),
            Slot::new("10:00", 1, 10 * 3_600_000, 11 * 3_600_000),
        ])
}

/// Asserts that a schedule places every session and breaks no hard rule.
pub fn assert_sound(schedule: &Schedule, model: &DomainModel, config: &SolverConfig) {
    assert_eq!(schedule.len(), model.sessions.len(), "every session placed once");
    let violations = u_timetable::validation::check_schedule(schedule, model, &config.hard_constraints);
    assert!(violations.is_empty(), "violations: {violations:?}");
}
