//! Timetable quality metrics (KPIs).
//!
//! Computes reporting indicators from a schedule and its model.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Latest session end (ms) |
//! | Coverage | Assigned sessions / total sessions |
//! | Room utilization | Occupied slots / slot count, per room |
//! | Avg utilization | Mean room utilization |
//! | Oversized placements | Rooms more than twice the audience |
//!
//! A room × slot grid of session ids is available through
//! [`ScheduleKpi::grid`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{DomainModel, Schedule};

/// Timetable performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleKpi {
    /// Latest end time (ms).
    pub makespan_ms: i64,
    /// Sessions with an assignment.
    pub assigned_sessions: usize,
    /// Sessions in the model.
    pub total_sessions: usize,
    /// Per-room share of slots in use (0.0..1.0).
    pub utilization_by_room: BTreeMap<String, f64>,
    /// Mean of `utilization_by_room`.
    pub avg_utilization: f64,
    /// Assignments to a room more than twice the expected audience.
    pub oversized_placements: usize,
    /// Occupancy grid.
    pub grid: RoomSlotGrid,
}

/// Session ids laid out by room (rows) and slot (columns).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSlotGrid {
    /// Room ids, model order.
    pub rooms: Vec<String>,
    /// Slot ids, ordinal order.
    pub slots: Vec<String>,
    /// `cells[room][slot]` = occupying session.
    pub cells: Vec<Vec<Option<String>>>,
}

impl RoomSlotGrid {
    /// The session occupying a room at a slot.
    pub fn cell(&self, room_id: &str, slot_id: &str) -> Option<&str> {
        let r = self.rooms.iter().position(|id| id == room_id)?;
        let s = self.slots.iter().position(|id| id == slot_id)?;
        self.cells[r][s].as_deref()
    }
}

impl fmt::Display for RoomSlotGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .cells
            .iter()
            .flatten()
            .flatten()
            .map(String::len)
            .chain(self.slots.iter().map(String::len))
            .chain(self.rooms.iter().map(String::len))
            .max()
            .unwrap_or(1)
            .max(1);

        write!(f, "{:width$}", "")?;
        for slot in &self.slots {
            write!(f, " | {slot:width$}")?;
        }
        writeln!(f)?;
        for (room, row) in self.rooms.iter().zip(&self.cells) {
            write!(f, "{room:width$}")?;
            for cell in row {
                write!(f, " | {:width$}", cell.as_deref().unwrap_or("-"))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and its model.
    ///
    /// Assignments referencing ids the model lacks are ignored.
    pub fn calculate(schedule: &Schedule, model: &DomainModel) -> Self {
        let slots: Vec<String> = model.ordered_slots().iter().map(|s| s.id.clone()).collect();
        let rooms: Vec<String> = model.rooms.iter().map(|r| r.id.clone()).collect();
        let mut cells = vec![vec![None; slots.len()]; rooms.len()];
        let mut oversized = 0;

        for a in schedule.iter() {
            let (Some(r), Some(start)) = (
                rooms.iter().position(|id| *id == a.room_id),
                slots.iter().position(|id| *id == a.start_slot_id),
            ) else {
                continue;
            };
            let end = (start + a.duration.max(1) as usize).min(slots.len());
            for cell in &mut cells[r][start..end] {
                *cell = Some(a.session_id.clone());
            }
            let attendance = model.session(&a.session_id).map_or(0, |s| s.expected_attendance);
            if model.rooms[r].is_oversized_for(attendance) {
                oversized += 1;
            }
        }

        let utilization_by_room: BTreeMap<String, f64> = rooms
            .iter()
            .zip(&cells)
            .map(|(id, row)| {
                let used = row.iter().filter(|c| c.is_some()).count();
                let share = if slots.is_empty() {
                    0.0
                } else {
                    used as f64 / slots.len() as f64
                };
                (id.clone(), share)
            })
            .collect();
        let avg_utilization = if utilization_by_room.is_empty() {
            0.0
        } else {
            utilization_by_room.values().sum::<f64>() / utilization_by_room.len() as f64
        };

        let assigned_sessions = model
            .sessions
            .iter()
            .filter(|s| schedule.get(&s.id).is_some())
            .count();

        Self {
            makespan_ms: schedule.makespan_ms(),
            assigned_sessions,
            total_sessions: model.sessions.len(),
            utilization_by_room,
            avg_utilization,
            oversized_placements: oversized,
            grid: RoomSlotGrid {
                rooms,
                slots,
                cells,
            },
        }
    }

    /// Whether every session is assigned.
    pub fn is_complete(&self) -> bool {
        self.assigned_sessions == self.total_sessions
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_utilization: f64, max_oversized: usize) -> bool {
        self.avg_utilization >= min_utilization && self.oversized_placements <= max_oversized
    }
}
