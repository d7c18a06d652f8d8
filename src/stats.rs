//! Weekly timetable statistics.
//!
//! Read-only aggregates computed from one week of a schedule. Nothing
//! here enforces anything; it reports.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Subject hours | Lessons per subject per class |
//! | Teacher load | Specialist lessons per teacher across classes |
//! | Holiday / forced / empty cells | Counts by cell state |
//! | Double bookings | Moments holding a teacher in several classes |
//! | Deficits | Standard weekly hours not reached, per class and subject |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{CellType, ScheduleStore};
use crate::rules::find_double_bookings;

/// A subject taught fewer hours than its weekly standard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourDeficit {
    pub class: u32,
    pub subject: String,
    /// Standard weekly hours.
    pub expected: f64,
    /// Lessons actually scheduled.
    pub actual: usize,
}

impl HourDeficit {
    /// Missing hours (positive).
    pub fn shortfall(&self) -> f64 {
        self.expected - self.actual as f64
    }
}

/// Statistics for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableStats {
    pub week: u32,
    /// Lessons per subject for each class.
    pub subject_hours: BTreeMap<u32, BTreeMap<String, usize>>,
    /// Specialist lessons per teacher id.
    pub teacher_load: BTreeMap<String, usize>,
    pub holiday_cells: usize,
    pub forced_cells: usize,
    pub empty_cells: usize,
    /// Double-booked moments (forced or not).
    pub double_bookings: usize,
    /// Subjects below their standard hours, by class then subject.
    pub deficits: Vec<HourDeficit>,
}

impl TimetableStats {
    /// Computes statistics for `week`.
    ///
    /// # Arguments
    /// * `store` - The schedule.
    /// * `week` - Week key; an unknown week yields all-zero statistics.
    /// * `standard_hours` - Expected weekly lessons per subject.
    pub fn calculate(
        store: &ScheduleStore,
        week: u32,
        standard_hours: &BTreeMap<String, f64>,
    ) -> Self {
        let mut subject_hours: BTreeMap<u32, BTreeMap<String, usize>> = BTreeMap::new();
        let mut teacher_load: BTreeMap<String, usize> = BTreeMap::new();
        let mut holiday_cells = 0;
        let mut forced_cells = 0;
        let mut empty_cells = 0;

        if let Some(schedule) = store.week(week) {
            for (class, grid) in schedule.iter() {
                let hours = subject_hours.entry(class).or_default();
                for (_, _, cell) in grid.iter() {
                    if cell.forced_conflict {
                        forced_cells += 1;
                    }
                    match cell.cell_type {
                        CellType::Empty => empty_cells += 1,
                        CellType::Holiday => holiday_cells += 1,
                        CellType::Homeroom => *hours.entry(cell.subject.clone()).or_default() += 1,
                        CellType::Special => {
                            *hours.entry(cell.subject.clone()).or_default() += 1;
                            if let Some(id) = cell.teacher_key() {
                                *teacher_load.entry(id.to_string()).or_default() += 1;
                            }
                        }
                    }
                }
            }
        }

        let mut deficits = Vec::new();
        for (&class, hours) in &subject_hours {
            for (subject, &expected) in standard_hours {
                let actual = hours.get(subject).copied().unwrap_or(0);
                if (actual as f64) < expected {
                    deficits.push(HourDeficit {
                        class,
                        subject: subject.clone(),
                        expected,
                        actual,
                    });
                }
            }
        }

        Self {
            week,
            subject_hours,
            teacher_load,
            holiday_cells,
            forced_cells,
            empty_cells,
            double_bookings: find_double_bookings(store, week).len(),
            deficits,
        }
    }

    /// Lessons of `subject` in `class`.
    pub fn hours(&self, class: u32, subject: &str) -> usize {
        self.subject_hours
            .get(&class)
            .and_then(|h| h.get(subject))
            .copied()
            .unwrap_or(0)
    }

    /// Whether every class meets every standard.
    pub fn meets_standard(&self) -> bool {
        self.deficits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, Slot, Teacher};

    fn sample() -> ScheduleStore {
        let pe = Teacher::new("T1", "Kim", "체육");
        let mut store = ScheduleStore::filled(1, 2, |s| Cell::homeroom(s, "국어"));
        for class in [1, 2] {
            let slot = Slot::new(1, class, 0, class as usize);
            store.set_cell(&slot, Cell::special(&slot, &pe, None)).unwrap();
        }
        let h = Slot::new(1, 1, 5, 4);
        store.set_cell(&h, Cell::holiday(&h)).unwrap();
        let e = Slot::new(1, 2, 5, 4);
        store.set_cell(&e, Cell::empty(&e)).unwrap();
        store
    }

    #[test]
    fn test_stats_basic() {
        let stats = TimetableStats::calculate(&sample(), 1, &BTreeMap::new());
        assert_eq!(stats.hours(1, "국어"), 28);
        assert_eq!(stats.hours(1, "체육"), 1);
        assert_eq!(stats.hours(2, "국어"), 28);
        assert_eq!(stats.teacher_load.get("T1"), Some(&2));
        assert_eq!(stats.holiday_cells, 1);
        assert_eq!(stats.empty_cells, 1);
        assert_eq!(stats.forced_cells, 0);
        assert_eq!(stats.double_bookings, 0);
        assert!(stats.meets_standard());
    }

    #[test]
    fn test_stats_deficits() {
        let standard = BTreeMap::from([("체육".to_string(), 2.0), ("국어".to_string(), 20.0)]);
        let stats = TimetableStats::calculate(&sample(), 1, &standard);
        assert_eq!(stats.deficits.len(), 2);
        assert!(stats.deficits.iter().all(|d| d.subject == "체육"));
        assert_eq!(stats.deficits[0].shortfall(), 1.0);
        assert!(!stats.meets_standard());
    }

    #[test]
    fn test_stats_unknown_week() {
        let stats = TimetableStats::calculate(&sample(), 9, &BTreeMap::new());
        assert!(stats.subject_hours.is_empty());
        assert_eq!(stats.holiday_cells, 0);
    }
}
