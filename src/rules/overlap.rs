//! Specialist overlap detection.
//!
//! A teacher is double-booked when two classes hold them as a `special`
//! cell at the same week/period/day.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{grid_positions, ScheduleStore};

/// Classes other than `exclude_class` holding `teacher_id` at the same
/// week/period/day.
///
/// # Example
/// ```
/// use u_timetable::models::{Cell, ScheduleStore, Slot, Teacher};
/// use u_timetable::rules::find_overlaps;
///
/// let pe = Teacher::new("T1", "Kim", "체육").with_classes([1, 2]);
/// let mut store = ScheduleStore::filled(1, 2, |s| Cell::empty(s));
/// for class in [1, 2] {
///     let slot = Slot::new(1, class, 0, 0);
///     store.set_cell(&slot, Cell::special(&slot, &pe, None)).unwrap();
/// }
/// assert_eq!(find_overlaps(&store, 1, 2, 0, 0, "T1"), vec![1]);
/// ```
pub fn find_overlaps(
    store: &ScheduleStore,
    week: u32,
    exclude_class: u32,
    period: usize,
    day: usize,
    teacher_id: &str,
) -> Vec<u32> {
    find_overlaps_excluding(store, week, &[exclude_class], period, day, teacher_id)
}

/// Like [`find_overlaps`] but excludes several classes.
pub fn find_overlaps_excluding(
    store: &ScheduleStore,
    week: u32,
    exclude: &[u32],
    period: usize,
    day: usize,
    teacher_id: &str,
) -> Vec<u32> {
    if teacher_id.is_empty() {
        return Vec::new();
    }
    store
        .cells_at(week, period, day)
        .filter(|(class, cell)| !exclude.contains(class) && cell.is_taught_by(teacher_id))
        .map(|(class, _)| class)
        .collect()
}

/// A teacher held by more than one class at the same moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleBooking {
    pub week: u32,
    pub period: usize,
    pub day: usize,
    pub teacher_id: String,
    /// Classes holding the teacher, ascending.
    pub classes: Vec<u32>,
    /// Whether at least one implicated cell carries `forced_conflict`.
    pub forced: bool,
}

/// Scans a week for every double-booked teacher.
pub fn find_double_bookings(store: &ScheduleStore, week: u32) -> Vec<DoubleBooking> {
    let mut out = Vec::new();
    for (period, day) in grid_positions() {
        let mut by_teacher: BTreeMap<&str, (Vec<u32>, bool)> = BTreeMap::new();
        for (class, cell) in store.cells_at(week, period, day) {
            if !cell.is_special() {
                continue;
            }
            let Some(teacher_id) = cell.teacher_id.as_deref() else {
                continue;
            };
            let entry = by_teacher.entry(teacher_id).or_default();
            entry.0.push(class);
            entry.1 |= cell.forced_conflict;
        }
        for (teacher_id, (classes, forced)) in by_teacher {
            if classes.len() > 1 {
                out.push(DoubleBooking {
                    week,
                    period,
                    day,
                    teacher_id: teacher_id.to_string(),
                    classes,
                    forced,
                });
            }
        }
    }
    out
}
