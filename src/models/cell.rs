//! Slot and cell models.
//!
//! A [`Slot`] addresses one lesson position in the timetable; a [`Cell`]
//! is what occupies it. The weekly grid is always total: every slot holds
//! exactly one cell, with [`CellType::Empty`] marking an unused lesson.

use serde::{Deserialize, Serialize};

use super::Teacher;

/// Lessons per day.
pub const PERIOD_COUNT: usize = 6;
/// School days per week (Monday..Friday).
pub const DAY_COUNT: usize = 5;
/// Short day labels, indexed by day.
pub const DAY_NAMES: [&str; DAY_COUNT] = ["Mon", "Tue", "Wed", "Thu", "Fri"];
/// Subject label written into holiday cells.
pub const HOLIDAY_SUBJECT: &str = "휴일";

/// A position in the timetable: `(week, class, period, day)`.
///
/// Classes are identified by their 1-based class number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    /// Week key (1-based).
    pub week: u32,
    /// Class number (1-based).
    pub class: u32,
    /// Period index in `0..PERIOD_COUNT`.
    pub period: usize,
    /// Day index in `0..DAY_COUNT` (0 = Monday).
    pub day: usize,
}

impl Slot {
    /// Creates a new slot.
    pub fn new(week: u32, class: u32, period: usize, day: usize) -> Self {
        Self {
            week,
            class,
            period,
            day,
        }
    }

    /// Whether period and day fall inside the weekly grid.
    #[inline]
    pub fn in_grid(&self) -> bool {
        self.period < PERIOD_COUNT && self.day < DAY_COUNT
    }

    /// Same week and class, different position.
    pub fn at(&self, period: usize, day: usize) -> Self {
        Self {
            period,
            day,
            ..*self
        }
    }

    /// Same position in another class.
    pub fn in_class(&self, class: u32) -> Self {
        Self { class, ..*self }
    }

    /// Same position in another week.
    pub fn in_week(&self, week: u32) -> Self {
        Self { week, ..*self }
    }

    /// Stable cell id derived from this slot.
    pub fn cell_id(&self) -> String {
        format!("w{}-c{}-p{}-d{}", self.week, self.class, self.period, self.day)
    }

    /// Whether two slots share week, period, and day (same moment in time).
    #[inline]
    pub fn same_time(&self, other: &Slot) -> bool {
        self.week == other.week && self.period == other.period && self.day == other.day
    }
}

/// Classification of a cell's occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// No lesson.
    #[default]
    Empty,
    /// Taught by the class's own homeroom teacher.
    Homeroom,
    /// Taught by a specialist teacher, tracked by teacher id.
    Special,
    /// School holiday; carries no teacher or location.
    Holiday,
}

/// The occupant of a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Stable id derived from the slot.
    pub id: String,
    /// Subject name; empty means unoccupied.
    pub subject: String,
    /// Occupant classification.
    #[serde(rename = "type")]
    pub cell_type: CellType,
    /// Specialist teacher id (present iff `Special`).
    pub teacher_id: Option<String>,
    /// Specialist teacher display name (present iff `Special`).
    pub teacher: Option<String>,
    /// Free-text location.
    pub location: Option<String>,
    /// Placed by overriding a legality check. Advisory only.
    #[serde(default)]
    pub forced_conflict: bool,
}

impl Cell {
    /// An unoccupied cell.
    pub fn empty(slot: &Slot) -> Self {
        Self {
            id: slot.cell_id(),
            subject: String::new(),
            cell_type: CellType::Empty,
            teacher_id: None,
            teacher: None,
            location: None,
            forced_conflict: false,
        }
    }

    /// A homeroom lesson. A blank subject yields an empty cell.
    pub fn homeroom(slot: &Slot, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Self::empty(slot);
        }
        Self {
            subject,
            cell_type: CellType::Homeroom,
            ..Self::empty(slot)
        }
    }

    /// A specialist lesson taught by `teacher`.
    pub fn special(slot: &Slot, teacher: &Teacher, location: Option<String>) -> Self {
        Self {
            subject: teacher.subject.clone(),
            cell_type: CellType::Special,
            teacher_id: Some(teacher.id.clone()),
            teacher: Some(teacher.name.clone()),
            location,
            ..Self::empty(slot)
        }
    }

    /// A holiday cell.
    pub fn holiday(slot: &Slot) -> Self {
        Self {
            subject: HOLIDAY_SUBJECT.to_string(),
            cell_type: CellType::Holiday,
            ..Self::empty(slot)
        }
    }

    /// Marks the cell as placed through a forced override.
    pub fn with_forced_conflict(mut self, forced: bool) -> Self {
        self.forced_conflict = forced;
        self
    }

    /// The same content, re-identified for another slot.
    pub fn relocated(&self, slot: &Slot) -> Self {
        Self {
            id: slot.cell_id(),
            ..self.clone()
        }
    }

    #[inline]
    pub fn is_special(&self) -> bool {
        self.cell_type == CellType::Special
    }

    #[inline]
    pub fn is_holiday(&self) -> bool {
        self.cell_type == CellType::Holiday
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cell_type == CellType::Empty
    }

    /// Whether the cell is held by `teacher_id` as a specialist lesson.
    pub fn is_taught_by(&self, teacher_id: &str) -> bool {
        self.is_special() && self.teacher_id.as_deref() == Some(teacher_id)
    }

    /// Specialist identity key: teacher id, else display name.
    ///
    /// `None` for non-specialist cells.
    pub fn teacher_key(&self) -> Option<&str> {
        if !self.is_special() {
            return None;
        }
        self.teacher_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or(self.teacher.as_deref())
    }
}

/// Iterates every `(period, day)` position of the weekly grid, row-major.
pub fn grid_positions() -> impl Iterator<Item = (usize, usize)> {
    (0..PERIOD_COUNT).flat_map(|p| (0..DAY_COUNT).map(move |d| (p, d)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn pe_teacher() -> Teacher {
        Teacher::new("T1", "Kim", "체육").with_classes([1, 2])
    }

    #[test]
    fn test_slot_helpers() {
        let s = Slot::new(3, 2, 1, 4);
        assert!(s.in_grid());
        assert_eq!(s.cell_id(), "w3-c2-p1-d4");
        assert_eq!(s.at(0, 0), Slot::new(3, 2, 0, 0));
        assert_eq!(s.in_class(5), Slot::new(3, 5, 1, 4));
        assert!(s.same_time(&s.in_class(7)));
        assert!(!s.same_time(&s.in_week(4)));
        assert!(!Slot::new(1, 1, PERIOD_COUNT, 0).in_grid());
    }

    #[test]
    fn test_cell_constructors() {
        let slot = Slot::new(1, 1, 0, 0);
        let t = pe_teacher();

        let c = Cell::special(&slot, &t, Some("강당".into()));
        assert!(c.is_special());
        assert_eq!(c.subject, "체육");
        assert_eq!(c.teacher_key(), Some("T1"));
        assert!(c.is_taught_by("T1"));
        assert!(!c.forced_conflict);

        let h = Cell::holiday(&slot);
        assert!(h.is_holiday());
        assert!(h.teacher_id.is_none() && h.location.is_none());
        assert_eq!(h.teacher_key(), None);

        assert!(Cell::homeroom(&slot, "  ").is_empty());
        assert_eq!(Cell::homeroom(&slot, "국어").cell_type, CellType::Homeroom);
    }

    #[test]
    fn test_teacher_key_falls_back_to_name() {
        let slot = Slot::new(1, 1, 0, 0);
        let mut c = Cell::special(&slot, &pe_teacher(), None);
        c.teacher_id = None;
        assert_eq!(c.teacher_key(), Some("Kim"));
    }

    #[test]
    fn test_relocated_keeps_content() {
        let c = Cell::homeroom(&Slot::new(1, 1, 0, 0), "수학");
        let moved = c.relocated(&Slot::new(1, 1, 2, 3));
        assert_eq!(moved.id, "w1-c1-p2-d3");
        assert_eq!(moved.subject, "수학");
    }

    #[test]
    fn test_grid_positions_cover_grid() {
        let all: BTreeSet<_> = grid_positions().collect();
        assert_eq!(all.len(), PERIOD_COUNT * DAY_COUNT);
    }

    #[test]
    fn test_cell_serde_shape() {
        let c = Cell::special(&Slot::new(1, 2, 0, 1), &pe_teacher(), None);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "special");
        assert_eq!(json["teacherId"], "T1");
        assert_eq!(json["forcedConflict"], false);
    }
}
