//! Structural validation of teacher lists, templates and schedules.
//!
//! Checks integrity before data is trusted (e.g. after loading a remote
//! snapshot) and collects every problem instead of stopping at the first.
//! Detects:
//! - Duplicate teacher IDs and incomplete teacher input
//! - Allowed classes outside the configured range
//! - Specialist cells with missing or unknown teachers
//! - Specialist cells outside the teacher's allowed classes
//! - Unforced double bookings
//! - Template authoring conflicts (two templates claiming one class slot)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::models::{Cell, CellType, ScheduleStore, Slot, Teacher, TeacherRegistry};
use crate::rules::find_double_bookings;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two teachers share the same ID.
    DuplicateId,
    /// A teacher lacks a name, subject or class.
    IncompleteTeacher,
    /// A class number is outside `1..=class_count`.
    ClassOutOfRange,
    /// A specialist cell has no teacher id.
    MissingTeacher,
    /// A specialist cell references an unregistered teacher.
    UnknownTeacher,
    /// A specialist cell sits in a class its teacher may not teach.
    ClassNotAllowed,
    /// A teacher is held by several classes at once without an override.
    DoubleBooking,
    /// A cell's fields contradict its type or slot.
    InconsistentCell,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a teacher list against a class count.
///
/// Checks:
/// 1. No duplicate teacher IDs
/// 2. Every teacher has a name, subject and at least one class
/// 3. Every allowed class lies in `1..=class_count`
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_teachers(teachers: &[Teacher], class_count: u32) -> ValidationResult {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();

    for teacher in teachers {
        if !ids.insert(teacher.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate teacher ID: {}", teacher.id),
            ));
        }
        if let Err(e) = teacher.check_input() {
            errors.push(ValidationError::new(
                ValidationErrorKind::IncompleteTeacher,
                format!("Teacher '{}': {e}", teacher.id),
            ));
        }
        for &class in &teacher.classes {
            if class == 0 || class > class_count {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ClassOutOfRange,
                    format!(
                        "Teacher '{}' lists class {class} outside 1..={class_count}",
                        teacher.id
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates every cell of a schedule against the registry.
///
/// Cells flagged `forced_conflict` may sit outside the allowed class set
/// and may double-book; everything else must be consistent.
pub fn validate_schedule(store: &ScheduleStore, registry: &TeacherRegistry) -> ValidationResult {
    let mut errors = Vec::new();

    for (slot, cell) in store.iter_cells() {
        check_cell(&slot, cell, registry, &mut errors);
    }

    for week in store.week_keys() {
        for booking in find_double_bookings(store, week) {
            if booking.forced {
                continue;
            }
            errors.push(ValidationError::new(
                ValidationErrorKind::DoubleBooking,
                format!(
                    "Teacher '{}' is double-booked in week {} (P{}, day {}) by classes {:?}",
                    booking.teacher_id,
                    booking.week,
                    booking.period + 1,
                    booking.day,
                    booking.classes
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_cell(slot: &Slot, cell: &Cell, registry: &TeacherRegistry, errors: &mut Vec<ValidationError>) {
    if cell.id != slot.cell_id() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InconsistentCell,
            format!("Cell '{}' stored at {}", cell.id, slot.cell_id()),
        ));
    }

    if cell.cell_type != CellType::Special {
        if cell.teacher_id.is_some() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InconsistentCell,
                format!("Non-specialist cell {} carries a teacher", slot.cell_id()),
            ));
        }
        return;
    }

    let Some(teacher_id) = cell.teacher_id.as_deref().filter(|id| !id.is_empty()) else {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingTeacher,
            format!("Specialist cell {} has no teacher", slot.cell_id()),
        ));
        return;
    };
    let Some(teacher) = registry.get(teacher_id) else {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnknownTeacher,
            format!("Cell {} references unknown teacher '{teacher_id}'", slot.cell_id()),
        ));
        return;
    };
    if !teacher.allows_class(slot.class) && !cell.forced_conflict {
        errors.push(ValidationError::new(
            ValidationErrorKind::ClassNotAllowed,
            format!(
                "Teacher '{teacher_id}' placed in class {} at {}",
                slot.class,
                slot.cell_id()
            ),
        ));
    }
}

/// Two or more templates claiming the same class at the same moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConflict {
    pub class: u32,
    pub period: usize,
    pub day: usize,
    /// Teachers whose templates claim the slot, ascending.
    pub teacher_ids: Vec<String>,
}

impl fmt::Display for TemplateConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "class {} P{} day {} claimed by {}",
            self.class,
            self.period + 1,
            self.day,
            self.teacher_ids.join(", ")
        )
    }
}

/// Lists every class/period/day claimed by more than one template.
///
/// Such conflicts are allowed while authoring; the affected slots
/// classify as mismatched until one template is changed.
pub fn find_template_conflicts(registry: &TeacherRegistry) -> Vec<TemplateConflict> {
    let mut claims: BTreeMap<(u32, usize, usize), Vec<String>> = BTreeMap::new();
    for (teacher_id, template) in registry.templates() {
        for (period, day, entry) in template.assigned() {
            if let Some(class) = entry.class {
                claims
                    .entry((class, period, day))
                    .or_default()
                    .push(teacher_id.clone());
            }
        }
    }
    claims
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((class, period, day), teacher_ids)| TemplateConflict {
            class,
            period,
            day,
            teacher_ids,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlacementTemplate;

    fn registry() -> TeacherRegistry {
        TeacherRegistry::from_teachers([
            Teacher::new("T1", "Kim", "체육").with_classes([1, 2]),
            Teacher::new("T2", "Lee", "영어").with_classes([1, 2, 3]),
        ])
    }

    #[test]
    fn test_valid_teachers() {
        assert!(validate_teachers(registry().teachers(), 3).is_ok());
    }

    #[test]
    fn test_teacher_errors_are_collected() {
        let teachers = vec![
            Teacher::new("T1", "Kim", "체육").with_classes([1, 9]),
            Teacher::new("T1", "", "영어").with_classes([1]),
            Teacher::new("T3", "Park", "음악"),
        ];
        let errors = validate_teachers(&teachers, 5).unwrap_err();
        let kinds: Vec<_> = errors.iter().map(|e| e.kind.clone()).collect();
        assert!(kinds.contains(&ValidationErrorKind::DuplicateId));
        assert!(kinds.contains(&ValidationErrorKind::ClassOutOfRange));
        assert_eq!(
            kinds
                .iter()
                .filter(|k| **k == ValidationErrorKind::IncompleteTeacher)
                .count(),
            2
        );
    }

    #[test]
    fn test_schedule_valid() {
        let reg = registry();
        let mut store = ScheduleStore::filled(1, 2, |s| Cell::homeroom(s, "국어"));
        let slot = Slot::new(1, 1, 0, 0);
        store
            .set_cell(&slot, Cell::special(&slot, reg.get("T1").unwrap(), None))
            .unwrap();
        assert!(validate_schedule(&store, &reg).is_ok());
    }

    #[test]
    fn test_schedule_errors() {
        let reg = registry();
        let outsider = Teacher::new("X", "Ghost", "미술");
        let mut store = ScheduleStore::filled(1, 3, |s| Cell::empty(s));

        let a = Slot::new(1, 1, 0, 0);
        let b = Slot::new(1, 2, 0, 0);
        let c = Slot::new(1, 3, 1, 1);
        let d = Slot::new(1, 3, 2, 2);
        let t1 = reg.get("T1").unwrap();
        store.set_cell(&a, Cell::special(&a, t1, None)).unwrap();
        store.set_cell(&b, Cell::special(&b, t1, None)).unwrap();
        store.set_cell(&c, Cell::special(&c, t1, None)).unwrap();
        store.set_cell(&d, Cell::special(&d, &outsider, None)).unwrap();

        let errors = validate_schedule(&store, &reg).unwrap_err();
        let has = |k: ValidationErrorKind| errors.iter().any(|e| e.kind == k);
        assert!(has(ValidationErrorKind::DoubleBooking));
        assert!(has(ValidationErrorKind::ClassNotAllowed));
        assert!(has(ValidationErrorKind::UnknownTeacher));
    }

    #[test]
    fn test_forced_cells_tolerated() {
        let reg = registry();
        let mut store = ScheduleStore::filled(1, 2, |s| Cell::empty(s));
        let t1 = reg.get("T1").unwrap();
        for class in [1, 2] {
            let slot = Slot::new(1, class, 0, 0);
            store
                .set_cell(&slot, Cell::special(&slot, t1, None).with_forced_conflict(true))
                .unwrap();
        }
        assert!(validate_schedule(&store, &reg).is_ok());
    }

    #[test]
    fn test_template_conflicts() {
        let mut reg = registry();
        reg.set_template("T1", PlacementTemplate::new().with_entry(0, 0, 1, ""))
            .unwrap();
        reg.set_template(
            "T2",
            PlacementTemplate::new()
                .with_entry(0, 0, 1, "")
                .with_entry(1, 0, 2, ""),
        )
        .unwrap();

        let conflicts = find_template_conflicts(&reg);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].teacher_ids, vec!["T1", "T2"]);
        assert_eq!(conflicts[0].to_string(), "class 1 P1 day 0 claimed by T1, T2");
    }
}
