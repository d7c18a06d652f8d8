//! Error types for timetable operations.
//!
//! Every failure path leaves the in-memory schedule in its last valid
//! state: errors are returned before any mutation is committed.

use thiserror::Error;

/// Result type for timetable operations.
pub type Result<T> = std::result::Result<T, TimetableError>;

/// Which history stack an undo/redo request targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    /// The undo stack.
    Undo,
    /// The redo stack.
    Redo,
}

impl std::fmt::Display for HistoryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryDirection::Undo => f.write_str("undo"),
            HistoryDirection::Redo => f.write_str("redo"),
        }
    }
}

/// Errors raised by the timetable engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimetableError {
    /// A teacher was submitted without a name.
    #[error("Teacher name must not be empty")]
    EmptyTeacherName,

    /// No subject was selected for an assignment or teacher.
    #[error("No subject selected")]
    EmptySubject,

    /// A teacher was submitted without any class.
    #[error("No class selected for teacher '{0}'")]
    NoClassSelected(String),

    /// A teacher id is already registered.
    #[error("Teacher '{0}' already exists")]
    DuplicateTeacher(String),

    /// A teacher id is not registered.
    #[error("Unknown teacher '{0}'")]
    UnknownTeacher(String),

    /// A week key is not present in the schedule.
    #[error("Unknown week {0}")]
    UnknownWeek(u32),

    /// A class number is not present in the given week.
    #[error("Unknown class {class} in week {week}")]
    UnknownClass { week: u32, class: u32 },

    /// A period or day index is outside the weekly grid.
    #[error("Slot out of range: period {period}, day {day}")]
    SlotOutOfRange { period: usize, day: usize },

    /// A teacher may not teach the given class.
    #[error("Teacher '{teacher_id}' is not allowed to teach class {class}")]
    TeacherClassNotAllowed { teacher_id: String, class: u32 },

    /// The teacher has no placement template to apply.
    #[error("Teacher '{0}' has no placement template")]
    NoTemplate(String),

    /// A class number is outside `1..=class_count`.
    #[error("Class {0} is outside the configured class range")]
    ClassOutOfRange(u32),

    /// The class count must be at least one.
    #[error("Invalid class count {0}")]
    InvalidClassCount(u32),

    /// The target slot holds a holiday and cannot be edited directly.
    #[error("Slot {0} is a holiday")]
    HolidayLocked(String),

    /// A plan was built against an older schedule revision.
    #[error("Plan was built at revision {plan_revision}, schedule is at {current_revision}")]
    StalePlan {
        plan_revision: u64,
        current_revision: u64,
    },

    /// Undo/redo on an empty stack. Benign: nothing changed.
    #[error("Nothing to {0}")]
    HistoryExhausted(HistoryDirection),

    /// Configuration could not be parsed or is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TimetableError {
    /// Whether this error is a benign notice rather than a failure.
    pub fn is_benign(&self) -> bool {
        matches!(self, TimetableError::HistoryExhausted(_))
    }
}
