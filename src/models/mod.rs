//! Timetable domain models.
//!
//! Provides the core data types: slots and cells, specialist teachers
//! with their placement templates, the copy-on-write schedule store,
//! and change log entries.
//!
//! # Shape
//!
//! | Type | Meaning |
//! |------|---------|
//! | `Slot` | `(week, class, period, day)` composite key |
//! | `Cell` | Occupant of one slot (empty, homeroom, special, holiday) |
//! | `Teacher` | Specialist with an allowed-class set |
//! | `PlacementTemplate` | A teacher's intended weekly pattern |
//! | `ScheduleStore` | `week → class → 6×5 grid` |

mod cell;
mod history;
mod schedule;
mod teacher;
mod template;

pub use cell::{
    grid_positions, Cell, CellType, Slot, DAY_COUNT, DAY_NAMES, HOLIDAY_SUBJECT, PERIOD_COUNT,
};
pub use history::{ChangeKind, ChangeLogEntry};
pub use schedule::{ClassGrid, ScheduleStore, WeekSchedule};
pub use teacher::{Teacher, TeacherRegistry};
pub use template::{PlacementTemplate, TemplateEntry, TemplateResolution};
