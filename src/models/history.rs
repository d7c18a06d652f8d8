//! Change log entries.
//!
//! Human-readable records of committed mutations, appended by the
//! history manager and carried through sync snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Direct subject assignment to one slot.
    Assign,
    /// Swap of two cells.
    Swap,
    /// A conflict resolution plan was applied.
    ResolvePlan,
    /// A teacher's placement template was applied.
    ApplyTemplate,
    /// A class grid was copied into later weeks.
    Propagate,
    /// Holiday days were set.
    HolidayApply,
    /// Holiday days were cleared.
    HolidayClear,
    /// Class count changed.
    ClassCount,
    /// A teacher was removed and their lessons cleared.
    TeacherRemove,
    /// The whole schedule was regenerated.
    Regenerate,
    /// Undo of the previous commit.
    Undo,
    /// Redo of an undone commit.
    Redo,
    /// Domain-specific change.
    Custom(String),
}

/// One entry of the change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    /// Change category.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Human-readable description.
    pub summary: String,
    /// Weeks touched by the change.
    pub week_keys: Vec<u32>,
    /// When the change was committed.
    pub timestamp: DateTime<Utc>,
    /// Who made the change.
    pub actor: String,
}

impl ChangeLogEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(kind: ChangeKind, summary: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            kind,
            summary: summary.into(),
            week_keys: Vec::new(),
            timestamp: Utc::now(),
            actor: actor.into(),
        }
    }

    /// Sets the touched weeks (sorted, deduplicated).
    pub fn with_weeks(mut self, weeks: impl IntoIterator<Item = u32>) -> Self {
        let mut weeks: Vec<u32> = weeks.into_iter().collect();
        weeks.sort_unstable();
        weeks.dedup();
        self.week_keys = weeks;
        self
    }
}
