//! Placement templates.
//!
//! A template records a specialist teacher's intended weekly pattern:
//! for each period×day, which class they teach and where. It is
//! independent of any calendar week and drives both bulk assignment and
//! mismatch classification.

use serde::{Deserialize, Serialize};

use super::{Teacher, DAY_COUNT, PERIOD_COUNT};

/// One template slot. `class == None` means the teacher is free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    /// Class taught in this slot.
    pub class: Option<u32>,
    /// Location; blank falls back to the configured default.
    pub location: String,
}

impl TemplateEntry {
    /// An entry assigning `class` at `location`.
    pub fn new(class: u32, location: impl Into<String>) -> Self {
        Self {
            class: Some(class),
            location: location.into(),
        }
    }

    /// Whether the slot is unused.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.class.is_none()
    }
}

/// A teacher's intended weekly placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementTemplate {
    entries: [[TemplateEntry; DAY_COUNT]; PERIOD_COUNT],
}

impl PlacementTemplate {
    /// An all-free template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry at a position, `None` when out of the grid.
    pub fn entry(&self, period: usize, day: usize) -> Option<&TemplateEntry> {
        self.entries.get(period).and_then(|row| row.get(day))
    }

    /// Sets an entry. Out-of-grid positions are ignored.
    pub fn set(&mut self, period: usize, day: usize, entry: TemplateEntry) {
        if let Some(slot) = self.entries.get_mut(period).and_then(|row| row.get_mut(day)) {
            *slot = entry;
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with_entry(mut self, period: usize, day: usize, class: u32, location: &str) -> Self {
        self.set(period, day, TemplateEntry::new(class, location));
        self
    }

    /// Iterates assigned entries as `(period, day, entry)`.
    pub fn assigned(&self) -> impl Iterator<Item = (usize, usize, &TemplateEntry)> {
        self.entries.iter().enumerate().flat_map(|(p, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, e)| !e.is_free())
                .map(move |(d, e)| (p, d, e))
        })
    }

    /// Classes referenced by assigned entries (may repeat).
    pub fn classes(&self) -> impl Iterator<Item = u32> + '_ {
        self.assigned().filter_map(|(_, _, e)| e.class)
    }

    /// Whether no entry is assigned.
    pub fn is_blank(&self) -> bool {
        self.assigned().next().is_none()
    }

    /// Frees every entry whose class fails `keep`.
    pub fn retain_classes(&mut self, keep: impl Fn(u32) -> bool) {
        for row in &mut self.entries {
            for entry in row.iter_mut() {
                if entry.class.is_some_and(|c| !keep(c)) {
                    *entry = TemplateEntry::default();
                }
            }
        }
    }
}

/// Outcome of looking up the template-expected teacher for a class slot.
#[derive(Debug, Clone)]
pub enum TemplateResolution<'a> {
    /// No template addresses this class slot.
    Unassigned,
    /// Exactly one teacher is expected.
    Unique {
        teacher: &'a Teacher,
        /// Raw template location (may be blank).
        location: &'a str,
    },
    /// Two or more templates claim the slot (authoring conflict).
    Ambiguous(Vec<&'a Teacher>),
}
