//! Engine configuration.
//!
//! All fields have defaults, so a configuration file only needs to list
//! the values it overrides. Loadable from TOML or JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TimetableError};

/// Scoring weights for conflict resolution plans.
///
/// `score = operation·ops + overlap·overlaps + mismatch·mismatches + forced·[forced]`.
/// Lower scores rank first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanWeights {
    /// Cost per operation in the plan.
    pub operation: i64,
    /// Cost per overlap remaining among changed slots.
    pub overlap: i64,
    /// Cost per mismatch remaining among changed slots.
    pub mismatch: i64,
    /// Flat penalty for the forced-apply family.
    pub forced: i64,
}

impl Default for PlanWeights {
    fn default() -> Self {
        Self {
            operation: 10,
            overlap: 18,
            mismatch: 6,
            forced: 120,
        }
    }
}

/// Configuration for a [`TimetableEngine`](crate::engine::TimetableEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of weeks in the academic year (week keys `1..=week_count`).
    pub week_count: u32,
    /// Maximum undo snapshots retained.
    pub undo_limit: usize,
    /// Maximum change log entries retained.
    pub change_log_limit: usize,
    /// Subjects that may be taught either by the homeroom teacher or a specialist.
    pub flex_subjects: Vec<String>,
    /// Location used when a template entry or cell leaves it blank.
    pub default_location: String,
    /// Suffix appended to a class number to form its display name.
    pub class_label_suffix: String,
    /// Specialist lessons per allowed class per week for the generator.
    pub specialist_lessons_per_class: usize,
    /// Planner scoring weights.
    pub plan_weights: PlanWeights,
    /// Maximum plans returned by the planner.
    pub max_plans: usize,
    /// Debounce before a local change is pushed to the sync store (ms).
    pub sync_debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            week_count: 40,
            undo_limit: 50,
            change_log_limit: 200,
            flex_subjects: vec!["체육".into(), "음악".into(), "미술".into()],
            default_location: "교실".into(),
            class_label_suffix: "반".into(),
            specialist_lessons_per_class: 2,
            plan_weights: PlanWeights::default(),
            max_plans: 10,
            sync_debounce_ms: 800,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)
            .map_err(|e| TimetableError::InvalidConfig(format!("Failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(text)
            .map_err(|e| TimetableError::InvalidConfig(format!("Failed to parse JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TimetableError::InvalidConfig(format!("Failed to read {}: {e}", path.display()))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    /// Checks that sizes and limits are usable.
    pub fn validate(&self) -> Result<()> {
        if self.week_count == 0 {
            return Err(TimetableError::InvalidConfig(
                "week_count must be at least 1".into(),
            ));
        }
        if self.undo_limit == 0 || self.change_log_limit == 0 {
            return Err(TimetableError::InvalidConfig(
                "history limits must be at least 1".into(),
            ));
        }
        if self.max_plans == 0 {
            return Err(TimetableError::InvalidConfig(
                "max_plans must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Whether `subject` is a flex subject.
    pub fn is_flex_subject(&self, subject: &str) -> bool {
        self.flex_subjects.iter().any(|s| s == subject)
    }

    /// Normalizes a location: trimmed, with blanks replaced by the default.
    pub fn normalize_location(&self, location: Option<&str>) -> String {
        match location.map(str::trim) {
            Some(loc) if !loc.is_empty() => loc.to_string(),
            _ => self.default_location.clone(),
        }
    }

    /// Display name for a class number (e.g. `3` → `"3반"`).
    pub fn class_label(&self, class: u32) -> String {
        format!("{class}{}", self.class_label_suffix)
    }

    /// Parses a class display name back to its number.
    ///
    /// Accepts bare numbers as well as labelled names; returns `None`
    /// when the name has no leading digits or the number is zero.
    pub fn parse_class_label(&self, label: &str) -> Option<u32> {
        let digits: String = label
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<u32>().ok().filter(|&n| n > 0)
    }

    /// Sync debounce as a [`Duration`].
    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync_debounce_ms)
    }
}
