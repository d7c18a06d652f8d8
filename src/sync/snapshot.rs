//! Wire-level snapshot document.
//!
//! The document shape is owned by whoever else writes to the store, so
//! every field is optional and inbound decoding is lenient: a missing or
//! malformed field decodes to `None`, a malformed cell decodes to an empty
//! raw cell. Semantic repair happens later, in normalization.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::SyncError;
use crate::models::{Cell, CellType, ChangeLogEntry, TemplateEntry};

/// `week key → class label → rows → cells`.
pub type RawSchedules = BTreeMap<String, BTreeMap<String, Vec<Vec<RawCell>>>>;

/// Snapshot of the whole shared state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_schedules: Option<RawSchedules>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_hours: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_configs: Option<Vec<RawTeacher>>,
    /// `teacher id → rows → entries`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_templates: Option<BTreeMap<String, Vec<Vec<RawTemplateEntry>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_logs: Option<Vec<ChangeLogEntry>>,
    /// `week key → notice text`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_notices: Option<BTreeMap<String, String>>,
}

impl Snapshot {
    /// Parses a snapshot from JSON text.
    ///
    /// Fails only when the text is not JSON at all; any JSON value is
    /// accepted and decoded field by field.
    pub fn from_json(text: &str) -> Result<Self, SyncError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SyncError::Malformed(e.to_string()))?;
        Ok(Self::from_value(value))
    }

    /// Decodes a snapshot field by field, dropping malformed fields.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(obj) = value else {
            warn!("snapshot: document is not an object, ignoring it");
            return Self::default();
        };
        Self {
            class_count: field(&obj, "classCount"),
            subject_list: field(&obj, "subjectList"),
            all_schedules: obj.get("allSchedules").and_then(decode_schedules),
            standard_hours: field(&obj, "standardHours"),
            teacher_configs: obj.get("teacherConfigs").and_then(decode_teachers),
            special_templates: field(&obj, "specialTemplates"),
            change_logs: obj.get("changeLogs").and_then(decode_change_logs),
            weekly_notices: field(&obj, "weeklyNotices"),
        }
    }

    /// Serializes to a JSON value.
    pub fn to_value(&self) -> Result<Value, SyncError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serializes to JSON text.
    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    let value = obj.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("snapshot: ignoring malformed '{key}': {e}");
            None
        }
    }
}

fn decode_schedules(value: &Value) -> Option<RawSchedules> {
    let Some(weeks) = value.as_object() else {
        warn!("snapshot: ignoring malformed 'allSchedules'");
        return None;
    };
    let mut out = RawSchedules::new();
    for (week_key, classes) in weeks {
        let Some(classes) = classes.as_object() else {
            warn!("snapshot: week '{week_key}' is not an object");
            continue;
        };
        let week = out.entry(week_key.clone()).or_default();
        for (class_key, grid) in classes {
            let rows = grid
                .as_array()
                .map(|rows| rows.iter().map(decode_row).collect())
                .unwrap_or_default();
            week.insert(class_key.clone(), rows);
        }
    }
    Some(out)
}

fn decode_row(row: &Value) -> Vec<RawCell> {
    let Some(cells) = row.as_array() else {
        return Vec::new();
    };
    cells
        .iter()
        .map(|cell| serde_json::from_value(cell.clone()).unwrap_or_default())
        .collect()
}

fn decode_teachers(value: &Value) -> Option<Vec<RawTeacher>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match serde_json::from_value(item.clone()) {
                Ok(teacher) => Some(teacher),
                Err(e) => {
                    warn!("snapshot: skipping malformed teacher: {e}");
                    None
                }
            })
            .collect(),
    )
}

fn decode_change_logs(value: &Value) -> Option<Vec<ChangeLogEntry>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
    )
}

/// Accepts a string or a number; anything else decodes to `None`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts an array of strings and/or numbers.
fn lenient_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// A cell as stored on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCell {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Older writers omit the type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub cell_type: Option<String>,
    #[serde(
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub teacher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_conflict: Option<bool>,
}

impl From<&Cell> for RawCell {
    fn from(cell: &Cell) -> Self {
        let cell_type = match cell.cell_type {
            CellType::Empty => "empty",
            CellType::Homeroom => "homeroom",
            CellType::Special => "special",
            CellType::Holiday => "holiday",
        };
        Self {
            id: Some(cell.id.clone()),
            subject: Some(cell.subject.clone()),
            cell_type: Some(cell_type.to_string()),
            teacher_id: cell.teacher_id.clone(),
            teacher: cell.teacher.clone(),
            location: cell.location.clone(),
            forced_conflict: cell.forced_conflict.then_some(true),
        }
    }
}

/// A teacher as stored on the wire. Classes are display names or numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTeacher {
    #[serde(deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub subject: Option<String>,
    #[serde(deserialize_with = "lenient_labels")]
    pub classes: Vec<String>,
    /// Set when an empty `classes` list means "no class" rather than
    /// "any class".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted: Option<bool>,
}

/// A template entry as stored on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTemplateEntry {
    /// Class display name; blank or absent means free.
    #[serde(
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl RawTemplateEntry {
    /// Wire form of a template entry, with the class rendered by `label`.
    pub fn from_entry(entry: &TemplateEntry, label: impl Fn(u32) -> String) -> Self {
        Self {
            class_name: entry.class.map(label),
            location: Some(entry.location.clone()).filter(|l| !l.is_empty()),
        }
    }
}
