//! Data models for the verdict comparison widget.
//!
//! This module contains the core data structures used throughout
//! the crate for representing cell values, tallies, and run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw table cell value as handed over by the host.
///
/// Hosts expose cells in a handful of shapes: plain primitives, tagged
/// records carrying a `text` or `name` field, or ordered lists of either.
/// Shapes with no recognized tag are kept verbatim in
/// [`Other`](CellValue::Other) so normalization can still coerce them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// No value stored in the cell (null/undefined on the host side).
    Absent,
    /// Plain text.
    Text(String),
    /// Numeric cell.
    Number(f64),
    /// Checkbox cell.
    Bool(bool),
    /// A tagged record, e.g. a select option or a mention.
    Tagged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// A multi-value cell; order is host-defined.
    List(Vec<CellValue>),
    /// An object with neither `text` nor `name`, kept verbatim. Normalizes
    /// to its JSON text rather than dropping the value.
    Other(serde_json::Value),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Absent
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => CellValue::Absent,
            Value::String(s) => CellValue::Text(s),
            Value::Number(n) => CellValue::Number(n.as_f64().unwrap_or(0.0)),
            Value::Bool(b) => CellValue::Bool(b),
            Value::Array(items) => {
                CellValue::List(items.into_iter().map(CellValue::from).collect())
            }
            Value::Object(map) => {
                let text = map.get("text").and_then(|v| v.as_str()).map(String::from);
                let name = map.get("name").and_then(|v| v.as_str()).map(String::from);
                if text.is_some() || name.is_some() {
                    CellValue::Tagged { text, name }
                } else {
                    CellValue::Other(Value::Object(map))
                }
            }
        }
    }
}

// Deserialization routes through the JSON conversion so untagged objects
// land in `Other` instead of an empty `Tagged`.
impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(CellValue::from(value))
    }
}

/// Identifier of a record (row) in the host table.
pub type RecordId = String;

/// A column exposed by the host schema, for selection UIs and id resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Stable column identifier.
    pub id: String,
    /// Human-readable column name.
    #[serde(rename = "name")]
    pub display_name: String,
}

/// Per-category verdict counters, accumulated while records are scanned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    /// Records the AI judged as normal.
    pub ai_normal: u64,
    /// Records the AI judged as a violation.
    pub ai_violation: u64,
    /// Records the reviewer judged as normal.
    pub reviewer_normal: u64,
    /// Records the reviewer judged as a violation.
    pub reviewer_violation: u64,
}

/// One entry of the chart-ready result series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Canonical category text (the grouping key).
    pub category: String,
    pub ai_normal: u64,
    pub ai_violation: u64,
    pub reviewer_normal: u64,
    pub reviewer_violation: u64,
}

impl SeriesPoint {
    /// Builds a series point from a category key and its accumulated tally.
    pub fn from_tally(category: String, tally: CategoryTally) -> Self {
        Self {
            category,
            ai_normal: tally.ai_normal,
            ai_violation: tally.ai_violation,
            reviewer_normal: tally.reviewer_normal,
            reviewer_violation: tally.reviewer_violation,
        }
    }

    /// Total records tallied into this category, counting the AI column.
    pub fn ai_total(&self) -> u64 {
        self.ai_normal + self.ai_violation
    }

    /// Total records tallied into this category, counting the reviewer column.
    pub fn reviewer_total(&self) -> u64 {
        self.reviewer_normal + self.reviewer_violation
    }
}

/// Bookkeeping for one aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Records fetched from the host.
    pub records_scanned: usize,
    /// Records dropped because their category normalized to empty.
    pub records_skipped: usize,
    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: f64,
}

/// Output of one successful aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub series: Vec<SeriesPoint>,
    pub metadata: RunMetadata,
}

/// Externally observable state of the widget engine.
///
/// `ConfigIncomplete` and `Ready` with an empty series are distinct on
/// purpose: the first means the widget is not configured, the second means
/// the table held no usable records.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetState {
    /// An aggregation run is in flight.
    Loading,
    /// One or more of the three column references is unset.
    ConfigIncomplete,
    /// The latest run completed; the series may be empty.
    Ready(Vec<SeriesPoint>),
    /// The latest run aborted on a host accessor failure. Any previously
    /// displayed series has been cleared.
    Failed,
}

impl fmt::Display for WidgetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WidgetState::Loading => write!(f, "loading"),
            WidgetState::ConfigIncomplete => write!(f, "configuration incomplete"),
            WidgetState::Ready(series) => write!(f, "ready ({} categories)", series.len()),
            WidgetState::Failed => write!(f, "failed"),
        }
    }
}
