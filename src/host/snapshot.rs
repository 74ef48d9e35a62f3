//! Table snapshot format.
//!
//! The CLI shell (and tests) feed the engine from a JSON snapshot of a table
//! instead of a live host SDK. The format mirrors what table hosts export:
//! a field list plus one cell map per record.

use crate::models::FieldMeta;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A self-contained snapshot of one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Schema: available columns.
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
    /// Data rows.
    #[serde(default)]
    pub records: Vec<RecordRow>,
}

/// One data row of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRow {
    /// Stable record identifier.
    pub id: String,
    /// Cell values keyed by field id. Missing keys read as absent cells.
    #[serde(default)]
    pub cells: HashMap<String, serde_json::Value>,
}

impl TableSnapshot {
    /// Loads a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read table snapshot: {}", path.display()))?;

        let snapshot: TableSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse table snapshot: {}", path.display()))?;

        Ok(snapshot)
    }

    /// Looks up a field's display name, falling back to the raw id.
    pub fn field_name<'a>(&'a self, field_id: &'a str) -> &'a str {
        self.fields
            .iter()
            .find(|f| f.id == field_id)
            .map(|f| f.display_name.as_str())
            .unwrap_or(field_id)
    }

    /// Returns true if the snapshot schema contains the given field id.
    pub fn has_field(&self, field_id: &str) -> bool {
        self.fields.iter().any(|f| f.id == field_id)
    }
}
