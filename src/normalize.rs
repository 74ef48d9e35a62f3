//! Cell value normalization.
//!
//! Hosts hand back cell values in whatever shape the column type produces.
//! Everything funnels through [`canonical_text`] before grouping or verdict
//! matching, so the aggregator only ever compares plain strings.

use crate::models::CellValue;

/// Converts a raw cell value into its canonical display string.
///
/// Total over every [`CellValue`] shape; unrecognized content degrades to a
/// best-effort string instead of failing. The empty string means "no value".
///
/// Multi-value cells are deliberately treated as single-valued: only the
/// first entry is consulted.
pub fn canonical_text(value: &CellValue) -> String {
    match value {
        CellValue::Absent => String::new(),
        CellValue::Text(s) => s.clone(),
        CellValue::List(items) => items.first().map(canonical_text).unwrap_or_default(),
        CellValue::Tagged { text: Some(t), .. } => t.clone(),
        CellValue::Tagged { name: Some(n), .. } => n.clone(),
        CellValue::Tagged { .. } => String::new(),
        // Unrecognized shapes fall through to their JSON text, so a record
        // with a malformed category still lands in a (junk) category
        // instead of silently vanishing.
        CellValue::Other(value) => value.to_string(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Bool(b) => b.to_string(),
    }
}

/// Renders a numeric cell without a trailing `.0` for whole numbers,
/// matching how hosts display integer-valued cells.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
