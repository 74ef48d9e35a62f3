//! Verdict aggregation.
//!
//! This module turns a host table into the chart-ready comparison series:
//! one pass over all records, grouped by normalized behavior category,
//! with AI and reviewer verdicts tallied independently per category.

mod collate;
mod tally;

pub use collate::CategoryCollator;
pub use tally::tally_records;

use crate::host::HostError;
use thiserror::Error;

/// Failure of one aggregation run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A host accessor failed mid-run. The whole run aborts; no partial
    /// series is surfaced.
    #[error("aggregation aborted on accessor failure: {0}")]
    Accessor(#[from] HostError),

    /// Locale collation data could not be loaded.
    #[error("collator unavailable: {0}")]
    Collation(String),
}
