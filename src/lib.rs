//! Verdictboard - AI vs reviewer verdict comparison widget core.
//!
//! Aggregates record-level moderation verdicts from a host table into
//! per-category counts, ready for multi-series chart rendering. The host
//! (table SDK, selection UI, chart library) stays behind the trait
//! boundary in [`host`]; the engine is the pure aggregation core plus a
//! recompute-on-signal loop.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod engine;
pub mod host;
pub mod models;
pub mod normalize;

pub use aggregate::{tally_records, EngineError};
pub use config::{VerdictLabels, WidgetConfig};
pub use engine::{RunReport, WidgetEngine};
pub use models::{CellValue, SeriesPoint, WidgetState};
pub use normalize::canonical_text;
