//! Locale-aware category ordering.
//!
//! Series output is sorted by category text under Chinese collation
//! (pinyin order), not by code point and not by insertion order.

use crate::aggregate::EngineError;
use crate::models::SeriesPoint;
use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;

/// A collator pinned to the `zh` locale.
pub struct CategoryCollator {
    collator: Collator,
}

impl CategoryCollator {
    /// Builds the collator from compiled locale data.
    pub fn new() -> Result<Self, EngineError> {
        let collator = Collator::try_new(&locale!("zh").into(), CollatorOptions::new())
            .map_err(|e| EngineError::Collation(e.to_string()))?;

        Ok(Self { collator })
    }

    /// Sorts a series ascending by category text.
    pub fn sort(&self, series: &mut [SeriesPoint]) {
        series.sort_by(|a, b| self.collator.compare(&a.category, &b.category));
    }
}
