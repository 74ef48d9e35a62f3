//! One aggregation run over a record source.

use crate::aggregate::{CategoryCollator, EngineError};
use crate::config::{VerdictLabels, WidgetConfig};
use crate::host::RecordSource;
use crate::models::{CategoryTally, RunMetadata, RunResult, SeriesPoint};
use crate::normalize::canonical_text;
use chrono::Utc;
use futures::future::try_join3;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// Runs one full aggregation pass and returns the sorted series.
///
/// The configuration gate is checked first: if any of the three column
/// references is unset, the run returns an empty series without touching
/// the source at all. Any accessor failure aborts the whole run; partial
/// tallies never escape.
///
/// A record whose normalized category is empty is skipped entirely, even
/// when its verdict cells hold valid values.
pub async fn tally_records(
    source: &dyn RecordSource,
    config: &WidgetConfig,
    labels: &VerdictLabels,
) -> Result<RunResult, EngineError> {
    let started = Instant::now();

    let Some((behavior_id, ai_id, reviewer_id)) = config.column_ids() else {
        debug!("configuration incomplete, returning empty series");
        return Ok(RunResult {
            series: Vec::new(),
            metadata: RunMetadata {
                finished_at: Utc::now(),
                records_scanned: 0,
                records_skipped: 0,
                duration_seconds: started.elapsed().as_secs_f64(),
            },
        });
    };

    let record_ids = source.list_record_ids().await?;
    debug!(records = record_ids.len(), "starting aggregation run");

    let mut tallies: HashMap<String, CategoryTally> = HashMap::new();
    let mut skipped = 0usize;

    for record_id in &record_ids {
        // All three cells of one record travel together so a failure can
        // never attribute values across records.
        let (behavior, ai, reviewer) = try_join3(
            source.get_value(behavior_id, record_id),
            source.get_value(ai_id, record_id),
            source.get_value(reviewer_id, record_id),
        )
        .await?;

        let category = canonical_text(&behavior);
        if category.is_empty() {
            // Blank category drops the whole record, not just one counter.
            skipped += 1;
            continue;
        }

        let tally = tallies.entry(category).or_default();
        apply_verdict(
            &canonical_text(&ai),
            labels,
            &mut tally.ai_normal,
            &mut tally.ai_violation,
        );
        apply_verdict(
            &canonical_text(&reviewer),
            labels,
            &mut tally.reviewer_normal,
            &mut tally.reviewer_violation,
        );
    }

    let mut series: Vec<SeriesPoint> = tallies
        .into_iter()
        .map(|(category, tally)| SeriesPoint::from_tally(category, tally))
        .collect();

    CategoryCollator::new()?.sort(&mut series);

    debug!(
        categories = series.len(),
        skipped, "aggregation run complete"
    );

    Ok(RunResult {
        series,
        metadata: RunMetadata {
            finished_at: Utc::now(),
            records_scanned: record_ids.len(),
            records_skipped: skipped,
            duration_seconds: started.elapsed().as_secs_f64(),
        },
    })
}

/// Applies one verdict cell to its counter pair. Values matching neither
/// label (including empty) count toward neither.
fn apply_verdict(text: &str, labels: &VerdictLabels, normal: &mut u64, violation: &mut u64) {
    if text == labels.normal {
        *normal += 1;
    } else if text == labels.violation {
        *violation += 1;
    }
}
