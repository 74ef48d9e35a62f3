//! The widget engine: recompute-on-signal loop around the aggregator.
//!
//! The engine owns no table data. It reads the host config store, gates,
//! runs one aggregation pass, and publishes the outcome through a watch
//! channel. Configuration changes trigger recomputation; an in-flight run
//! that a newer run supersedes is discarded by generation counter, not
//! cancelled.

use crate::aggregate::{tally_records, EngineError};
use crate::config::VerdictLabels;
use crate::host::{ConfigStore, RecordSource, RenderSignal};
use crate::models::{RunMetadata, WidgetState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of one [`WidgetEngine::refresh`] call.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The state published for this run.
    pub state: WidgetState,
    /// Run bookkeeping; absent when the configuration gate short-circuited.
    pub metadata: Option<RunMetadata>,
}

/// Aggregation engine bound to one record source and one config store.
pub struct WidgetEngine {
    source: Arc<dyn RecordSource>,
    config_store: Arc<dyn ConfigStore>,
    labels: VerdictLabels,
    render_signal: Option<Arc<dyn RenderSignal>>,
    /// Monotonic run id; only the latest issued run may publish.
    generation: AtomicU64,
    state_tx: tokio::sync::watch::Sender<WidgetState>,
}

impl WidgetEngine {
    /// Creates an engine. The initial observable state is `Loading`.
    pub fn new(
        source: Arc<dyn RecordSource>,
        config_store: Arc<dyn ConfigStore>,
        labels: VerdictLabels,
    ) -> Self {
        Self {
            source,
            config_store,
            labels,
            render_signal: None,
            generation: AtomicU64::new(0),
            state_tx: tokio::sync::watch::channel(WidgetState::Loading).0,
        }
    }

    /// Attaches a render-complete hook, notified after every settled run.
    pub fn with_render_signal(mut self, signal: Arc<dyn RenderSignal>) -> Self {
        self.render_signal = Some(signal);
        self
    }

    /// Subscribes to the engine's observable state.
    pub fn state(&self) -> tokio::sync::watch::Receiver<WidgetState> {
        self.state_tx.subscribe()
    }

    /// Runs one aggregation pass and publishes its outcome.
    ///
    /// If a newer refresh was issued while this one was fetching, the result
    /// is dropped instead of published, so a stale run can never overwrite
    /// fresh data. On accessor failure the published state is `Failed` with
    /// any previous series cleared; no partial series is ever surfaced.
    pub async fn refresh(&self) -> Result<RunReport, EngineError> {
        let run_id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(run_id, "refresh issued");
        self.publish(run_id, WidgetState::Loading);

        let config = match self.config_store.get().await {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                return match self.settle(run_id, WidgetState::Failed) {
                    Some(_) => {
                        error!("failed to read configuration: {e}");
                        Err(EngineError::Accessor(e))
                    }
                    None => Ok(self.stale_report()),
                };
            }
        };

        if !config.is_complete() {
            debug!(run_id, "configuration incomplete");
            let state = self
                .settle(run_id, WidgetState::ConfigIncomplete)
                .unwrap_or_else(|| self.state_tx.borrow().clone());
            return Ok(RunReport {
                state,
                metadata: None,
            });
        }

        match tally_records(self.source.as_ref(), &config, &self.labels).await {
            Ok(result) => {
                let published = self.settle(run_id, WidgetState::Ready(result.series));
                match published {
                    Some(state) => {
                        info!(
                            run_id,
                            scanned = result.metadata.records_scanned,
                            skipped = result.metadata.records_skipped,
                            "aggregation published"
                        );
                        Ok(RunReport {
                            state,
                            metadata: Some(result.metadata),
                        })
                    }
                    None => {
                        debug!(run_id, "run superseded, result discarded");
                        Ok(self.stale_report())
                    }
                }
            }
            Err(e) => {
                if self.settle(run_id, WidgetState::Failed).is_some() {
                    error!(run_id, "aggregation run aborted: {e}");
                    Err(e)
                } else {
                    debug!(run_id, "superseded run failed, error discarded");
                    Ok(self.stale_report())
                }
            }
        }
    }

    /// Recompute loop: refresh once, then once more per config change,
    /// until the config store drops its change channel.
    pub async fn run(&self) {
        let mut changes = self.config_store.changes();

        loop {
            if let Err(e) = self.refresh().await {
                error!("refresh failed: {e}");
            }

            if changes.changed().await.is_err() {
                debug!("config change channel closed, engine loop ending");
                break;
            }
            debug!("configuration changed, recomputing");
        }
    }

    /// Publishes a settled state and fires the render hook, if this run is
    /// still the latest. Returns the published state, or `None` when the
    /// run was superseded.
    fn settle(&self, run_id: u64, state: WidgetState) -> Option<WidgetState> {
        if !self.publish(run_id, state.clone()) {
            return None;
        }
        if let Some(signal) = &self.render_signal {
            signal.settled(&state);
        }
        Some(state)
    }

    /// Publishes only when `run_id` is still the latest issued run.
    fn publish(&self, run_id: u64, state: WidgetState) -> bool {
        if self.generation.load(Ordering::SeqCst) != run_id {
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }

    /// Report handed back for a superseded run: the currently published
    /// state, no metadata.
    fn stale_report(&self) -> RunReport {
        RunReport {
            state: self.state_tx.borrow().clone(),
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WidgetConfig;
    use crate::host::{HostError, MemoryConfigStore};
    use crate::models::{CellValue, RecordId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tokio::time::timeout;

    const BEHAVIOR: &str = "fld_behavior";
    const BEHAVIOR_ALT: &str = "fld_behavior_alt";
    const AI: &str = "fld_ai";
    const REVIEWER: &str = "fld_reviewer";

    /// One-record source; fetches of `gated_field` wait on the semaphore,
    /// and `failing` flips every fetch into an error.
    struct TestSource {
        gate: Semaphore,
        gated_field: Option<String>,
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    impl TestSource {
        fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                gated_field: None,
                failing: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }

        fn gating(mut self, field_id: &str) -> Self {
            self.gated_field = Some(field_id.to_string());
            self
        }
    }

    #[async_trait]
    impl RecordSource for TestSource {
        async fn list_record_ids(&self) -> Result<Vec<RecordId>, HostError> {
            Ok(vec!["rec1".to_string()])
        }

        async fn get_value(
            &self,
            field_id: &str,
            _record_id: &str,
        ) -> Result<CellValue, HostError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.failing.load(Ordering::SeqCst) {
                return Err(HostError::Io("injected failure".to_string()));
            }

            if self.gated_field.as_deref() == Some(field_id) {
                let permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|e| HostError::Io(e.to_string()))?;
                permit.forget();
            }

            Ok(match field_id {
                BEHAVIOR => CellValue::Text("旧".to_string()),
                BEHAVIOR_ALT => CellValue::Text("新".to_string()),
                AI => CellValue::Text("正常".to_string()),
                REVIEWER => CellValue::Text("违规".to_string()),
                _ => CellValue::Absent,
            })
        }
    }

    fn config_with_behavior(behavior_field: &str) -> WidgetConfig {
        WidgetConfig {
            behavior_field_id: Some(behavior_field.to_string()),
            ai_field_id: Some(AI.to_string()),
            reviewer_field_id: Some(REVIEWER.to_string()),
        }
    }

    struct CountingSignal {
        settled: AtomicUsize,
    }

    impl RenderSignal for CountingSignal {
        fn settled(&self, _state: &WidgetState) {
            self.settled.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_refresh_without_config_publishes_incomplete() {
        let source = Arc::new(TestSource::new());
        let store = Arc::new(MemoryConfigStore::new());
        let engine = WidgetEngine::new(source.clone(), store, VerdictLabels::default());

        let report = engine.refresh().await.unwrap();

        assert_eq!(report.state, WidgetState::ConfigIncomplete);
        assert!(report.metadata.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_publishes_ready_series() {
        let source = Arc::new(TestSource::new());
        let store = Arc::new(MemoryConfigStore::with_config(config_with_behavior(
            BEHAVIOR,
        )));
        let engine = WidgetEngine::new(source, store, VerdictLabels::default());

        let report = engine.refresh().await.unwrap();

        match report.state {
            WidgetState::Ready(series) => {
                assert_eq!(series.len(), 1);
                assert_eq!(series[0].category, "旧");
                assert_eq!(series[0].ai_normal, 1);
                assert_eq!(series[0].reviewer_violation, 1);
            }
            other => panic!("expected ready, got {other:?}"),
        }
        assert_eq!(report.metadata.unwrap().records_scanned, 1);
    }

    #[tokio::test]
    async fn test_failure_clears_state_to_failed() {
        let source = Arc::new(TestSource::new());
        let store = Arc::new(MemoryConfigStore::with_config(config_with_behavior(
            BEHAVIOR,
        )));
        let engine = WidgetEngine::new(source.clone(), store, VerdictLabels::default());

        engine.refresh().await.unwrap();
        assert!(matches!(&*engine.state().borrow(), WidgetState::Ready(_)));

        source.failing.store(true, Ordering::SeqCst);
        let err = engine.refresh().await.unwrap_err();
        assert!(matches!(err, EngineError::Accessor(_)));

        // Previous series is gone, not retained alongside the failure.
        assert_eq!(*engine.state().borrow(), WidgetState::Failed);
    }

    #[tokio::test]
    async fn test_stale_run_cannot_overwrite_newer_result() {
        let source = Arc::new(TestSource::new().gating(BEHAVIOR));
        let store = Arc::new(MemoryConfigStore::with_config(config_with_behavior(
            BEHAVIOR,
        )));
        let engine = Arc::new(WidgetEngine::new(
            source.clone(),
            store.clone(),
            VerdictLabels::default(),
        ));

        // Slow run: reads the old config, then blocks fetching the gated
        // behavior column.
        let slow = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Newer configuration arrives and a fresh run completes against it.
        store
            .save(&config_with_behavior(BEHAVIOR_ALT))
            .await
            .unwrap();
        engine.refresh().await.unwrap();

        // Release the slow run; its result must be discarded.
        source.gate.add_permits(1);
        let stale_report = timeout(Duration::from_secs(5), slow)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(stale_report.metadata.is_none());

        match &*engine.state().borrow() {
            WidgetState::Ready(series) => assert_eq!(series[0].category, "新"),
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_render_signal_fires_on_every_settled_run() {
        let signal = Arc::new(CountingSignal {
            settled: AtomicUsize::new(0),
        });
        let source = Arc::new(TestSource::new());
        let store = Arc::new(MemoryConfigStore::new());
        let engine = WidgetEngine::new(source.clone(), store.clone(), VerdictLabels::default())
            .with_render_signal(signal.clone());

        // Incomplete config still counts as a settled run.
        engine.refresh().await.unwrap();
        assert_eq!(signal.settled.load(Ordering::SeqCst), 1);

        store.save(&config_with_behavior(BEHAVIOR)).await.unwrap();
        engine.refresh().await.unwrap();
        assert_eq!(signal.settled.load(Ordering::SeqCst), 2);

        // Controlled failure settles too.
        source.failing.store(true, Ordering::SeqCst);
        let _ = engine.refresh().await;
        assert_eq!(signal.settled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_loop_recomputes_on_config_change() {
        let source = Arc::new(TestSource::new());
        let store = Arc::new(MemoryConfigStore::new());
        let engine = Arc::new(WidgetEngine::new(
            source,
            store.clone(),
            VerdictLabels::default(),
        ));
        let mut state_rx = engine.state();

        let loop_handle = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run().await })
        };

        // First pass settles on the missing configuration.
        timeout(
            Duration::from_secs(5),
            state_rx.wait_for(|s| *s == WidgetState::ConfigIncomplete),
        )
        .await
        .unwrap()
        .unwrap();

        // Saving a complete configuration wakes the loop.
        store.save(&config_with_behavior(BEHAVIOR)).await.unwrap();
        timeout(
            Duration::from_secs(5),
            state_rx.wait_for(|s| matches!(s, WidgetState::Ready(_))),
        )
        .await
        .unwrap()
        .unwrap();

        loop_handle.abort();
    }
}
