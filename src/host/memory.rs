//! In-memory reference host.
//!
//! Backs the host traits with a [`TableSnapshot`] and a process-local config
//! store. The CLI shell runs against this; tests use it as a known-good host.

use crate::config::WidgetConfig;
use crate::host::snapshot::TableSnapshot;
use crate::host::{ConfigStore, HostError, RecordSource, SchemaSource};
use crate::models::{CellValue, FieldMeta, RecordId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;

/// A [`RecordSource`] + [`SchemaSource`] over a loaded snapshot.
pub struct MemoryTable {
    fields: Vec<FieldMeta>,
    record_order: Vec<RecordId>,
    cells: HashMap<RecordId, HashMap<String, CellValue>>,
}

impl MemoryTable {
    /// Builds a table from a snapshot, converting every cell to [`CellValue`].
    pub fn new(snapshot: TableSnapshot) -> Self {
        let mut record_order = Vec::with_capacity(snapshot.records.len());
        let mut cells = HashMap::with_capacity(snapshot.records.len());

        for row in snapshot.records {
            record_order.push(row.id.clone());
            let converted: HashMap<String, CellValue> = row
                .cells
                .into_iter()
                .map(|(field_id, value)| (field_id, CellValue::from(value)))
                .collect();
            cells.insert(row.id, converted);
        }

        Self {
            fields: snapshot.fields,
            record_order,
            cells,
        }
    }

    /// Number of records in the table.
    pub fn record_count(&self) -> usize {
        self.record_order.len()
    }
}

#[async_trait]
impl RecordSource for MemoryTable {
    async fn list_record_ids(&self) -> Result<Vec<RecordId>, HostError> {
        Ok(self.record_order.clone())
    }

    async fn get_value(&self, field_id: &str, record_id: &str) -> Result<CellValue, HostError> {
        let row = self
            .cells
            .get(record_id)
            .ok_or_else(|| HostError::RecordNotFound {
                id: record_id.to_string(),
            })?;

        // A missing key is an absent cell, not an error; hosts omit cells
        // the record never filled in.
        Ok(row.get(field_id).cloned().unwrap_or(CellValue::Absent))
    }
}

#[async_trait]
impl SchemaSource for MemoryTable {
    async fn list_fields(&self) -> Result<Vec<FieldMeta>, HostError> {
        Ok(self.fields.clone())
    }
}

/// A process-local [`ConfigStore`] with a watch-based change signal.
pub struct MemoryConfigStore {
    config: Mutex<Option<WidgetConfig>>,
    version_tx: watch::Sender<u64>,
}

impl MemoryConfigStore {
    /// Creates a store with no saved configuration.
    pub fn new() -> Self {
        Self {
            config: Mutex::new(None),
            version_tx: watch::channel(0).0,
        }
    }

    /// Creates a store pre-seeded with a configuration.
    pub fn with_config(config: WidgetConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
            version_tx: watch::channel(0).0,
        }
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self) -> Result<Option<WidgetConfig>, HostError> {
        Ok(self
            .config
            .lock()
            .map_err(|e| HostError::Io(e.to_string()))?
            .clone())
    }

    async fn save(&self, config: &WidgetConfig) -> Result<(), HostError> {
        {
            let mut slot = self
                .config
                .lock()
                .map_err(|e| HostError::Io(e.to_string()))?;
            *slot = Some(config.clone());
        }
        self.version_tx.send_modify(|v| *v += 1);
        Ok(())
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }
}
