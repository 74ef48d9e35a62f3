//! Host boundary contracts.
//!
//! The widget core never talks to a concrete table backend directly. Hosts
//! implement these traits (an in-memory snapshot host ships in
//! [`memory`](crate::host::memory); production hosts bridge their SDK) and
//! the engine stays agnostic to where records actually live.

pub mod memory;
pub mod snapshot;

use crate::config::WidgetConfig;
use crate::models::{CellValue, FieldMeta, RecordId, WidgetState};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

pub use memory::{MemoryConfigStore, MemoryTable};
pub use snapshot::TableSnapshot;

/// Failure surfaced by a host accessor.
#[derive(Debug, Error)]
pub enum HostError {
    /// The backing store could not be reached or answered with an error.
    #[error("host I/O failure: {0}")]
    Io(String),

    /// A configured column id does not resolve in the active table.
    #[error("field not found: {id}")]
    FieldNotFound { id: String },

    /// A record id from the listing no longer resolves.
    #[error("record not found: {id}")]
    RecordNotFound { id: String },
}

/// Read access to the records and cell values of the active table.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Lists every record id in the active table, in host order.
    ///
    /// The order carries no meaning and is not preserved in output.
    async fn list_record_ids(&self) -> Result<Vec<RecordId>, HostError>;

    /// Fetches one cell value by column and record id.
    async fn get_value(&self, field_id: &str, record_id: &str) -> Result<CellValue, HostError>;
}

/// Read access to the table schema, for column selection UIs.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Lists the available columns as `{id, display name}` pairs.
    async fn list_fields(&self) -> Result<Vec<FieldMeta>, HostError>;
}

/// The host-owned configuration store.
///
/// The widget treats this as eventually-consistent external state: another
/// collaborator (typically the selection UI) may update it at any time, and
/// `changes` fires whenever that happens.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Returns the current configuration, or `None` if nothing was saved yet.
    async fn get(&self) -> Result<Option<WidgetConfig>, HostError>;

    /// Persists a new configuration and notifies subscribers.
    async fn save(&self, config: &WidgetConfig) -> Result<(), HostError>;

    /// A change signal that resolves each time the stored configuration is
    /// replaced. Receivers observe the signal, then re-read via [`get`].
    ///
    /// [`get`]: ConfigStore::get
    fn changes(&self) -> watch::Receiver<u64>;
}

/// Optional host hook fired after each aggregation run settles.
///
/// Hosts that capture dashboard snapshots use this to know when the widget
/// has finished computing, whether the run succeeded or degraded to an
/// empty/failed state.
pub trait RenderSignal: Send + Sync {
    fn settled(&self, state: &WidgetState);
}
