//! Search index writer and backends.
//!
//! Records are written one per (identifier, locale) with create-or-replace
//! semantics, so re-running a crawl converges to the same index content.
//!
//! - [`SearchIndex`] — the backend seam: `upsert(partition, key, document)` and `get`
//! - [`IndexWriter`] — maps a [`Record`] onto its partition and key
//! - [`ElasticIndex`] — Elasticsearch-compatible HTTP backend with bootstrap
//! - [`LocalIndex`] — libSQL file backend for offline runs

mod elastic;
mod local;
pub mod mapping;
mod migrations;

use std::sync::Arc;

use async_trait::async_trait;
use roomscout_shared::{Identifier, Locale, Record, Result, RoomscoutError};
use serde_json::Value;
use tracing::{debug, instrument};

pub use elastic::ElasticIndex;
pub use local::LocalIndex;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A key-value document index partitioned by locale.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or replace the document stored under `(partition, key)`.
    async fn upsert(&self, partition: &str, key: &str, document: &Value) -> Result<()>;

    /// Read a document back. A missing document is `Ok(None)`.
    async fn get(&self, partition: &str, key: &str) -> Result<Option<Value>>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// IndexWriter
// ---------------------------------------------------------------------------

/// Writes [`Record`]s into a [`SearchIndex`].
///
/// Each call is one write for one (identifier, locale); failures are returned
/// to the caller and never retried here.
#[derive(Clone)]
pub struct IndexWriter {
    index: Arc<dyn SearchIndex>,
}

impl IndexWriter {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    /// Upsert one record under `(hotel-<locale>, <id>)`.
    #[instrument(skip_all, fields(id = %record.id, locale = %record.locale))]
    pub async fn upsert(&self, record: &Record) -> Result<()> {
        let document = serde_json::to_value(record)
            .map_err(|e| RoomscoutError::Index(format!("failed to serialize record: {e}")))?;

        self.index
            .upsert(&record.partition(), record.id.as_str(), &document)
            .await?;

        debug!(backend = self.index.name(), "record upserted");
        Ok(())
    }

    /// Read a record back; `None` when it was never indexed.
    pub async fn get(&self, id: &Identifier, locale: &Locale) -> Result<Option<Record>> {
        let Some(document) = self.index.get(&locale.partition(), id.as_str()).await? else {
            return Ok(None);
        };

        serde_json::from_value(document)
            .map(Some)
            .map_err(|e| RoomscoutError::Index(format!("stored record for {id} is malformed: {e}")))
    }
}
