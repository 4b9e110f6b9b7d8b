use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::{ErrorKind, IngestResult};
use crate::fixture::Fixture;
use crate::reclaimer::ResourceReclaimer;
use crate::store::memory::MemoryStore;
use crate::transport::Transport;
use crate::transport::memory::{Message, MemoryTransport};
use crate::types::{RECORD_METADATA_COLUMN, RECORD_METADATA_TYPE};
use crate::{bail, ingest_error};

/// Infers the column type the pipeline declares for a JSON value.
pub fn inferred_type(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "STRING",
        Value::Number(number) if number.is_f64() => "DOUBLE",
        Value::Number(_) => "INT",
        Value::Bool(_) => "BOOLEAN",
        Value::Null | Value::Array(_) | Value::Object(_) => "VARIANT",
    }
}

/// An in-memory ingestion pipeline between a [`MemoryTransport`] and a [`MemoryStore`].
///
/// Sending through the pipeline forwards the batch to the transport, then consumes it: the
/// connector resources are created and the routed table is widened right away with one column per
/// new field, while the rows stay pending until [`MemoryPipeline::flush`] lands them. With
/// [`MemoryPipeline::auto_flush`] rows land as part of the send.
#[derive(Debug, Clone)]
pub struct MemoryPipeline {
    store: MemoryStore,
    transport: MemoryTransport,
    routes: HashMap<String, String>,
    type_overrides: HashMap<String, String>,
    dropped_fields: HashSet<String>,
    partitions: usize,
    auto_flush: bool,
    pending_rows: Arc<Mutex<BTreeMap<String, u64>>>,
}

impl MemoryPipeline {
    pub fn new(store: MemoryStore, transport: MemoryTransport) -> Self {
        Self {
            store,
            transport,
            routes: HashMap::new(),
            type_overrides: HashMap::new(),
            dropped_fields: HashSet::new(),
            partitions: 1,
            auto_flush: false,
            pending_rows: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Creates a pipeline routing every channel of the fixture to its table.
    pub fn for_fixture(store: MemoryStore, transport: MemoryTransport, fixture: &Fixture) -> Self {
        fixture
            .channels()
            .iter()
            .fold(Self::new(store, transport), |pipeline, channel| {
                pipeline.route(channel, fixture.table_name())
            })
    }

    pub fn route(mut self, channel: impl Into<String>, table: impl Into<String>) -> Self {
        self.routes.insert(channel.into(), table.into());
        self
    }

    /// Declares `column` with `declared_type` instead of the inferred type.
    pub fn override_type(
        mut self,
        column: impl Into<String>,
        declared_type: impl Into<String>,
    ) -> Self {
        self.type_overrides
            .insert(column.into(), declared_type.into());
        self
    }

    /// Ignores `field` when widening tables, as a lossy pipeline would.
    pub fn drop_field(mut self, field: impl Into<String>) -> Self {
        self.dropped_fields.insert(field.into());
        self
    }

    pub fn partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn auto_flush(mut self, auto_flush: bool) -> Self {
        self.auto_flush = auto_flush;
        self
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn transport(&self) -> &MemoryTransport {
        &self.transport
    }

    /// Number of rows consumed from the transport and not landed yet.
    pub async fn pending_rows(&self) -> u64 {
        let pending_rows = self.pending_rows.lock().await;
        pending_rows.values().sum()
    }

    /// Lands every pending row and returns how many landed.
    pub async fn flush(&self) -> IngestResult<u64> {
        self.flush_up_to(u64::MAX).await
    }

    /// Lands at most `max` pending rows, table by table in name order.
    pub async fn flush_up_to(&self, max: u64) -> IngestResult<u64> {
        let mut pending_rows = self.pending_rows.lock().await;
        let mut landed = 0;

        for (table, count) in pending_rows.iter_mut() {
            let batch = (*count).min(max - landed);
            if batch == 0 {
                continue;
            }

            self.store.insert_rows(table, batch).await?;
            *count -= batch;
            landed += batch;

            info!(table = %table, rows = batch, "landed rows");
        }
        pending_rows.retain(|_, count| *count > 0);

        Ok(landed)
    }

    /// Spawns a task landing every pending row after `lag`.
    ///
    /// A failed flush is logged by the task and returned through the handle.
    pub fn spawn_delayed_flush(&self, lag: Duration) -> JoinHandle<IngestResult<u64>> {
        let pipeline = self.clone();

        tokio::spawn(async move {
            sleep(lag).await;

            let result = pipeline.flush().await;
            if let Err(err) = &result {
                error!(error = %err, "delayed flush failed");
            }

            result
        })
    }

    async fn consume(&self, message: Message) -> IngestResult<()> {
        let Some(table) = self.routes.get(&message.destination) else {
            warn!(destination = %message.destination, "no table routed for destination, dropping message");
            return Ok(());
        };

        let fields: Map<String, Value> = serde_json::from_slice(&message.value)?;

        self.ensure_connector_resources(table).await;
        self.store
            .add_column(table, RECORD_METADATA_COLUMN, RECORD_METADATA_TYPE)
            .await?;

        for (field, value) in &fields {
            if self.dropped_fields.contains(field) {
                continue;
            }

            let declared_type = self
                .type_overrides
                .get(field)
                .map(String::as_str)
                .unwrap_or_else(|| inferred_type(value));
            self.store.add_column(table, field, declared_type).await?;
        }

        let mut pending_rows = self.pending_rows.lock().await;
        *pending_rows.entry(table.clone()).or_default() += 1;

        Ok(())
    }

    async fn ensure_connector_resources(&self, table: &str) {
        let names = ResourceReclaimer::new(table, self.partitions);

        self.store.create_stage(&names.stage_name()).await;
        for partition in 0..self.partitions {
            self.store.create_pipe(&names.pipe_name(partition)).await;
        }
    }
}

impl Transport for MemoryPipeline {
    async fn send(&self, destination: &str, values: Vec<Bytes>, keys: Vec<Bytes>) -> IngestResult<()> {
        let count = values.len();
        self.transport.send(destination, values, keys).await?;

        let messages = self.transport.take_undelivered(count).await;
        if messages.len() != count {
            bail!(
                ErrorKind::InvalidState,
                "Pipeline lost messages accepted by the transport",
                format!("accepted: {count}, consumed: {}", messages.len())
            );
        }

        for message in messages {
            self.consume(message).await.map_err(|err| {
                ingest_error!(
                    ErrorKind::InvalidData,
                    "Pipeline could not consume message",
                    format!("destination: {destination}, error: {err}")
                )
            })?;
        }

        if self.auto_flush {
            self.flush().await?;
        }

        Ok(())
    }
}
