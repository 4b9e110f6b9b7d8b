use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, IngestResult};
use crate::transport::base::Transport;

/// A message accepted by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub destination: String,
    pub key: Bytes,
    pub value: Bytes,
}

#[derive(Debug, Default)]
struct Inner {
    messages: Vec<Message>,
    undelivered: VecDeque<Message>,
    fail_sends: bool,
}

/// In-memory [`Transport`].
///
/// Every accepted message is kept for inspection and also queued for delivery until a consumer
/// takes it with [`MemoryTransport::take_undelivered`].
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later send fail, as if the broker were unreachable.
    pub async fn fail_sends(&self) {
        let mut inner = self.inner.lock().await;
        inner.fail_sends = true;
    }

    /// Returns every message accepted so far, in send order.
    pub async fn messages(&self) -> Vec<Message> {
        let inner = self.inner.lock().await;
        inner.messages.clone()
    }

    pub async fn messages_for(&self, destination: &str) -> Vec<Message> {
        let inner = self.inner.lock().await;
        inner
            .messages
            .iter()
            .filter(|message| message.destination == destination)
            .cloned()
            .collect()
    }

    /// Removes up to `max` messages from the delivery queue, oldest first.
    pub async fn take_undelivered(&self, max: usize) -> Vec<Message> {
        let mut inner = self.inner.lock().await;
        let count = max.min(inner.undelivered.len());
        inner.undelivered.drain(..count).collect()
    }

    pub async fn undelivered_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.undelivered.len()
    }
}

impl Transport for MemoryTransport {
    async fn send(&self, destination: &str, values: Vec<Bytes>, keys: Vec<Bytes>) -> IngestResult<()> {
        let mut inner = self.inner.lock().await;

        if inner.fail_sends {
            bail!(
                ErrorKind::TransportConnectionFailed,
                "Transport is unreachable",
                format!("destination: {destination}")
            );
        }

        if values.len() != keys.len() {
            bail!(
                ErrorKind::InvalidData,
                "Values and keys differ in length",
                format!("values: {}, keys: {}", values.len(), keys.len())
            );
        }

        info!(destination, messages = values.len(), "accepting batch");
        for (value, key) in values.into_iter().zip(keys) {
            let message = Message {
                destination: destination.to_string(),
                key,
                value,
            };
            inner.messages.push(message.clone());
            inner.undelivered.push_back(message);
        }

        Ok(())
    }
}
