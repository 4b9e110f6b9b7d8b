use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::error::{ErrorKind, IngestResult};
use crate::fixture::Fixture;
use crate::transport::Transport;
use crate::ingest_error;

/// Key attached to every emitted copy, distinguishing copies of the same record.
#[derive(Debug, Serialize)]
struct KeyPayload {
    number: String,
}

/// Encodes the key of the `copy`-th message of a channel.
pub fn key_payload(copy: usize) -> IngestResult<Bytes> {
    let key = KeyPayload {
        number: copy.to_string(),
    };

    let payload = serde_json::to_vec(&key).map_err(|err| {
        ingest_error!(
            ErrorKind::SerializationError,
            "Key serialization failed",
            err
        )
    })?;

    Ok(Bytes::from(payload))
}

/// Sends the fixture's records through the transport.
///
/// Channel `i` carries `record_num` copies of record `i mod |records|`, one batch per channel.
/// Nothing is awaited beyond the transport accepting the batch, whether the records reached the
/// store is for the verifier to find out.
#[derive(Debug)]
pub struct RecordEmitter<'a> {
    fixture: &'a Fixture,
}

impl<'a> RecordEmitter<'a> {
    pub fn new(fixture: &'a Fixture) -> Self {
        Self { fixture }
    }

    /// Emits every channel's batch and returns the number of messages sent.
    pub async fn emit<T: Transport>(&self, transport: &T) -> IngestResult<usize> {
        let record_num = self.fixture.record_num();
        let mut sent = 0;

        for (channel_index, channel) in self.fixture.channels().iter().enumerate() {
            let value = self.fixture.record_for_channel(channel_index).to_payload()?;

            let mut values = Vec::with_capacity(record_num);
            let mut keys = Vec::with_capacity(record_num);
            for copy in 0..record_num {
                // Cloning `Bytes` shares the buffer.
                values.push(value.clone());
                keys.push(key_payload(copy)?);
            }

            transport.send(channel, values, keys).await?;
            sent += record_num;

            info!(channel = %channel, messages = record_num, "sent records");
        }

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureBuilder;
    use crate::transport::memory::MemoryTransport;

    #[test]
    fn test_key_payload() {
        assert_eq!(key_payload(0).unwrap().as_ref(), br#"{"number":"0"}"#);
        assert_eq!(key_payload(42).unwrap().as_ref(), br#"{"number":"42"}"#);
    }

    #[tokio::test]
    async fn test_emit_sends_one_batch_per_channel() {
        let fixture = FixtureBuilder::schema_evolution("_salt")
            .record_num(3)
            .assemble()
            .unwrap();
        let transport = MemoryTransport::new();

        let sent = RecordEmitter::new(&fixture).emit(&transport).await.unwrap();

        assert_eq!(sent, 6);
        let channel0 = transport.messages_for(&fixture.channels()[0]).await;
        let channel1 = transport.messages_for(&fixture.channels()[1]).await;
        assert_eq!(channel0.len(), 3);
        assert_eq!(channel1.len(), 3);

        let expected_value0 = fixture.records()[0].to_payload().unwrap();
        let expected_value1 = fixture.records()[1].to_payload().unwrap();
        for (copy, message) in channel0.iter().enumerate() {
            assert_eq!(message.value, expected_value0);
            assert_eq!(message.key, key_payload(copy).unwrap());
        }
        assert!(channel1.iter().all(|message| message.value == expected_value1));
    }

    #[tokio::test]
    async fn test_emit_propagates_transport_failure() {
        let fixture = FixtureBuilder::schema_evolution("_salt").assemble().unwrap();
        let transport = MemoryTransport::new();
        transport.fail_sends().await;

        let err = RecordEmitter::new(&fixture)
            .emit(&transport)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportConnectionFailed);
    }
}
