use bytes::Bytes;
use std::future::Future;

use crate::error::IngestResult;

/// A message transport feeding the ingestion pipeline, e.g. a topic-based broker.
///
/// `values` and `keys` have the same length and are paired by position: the message at index `i`
/// carries `values[i]` with key `keys[i]`.
pub trait Transport {
    fn send(
        &self,
        destination: &str,
        values: Vec<Bytes>,
        keys: Vec<Bytes>,
    ) -> impl Future<Output = IngestResult<()>> + Send;
}

impl<T> Transport for &T
where
    T: Transport + Sync + ?Sized,
{
    fn send(
        &self,
        destination: &str,
        values: Vec<Bytes>,
        keys: Vec<Bytes>,
    ) -> impl Future<Output = IngestResult<()>> + Send {
        (**self).send(destination, values, keys)
    }
}
