use std::future::Future;

use crate::error::IngestResult;
use crate::outcome::VerificationOutcome;

/// An end-to-end case checking that the pipeline delivered records to the store.
///
/// A driver calls [`Case::setup`] and [`Case::send`] once, then [`Case::verify`] with an
/// increasing attempt index for as long as the outcome is retryable. [`Case::clean`] must be
/// called at the end whatever happened before, including a failed setup.
pub trait Case {
    /// Name of the declarative configuration describing the transport topology of the case.
    fn config_file_name(&self) -> String;

    fn setup(&self) -> impl Future<Output = IngestResult<()>> + Send;

    fn send(&self) -> impl Future<Output = IngestResult<()>> + Send;

    fn verify(&self, attempt: u32) -> impl Future<Output = VerificationOutcome> + Send;

    fn clean(&self) -> impl Future<Output = ()> + Send;
}

impl<C> Case for &C
where
    C: Case + Sync + ?Sized,
{
    fn config_file_name(&self) -> String {
        (**self).config_file_name()
    }

    fn setup(&self) -> impl Future<Output = IngestResult<()>> + Send {
        (**self).setup()
    }

    fn send(&self) -> impl Future<Output = IngestResult<()>> + Send {
        (**self).send()
    }

    fn verify(&self, attempt: u32) -> impl Future<Output = VerificationOutcome> + Send {
        (**self).verify(attempt)
    }

    fn clean(&self) -> impl Future<Output = ()> + Send {
        (**self).clean()
    }
}
