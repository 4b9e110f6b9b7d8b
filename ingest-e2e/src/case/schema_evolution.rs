use ingest_config::shared::CaseConfig;
use tracing::info;

use crate::case::Case;
use crate::emitter::RecordEmitter;
use crate::error::IngestResult;
use crate::fixture::{Fixture, FixtureBuilder};
use crate::outcome::VerificationOutcome;
use crate::reclaimer::ResourceReclaimer;
use crate::store::Store;
use crate::transport::Transport;
use crate::verifier::ConvergenceVerifier;

/// Checks that a table created with a single column is widened to the union of the fields of
/// JSON records sent through several channels, and that every record lands.
#[derive(Debug)]
pub struct SchemaEvolutionCase<S, T> {
    store: S,
    transport: T,
    fixture: Fixture,
    verifier: ConvergenceVerifier,
    reclaimer: ResourceReclaimer,
}

impl<S, T> SchemaEvolutionCase<S, T> {
    /// Creates the case from its configuration.
    ///
    /// Nothing is sent to the store until [`Case::setup`] is called.
    pub fn new(
        store: S,
        transport: T,
        name_salt: impl Into<String>,
        config: &CaseConfig,
    ) -> IngestResult<Self> {
        config.validate()?;

        let fixture = FixtureBuilder::schema_evolution(name_salt)
            .channel_count(config.channel_count)
            .record_num(config.record_num)
            .assemble()?;

        Ok(Self::with_fixture(
            store,
            transport,
            fixture,
            config.partitions_per_channel,
        ))
    }

    /// Creates the case around a custom fixture.
    pub fn with_fixture(store: S, transport: T, fixture: Fixture, partitions: usize) -> Self {
        let verifier = ConvergenceVerifier::for_fixture(&fixture);
        let reclaimer = ResourceReclaimer::new(fixture.table_name(), partitions);

        Self {
            store,
            transport,
            fixture,
            verifier,
            reclaimer,
        }
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<S, T> Case for SchemaEvolutionCase<S, T>
where
    S: Store + Sync,
    T: Transport + Sync,
{
    fn config_file_name(&self) -> String {
        self.fixture.config_file_name()
    }

    async fn setup(&self) -> IngestResult<()> {
        self.fixture.create_table(&self.store).await
    }

    async fn send(&self) -> IngestResult<()> {
        let sent = RecordEmitter::new(&self.fixture)
            .emit(&self.transport)
            .await?;

        info!(table = %self.fixture.table_name(), sent, "records handed to the transport");

        Ok(())
    }

    async fn verify(&self, attempt: u32) -> VerificationOutcome {
        self.verifier.verify(&self.store, attempt).await
    }

    async fn clean(&self) {
        // Failures are logged by the reclaimer and must not mask the outcome of the run.
        let _ = self.reclaimer.reclaim(&self.store).await;
    }
}
