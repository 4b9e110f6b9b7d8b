//! Shared setup for the end-to-end tests.
//!
//! Every case runs against an in-memory store fed by an in-memory pipeline, wired so that the
//! pipeline routes the case's channels to the case's table.

use ingest_config::shared::{CaseConfig, RetryConfig};
use ingest_e2e::case::SchemaEvolutionCase;
use ingest_e2e::fixture::FixtureBuilder;
use ingest_e2e::runner::CaseRunner;
use ingest_e2e::store::memory::MemoryStore;
use ingest_e2e::test_utils::pipeline::MemoryPipeline;
use ingest_e2e::transport::memory::MemoryTransport;

pub type MemoryCase = SchemaEvolutionCase<MemoryStore, MemoryPipeline>;

pub struct TestCase {
    pub case: MemoryCase,
    pub store: MemoryStore,
    pub pipeline: MemoryPipeline,
}

/// Builds a schema evolution case whose pipeline is customized by `configure`.
pub fn schema_evolution_case(
    store: MemoryStore,
    name_salt: &str,
    config: &CaseConfig,
    configure: impl FnOnce(MemoryPipeline) -> MemoryPipeline,
) -> TestCase {
    let fixture = FixtureBuilder::schema_evolution(name_salt)
        .channel_count(config.channel_count)
        .record_num(config.record_num)
        .assemble()
        .unwrap();

    let pipeline = configure(
        MemoryPipeline::for_fixture(store.clone(), MemoryTransport::new(), &fixture)
            .partitions(config.partitions_per_channel),
    );
    let case = SchemaEvolutionCase::with_fixture(
        store.clone(),
        pipeline.clone(),
        fixture,
        config.partitions_per_channel,
    );

    TestCase {
        case,
        store,
        pipeline,
    }
}

pub fn runner() -> CaseRunner {
    CaseRunner::new(RetryConfig::default())
}
