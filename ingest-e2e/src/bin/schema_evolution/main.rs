//! Runs the schema evolution case against the in-memory pipeline.

use crate::config::load_case_config;
use ingest_config::shared::CaseConfig;
use ingest_e2e::case::{Case, SchemaEvolutionCase};
use ingest_e2e::fixture::{FixtureBuilder, SCHEMA_EVOLUTION_FILE_NAME, random_name_salt};
use ingest_e2e::runner::CaseRunner;
use ingest_e2e::store::memory::MemoryStore;
use ingest_e2e::test_utils::pipeline::MemoryPipeline;
use ingest_e2e::transport::memory::MemoryTransport;
use ingest_telemetry::init_tracing_with_case_name;
use std::time::Duration;
use tracing::{error, info};

mod config;

/// Delay between the records being sent and the pipeline landing them.
const INGESTION_LAG: Duration = Duration::from_millis(750);

fn main() -> anyhow::Result<()> {
    let case_config = load_case_config()?;

    let _log_flusher = init_tracing_with_case_name(
        env!("CARGO_BIN_NAME"),
        Some(SCHEMA_EVOLUTION_FILE_NAME.to_string()),
    )?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main(case_config))?;

    Ok(())
}

async fn async_main(case_config: CaseConfig) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let fixture = FixtureBuilder::schema_evolution(random_name_salt())
        .channel_count(case_config.channel_count)
        .record_num(case_config.record_num)
        .assemble()?;

    let pipeline = MemoryPipeline::for_fixture(store.clone(), MemoryTransport::new(), &fixture)
        .partitions(case_config.partitions_per_channel);
    let case = SchemaEvolutionCase::with_fixture(
        store,
        pipeline.clone(),
        fixture,
        case_config.partitions_per_channel,
    );

    let flusher = pipeline.spawn_delayed_flush(INGESTION_LAG);

    info!(config = %case.config_file_name(), "running case against the in-memory pipeline");
    let result = CaseRunner::new(case_config.retry).run(&case).await;

    // A flush that already failed explains a run that did not converge.
    let flush_result = if flusher.is_finished() {
        Some(flusher.await?)
    } else {
        flusher.abort();
        None
    };

    match result {
        Ok(report) => {
            info!(attempts = report.attempts, "case passed");
            Ok(())
        }
        Err(err) => {
            error!("an error occurred while running the case: {err}");
            match flush_result {
                Some(Err(flush_err)) => {
                    Err(anyhow::Error::new(flush_err).context(format!("case failed: {err}")))
                }
                _ => Err(err.into()),
            }
        }
    }
}
