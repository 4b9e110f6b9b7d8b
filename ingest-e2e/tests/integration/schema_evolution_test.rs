use ingest_config::shared::CaseConfig;
use ingest_e2e::case::{Case, SchemaEvolutionCase};
use ingest_e2e::emitter::key_payload;
use ingest_e2e::error::ErrorKind;
use ingest_e2e::outcome::{Defect, RetryReason, VerificationOutcome};
use ingest_e2e::reclaimer::ResourceReclaimer;
use ingest_e2e::store::memory::MemoryStore;
use ingest_e2e::transport::memory::MemoryTransport;
use ingest_e2e::types::RECORD_METADATA_COLUMN;
use ingest_telemetry::init_test_tracing;
use std::collections::BTreeSet;

use crate::common::schema_evolution_case;

#[tokio::test]
async fn table_is_widened_to_the_union_of_record_fields() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_widen", &CaseConfig::default(), |p| p);

    test.case.setup().await.unwrap();
    test.case.send().await.unwrap();

    // Schema evolved, rows still in flight.
    assert_eq!(
        test.case.verify(0).await,
        VerificationOutcome::Retryable(RetryReason::NoRowsYet)
    );

    test.pipeline.flush().await.unwrap();
    assert_eq!(test.case.verify(1).await, VerificationOutcome::Converged);

    let table = test.case.fixture().table_name();
    let observed: BTreeSet<String> = test
        .store
        .table_columns(table)
        .await
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    let golden: BTreeSet<String> = test
        .case
        .fixture()
        .golden_schema()
        .column_names()
        .map(str::to_string)
        .collect();
    assert_eq!(observed, golden);
    assert!(observed.contains(RECORD_METADATA_COLUMN));
    assert_eq!(test.store.row_count(table).await, Some(200));

    test.case.clean().await;
}

#[tokio::test]
async fn verification_is_idempotent_after_convergence() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_idempotent", &CaseConfig::default(), |p| {
        p.auto_flush(true)
    });

    test.case.setup().await.unwrap();
    test.case.send().await.unwrap();

    for attempt in 0..3 {
        assert_eq!(test.case.verify(attempt).await, VerificationOutcome::Converged);
    }
    assert_eq!(
        test.store.row_count(test.case.fixture().table_name()).await,
        Some(200)
    );

    test.case.clean().await;
}

#[tokio::test]
async fn every_channel_replays_its_record_with_numbered_keys() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_keys", &CaseConfig::default(), |p| p);

    test.case.setup().await.unwrap();
    test.case.send().await.unwrap();

    let fixture = test.case.fixture();
    for (index, channel) in fixture.channels().iter().enumerate() {
        let messages = test.pipeline.transport().messages_for(channel).await;
        assert_eq!(messages.len(), 100);

        let expected_value = fixture.record_for_channel(index).to_payload().unwrap();
        for (copy, message) in messages.iter().enumerate() {
            assert_eq!(message.value, expected_value);
            assert_eq!(message.key, key_payload(copy).unwrap());
        }
    }

    test.case.clean().await;
}

#[tokio::test]
async fn partial_delivery_is_not_retryable() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_partial", &CaseConfig::default(), |p| p);

    test.case.setup().await.unwrap();
    test.case.send().await.unwrap();
    test.pipeline.flush_up_to(150).await.unwrap();

    let outcome = test.case.verify(0).await;

    assert_eq!(
        outcome,
        VerificationOutcome::NonRetryable(Defect::RowCountMismatch {
            expected: 200,
            observed: 150
        })
    );
    assert!(
        outcome
            .to_string()
            .contains("number of records in table is different from number of records sent")
    );

    test.case.clean().await;
}

#[tokio::test]
async fn wrong_column_type_is_reported_before_the_row_count() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_wrong_type", &CaseConfig::default(), |p| {
        p.override_type("PERFORMANCE_CHAR", "TIMESTAMP_NTZ(9)")
    });

    test.case.setup().await.unwrap();
    test.case.send().await.unwrap();

    let outcome = test.case.verify(0).await;

    assert_eq!(
        outcome,
        VerificationOutcome::NonRetryable(Defect::ColumnTypeMismatch {
            column: "PERFORMANCE_CHAR".to_string(),
            observed: "TIMESTAMP_NTZ(9)".to_string(),
            expected: "VARCHAR".to_string(),
        })
    );
    assert!(
        !test
            .store
            .executed_statements()
            .await
            .iter()
            .any(|statement| statement.starts_with("SELECT COUNT(*)"))
    );

    test.case.clean().await;
}

#[tokio::test]
async fn column_never_created_is_reported() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_lossy", &CaseConfig::default(), |p| {
        p.drop_field("APPROVAL").auto_flush(true)
    });

    test.case.setup().await.unwrap();
    test.case.send().await.unwrap();

    assert_eq!(
        test.case.verify(0).await,
        VerificationOutcome::NonRetryable(Defect::MissingColumns(vec!["APPROVAL".to_string()]))
    );

    test.case.clean().await;
}

#[tokio::test]
async fn clean_drops_table_stage_and_pipes() {
    init_test_tracing();
    let config = CaseConfig {
        partitions_per_channel: 2,
        ..CaseConfig::default()
    };
    let test = schema_evolution_case(MemoryStore::new(), "_clean", &config, |p| p.auto_flush(true));

    test.case.setup().await.unwrap();
    test.case.send().await.unwrap();

    let table = test.case.fixture().table_name().to_string();
    let names = ResourceReclaimer::new(&table, 2);
    assert!(test.store.stage_exists(&names.stage_name()).await);
    assert!(test.store.pipe_exists(&names.pipe_name(1)).await);

    test.case.clean().await;

    assert!(!test.store.table_exists(&table).await);
    assert!(!test.store.stage_exists(&names.stage_name()).await);
    assert!(!test.store.pipe_exists(&names.pipe_name(0)).await);
    assert!(!test.store.pipe_exists(&names.pipe_name(1)).await);

    // Cleaning twice is harmless.
    test.case.clean().await;
}

#[tokio::test]
async fn cleaning_failures_are_swallowed() {
    init_test_tracing();
    let store = MemoryStore::new();
    let test = schema_evolution_case(store.clone(), "_clean_fail", &CaseConfig::default(), |p| p);
    test.case.setup().await.unwrap();
    store.fail_statements_starting_with("DROP TABLE").await;

    test.case.clean().await;

    // The remaining statements were still attempted.
    let statements = store.executed_statements().await;
    assert!(statements.iter().any(|s| s.starts_with("DROP STAGE")));
    assert!(statements.iter().any(|s| s.starts_with("DROP PIPE")));
}

#[tokio::test]
async fn records_without_a_channel_are_rejected_before_setup() {
    init_test_tracing();
    let store = MemoryStore::new();
    let config = CaseConfig {
        channel_count: 1,
        ..CaseConfig::default()
    };

    let err = SchemaEvolutionCase::new(store.clone(), MemoryTransport::new(), "_one_channel", &config)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfigError);
    assert!(store.executed_statements().await.is_empty());
}
