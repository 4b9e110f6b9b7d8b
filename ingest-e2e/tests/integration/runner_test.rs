use ingest_config::shared::{CaseConfig, RetryConfig};
use ingest_e2e::error::ErrorKind;
use ingest_e2e::fixture::random_name_salt;
use ingest_e2e::outcome::Defect;
use ingest_e2e::runner::{CaseRunner, RunError};
use ingest_e2e::store::memory::MemoryStore;
use ingest_telemetry::init_test_tracing;
use std::time::Duration;
use tokio::time::sleep;

use crate::common::{runner, schema_evolution_case};

#[tokio::test(start_paused = true)]
async fn run_converges_when_rows_land_immediately() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_immediate", &CaseConfig::default(), |p| {
        p.auto_flush(true)
    });

    let report = runner().run(&test.case).await.unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(report.elapsed, Duration::ZERO);
    assert!(!test.store.table_exists(test.case.fixture().table_name()).await);
}

#[tokio::test(start_paused = true)]
async fn run_retries_while_rows_are_in_flight() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_in_flight", &CaseConfig::default(), |p| p);

    let pipeline = test.pipeline.clone();
    let flusher = tokio::spawn(async move {
        sleep(Duration::from_millis(1_200)).await;
        pipeline.flush().await
    });

    let report = runner().run(&test.case).await.unwrap();

    // Attempts at 0ms and 500ms see an empty table, the one at 1500ms sees every row.
    assert_eq!(report.attempts, 3);
    assert_eq!(flusher.await.unwrap().unwrap(), 200);
    assert!(!test.store.table_exists(test.case.fixture().table_name()).await);
}

#[tokio::test(start_paused = true)]
async fn run_aborts_on_partial_delivery() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_abort", &CaseConfig::default(), |p| p);

    let pipeline = test.pipeline.clone();
    let flusher = tokio::spawn(async move {
        sleep(Duration::from_millis(700)).await;
        pipeline.flush_up_to(150).await
    });

    let err = runner().run(&test.case).await.unwrap_err();

    assert!(matches!(
        err,
        RunError::Defect {
            attempt: 2,
            defect: Defect::RowCountMismatch {
                expected: 200,
                observed: 150
            }
        }
    ));
    assert_eq!(flusher.await.unwrap().unwrap(), 150);
    assert!(!test.store.table_exists(test.case.fixture().table_name()).await);
}

#[tokio::test(start_paused = true)]
async fn run_gives_up_when_nothing_lands() {
    init_test_tracing();
    let config = CaseConfig {
        retry: RetryConfig {
            max_attempts: 4,
            ..RetryConfig::default()
        },
        ..CaseConfig::default()
    };
    let test = schema_evolution_case(MemoryStore::new(), "_stalled", &config, |p| p);

    let err = CaseRunner::new(config.retry.clone())
        .run(&test.case)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::AttemptsExhausted { attempts: 4 }));
    assert_eq!(test.pipeline.pending_rows().await, 200);
    assert!(!test.store.table_exists(test.case.fixture().table_name()).await);
}

#[tokio::test]
async fn setup_failure_still_reclaims_resources() {
    init_test_tracing();
    let store = MemoryStore::new();
    store.fail_statements_starting_with("CREATE").await;
    let test = schema_evolution_case(store, "_no_table", &CaseConfig::default(), |p| p);

    let err = runner().run(&test.case).await.unwrap_err();

    match err {
        RunError::Setup(err) => assert_eq!(err.kind(), ErrorKind::StoreQueryFailed),
        other => panic!("unexpected error: {other:?}"),
    }
    let statements = test.store.executed_statements().await;
    assert_eq!(statements.len(), 4);
    assert!(statements[1].starts_with("DROP TABLE IF EXISTS"));
    assert!(test.pipeline.transport().messages().await.is_empty());
}

#[tokio::test]
async fn transport_failure_still_reclaims_resources() {
    init_test_tracing();
    let test = schema_evolution_case(MemoryStore::new(), "_no_broker", &CaseConfig::default(), |p| p);
    test.pipeline.transport().fail_sends().await;

    let err = runner().run(&test.case).await.unwrap_err();

    match err {
        RunError::Send(err) => assert_eq!(err.kind(), ErrorKind::TransportConnectionFailed),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!test.store.table_exists(test.case.fixture().table_name()).await);
}

#[tokio::test(start_paused = true)]
async fn concurrent_cases_are_isolated_by_salt() {
    init_test_tracing();
    let store = MemoryStore::new();
    let config = CaseConfig {
        record_num: 10,
        ..CaseConfig::default()
    };
    let first = schema_evolution_case(store.clone(), &random_name_salt(), &config, |p| {
        p.auto_flush(true)
    });
    let second = schema_evolution_case(store.clone(), &random_name_salt(), &config, |p| {
        p.auto_flush(true)
    });
    assert_ne!(
        first.case.fixture().table_name(),
        second.case.fixture().table_name()
    );

    let runner = runner();
    let (first_report, second_report) =
        tokio::join!(runner.run(&first.case), runner.run(&second.case));

    assert_eq!(first_report.unwrap().attempts, 1);
    assert_eq!(second_report.unwrap().attempts, 1);
    assert!(!store.table_exists(first.case.fixture().table_name()).await);
    assert!(!store.table_exists(second.case.fixture().table_name()).await);
}
