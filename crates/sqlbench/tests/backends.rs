//! End-to-end runs of the scenario suite against the real SQLite backends.

use sqlbench::{build_clients, BackendKind, BenchConfig, RusqliteClient, SqlxSqliteClient};
use sqlbench_core::scenarios::{self, SELECT_ALL_SQL};
use sqlbench_core::{
    group_by_backend, DatabaseClient, FailurePolicy, Measurer, Scenario, TestRunner,
};

const ITERATIONS: u32 = 5;

#[tokio::test]
async fn test_all_sqlite_backends() {
    let config = BenchConfig::new(ITERATIONS).with_backends(vec![
        BackendKind::RusqliteMemory,
        BackendKind::RusqliteFile,
        BackendKind::SqlxSqlite,
    ]);
    let clients = build_clients(&config).unwrap();
    let mut runner = TestRunner::new(clients)
        .unwrap()
        .with_failure_policy(FailurePolicy::Abort);

    let comparison = runner.run_all_tests(ITERATIONS).await.unwrap();

    assert!(comparison.failures.is_empty());
    assert_eq!(comparison.results.len(), 12);

    let grouped = group_by_backend(&comparison.results);
    let backends: Vec<&str> = grouped.backends().collect();
    assert_eq!(backends, vec!["rusqlite-memory", "rusqlite-file", "sqlx-sqlite"]);

    for (backend, results) in grouped.iter() {
        assert_eq!(results.len(), 4);
        for (result, scenario) in results.iter().zip(Scenario::ALL) {
            assert_eq!(result.name(), scenario.label(backend));
            assert_eq!(result.errors(), 0, "{} reported errors", result.name());
            assert!(result.operations_per_second() > 0.0);
            assert!(result.execution_time() >= 0.0);
        }
        assert_eq!(results[0].iterations(), ITERATIONS);
        assert_eq!(results[3].iterations(), 1);
    }
}

#[tokio::test]
async fn test_file_backend_persists_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.sqlite");

    let config = BenchConfig::new(ITERATIONS)
        .with_backends(vec![BackendKind::RusqliteFile])
        .with_sqlite_path(&path);
    let mut runner = TestRunner::new(build_clients(&config).unwrap()).unwrap();
    let comparison = runner.run_all_tests(ITERATIONS).await.unwrap();
    assert_eq!(comparison.results.len(), 4);

    // 5 mixed iterations insert 50 rows and delete id 2 once, then 5 inserts
    // and a 5-statement batch.
    let client = RusqliteClient::file(&path);
    client.connect().await.unwrap();
    let rows = client.execute_query(SELECT_ALL_SQL, &[]).await.unwrap();
    assert_eq!(rows.len(), 59);
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_ensure_table_is_idempotent() {
    let clients: Vec<Box<dyn DatabaseClient>> = vec![
        Box::new(RusqliteClient::in_memory()),
        Box::new(SqlxSqliteClient::in_memory()),
    ];

    for client in clients {
        client.connect().await.unwrap();
        scenarios::ensure_table(client.as_ref()).await.unwrap();
        scenarios::insert(client.as_ref()).await.unwrap();
        scenarios::ensure_table(client.as_ref()).await.unwrap();

        let rows = client.execute_query(SELECT_ALL_SQL, &[]).await.unwrap();
        assert_eq!(rows.len(), 1, "{} lost rows", client.name());
        client.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_select_before_table_counts_errors() {
    let config = BenchConfig::new(3).with_backends(vec![BackendKind::RusqliteMemory]);
    let clients = build_clients(&config).unwrap();
    let client = clients[0].as_ref();
    client.connect().await.unwrap();

    let err = scenarios::select(client).await.unwrap_err();
    assert!(err.to_string().contains("test_performance"));

    let mut measurer = Measurer::new().unwrap();
    let result = measurer
        .measure(Scenario::Select.label(client.name()), config.iterations, || {
            scenarios::select(client)
        })
        .await
        .unwrap();
    assert_eq!(result.iterations(), 3);
    assert_eq!(result.errors(), 3);

    client.close().await.unwrap();
}
