//! Integration tests for the comparison runner against recording clients.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlbench_core::scenarios::{self, CREATE_TABLE_SQL, INSERT_SQL};
use sqlbench_core::{
    ClientError, DatabaseClient, Error, Measurer, MemoryProbe, MemorySnapshot, RowSet, Statement,
    TestRunner, Value,
};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Connect,
    Query(String),
    Many(usize),
    Close,
}

#[derive(Default)]
struct Log {
    calls: Mutex<Vec<Call>>,
    tables: Mutex<HashSet<String>>,
}

/// Records every call. Understands just enough SQL to track created tables.
struct RecordingClient {
    name: &'static str,
    log: Arc<Log>,
    query_delay: Option<Duration>,
}

impl RecordingClient {
    fn new(name: &'static str) -> (Self, Arc<Log>) {
        let log = Arc::new(Log::default());
        let client = Self {
            name,
            log: Arc::clone(&log),
            query_delay: None,
        };
        (client, log)
    }
}

#[async_trait]
impl DatabaseClient for RecordingClient {
    fn name(&self) -> &str {
        self.name
    }

    async fn connect(&self) -> Result<(), ClientError> {
        self.log.calls.lock().push(Call::Connect);
        Ok(())
    }

    async fn execute_query(&self, sql: &str, _params: &[Value]) -> Result<RowSet, ClientError> {
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        self.log.calls.lock().push(Call::Query(sql.to_string()));

        if sql == CREATE_TABLE_SQL {
            self.log.tables.lock().insert("test_performance".to_string());
        } else if !self.log.tables.lock().contains("test_performance") {
            return Err(ClientError::Query("no such table: test_performance".into()));
        }
        Ok(RowSet::empty())
    }

    async fn execute_many(&self, statements: &[Statement]) -> Result<(), ClientError> {
        self.log.calls.lock().push(Call::Many(statements.len()));
        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.log.calls.lock().push(Call::Close);
        Ok(())
    }
}

struct ZeroProbe;

impl MemoryProbe for ZeroProbe {
    fn snapshot(&mut self) -> sqlbench_core::Result<MemorySnapshot> {
        Ok(MemorySnapshot::default())
    }
}

fn runner(clients: Vec<Box<dyn DatabaseClient>>) -> TestRunner<ZeroProbe> {
    TestRunner::with_measurer(clients, Measurer::with_probe(ZeroProbe))
}

#[tokio::test]
async fn test_run_all_tests_call_sequence() {
    let (client, log) = RecordingClient::new("fake");
    let mut runner = runner(vec![Box::new(client)]);

    let comparison = runner.run_all_tests(5).await.unwrap();

    let names: Vec<&str> = comparison.results.iter().map(|r| r.name()).collect();
    assert_eq!(
        names,
        vec![
            "fake Performance Test",
            "fake SELECT Performance Test",
            "fake INSERT Performance Test",
            "fake Batch Performance Test",
        ]
    );
    let iterations: Vec<u32> = comparison.results.iter().map(|r| r.iterations()).collect();
    assert_eq!(iterations, vec![5, 5, 5, 1]);
    assert!(comparison.results.iter().all(|r| r.errors() == 0));
    assert!(comparison.failures.is_empty());

    let calls = log.calls.lock().clone();
    assert_eq!(calls.first(), Some(&Call::Connect));
    assert_eq!(calls.last(), Some(&Call::Close));
    assert_eq!(calls.iter().filter(|c| **c == Call::Connect).count(), 1);
    assert_eq!(calls.iter().filter(|c| **c == Call::Close).count(), 1);

    // Mixed: create + 10 inserts + select + update + delete, five times.
    let creates = calls
        .iter()
        .filter(|c| **c == Call::Query(CREATE_TABLE_SQL.to_string()))
        .count();
    assert_eq!(creates, 5);

    let queries = calls.iter().filter(|c| matches!(c, Call::Query(_))).count();
    assert_eq!(queries, 5 * 14 + 5 + 5);

    let batches: Vec<&Call> = calls.iter().filter(|c| matches!(c, Call::Many(_))).collect();
    assert_eq!(batches, vec![&Call::Many(5)]);
    assert_eq!(calls[calls.len() - 2], Call::Many(5));
}

#[tokio::test]
async fn test_batch_scenario_is_capped() {
    let (client, log) = RecordingClient::new("fake");
    let mut runner = runner(vec![Box::new(client)]);

    let comparison = runner.run_all_tests(200).await.unwrap();

    let batch = comparison.results.last().unwrap();
    assert_eq!(batch.name(), "fake Batch Performance Test");
    assert_eq!(batch.iterations(), 1);
    let many: Vec<Call> = log
        .calls
        .lock()
        .iter()
        .filter(|c| matches!(c, Call::Many(_)))
        .cloned()
        .collect();
    assert_eq!(many, vec![Call::Many(50)]);
}

#[tokio::test]
async fn test_backends_run_in_order() {
    let (first, first_log) = RecordingClient::new("first");
    let (second, second_log) = RecordingClient::new("second");
    let mut runner = runner(vec![Box::new(first), Box::new(second)]);

    let comparison = runner.run_all_tests(2).await.unwrap();

    let backends: Vec<&str> = comparison.results.iter().map(|r| r.backend()).collect();
    assert_eq!(
        backends,
        vec!["first", "first", "first", "first", "second", "second", "second", "second"]
    );
    assert_eq!(first_log.calls.lock().last(), Some(&Call::Close));
    assert_eq!(second_log.calls.lock().first(), Some(&Call::Connect));

    let grouped = sqlbench_core::group_by_backend(&comparison.results);
    assert_eq!(grouped.get("first").unwrap().len(), 4);
    assert_eq!(grouped.get("second").unwrap().len(), 4);
}

#[tokio::test]
async fn test_select_before_table_counts_errors() {
    // The select scenario alone, against a client with no table yet.
    let (client, _log) = RecordingClient::new("fake");
    let mut measurer = Measurer::with_probe(ZeroProbe);

    let result = measurer
        .measure("fake SELECT Performance Test", 4, || scenarios::select(&client))
        .await
        .unwrap();

    assert_eq!(result.errors(), 4);
    assert_eq!(result.iterations(), 4);
}

#[tokio::test]
async fn test_ensure_table_is_idempotent() {
    let (client, log) = RecordingClient::new("fake");

    scenarios::ensure_table(&client).await.unwrap();
    scenarios::ensure_table(&client).await.unwrap();

    assert_eq!(log.tables.lock().len(), 1);
    client
        .execute_query(INSERT_SQL, &[Value::from("x"), Value::from(1)])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_cancels_and_still_closes() {
    let log = Arc::new(Log::default());
    let client = RecordingClient {
        name: "slow",
        log: Arc::clone(&log),
        query_delay: Some(Duration::from_millis(20)),
    };
    let mut runner = runner(vec![Box::new(client)]);
    let (tx, rx) = broadcast::channel(1);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(());
    });

    let err = runner.run_until_shutdown(1_000, rx).await.unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    let calls = log.calls.lock();
    assert_eq!(calls.first(), Some(&Call::Connect));
    assert_eq!(calls.last(), Some(&Call::Close));
}
