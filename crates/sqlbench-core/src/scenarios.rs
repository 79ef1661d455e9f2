//! Fixed workload scenarios.
//!
//! Every scenario is expressed purely through [`DatabaseClient`], so the same
//! SQL runs against every backend. The statements are kept verbatim across
//! backends; adapters translate placeholders and dialect where needed.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

use crate::client::DatabaseClient;
use crate::error::ClientError;
use crate::value::{Statement, Value};

/// Upper bound on the batch scenario's statement count.
pub const MAX_BATCH_SIZE: u32 = 50;

/// Rows inserted by each iteration of the mixed scenario.
pub const MIXED_INSERT_ROWS: i64 = 10;

pub const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS test_performance (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    value INTEGER,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

pub const INSERT_SQL: &str = "INSERT INTO test_performance (name, value) VALUES (?, ?)";
pub const SELECT_ALL_SQL: &str = "SELECT * FROM test_performance";
pub const SELECT_FILTERED_SQL: &str = "SELECT * FROM test_performance WHERE value > ?";
pub const UPDATE_SQL: &str = "UPDATE test_performance SET value = ? WHERE id = ?";
pub const DELETE_SQL: &str = "DELETE FROM test_performance WHERE id = ?";

static INSERT_SEQ: AtomicU64 = AtomicU64::new(0);

/// The four benchmark workloads, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Create-if-absent, 10 inserts, select all, one update, one delete.
    Mixed,
    /// Filtered select.
    Select,
    /// One insert with a fresh name.
    Insert,
    /// One `execute_many` call of N inserts.
    Batch,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Mixed,
        Scenario::Select,
        Scenario::Insert,
        Scenario::Batch,
    ];

    /// Result label for this scenario on `backend`.
    pub fn label(&self, backend: &str) -> String {
        match self {
            Scenario::Mixed => format!("{backend} Performance Test"),
            Scenario::Select => format!("{backend} SELECT Performance Test"),
            Scenario::Insert => format!("{backend} INSERT Performance Test"),
            Scenario::Batch => format!("{backend} Batch Performance Test"),
        }
    }
}

/// Batch size used for a run with `iterations` iterations.
pub fn batch_size(iterations: u32) -> u32 {
    iterations.min(MAX_BATCH_SIZE)
}

/// Create the benchmark table if it does not exist.
pub async fn ensure_table(client: &dyn DatabaseClient) -> Result<(), ClientError> {
    client.execute_query(CREATE_TABLE_SQL, &[]).await?;
    Ok(())
}

/// One iteration of the mixed CRUD scenario.
pub async fn mixed(client: &dyn DatabaseClient) -> Result<(), ClientError> {
    ensure_table(client).await?;

    for i in 0..MIXED_INSERT_ROWS {
        client
            .execute_query(
                INSERT_SQL,
                &[Value::Text(format!("test_name_{i}")), Value::Integer(i * 10)],
            )
            .await?;
    }

    let rows = client.execute_query(SELECT_ALL_SQL, &[]).await?;
    tracing::debug!(backend = client.name(), records = rows.len(), "retrieved records");

    client
        .execute_query(UPDATE_SQL, &[Value::Integer(999), Value::Integer(1)])
        .await?;
    client.execute_query(DELETE_SQL, &[Value::Integer(2)]).await?;
    Ok(())
}

/// One iteration of the read-only scenario.
pub async fn select(client: &dyn DatabaseClient) -> Result<(), ClientError> {
    client
        .execute_query(SELECT_FILTERED_SQL, &[Value::Integer(50)])
        .await?;
    Ok(())
}

/// One iteration of the write-only scenario.
pub async fn insert(client: &dyn DatabaseClient) -> Result<(), ClientError> {
    client.execute_query(INSERT_SQL, &fresh_insert_params()).await?;
    Ok(())
}

/// The statements issued by the batch scenario.
pub fn batch_statements(count: u32) -> Vec<Statement> {
    (0..count)
        .map(|i| {
            Statement::new(INSERT_SQL)
                .with_params(vec![Value::Text(format!("batch_test_{i}")), Value::from(i)])
        })
        .collect()
}

/// Issue `count` inserts as a single batch call.
pub async fn batch(client: &dyn DatabaseClient, count: u32) -> Result<(), ClientError> {
    client.execute_many(&batch_statements(count)).await
}

/// Name unique within the process plus a value in `0..100`.
fn fresh_insert_params() -> [Value; 2] {
    let seq = INSERT_SEQ.fetch_add(1, Ordering::Relaxed);
    let millis = chrono::Utc::now().timestamp_millis();
    let value = rand::thread_rng().gen_range(0..100i64);
    [
        Value::Text(format!("perf_test_{millis}_{seq}")),
        Value::Integer(value),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Scenario::Mixed.label("a"), "a Performance Test");
        assert_eq!(Scenario::Select.label("a"), "a SELECT Performance Test");
        assert_eq!(Scenario::Insert.label("a"), "a INSERT Performance Test");
        assert_eq!(Scenario::Batch.label("a"), "a Batch Performance Test");
    }

    #[test]
    fn test_batch_size_is_capped() {
        assert_eq!(batch_size(200), 50);
        assert_eq!(batch_size(50), 50);
        assert_eq!(batch_size(5), 5);
    }

    #[test]
    fn test_batch_statements() {
        let stmts = batch_statements(3);
        assert_eq!(stmts.len(), 3);
        assert!(stmts.iter().all(|s| s.sql == INSERT_SQL));
        assert_eq!(
            stmts[2].params,
            vec![Value::Text("batch_test_2".into()), Value::Integer(2)]
        );
    }

    #[test]
    fn test_insert_names_are_unique() {
        let a = fresh_insert_params();
        let b = fresh_insert_params();
        assert_ne!(a[0], b[0]);
        for params in [&a, &b] {
            let v = params[1].as_i64().unwrap();
            assert!((0..100).contains(&v));
        }
    }
}
