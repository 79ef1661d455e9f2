//! The database client capability every benchmarked backend implements.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::value::{RowSet, Statement, Value};

/// Uniform interface over a SQL backend.
///
/// The runner drives every backend through this trait only, so a backend
/// adapter is a thin shim translating these calls into its native driver API.
/// Methods take `&self`; adapters hold their connection behind interior
/// mutability so a client can be shared by reference with scenario futures.
///
/// Contract:
/// - `connect` must succeed before any statement is issued and is idempotent
///   within one client lifetime.
/// - `execute_many` applies statements in input order, one at a time, and
///   reports the first failure.
/// - `close` is safe even when `connect` never completed.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Stable backend identifier. Used as the first word of result labels,
    /// so it must not contain spaces.
    fn name(&self) -> &str;

    /// Open the underlying connection.
    async fn connect(&self) -> Result<(), ClientError>;

    /// Run one statement with positional `?` parameters.
    async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<RowSet, ClientError>;

    /// Run a batch of statements sequentially.
    ///
    /// The default issues each statement through `execute_query`, stopping at
    /// the first failure.
    async fn execute_many(&self, statements: &[Statement]) -> Result<(), ClientError> {
        for (index, stmt) in statements.iter().enumerate() {
            self.execute_query(&stmt.sql, &stmt.params)
                .await
                .map_err(|e| ClientError::batch(index, e))?;
        }
        Ok(())
    }

    /// Release the connection.
    async fn close(&self) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records statements and fails on a configured SQL prefix.
    struct Scripted {
        seen: Mutex<Vec<String>>,
        fail_on: &'static str,
    }

    #[async_trait]
    impl DatabaseClient for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn connect(&self) -> Result<(), ClientError> {
            Ok(())
        }

        async fn execute_query(&self, sql: &str, _params: &[Value]) -> Result<RowSet, ClientError> {
            self.seen.lock().push(sql.to_string());
            if sql.starts_with(self.fail_on) {
                return Err(ClientError::Query(format!("rejected: {sql}")));
            }
            Ok(RowSet::empty())
        }

        async fn close(&self) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_execute_many_keeps_order() {
        let client = Scripted {
            seen: Mutex::new(Vec::new()),
            fail_on: "never",
        };
        let batch = vec![Statement::new("a"), Statement::new("b"), Statement::new("c")];
        client.execute_many(&batch).await.unwrap();
        assert_eq!(*client.seen.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_default_execute_many_stops_at_first_error() {
        let client = Scripted {
            seen: Mutex::new(Vec::new()),
            fail_on: "bad",
        };
        let batch = vec![
            Statement::new("ok"),
            Statement::new("bad 1"),
            Statement::new("bad 2"),
        ];
        let err = client.execute_many(&batch).await.unwrap_err();
        assert!(matches!(err, ClientError::Batch { index: 1, .. }));
        assert_eq!(client.seen.lock().len(), 2);
    }
}
