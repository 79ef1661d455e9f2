//! SQLite backend over the async `sqlx` driver.
//!
//! Uses a single-connection pool so an in-memory database survives for the
//! lifetime of the client.

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use sqlbench_core::{ClientError, DatabaseClient, RowSet, Statement, Value};

/// Default URL: a private in-memory database.
pub const DEFAULT_SQLITE_URL: &str = "sqlite::memory:";

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// `sqlx` SQLite client.
pub struct SqlxSqliteClient {
    name: String,
    url: String,
    pool: Mutex<Option<SqlitePool>>,
}

impl SqlxSqliteClient {
    /// In-memory database.
    pub fn in_memory() -> Self {
        Self::new(DEFAULT_SQLITE_URL)
    }

    /// Database at a `sqlite:` URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: "sqlx-sqlite".to_string(),
            url: url.into(),
            pool: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn pool(&self) -> Result<SqlitePool, ClientError> {
        self.pool.lock().clone().ok_or(ClientError::NotConnected)
    }
}

#[async_trait]
impl DatabaseClient for SqlxSqliteClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), ClientError> {
        if self.pool.lock().is_some() {
            return Ok(());
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&self.url)
            .await
            .map_err(|e| ClientError::Connection(format!("failed to connect to {}: {}", self.url, e)))?;

        *self.pool.lock() = Some(pool);
        tracing::debug!(backend = %self.name, url = %self.url, "sqlx sqlite pool opened");
        Ok(())
    }

    async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<RowSet, ClientError> {
        let pool = self.pool()?;
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&pool)
            .await
            .map_err(query_error)?;
        decode_rows(&rows)
    }

    async fn execute_many(&self, statements: &[Statement]) -> Result<(), ClientError> {
        let pool = self.pool()?;
        let mut tx = pool.begin().await.map_err(query_error)?;

        for (index, stmt) in statements.iter().enumerate() {
            bind_all(sqlx::query(&stmt.sql), &stmt.params)
                .execute(&mut *tx)
                .await
                .map_err(|e| ClientError::batch(index, query_error(e)))?;
        }

        tx.commit().await.map_err(query_error)
    }

    async fn close(&self) -> Result<(), ClientError> {
        let pool = self.pool.lock().take();
        if let Some(pool) = pool {
            pool.close().await;
        }
        Ok(())
    }
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, params: &[Value]) -> SqliteQuery<'q> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<i64>),
            Value::Integer(v) => query.bind(*v),
            Value::Real(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.clone()),
            Value::Blob(v) => query.bind(v.clone()),
        };
    }
    query
}

fn decode_rows(rows: &[SqliteRow]) -> Result<RowSet, ClientError> {
    let Some(first) = rows.first() else {
        return Ok(RowSet::empty());
    };
    let columns = first.columns().iter().map(|c| c.name().to_string()).collect();

    let values = rows
        .iter()
        .map(decode_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RowSet::new(columns, values))
}

/// Decode by the storage class of each value, not the declared column type.
fn decode_row(row: &SqliteRow) -> Result<Vec<Value>, ClientError> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let raw = row.try_get_raw(idx).map_err(query_error)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let type_name = raw.type_info().name().to_string();
        let value = match type_name.as_str() {
            "INTEGER" | "BOOLEAN" => row.try_get_unchecked::<i64, _>(idx).map(Value::Integer),
            "REAL" | "NUMERIC" => row.try_get_unchecked::<f64, _>(idx).map(Value::Real),
            "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(idx).map(Value::Blob),
            _ => row.try_get_unchecked::<String, _>(idx).map(Value::Text),
        };
        values.push(value.map_err(query_error)?);
    }
    Ok(values)
}

fn query_error(e: sqlx::Error) -> ClientError {
    ClientError::Query(e.to_string())
}
