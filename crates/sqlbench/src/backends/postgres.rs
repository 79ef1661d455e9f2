//! PostgreSQL backend over the async `sqlx` driver.
//!
//! Requires a reachable server. Enable with `--features postgres`.
//! Statements are written with SQLite-style `?` placeholders; this adapter
//! rewrites them to `$n` and maps `INTEGER PRIMARY KEY` to `SERIAL PRIMARY KEY`
//! before sending.

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};

use sqlbench_core::{ClientError, DatabaseClient, RowSet, Statement, Value};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// `sqlx` PostgreSQL client.
pub struct SqlxPostgresClient {
    name: String,
    url: String,
    pool: Mutex<Option<PgPool>>,
}

impl SqlxPostgresClient {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            name: "sqlx-postgres".to_string(),
            url: database_url.into(),
            pool: Mutex::new(None),
        }
    }

    fn pool(&self) -> Result<PgPool, ClientError> {
        self.pool.lock().clone().ok_or(ClientError::NotConnected)
    }
}

#[async_trait]
impl DatabaseClient for SqlxPostgresClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), ClientError> {
        if self.pool.lock().is_some() {
            return Ok(());
        }

        // One connection: the benchmark measures a single logical client.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.url)
            .await
            .map_err(|e| ClientError::Connection(format!("failed to connect to PostgreSQL: {}", e)))?;

        *self.pool.lock() = Some(pool);
        tracing::debug!(backend = %self.name, "postgres pool opened");
        Ok(())
    }

    async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<RowSet, ClientError> {
        let pool = self.pool()?;
        let sql = translate_sql(sql);
        let rows = bind_all(sqlx::query(&sql), params)
            .fetch_all(&pool)
            .await
            .map_err(query_error)?;
        decode_rows(&rows)
    }

    async fn execute_many(&self, statements: &[Statement]) -> Result<(), ClientError> {
        let pool = self.pool()?;
        let mut tx = pool.begin().await.map_err(query_error)?;

        for (index, stmt) in statements.iter().enumerate() {
            let sql = translate_sql(&stmt.sql);
            bind_all(sqlx::query(&sql), &stmt.params)
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

/// Rewrite `?` placeholders to `$1..$n` outside quoted literals and adapt
/// SQLite's rowid primary key to a serial column.
pub fn translate_sql(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut next = 1;
    let mut in_single = false;
    let mut in_double = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                out.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(ch);
            }
            '?' if !in_single && !in_double => {
                out.push('$');
                out.push_str(&next.to_string());
                next += 1;
            }
            _ => out.push(ch),
        }
    }

    out.replace("INTEGER PRIMARY KEY", "SERIAL PRIMARY KEY")
}

fn bind_all<'q>(mut query: PgQuery<'q>, params: &[Value]) -> PgQuery<'q> {
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

fn decode_rows(rows: &[PgRow]) -> Result<RowSet, ClientError> {
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

fn decode_row(row: &PgRow) -> Result<Vec<Value>, ClientError> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        let raw = row.try_get_raw(idx).map_err(query_error)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let type_name = raw.type_info().name().to_string();
        let value = match type_name.as_str() {
            "INT2" => row.try_get::<i16, _>(idx).map(|v| Value::Integer(v.into())),
            "INT4" => row.try_get::<i32, _>(idx).map(|v| Value::Integer(v.into())),
            "INT8" => row.try_get::<i64, _>(idx).map(Value::Integer),
            "BOOL" => row.try_get::<bool, _>(idx).map(|v| Value::Integer(v.into())),
            "FLOAT4" => row.try_get::<f32, _>(idx).map(|v| Value::Real(v.into())),
            "FLOAT8" => row.try_get::<f64, _>(idx).map(Value::Real),
            "BYTEA" => row.try_get::<Vec<u8>, _>(idx).map(Value::Blob),
            "TIMESTAMP" => row
                .try_get::<chrono::NaiveDateTime, _>(idx)
                .map(|v| Value::Text(v.to_string())),
            "TIMESTAMPTZ" => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
                .map(|v| Value::Text(v.to_rfc3339())),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row.try_get::<String, _>(idx).map(Value::Text),
            other => {
                return Err(ClientError::UnsupportedValue(format!(
                    "column {} has unsupported type {}",
                    idx, other
                )))
            }
        };
        values.push(value.map_err(query_error)?);
    }
    Ok(values)
}

fn query_error(e: sqlx::Error) -> ClientError {
    ClientError::Query(e.to_string())
}
