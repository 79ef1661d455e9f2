//! SQLite backend over `rusqlite`.
//!
//! Supports an in-memory database and a file-backed one. The driver is
//! synchronous; calls block the current worker for the statement's duration.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use sqlbench_core::{ClientError, DatabaseClient, RowSet, Statement, Value};

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

/// `rusqlite` client.
pub struct RusqliteClient {
    name: String,
    target: SqliteTarget,
    conn: Mutex<Option<Connection>>,
    _temp_dir: Option<tempfile::TempDir>,
}

impl RusqliteClient {
    /// In-memory database, discarded on close.
    pub fn in_memory() -> Self {
        Self::with_target("rusqlite-memory", SqliteTarget::Memory, None)
    }

    /// Database stored at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_target("rusqlite-file", SqliteTarget::File(path.into()), None)
    }

    /// Database in a fresh temporary directory, removed when the client drops.
    pub fn temp_file() -> Result<Self, ClientError> {
        let dir = tempfile::Builder::new()
            .prefix("sqlbench-")
            .tempdir()
            .map_err(|e| ClientError::Connection(format!("failed to create temp dir: {}", e)))?;
        let path = dir.path().join("bench.sqlite");
        Ok(Self::with_target(
            "rusqlite-file",
            SqliteTarget::File(path),
            Some(dir),
        ))
    }

    fn with_target(name: &str, target: SqliteTarget, temp_dir: Option<tempfile::TempDir>) -> Self {
        Self {
            name: name.to_string(),
            target,
            conn: Mutex::new(None),
            _temp_dir: temp_dir,
        }
    }

    pub fn target(&self) -> &SqliteTarget {
        &self.target
    }

    fn open(&self) -> Result<Connection, ClientError> {
        let conn = match &self.target {
            SqliteTarget::Memory => Connection::open_in_memory(),
            SqliteTarget::File(path) => Connection::open(path),
        };
        conn.map_err(|e| ClientError::Connection(format!("{}: {}", self.describe_target(), e)))
    }

    fn describe_target(&self) -> String {
        match &self.target {
            SqliteTarget::Memory => ":memory:".to_string(),
            SqliteTarget::File(path) => display_path(path),
        }
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

#[async_trait]
impl DatabaseClient for RusqliteClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), ClientError> {
        let mut guard = self.conn.lock();
        if guard.is_none() {
            *guard = Some(self.open()?);
            tracing::debug!(backend = %self.name, target = %self.describe_target(), "sqlite connection opened");
        }
        Ok(())
    }

    async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<RowSet, ClientError> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(ClientError::NotConnected)?;
        run_statement(conn, sql, params)
    }

    async fn execute_many(&self, statements: &[Statement]) -> Result<(), ClientError> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let tx = conn.transaction().map_err(query_error)?;
        for (index, stmt) in statements.iter().enumerate() {
            run_statement(&tx, &stmt.sql, &stmt.params).map_err(|e| ClientError::batch(index, e))?;
        }
        tx.commit().map_err(query_error)
    }

    async fn close(&self) -> Result<(), ClientError> {
        match self.conn.lock().take() {
            Some(conn) => conn
                .close()
                .map_err(|(_, e)| ClientError::Close(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Prepare and run one statement, collecting rows when it produces any.
fn run_statement(conn: &Connection, sql: &str, params: &[Value]) -> Result<RowSet, ClientError> {
    let mut stmt = conn.prepare(sql).map_err(query_error)?;
    let bound = params_from_iter(params.iter().map(to_sql_value));

    if stmt.column_count() == 0 {
        stmt.execute(bound).map_err(query_error)?;
        return Ok(RowSet::empty());
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut rows = stmt.query(bound).map_err(query_error)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(query_error)? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(from_value_ref(row.get_ref(idx).map_err(query_error)?));
        }
        out.push(values);
    }

    Ok(RowSet::new(columns, out))
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Blob(v) => SqlValue::Blob(v.clone()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Blob(v.to_vec()),
    }
}

fn query_error(e: rusqlite::Error) -> ClientError {
    ClientError::Query(e.to_string())
}
