//! Database backends under comparison.
//!
//! Every backend implements [`DatabaseClient`] so the runner can drive them
//! identically. Backends run in the fixed order of [`BackendKind::ALL`].

pub mod sqlite;
pub mod sqlx_sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use sqlite::{RusqliteClient, SqliteTarget};
pub use sqlx_sqlite::SqlxSqliteClient;

#[cfg(feature = "postgres")]
pub use postgres::SqlxPostgresClient;

use clap::ValueEnum;
use serde::Serialize;
use sqlbench_core::DatabaseClient;

use crate::config::BenchConfig;
use crate::error::Error;

/// Selectable backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// rusqlite, in-memory database
    RusqliteMemory,
    /// rusqlite, file-backed database
    RusqliteFile,
    /// sqlx SQLite driver, in-memory database
    SqlxSqlite,
    /// sqlx PostgreSQL driver (requires the `postgres` feature)
    SqlxPostgres,
}

impl BackendKind {
    /// Every backend, in run order.
    pub const ALL: [BackendKind; 4] = [
        BackendKind::RusqliteMemory,
        BackendKind::RusqliteFile,
        BackendKind::SqlxSqlite,
        BackendKind::SqlxPostgres,
    ];

    /// Backend name as it appears in result labels.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::RusqliteMemory => "rusqlite-memory",
            BackendKind::RusqliteFile => "rusqlite-file",
            BackendKind::SqlxSqlite => "sqlx-sqlite",
            BackendKind::SqlxPostgres => "sqlx-postgres",
        }
    }

    /// Whether this build can construct the backend.
    pub fn is_compiled(&self) -> bool {
        match self {
            BackendKind::SqlxPostgres => cfg!(feature = "postgres"),
            _ => true,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Construct the configured backends in run order.
///
/// The selection is sorted into [`BackendKind::ALL`] order and deduplicated.
pub fn build_clients(config: &BenchConfig) -> Result<Vec<Box<dyn DatabaseClient>>, Error> {
    let mut clients: Vec<Box<dyn DatabaseClient>> = Vec::new();

    for kind in BackendKind::ALL {
        if !config.backends.contains(&kind) {
            continue;
        }
        clients.push(build_client(kind, config)?);
    }

    Ok(clients)
}

fn build_client(kind: BackendKind, config: &BenchConfig) -> Result<Box<dyn DatabaseClient>, Error> {
    let client: Box<dyn DatabaseClient> = match kind {
        BackendKind::RusqliteMemory => Box::new(RusqliteClient::in_memory()),
        BackendKind::RusqliteFile => match &config.sqlite_path {
            Some(path) => Box::new(RusqliteClient::file(path)),
            None => Box::new(RusqliteClient::temp_file()?),
        },
        BackendKind::SqlxSqlite => Box::new(SqlxSqliteClient::in_memory()),
        BackendKind::SqlxPostgres => build_postgres(config)?,
    };
    Ok(client)
}

#[cfg(feature = "postgres")]
fn build_postgres(config: &BenchConfig) -> Result<Box<dyn DatabaseClient>, Error> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| Error::Config("sqlx-postgres requires --database-url or DATABASE_URL".into()))?;
    Ok(Box::new(SqlxPostgresClient::new(url)))
}

#[cfg(not(feature = "postgres"))]
fn build_postgres(_config: &BenchConfig) -> Result<Box<dyn DatabaseClient>, Error> {
    Err(Error::Config(
        "sqlx-postgres support not compiled. Enable the postgres feature.".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_clients_in_fixed_order() {
        let config = BenchConfig::default().with_backends(vec![
            BackendKind::SqlxSqlite,
            BackendKind::RusqliteMemory,
            BackendKind::SqlxSqlite,
        ]);
        let clients = build_clients(&config).unwrap();
        let names: Vec<&str> = clients.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["rusqlite-memory", "sqlx-sqlite"]);
    }

    #[test]
    fn test_names_match_kinds() {
        let config = BenchConfig::default().with_backends(vec![
            BackendKind::RusqliteMemory,
            BackendKind::RusqliteFile,
            BackendKind::SqlxSqlite,
        ]);
        for client in build_clients(&config).unwrap() {
            assert!(BackendKind::ALL.iter().any(|k| k.name() == client.name()));
            assert!(!client.name().contains(' '));
        }
    }

    #[cfg(not(feature = "postgres"))]
    #[test]
    fn test_postgres_requires_feature() {
        let config = BenchConfig::default().with_backends(vec![BackendKind::SqlxPostgres]);
        assert!(matches!(build_clients(&config), Err(Error::Config(_))));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn test_postgres_requires_url() {
        let config = BenchConfig::default().with_backends(vec![BackendKind::SqlxPostgres]);
        assert!(matches!(build_clients(&config), Err(Error::Config(_))));
    }
}
