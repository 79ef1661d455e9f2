//! Benchmark configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sqlbench_core::FailurePolicy;

use crate::backends::BackendKind;
use crate::error::Error;

/// Default iterations per scenario.
pub const DEFAULT_ITERATIONS: u32 = 100;

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Per-result blocks followed by the grouped summary
    #[default]
    Text,
    /// The full comparison as JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Backends run when none are selected explicitly: every compiled-in backend,
/// with PostgreSQL only when a URL is available.
fn default_backends(database_url: Option<&str>) -> Vec<BackendKind> {
    BackendKind::ALL
        .into_iter()
        .filter(|kind| kind.is_compiled())
        .filter(|kind| *kind != BackendKind::SqlxPostgres || database_url.is_some())
        .collect()
}

/// Benchmark configuration.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Iterations for the Mixed, SELECT and INSERT scenarios.
    pub iterations: u32,

    /// Backends to run. Run order is always [`BackendKind::ALL`] order.
    pub backends: Vec<BackendKind>,

    /// File for the file-backed SQLite backend. None uses a temp file.
    pub sqlite_path: Option<PathBuf>,

    /// PostgreSQL connection URL.
    pub database_url: Option<String>,

    /// Whether one backend's failure aborts the comparison.
    pub failure_policy: FailurePolicy,

    /// Report format.
    pub output_format: OutputFormat,
}

impl BenchConfig {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations,
            backends: default_backends(None),
            sqlite_path: None,
            database_url: None,
            failure_policy: FailurePolicy::default(),
            output_format: OutputFormat::default(),
        }
    }

    /// Set the iteration count.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the backends to run.
    pub fn with_backends(mut self, backends: Vec<BackendKind>) -> Self {
        self.backends = backends;
        self
    }

    /// Use a fixed file for the file-backed SQLite backend.
    pub fn with_sqlite_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sqlite_path = Some(path.into());
        self
    }

    /// Set the PostgreSQL URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the report format.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<(), Error> {
        if self.iterations == 0 {
            return Err(Error::Config("iterations must be at least 1".into()));
        }
        if self.backends.is_empty() {
            return Err(Error::Config("no backends selected".into()));
        }
        for kind in &self.backends {
            if !kind.is_compiled() {
                return Err(Error::Config(format!(
                    "{} support not compiled. Enable the postgres feature.",
                    kind
                )));
            }
        }
        if self.backends.contains(&BackendKind::SqlxPostgres) && self.database_url.is_none() {
            return Err(Error::Config(
                "sqlx-postgres requires --database-url or DATABASE_URL".into(),
            ));
        }
        Ok(())
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "sqlbench")]
#[command(version, about = "Compare SQL client backends on identical workloads", long_about = None)]
pub struct Args {
    /// Iterations per scenario (the batch scenario uses min(iterations, 50) statements).
    #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u32,

    /// Backend to run. Repeat to select several; defaults to all available.
    #[arg(short, long = "backend", value_enum)]
    pub backends: Vec<BackendKind>,

    /// Database file for the rusqlite-file backend (defaults to a temp file).
    #[arg(long)]
    pub sqlite_path: Option<PathBuf>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Stop at the first failing backend instead of recording it and continuing.
    #[arg(long)]
    pub fail_fast: bool,

    /// Report format.
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

impl Args {
    /// Convert command-line arguments to a benchmark configuration.
    pub fn into_config(self) -> BenchConfig {
        let backends = if self.backends.is_empty() {
            default_backends(self.database_url.as_deref())
        } else {
            self.backends
        };

        let failure_policy = if self.fail_fast {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Continue
        };

        BenchConfig {
            iterations: self.iterations,
            backends,
            sqlite_path: self.sqlite_path,
            database_url: self.database_url,
            failure_policy,
            output_format: self.format,
        }
    }
}
