//! Application error types.

use thiserror::Error;

/// Errors surfaced by the benchmark binary.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend construction failed.
    #[error("backend error: {0}")]
    Client(#[from] sqlbench_core::ClientError),

    /// The benchmark run failed.
    #[error(transparent)]
    Bench(#[from] sqlbench_core::Error),

    /// Report serialization failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
