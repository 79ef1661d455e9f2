//! Error types for the benchmark engine and database clients.

use thiserror::Error;

/// Errors raised by a [`DatabaseClient`](crate::DatabaseClient) implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Opening the underlying connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// A statement was issued before `connect()` succeeded or after `close()`.
    #[error("client is not connected")]
    NotConnected,

    /// A single statement failed.
    #[error("query error: {0}")]
    Query(String),

    /// A statement inside a batch failed. Statements before `index` were issued.
    #[error("batch statement {index} failed: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<ClientError>,
    },

    /// A parameter or column value the backend cannot represent.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// Releasing the connection failed.
    #[error("close error: {0}")]
    Close(String),
}

impl ClientError {
    /// Wrap an error raised by the statement at `index` of a batch.
    pub fn batch(index: usize, source: ClientError) -> Self {
        ClientError::Batch {
            index,
            source: Box::new(source),
        }
    }
}

/// Engine and runner errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Client error outside the per-iteration guard (connect, close).
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Measurements need at least one iteration.
    #[error("invalid iteration count {0}: at least one iteration is required")]
    InvalidIterations(u32),

    /// The process memory snapshot could not be taken.
    #[error("memory probe error: {0}")]
    MemoryProbe(String),

    /// The run was interrupted by a shutdown signal.
    #[error("benchmark cancelled")]
    Cancelled,

    /// A backend failed and the failure policy aborts the comparison.
    #[error("backend {backend} failed: {source}")]
    Backend {
        backend: String,
        #[source]
        source: Box<Error>,
    },
}

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, Error>;
