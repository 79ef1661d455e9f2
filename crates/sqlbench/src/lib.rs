//! SQLBench - compare SQL client backends on identical workloads.
//!
//! This crate provides the concrete backends, configuration and the
//! `sqlbench` binary on top of [`sqlbench_core`].

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: sqlbench_core::CountingAllocator<mimalloc::MiMalloc> =
    sqlbench_core::CountingAllocator::new(mimalloc::MiMalloc);

#[cfg(not(feature = "mimalloc"))]
#[global_allocator]
static GLOBAL: sqlbench_core::CountingAllocator<std::alloc::System> =
    sqlbench_core::CountingAllocator::new(std::alloc::System);

pub mod backends;
pub mod config;
pub mod error;

pub use backends::{build_clients, BackendKind, RusqliteClient, SqliteTarget, SqlxSqliteClient};
pub use config::{Args, BenchConfig, OutputFormat, DEFAULT_ITERATIONS};
pub use error::Error;

#[cfg(feature = "postgres")]
pub use backends::SqlxPostgresClient;
