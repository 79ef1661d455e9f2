//! SQLBench Core - measurement engine, workloads and comparison runner.
//!
//! This crate drives interchangeable SQL backends through one
//! [`DatabaseClient`] trait, runs the same four workloads against each and
//! reports throughput, elapsed time and memory deltas.
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlbench_core::{DatabaseClient, TestRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let clients: Vec<Box<dyn DatabaseClient>> = vec![/* backend adapters */];
//!     let mut runner = TestRunner::new(clients)?;
//!     runner.run_comparison_test(100).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod measure;
pub mod memory;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod value;

pub use client::DatabaseClient;
pub use error::{ClientError, Error, Result};
pub use measure::{operations_per_second, Measurer, TestResult};
pub use memory::{CountingAllocator, MemoryProbe, MemorySnapshot, MemoryUsage, ProcessMemory};
pub use report::{format_test_result, group_by_backend, render_summary, GroupedResults};
pub use runner::{
    print_comparison, BackendFailure, Comparison, FailurePolicy, TestRunner, START_MESSAGE,
};
pub use scenarios::Scenario;
pub use value::{RowSet, Statement, Value};
