//! Performance measurement engine.
//!
//! Runs an operation a fixed number of times, sequentially, and reports
//! elapsed time, derived throughput, a memory delta and the number of failed
//! iterations. A failing iteration is counted and the loop moves on. Panics
//! are not caught and abort the benchmark.

use std::future::Future;
use std::time::Instant;

use serde::Serialize;

use crate::error::{ClientError, Error, Result};
use crate::memory::{MemoryProbe, MemoryUsage, ProcessMemory};

/// Outcome of one measured scenario run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    name: String,
    iterations: u32,
    execution_time: f64,
    operations_per_second: f64,
    memory_usage: MemoryUsage,
    errors: u32,
}

impl TestResult {
    /// Build a result, deriving throughput from `iterations` and
    /// `execution_time_ms`.
    pub fn new(
        name: impl Into<String>,
        iterations: u32,
        execution_time_ms: f64,
        memory_usage: MemoryUsage,
        errors: u32,
    ) -> Self {
        Self {
            name: name.into(),
            iterations,
            execution_time: execution_time_ms,
            operations_per_second: operations_per_second(iterations, execution_time_ms),
            memory_usage,
            errors: errors.min(iterations),
        }
    }

    /// Scenario label, `"<backend> <scenario words>"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Wall-clock time across all iterations, in milliseconds.
    pub fn execution_time(&self) -> f64 {
        self.execution_time
    }

    pub fn operations_per_second(&self) -> f64 {
        self.operations_per_second
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        self.memory_usage
    }

    /// Iterations whose operation returned an error.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Backend portion of the label: everything before the first space.
    pub fn backend(&self) -> &str {
        self.name.split(' ').next().unwrap_or("")
    }

    /// Scenario word of the label: the second space-separated word.
    pub fn scenario(&self) -> &str {
        self.name.split(' ').nth(1).unwrap_or("")
    }
}

/// Throughput for `iterations` completed in `execution_time_ms`.
///
/// A zero (or negative) duration is treated as 1 ms, so the result is
/// `iterations * 1000` rather than infinity.
pub fn operations_per_second(iterations: u32, execution_time_ms: f64) -> f64 {
    if execution_time_ms > 0.0 {
        iterations as f64 / (execution_time_ms / 1000.0)
    } else {
        iterations as f64 * 1000.0
    }
}

/// Times repeated operations and samples memory around them.
pub struct Measurer<P = ProcessMemory> {
    probe: P,
}

impl Measurer<ProcessMemory> {
    /// Measurer sampling the current process.
    pub fn new() -> Result<Self> {
        Ok(Self::with_probe(ProcessMemory::new()?))
    }
}

impl<P: MemoryProbe> Measurer<P> {
    pub fn with_probe(probe: P) -> Self {
        Self { probe }
    }

    /// Run `operation` `iterations` times and report the result under `label`.
    ///
    /// Per-iteration errors only increment the error count. Fails when
    /// `iterations` is zero or a memory snapshot cannot be taken.
    pub async fn measure<F, Fut>(
        &mut self,
        label: impl Into<String>,
        iterations: u32,
        mut operation: F,
    ) -> Result<TestResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<(), ClientError>>,
    {
        if iterations == 0 {
            return Err(Error::InvalidIterations(iterations));
        }
        let label = label.into();

        let start_memory = self.probe.snapshot()?;
        let start = Instant::now();

        let mut errors = 0u32;
        for iteration in 0..iterations {
            if let Err(e) = operation().await {
                errors += 1;
                tracing::debug!(label = %label, iteration, error = %e, "iteration failed");
            }
        }

        let elapsed = start.elapsed();
        let end_memory = self.probe.snapshot()?;

        let result = TestResult::new(
            label,
            iterations,
            elapsed.as_secs_f64() * 1000.0,
            MemoryUsage::between(&start_memory, &end_memory),
            errors,
        );

        tracing::info!(
            label = %result.name(),
            iterations,
            execution_ms = result.execution_time(),
            ops_per_sec = result.operations_per_second(),
            errors = result.errors(),
            "measurement complete"
        );

        Ok(result)
    }
}
