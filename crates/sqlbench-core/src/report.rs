//! Result grouping and text rendering.

use std::fmt::Write;

use crate::measure::TestResult;
use crate::runner::Comparison;

/// Width of the `=` banner framing the summary.
pub const BANNER_WIDTH: usize = 50;

/// Results grouped by backend, in first-seen backend order. Results within a
/// group keep their insertion order.
#[derive(Debug, Default)]
pub struct GroupedResults<'a> {
    groups: Vec<(&'a str, Vec<&'a TestResult>)>,
}

impl<'a> GroupedResults<'a> {
    /// Results recorded for `backend`.
    pub fn get(&self, backend: &str) -> Option<&[&'a TestResult]> {
        self.groups
            .iter()
            .find(|(name, _)| *name == backend)
            .map(|(_, results)| results.as_slice())
    }

    pub fn backends(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.groups.iter().map(|(name, _)| *name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &[&'a TestResult])> + '_ {
        self.groups
            .iter()
            .map(|(name, results)| (*name, results.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Group results by the backend portion of their label.
pub fn group_by_backend(results: &[TestResult]) -> GroupedResults<'_> {
    let mut grouped = GroupedResults::default();
    for result in results {
        let backend = result.backend();
        match grouped.groups.iter_mut().find(|(name, _)| *name == backend) {
            Some((_, bucket)) => bucket.push(result),
            None => grouped.groups.push((backend, vec![result])),
        }
    }
    grouped
}

/// Detailed block for one result.
pub fn format_test_result(result: &TestResult) -> String {
    let memory = result.memory_usage();
    format!(
        "\n{} Performance Results:\n  \
         Execution Time: {:.3}ms\n  \
         Operations/Second: {:.2}\n  \
         Memory Usage:\n    \
         RSS: {} bytes\n    \
         Heap Total: {} bytes\n    \
         Heap Used: {} bytes\n  \
         Errors: {}\n",
        result.name(),
        result.execution_time(),
        result.operations_per_second(),
        memory.rss,
        memory.heap_total,
        memory.heap_used,
        result.errors(),
    )
}

/// Banner followed by one block per backend listing each scenario's
/// throughput, then any failed backends.
pub fn render_summary(comparison: &Comparison) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "\n{banner}");
    let _ = writeln!(out, "PERFORMANCE COMPARISON SUMMARY");
    let _ = writeln!(out, "{banner}");

    for (backend, results) in group_by_backend(&comparison.results).iter() {
        let _ = writeln!(out, "\n{backend}:");
        for result in results {
            let _ = writeln!(
                out,
                "  {}: {:.2} ops/sec",
                result.scenario(),
                result.operations_per_second()
            );
        }
    }

    if !comparison.failures.is_empty() {
        let _ = writeln!(out, "\nFailed backends:");
        for failure in &comparison.failures {
            let _ = writeln!(out, "  {}: {}", failure.backend, failure.error);
        }
    }

    out
}
