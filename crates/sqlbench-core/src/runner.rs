//! Comparison runner.
//!
//! Drives each configured backend through connect, the four scenarios and
//! close, strictly one backend at a time. `close()` is attempted on every
//! exit path, including scenario failure and cancellation.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::client::DatabaseClient;
use crate::error::{Error, Result};
use crate::measure::{Measurer, TestResult};
use crate::memory::{MemoryProbe, ProcessMemory};
use crate::report::{format_test_result, render_summary};
use crate::scenarios::{self, batch_size, Scenario};

/// What to do when a backend fails to connect or a scenario fails fatally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and continue with the next backend.
    #[default]
    Continue,
    /// Stop the comparison at the first failing backend.
    Abort,
}

/// A backend that could not complete its scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendFailure {
    pub backend: String,
    pub error: String,
}

/// Everything a comparison run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Comparison {
    /// Results in run order: per backend, Mixed, Select, Insert, Batch.
    pub results: Vec<TestResult>,
    pub failures: Vec<BackendFailure>,
}

/// Runs the scenario suite against a fixed, ordered list of backends.
pub struct TestRunner<P = ProcessMemory> {
    clients: Vec<Box<dyn DatabaseClient>>,
    measurer: Measurer<P>,
    policy: FailurePolicy,
}

impl TestRunner<ProcessMemory> {
    /// Runner sampling memory of the current process.
    pub fn new(clients: Vec<Box<dyn DatabaseClient>>) -> Result<Self> {
        Ok(Self::with_measurer(clients, Measurer::new()?))
    }
}

impl<P: MemoryProbe> TestRunner<P> {
    pub fn with_measurer(clients: Vec<Box<dyn DatabaseClient>>, measurer: Measurer<P>) -> Self {
        Self {
            clients,
            measurer,
            policy: FailurePolicy::default(),
        }
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Backend names in run order.
    pub fn backends(&self) -> Vec<&str> {
        self.clients.iter().map(|c| c.name()).collect()
    }

    /// Run every scenario against every backend.
    pub async fn run_all_tests(&mut self, iterations: u32) -> Result<Comparison> {
        self.run(iterations, None).await
    }

    /// Like [`run_all_tests`](Self::run_all_tests), but stops with
    /// [`Error::Cancelled`] when `shutdown` fires. The in-flight iteration is
    /// dropped and the current backend is still closed.
    pub async fn run_until_shutdown(
        &mut self,
        iterations: u32,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<Comparison> {
        self.run(iterations, Some(shutdown)).await
    }

    /// Run all tests, then print each result and the summary to stdout.
    pub async fn run_comparison_test(&mut self, iterations: u32) -> Result<Comparison> {
        println!("{}", START_MESSAGE);
        let comparison = self.run_all_tests(iterations).await?;
        print_comparison(&comparison);
        Ok(comparison)
    }

    async fn run(
        &mut self,
        iterations: u32,
        mut shutdown: Option<broadcast::Receiver<()>>,
    ) -> Result<Comparison> {
        if iterations == 0 {
            return Err(Error::InvalidIterations(iterations));
        }

        let mut comparison = Comparison::default();

        for client in &self.clients {
            let client = client.as_ref();
            let backend = client.name().to_string();
            tracing::info!(backend = %backend, iterations, "testing backend");

            let work = run_backend(&mut self.measurer, client, iterations, &mut comparison.results);
            let outcome = match shutdown.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        outcome = work => outcome,
                        _ = wait_for_shutdown(rx) => Err(Error::Cancelled),
                    }
                }
                None => work.await,
            };

            match client.close().await {
                Ok(()) => tracing::info!(backend = %backend, "closed"),
                Err(e) => tracing::warn!(backend = %backend, error = %e, "close failed"),
            }

            // A signal that lands while closing still cancels the run.
            let cancelled_while_closing =
                outcome.is_ok() && shutdown.as_mut().is_some_and(shutdown_pending);
            let outcome = if cancelled_while_closing {
                Err(Error::Cancelled)
            } else {
                outcome
            };

            match outcome {
                Ok(()) => {}
                Err(Error::Cancelled) => {
                    tracing::warn!(backend = %backend, "benchmark cancelled");
                    return Err(Error::Cancelled);
                }
                Err(e) => match self.policy {
                    FailurePolicy::Abort => {
                        tracing::error!(backend = %backend, error = %e, "backend failed, aborting");
                        return Err(Error::Backend {
                            backend,
                            source: Box::new(e),
                        });
                    }
                    FailurePolicy::Continue => {
                        tracing::error!(backend = %backend, error = %e, "backend failed, continuing");
                        comparison.failures.push(BackendFailure {
                            backend,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok(comparison)
    }
}

/// Connect and run the four scenarios, appending each result as it lands.
async fn run_backend<P: MemoryProbe>(
    measurer: &mut Measurer<P>,
    client: &dyn DatabaseClient,
    iterations: u32,
    results: &mut Vec<TestResult>,
) -> Result<()> {
    let backend = client.name();
    client.connect().await?;
    tracing::info!(backend, "connected");

    for scenario in Scenario::ALL {
        let label = scenario.label(backend);
        let result = match scenario {
            Scenario::Mixed => {
                measurer
                    .measure(label, iterations, || scenarios::mixed(client))
                    .await?
            }
            Scenario::Select => {
                measurer
                    .measure(label, iterations, || scenarios::select(client))
                    .await?
            }
            Scenario::Insert => {
                measurer
                    .measure(label, iterations, || scenarios::insert(client))
                    .await?
            }
            Scenario::Batch => {
                let size = batch_size(iterations);
                measurer
                    .measure(label, 1, || scenarios::batch(client, size))
                    .await?
            }
        };
        results.push(result);
    }

    Ok(())
}

/// Resolves on a shutdown message. A dropped sender never resolves.
async fn wait_for_shutdown(rx: &mut broadcast::Receiver<()>) {
    match rx.recv().await {
        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
        Err(broadcast::error::RecvError::Closed) => std::future::pending().await,
    }
}

/// Printed before a text-mode comparison starts.
pub const START_MESSAGE: &str = "Starting comprehensive performance comparison...";

/// Whether a shutdown message is already queued.
fn shutdown_pending(rx: &mut broadcast::Receiver<()>) -> bool {
    matches!(
        rx.try_recv(),
        Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_))
    )
}

/// Print every result block followed by the grouped summary.
pub fn print_comparison(comparison: &Comparison) {
    for result in &comparison.results {
        println!("{}", format_test_result(result));
    }
    print!("{}", render_summary(comparison));
}
