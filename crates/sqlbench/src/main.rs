//! SQLBench - run the scenario suite against every selected backend.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sqlbench::{build_clients, Args, Error, OutputFormat};
use sqlbench_core::{print_comparison, TestRunner, START_MESSAGE};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlbench=info,sqlbench_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "benchmark failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let config = args.into_config();
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        iterations = config.iterations,
        backends = ?config.backends,
        policy = ?config.failure_policy,
        "configuration loaded"
    );

    let clients = build_clients(&config)?;
    let mut runner = TestRunner::new(clients)?.with_failure_policy(config.failure_policy);

    // Ctrl+C stops the current scenario; the backend is still closed.
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    if config.output_format == OutputFormat::Text {
        println!("{}", START_MESSAGE);
    }

    let comparison = runner
        .run_until_shutdown(config.iterations, shutdown_rx)
        .await?;

    match config.output_format {
        OutputFormat::Text => {
            print_comparison(&comparison);
            println!("\nPerformance tests completed!");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
    }

    tracing::info!(
        results = comparison.results.len(),
        failures = comparison.failures.len(),
        "benchmark complete"
    );
    Ok(())
}
