use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use quorum_agents::StaticContextProvider;
use quorum_models::OrchestrationResult;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "quorum", about = "Multi-agent analysis orchestrator")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/quorum.toml")]
    config: String,

    /// JSON array of market context snapshots
    #[arg(long)]
    contexts: String,

    /// Symbol to analyze; repeat for several. Defaults to every snapshot.
    #[arg(short, long)]
    symbol: Vec<String>,

    /// Submit through the worker pool instead of analyzing inline
    #[arg(long = "async")]
    use_workers: bool,

    /// Task priority for --async submissions (lower runs first)
    #[arg(long, default_value_t = 1)]
    priority: i32,

    /// How long to wait for each --async result, in seconds
    #[arg(long, default_value_t = 600)]
    wait_seconds: u64,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = quorum::load_config(&cli.config)?;
    let contexts = quorum::load_contexts(&cli.contexts)?;

    let symbols = if cli.symbol.is_empty() {
        contexts.iter().map(|c| c.symbol.clone()).collect()
    } else {
        cli.symbol.clone()
    };

    let provider = Arc::new(StaticContextProvider::new(contexts));
    let orchestrator = quorum::build_orchestrator(&config, provider);
    info!(
        agents = orchestrator.registered_agents().len(),
        symbols = symbols.len(),
        strategy = %config.orchestrator.strategy,
        "Orchestrator ready"
    );

    let mut results: Vec<Arc<OrchestrationResult>> = Vec::with_capacity(symbols.len());
    if cli.use_workers {
        orchestrator
            .start_default()
            .context("Failed to start worker pool")?;

        let mut task_ids = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            let id = orchestrator
                .request_async(symbol, cli.priority)
                .await
                .with_context(|| format!("Failed to queue {symbol}"))?;
            task_ids.push((symbol, id));
        }

        let wait = Duration::from_secs(cli.wait_seconds);
        for (symbol, id) in task_ids {
            let result = orchestrator
                .wait_for_result(id, wait)
                .await
                .with_context(|| format!("No result for {symbol} (task {id})"))?;
            results.push(result);
        }

        orchestrator.stop().await;
    } else {
        for symbol in &symbols {
            results.push(orchestrator.request_sync(symbol).await);
        }
    }

    // Output results as JSON to stdout
    let results: Vec<&OrchestrationResult> = results.iter().map(Arc::as_ref).collect();
    let output = if cli.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{output}");

    Ok(())
}
