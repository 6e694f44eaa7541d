use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rezoom_evaluator::worker::local::DEFAULT_TEST_INPUT_FILE;
use rezoom_evaluator::worker::{HttpJobQueue, HttpQueueConfig, LocalJobSource, Worker};
use rezoom_evaluator::{Evaluator, Settings};

/// Resume/job-posting evaluation worker.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(flatten)]
    queue: HttpQueueConfig,

    /// Run a single job given inline as JSON, then exit.
    #[arg(long, conflicts_with = "test_input_file")]
    test_input: Option<String>,

    /// Run a single job read from a JSON file, then exit.
    #[arg(long)]
    test_input_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = &cli.settings;

    info!("rezoom-worker v{}", env!("CARGO_PKG_VERSION"));
    info!(
        model_id = %settings.model_id,
        hf_token_set = settings.hf_token.is_some(),
        cpu_only = settings.cpu_only,
        kind = %settings.kind,
        "configuration"
    );

    let evaluator = Arc::new(Evaluator::initialize(settings).await?);

    let processed = if let Some(json) = &cli.test_input {
        run_local(LocalJobSource::from_json(json)?, evaluator).await
    } else if let Some(path) = &cli.test_input_file {
        run_local(LocalJobSource::from_file(path)?, evaluator).await
    } else if cli.queue.is_configured() {
        info!(worker_id = %cli.queue.worker_id, "polling job queue");
        let mut worker = Worker::new(HttpJobQueue::new(&cli.queue)?, evaluator);
        worker.run().await
    } else {
        info!("no job queue configured, running {DEFAULT_TEST_INPUT_FILE}");
        run_local(LocalJobSource::from_file(DEFAULT_TEST_INPUT_FILE)?, evaluator).await
    };

    info!(processed, "worker finished");
    Ok(())
}

async fn run_local(source: LocalJobSource, evaluator: Arc<Evaluator>) -> usize {
    Worker::new(source, evaluator).run().await
}
