use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_digest::cli::{Cli, Commands, OutputFormat};
use video_digest::config::Config;
use video_digest::pipeline::{load_urls, BatchPipeline};
use video_digest::progress::{ItemResult, ProgressTracker};
use video_digest::summarize::MODEL_TABLE;
use video_digest::{output, server, utils};

fn init_tracing(verbose: bool, json_logs: bool) {
    let default_filter = if verbose { "video_digest=debug" } else { "video_digest=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Read the URL list; a broken input file is fatal for the whole batch
fn read_input(path: &Path) -> Result<Vec<String>> {
    utils::check_file_accessible(path)?;
    let file = fs_err::File::open(path)?;
    Ok(load_urls(file)?)
}

async fn warn_missing_tools(config: &Config) {
    let missing_deps = utils::check_dependencies(&config.retrieval.yt_dlp_path).await;
    if !missing_deps.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - every retrieval will fail without it)");
    }
}

async fn emit(results: &[ItemResult], output_path: Option<PathBuf>, format: &OutputFormat) -> Result<()> {
    match output_path {
        Some(path) => {
            output::save_to_file(results, &path, format).await?;
            println!("Results saved to: {}", path.display());
        }
        None => output::print_to_console(results, format)?,
    }
    Ok(())
}

/// Run a batch while an optional progress bar polls its tracker
async fn run_batch(
    quiet: bool,
    tracker: &ProgressTracker,
    batch: impl Future<Output = Vec<ItemResult>>,
) -> Vec<ItemResult> {
    let watcher = (!quiet).then(|| tokio::spawn(output::watch_progress(tracker.clone())));

    let started = std::time::Instant::now();
    let results = batch.await;

    if let Some(watcher) = watcher {
        output::join_watcher(watcher).await;
    }
    output::print_summary_line(&results, &utils::format_duration(started.elapsed().as_secs_f64()));
    results
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Models => {
            println!("Available models:");
            for (key, model) in MODEL_TABLE {
                println!("  • {:<10} {}", key, model);
            }
        }
        Commands::Transcripts { input, output, format } => {
            let urls = read_input(&input)?;
            let config = Config::load().await?;
            warn_missing_tools(&config).await;

            let pipeline = BatchPipeline::from_config(&config);
            tracing::info!("Starting transcript batch for {} URLs", urls.len());

            let tracker = ProgressTracker::new();
            let results = run_batch(cli.quiet, &tracker, pipeline.run_transcripts(&urls, &tracker)).await;
            emit(&results, output, &format).await?;
        }
        Commands::Process { input, model, output, format } => {
            let urls = read_input(&input)?;
            let config = Config::load().await?;
            warn_missing_tools(&config).await;

            let model = model.unwrap_or_else(|| config.summarization.default_model.clone());
            let pipeline = BatchPipeline::from_config(&config);
            tracing::info!("Starting summary batch for {} URLs with model '{}'", urls.len(), model);

            let tracker = ProgressTracker::new();
            let batch = pipeline.run_with_summaries(&urls, &model, &tracker);
            let results = run_batch(cli.quiet, &tracker, batch).await;
            emit(&results, output, &format).await?;
        }
        Commands::Serve { host, port } => {
            let config = Config::load().await?;
            warn_missing_tools(&config).await;

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            server::serve(&config, &host, port)
                .await
                .context("HTTP server failed")?;
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if !show {
                println!("Edit the config file to change settings.");
            }
            config.display();
        }
    }

    Ok(())
}
