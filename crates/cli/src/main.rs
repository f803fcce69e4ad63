mod cli;
mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bambam_core::progress::{ChannelReporter, TracingReporter};
use bambam_core::{
    build_job_set, load_config_or_default, validate_config, BatchSummary, Category, Config,
    JobOutcome, JobTemplate, ProgressEvent, ProgressReporter, RunCoordinator, RunStatus,
};

use cli::{Cli, Command, ConvertArgs};

/// Exit code when the run was cancelled (128 + SIGINT).
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("error: {:#}", e);
            std::process::exit(2);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config_or_default(cli.config.as_deref()).with_context(|| match &cli.config
    {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load configuration".to_string(),
    })?;
    validate_config(&config).context("Configuration validation failed")?;

    let (name, result) = match &cli.command {
        Command::Convert(args) => ("convert", convert(&config, args).await),
        Command::Formats => ("formats", Ok(print_formats(&config))),
    };

    let outcome = match &result {
        Ok(0) => "ok",
        Ok(EXIT_CANCELLED) => "cancelled",
        _ => "failed",
    };
    metrics::COMMANDS_TOTAL
        .with_label_values(&[name, outcome])
        .inc();
    if cli.metrics {
        print!("{}", metrics::encode_metrics());
    }

    result
}

async fn convert(config: &Config, args: &ConvertArgs) -> Result<i32> {
    let category = args.category;
    let filter = config.extension_filter(category);
    let sources = build_job_set(&args.files, &args.folders, &filter);
    if sources.is_empty() {
        println!("Nothing to convert: no {} files in the selection", category);
        return Ok(0);
    }

    let jobs = JobTemplate::new(args.target.clone(), args.output_policy())
        .with_options(args.job_options())
        .instantiate(sources)?;
    let total = jobs.len();

    let coordinator = RunCoordinator::new(config.runner.clone(), config.actions.clone());
    let (channel, events) = ChannelReporter::new();
    let reporter = move |event: ProgressEvent| {
        TracingReporter.report(event.clone());
        channel.report(event);
    };
    let handle = coordinator
        .start(category, jobs, Arc::new(reporter))
        .await
        .with_context(|| format!("Failed to start {} run", category))?;
    info!(run_id = %handle.id(), category = %category, total, "Conversion started");

    let printer = tokio::spawn(print_events(events, total));

    let summary = tokio::select! {
        summary = handle.wait() => summary,
        _ = signal::ctrl_c() => {
            warn!("Interrupted, cancelling run");
            eprintln!("Cancelling... waiting for the current file to stop");
            coordinator.cancel(category).await;
            handle.wait().await
        }
    };

    // The reporter is dropped with the run task; the printer drains and exits.
    if let Err(e) = printer.await {
        warn!(error = %e, "Progress printer failed");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(exit_code(&summary))
}

async fn print_events(mut events: mpsc::UnboundedReceiver<ProgressEvent>, total: usize) {
    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::JobStarted {
                index, source_path, ..
            } => {
                println!("[{}/{}] {}", index + 1, total, source_path.display());
            }
            ProgressEvent::JobFinished { index, outcome, .. } => match outcome {
                JobOutcome::Succeeded { output_path } => {
                    println!("[{}/{}]   -> {}", index + 1, total, output_path.display());
                }
                JobOutcome::Failed { message, .. } => {
                    println!("[{}/{}]   failed: {}", index + 1, total, message);
                }
                JobOutcome::Skipped => {}
            },
            ProgressEvent::BatchFinished { .. } => break,
            ProgressEvent::JobProgress { .. } | ProgressEvent::BatchProgress { .. } => {}
        }
    }
}

fn exit_code(summary: &BatchSummary) -> i32 {
    match summary.status {
        RunStatus::Cancelled => EXIT_CANCELLED,
        _ if summary.failed > 0 => 1,
        _ => 0,
    }
}

fn print_formats(config: &Config) -> i32 {
    for category in Category::ALL {
        let mut inputs: Vec<String> = match config
            .categories
            .get(category.as_str())
            .and_then(|c| c.extensions.clone())
        {
            Some(overrides) => overrides,
            None => category
                .input_extensions()
                .iter()
                .map(|e| e.to_string())
                .collect(),
        };
        if inputs.is_empty() {
            inputs.push("*".to_string());
        }
        let outputs = match category.output_formats() {
            [] => "same as input".to_string(),
            formats => formats.join(", "),
        };
        println!("{}", category);
        println!("  inputs:  {}", inputs.join(", "));
        println!("  outputs: {}", outputs);
        if category.supports_keep_original() {
            println!("  keep original: yes");
        }
    }
    0
}
