//! cvforge CLI binary.
//!
//! Runs the single-item or batch pipeline with the file-based reference
//! collaborators.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

use cvforge::batch::{BatchCoordinator, BatchRequest};
use cvforge::broadcast::{for_each_update, ProgressBroadcaster};
use cvforge::pipeline::{BroadcastProgress, ItemRequest, Pipeline, PipelineOptions, PipelineResult};
use cvforge::{load_config, Collaborators, Config, Mode, SourceDocument};

#[derive(Parser, Debug)]
#[command(name = "cvforge", version, about = "Résumé and job-description pipeline")]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured output directory
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Override the configured mode (basic, professional_analysis)
    #[arg(short, long, global = true)]
    mode: Option<Mode>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one source document
    Single {
        /// Source document (résumé)
        #[arg(short, long)]
        source: PathBuf,

        /// Optional target document (job description)
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Name used for output naming; defaults to the source file stem
        #[arg(long)]
        candidate: Option<String>,

        /// Job context name; defaults to the target file stem
        #[arg(short, long)]
        job: Option<String>,
    },
    /// Compare many source documents against one target
    Batch {
        /// Target document (job description)
        #[arg(short, long)]
        target: PathBuf,

        /// Job context name; defaults to the target file stem
        #[arg(short, long)]
        job: Option<String>,

        /// Source documents
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    if let Err(e) = cvforge::init_logging(level, cli.json_logs) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether everything succeeded.
fn run(cli: &Cli) -> Result<bool> {
    let options = build_options(cli)?;
    let collaborators = Collaborators::reference(&options.output_directory);
    let pipeline = Arc::new(Pipeline::new(options, collaborators));

    let broadcaster = ProgressBroadcaster::default();
    let printer = spawn_progress_printer(&broadcaster);

    let succeeded = match &cli.command {
        Command::Single {
            source,
            target,
            candidate,
            job,
        } => {
            let mut request = ItemRequest::new(read_document(source)?);
            if let Some(target) = target {
                request = request.with_target(read_document(target)?);
            }
            if let Some(candidate) = candidate {
                request = request.with_candidate_name(candidate);
            }
            if let Some(job) = job {
                request = request.with_job_context_name(job);
            }

            let progress = BroadcastProgress::new(&request.source.label, broadcaster.clone());
            drop(broadcaster);
            let result = pipeline.run_single(request, &progress)?;
            drop(progress);
            finish_printer(printer);

            print_single(&result, cli.json)?;
            result.success
        }
        Command::Batch {
            target,
            job,
            sources,
        } => {
            let items = sources
                .iter()
                .map(|path| read_document(path))
                .collect::<Result<Vec<_>>>()?;
            let mut request = BatchRequest::new(items, read_document(target)?);
            if let Some(job) = job {
                request = request.with_job_context_name(job);
            }

            let progress = BroadcastProgress::new("batch", broadcaster.clone());
            drop(broadcaster);
            let report = BatchCoordinator::new(Arc::clone(&pipeline)).run_batch(request, &progress)?;
            drop(progress);
            finish_printer(printer);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.status_table());
                println!("{}", report.summary());
                if let Some(folder) = &report.batch_folder {
                    println!("Output: {}", folder.display());
                }
            }
            report.overall_success
        }
    };

    info!(succeeded, "Command finished");
    Ok(succeeded)
}

fn build_options(cli: &Cli) -> Result<PipelineOptions> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.output_dir {
        config.output_directory = dir.display().to_string();
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    Ok(PipelineOptions::from_config(&config))
}

fn read_document(path: &Path) -> Result<SourceDocument> {
    SourceDocument::from_path(path).with_context(|| format!("reading {}", path.display()))
}

/// Prints progress updates to stderr until every sender is gone.
fn spawn_progress_printer(broadcaster: &ProgressBroadcaster) -> thread::JoinHandle<()> {
    let updates = broadcaster.subscribe();
    thread::spawn(move || {
        let skipped = for_each_update(updates, |update| {
            eprintln!("[{:>3}%] {}", update.percent, update.message);
        });
        if skipped > 0 {
            debug!(skipped, "Some progress updates were not printed");
        }
    })
}

fn finish_printer(printer: thread::JoinHandle<()>) {
    if printer.join().is_err() {
        error!("Progress printer panicked");
    }
}

fn print_single(result: &PipelineResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let status = if result.success { "OK" } else { "FAILED" };
    println!("{}: {}", result.candidate_display_name, status);
    if let Some(folder) = &result.output_folder {
        println!("Output: {}", folder.display());
    }
    for handle in result.produced() {
        println!("  {:<15} {}", handle.kind.to_string(), handle.path().display());
    }
    for note in &result.informational {
        println!("  note: {}", note);
    }
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }
    if let Some(error) = &result.error {
        println!("  error: {}", error);
    }
    Ok(())
}
