mod cli;
mod logging;
mod progress;
mod settings;
mod status;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use corpus_engine::{build_tokenizer, BatchRunner};
use pipeline_logging::{pipeline_error, pipeline_info};

use crate::cli::{Cli, Command, RunArgs};
use crate::logging::LogDestination;
use crate::progress::LogProgress;
use crate::settings::{resolve, SettingsFile};

const PROGRESS_EVERY: usize = 100;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = logging::level_for(cli.verbose, cli.quiet);
    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    logging::initialize(level, destination);

    let outcome = match &cli.command {
        Command::Run(args) => run(args),
        Command::Status(args) => status::print_status(args),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            pipeline_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let file = match &args.config {
        Some(path) => SettingsFile::load(path)?,
        None => SettingsFile::default(),
    };
    let resolved = resolve(args, file)?;
    let tokenizer = build_tokenizer(&resolved.tokenizer, &resolved.options)
        .with_context(|| format!("configuring tokenizer {:?}", resolved.tokenizer))?;
    pipeline_info!(
        "tokenizing {} with the {} tokenizer",
        resolved.config.root.display(),
        resolved.tokenizer
    );

    let progress = LogProgress::new(PROGRESS_EVERY);

    let report = BatchRunner::new(&resolved.config, tokenizer.as_ref())
        .with_progress(&progress)
        .run()?;

    let summary = report.manifest.summary();
    println!(
        "processed {} files: {} succeeded, {} failed; {} of {} done",
        report.selected, report.succeeded, report.failed, summary.done, summary.total
    );
    Ok(())
}
