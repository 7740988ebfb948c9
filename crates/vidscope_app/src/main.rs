mod cli;
mod commands;
mod effects;
mod monitor;
mod render;
mod settings;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use engine_logging::{engine_debug, engine_error, engine_info, LogDestination};
use log::LevelFilter;

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let (mut settings, source) =
        settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(log_file) = cli.log_file {
        settings.log_file = Some(log_file);
    }
    settings.validate()?;

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = log_destination(
        settings.log_file.as_deref(),
        cli.command.draws_progress(),
        cli.verbose,
    );
    if let Some(destination) = &destination {
        engine_logging::initialize(destination, level);
    }
    engine_info!("Settings loaded from {}", source);
    engine_debug!("Effective settings: {:?}", settings);

    commands::execute(cli.command, &settings)
}

/// Terminal logging would tear through a progress bar, so bar-drawing
/// commands log to the file only unless `-v` asks for terminal output.
fn log_destination(
    log_file: Option<&Path>,
    draws_progress: bool,
    verbose: bool,
) -> Option<LogDestination> {
    let terminal = verbose || !draws_progress;
    match (log_file, terminal) {
        (Some(path), true) => Some(LogDestination::Both(path.to_path_buf())),
        (Some(path), false) => Some(LogDestination::File(path.to_path_buf())),
        (None, true) => Some(LogDestination::Terminal),
        (None, false) => None,
    }
}
