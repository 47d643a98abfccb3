//! calferry CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calferry_cli::cli::{Cli, Command};
use calferry_cli::config::{FileConfig, Settings};
use calferry_cli::error::{CliError, CliResult};
use calferry_cli::render;

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let file = match load_file_config(&cli) {
        Ok(file) => file,
        Err(e) => return fail(&e),
    };
    let settings = match Settings::resolve(&cli, &file) {
        Ok(settings) => settings,
        Err(e) => return fail(&e),
    };

    if let Err(e) = calferry_core::init_tracing(settings.tracing.clone()) {
        eprintln!("error: {}", e);
        return ExitCode::from(EXIT_FAILURE);
    }

    match run(cli, settings).await {
        Ok(code) => code,
        Err(e) => fail(&e),
    }
}

async fn run(cli: Cli, settings: Settings) -> CliResult<ExitCode> {
    if let Some(Command::Auth { force }) = cli.command {
        calferry_cli::commands::auth::run(&settings, force).await?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.list_calendars {
        calferry_cli::commands::calendars::run(&settings).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let ics_path = cli.ics_path.as_deref().ok_or_else(|| {
        CliError::Usage("missing ICS_PATH (a .ics file or a directory of them)".to_string())
    })?;

    let summary = calferry_cli::commands::import::run(ics_path, &settings).await?;
    print!("{}", render::render_summary(&summary));

    if summary.has_failures() {
        Ok(ExitCode::from(EXIT_FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn load_file_config(cli: &Cli) -> CliResult<FileConfig> {
    match &cli.config {
        Some(path) => FileConfig::load_from(path),
        None => FileConfig::load(),
    }
}

fn fail(error: &CliError) -> ExitCode {
    eprintln!("error: {}", error);
    if error.is_usage() {
        ExitCode::from(EXIT_USAGE)
    } else {
        ExitCode::from(EXIT_FAILURE)
    }
}
