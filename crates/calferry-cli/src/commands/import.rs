//! The import run: discover, parse, and drive the engine.

use std::path::Path;

use tokio::sync::watch;
use tracing::{info, warn};

use calferry_core::{RawEvent, TimezoneMap};
use calferry_engine::{RunController, RunSummary};
use calferry_ics::{find_ics_files, parse_ics_file};

use crate::config::Settings;
use crate::error::CliResult;
use crate::render::ConsoleProgress;

/// Everything parsed out of the source path.
struct ParsedInput {
    events: Vec<RawEvent>,
    default_timezone: Option<String>,
    anomalies: usize,
}

/// Runs one import and returns the summary.
pub async fn run(ics_path: &Path, settings: &Settings) -> CliResult<RunSummary> {
    let input = parse_input(ics_path)?;
    info!(
        events = input.events.len(),
        anomalies = input.anomalies,
        "parsed source files"
    );

    let client = super::authenticated_client(settings).await?;

    let stop = stop_signal();
    let tz_map = TimezoneMap::with_defaults();
    let mut controller = RunController::new(&client, &settings.options, &tz_map)
        .with_stop_signal(stop);

    let mut progress = ConsoleProgress::stderr();
    let summary = controller
        .run(
            &input.events,
            input.default_timezone.as_deref(),
            input.anomalies,
            &mut progress,
        )
        .await;

    Ok(summary)
}

/// Parses every discovered file into one event stream.
///
/// The first file that declares a calendar-level timezone supplies the
/// default for the whole run.
fn parse_input(path: &Path) -> CliResult<ParsedInput> {
    let files = find_ics_files(path)?;
    info!(files = files.len(), path = %path.display(), "discovered source files");

    let mut events = Vec::new();
    let mut default_timezone: Option<String> = None;
    let mut anomalies = 0;

    for file in files {
        let parsed = parse_ics_file(&file)?;
        if parsed.anomalies > 0 {
            warn!(
                file = %file.display(),
                anomalies = parsed.anomalies,
                "skipped unparsable components"
            );
        }
        if default_timezone.is_none() {
            default_timezone = parsed.default_timezone;
        }
        events.extend(parsed.events);
        anomalies += parsed.anomalies;
    }

    Ok(ParsedInput {
        events,
        default_timezone,
        anomalies,
    })
}

/// A watch channel flipped to true on Ctrl-C.
fn stop_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current event");
            let _ = tx.send(true);
        }
    });
    rx
}
