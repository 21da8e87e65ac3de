use crate::cli::{actions::Action, commands, dispatch::handler, telemetry};
use anyhow::Result;
use clap::ArgMatches;
use tracing::Level;

/// Log level requested with `-v`; without it only errors are logged unless
/// `RUST_LOG` says otherwise.
fn verbosity(matches: &ArgMatches) -> Option<Level> {
    match matches.get_count("verbose") {
        0 => None,
        1 => Some(Level::INFO),
        2 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

/// Parse the command line, start telemetry and resolve the exporter action.
///
/// Telemetry starts before dispatch so tracker and collector warnings are
/// logged.
///
/// # Errors
///
/// Returns an error if telemetry fails to start or the tracker settings are
/// invalid
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(verbosity(&matches))?;

    handler(&matches)
}
