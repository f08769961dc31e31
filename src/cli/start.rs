use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;
use tracing::Level;

/// `-v` occurrences (or `CASGATE_LOG_LEVEL`) to the most verbose level shown.
/// Zero keeps the telemetry default of errors only.
const fn log_level(count: u8) -> Option<Level> {
    match count {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

/// Parse the command line, set up logging and resolve the configuration into
/// the action to run.
///
/// Configuration errors surface here, before the gateway is built.
///
/// # Errors
///
/// Returns an error if logging cannot be installed or the CAS configuration is invalid
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let count = matches
        .get_one::<u8>(commands::logging::ARG_VERBOSITY)
        .copied()
        .unwrap_or(0);
    telemetry::init(log_level(count))?;

    dispatch::handler(&matches)
}
