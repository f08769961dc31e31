//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an action. Configuration errors surface here,
//! before anything runs.

use crate::cli::actions::{check::Args, Action};
use crate::cli::commands::{cas, deployment, ARG_USER_AGENT};
use anyhow::Result;

/// Map validated CLI matches to the check action.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or is invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let config = cas::parse(matches)?;
    let deployment = deployment::parse(matches);
    let user_agent = matches.get_one::<String>(ARG_USER_AGENT).cloned();

    Ok(Action::Check(Args {
        config,
        deployment,
        user_agent,
    }))
}
