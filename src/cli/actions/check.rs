//! Configuration dry run.
//!
//! Builds the gateway exactly as a request would, against the recording
//! engine, and prints what the protocol engine ended up configured with.

use anyhow::{Context, Result};
use axum::http::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    cas::{
        Cas, Config, CookieParams, Deployment, MemorySessionStore, Plan, RecordingEngine,
        RequestContext,
    },
    GIT_COMMIT_HASH,
};

#[derive(Debug)]
pub struct Args {
    pub config: Config,
    pub deployment: Deployment,
    pub user_agent: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    name: &'static str,
    version: &'static str,
    build: &'static str,
    inert: bool,
    plan: Option<&'a Plan>,
    login_url: Option<String>,
    logout_url: Option<String>,
    masquerade: bool,
    session_name: Option<&'a str>,
    cookie: Option<&'a CookieParams>,
}

/// Run the construction sequence and render the report.
///
/// # Errors
/// Returns an error if the gateway cannot be configured.
pub fn report(args: &Args) -> Result<Value> {
    let mut request = RequestContext::new(Method::GET, "localhost", "/");
    if let Some(user_agent) = &args.user_agent {
        request = request.with_user_agent(user_agent.as_str());
    }

    let mut session = MemorySessionStore::new();
    let cas = Cas::new(
        args.config.clone(),
        RecordingEngine::new(),
        &request,
        &mut session,
        &args.deployment,
    )
    .context("Failed to configure the CAS gateway")?;

    let report = Report {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        build: GIT_COMMIT_HASH,
        inert: cas.is_inert(),
        plan: cas.plan(),
        login_url: cas.login_url(),
        logout_url: cas.logout_url(),
        masquerade: cas.masquerade().is_some(),
        session_name: session.name(),
        cookie: session.cookie_params(),
    };
    debug!(inert = report.inert, "gateway constructed");

    serde_json::to_value(&report).context("Failed to serialize report")
}

/// Execute the check action.
///
/// # Errors
/// Returns an error if the gateway cannot be configured or the report cannot be written.
pub fn execute(args: Args) -> Result<()> {
    info!(host = %args.config.host, "Checking CAS configuration");

    let report = report(&args)?;
    let rendered = serde_json::to_string_pretty(&report).context("Failed to render report")?;
    println!("{rendered}");

    Ok(())
}
