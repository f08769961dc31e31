//! CAS and session settings.
//!
//! Every setting maps 1:1 to a configuration key and can also be set through
//! the environment variable of the same name. Values are handed to
//! [`Config::from_value`] as strings, which parses them leniently.

use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use serde_json::{Map, Value};
use std::fs;

use crate::cas::Config;

pub const ARG_CONFIG: &str = "config";

/// (argument, configuration key and env var, help)
pub const SETTINGS: &[(&str, &str, &str)] = &[
    ("cas-host", "CAS_HOST", "CAS server host name"),
    ("cas-port", "CAS_PORT", "CAS server port (default: 443)"),
    ("cas-context", "CAS_CONTEXT", "CAS server context path (default: /cas)"),
    ("cas-mode", "CAS_MODE", "Client mode: client or proxy"),
    (
        "cas-proxy",
        "CAS_PROXY",
        "Run as CAS proxy when true, same as --cas-mode proxy",
    ),
    (
        "cas-version",
        "CAS_VERSION",
        "Protocol version: 1.0, 2.0, 3.0, S1 or a CAS_VERSION_* name (default: 2.0)",
    ),
    (
        "cas-enable-saml",
        "CAS_ENABLE_SAML",
        "Use SAML 1.1 and accept SAML logout requests",
    ),
    (
        "cas-control-session",
        "CAS_CONTROL_SESSION",
        "Let the CAS client control the session (default: true)",
    ),
    (
        "cas-real-hosts",
        "CAS_REAL_HOSTS",
        "Comma separated hosts allowed to send SAML logout requests",
    ),
    ("cas-login-url", "CAS_LOGIN_URL", "Override the CAS login URL"),
    (
        "cas-redirect-path",
        "CAS_REDIRECT_PATH",
        "Fixed service URL the CAS server returns to",
    ),
    ("cas-logout-url", "CAS_LOGOUT_URL", "Override the CAS logout URL"),
    (
        "cas-logout-redirect",
        "CAS_LOGOUT_REDIRECT",
        "Where users land after logging out",
    ),
    (
        "cas-cert-path",
        "CAS_CERT_PATH",
        "CA certificate (PEM) used to validate the CAS server",
    ),
    (
        "cas-cert-validate-cn",
        "CAS_CERT_VALIDATE_CN",
        "Validate the CAS server certificate CN (default: true)",
    ),
    (
        "cas-mask-dummy",
        "CAS_MASK_DUMMY",
        "Masquerade as this user instead of asking CAS (development only)",
    ),
    ("cas-debug", "CAS_DEBUG", "Enable CAS debug logging"),
    ("cas-verbose", "CAS_VERBOSE", "Enable verbose CAS errors"),
    ("session-name", "SESSION_NAME", "Session cookie name"),
    (
        "session-max-life",
        "SESSION_MAX_LIFE",
        "Session cookie lifetime in seconds, 0 for a browser session",
    ),
    ("session-path", "SESSION_PATH", "Session cookie path (default: /)"),
    (
        "session-httponly",
        "SESSION_HTTPONLY",
        "Set HttpOnly on the session cookie (default: true)",
    ),
];

fn load_file(path: &str) -> Result<Map<String, Value>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read config file: {path}"))?;
    match serde_json::from_str::<Value>(&contents)
        .with_context(|| format!("Invalid JSON in config file: {path}"))?
    {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("config file must contain a JSON object: {path}")),
    }
}

/// Build the configuration: file values first, flags and env on top.
///
/// # Errors
/// Returns an error if the config file cannot be read or the result is invalid.
pub fn parse(matches: &ArgMatches) -> Result<Config> {
    let mut map = match matches.get_one::<String>(ARG_CONFIG) {
        Some(path) => load_file(path)?,
        None => Map::new(),
    };

    for (id, key, _) in SETTINGS {
        if let Some(value) = matches.get_one::<String>(id) {
            map.insert((*key).to_string(), Value::String(value.clone()));
        }
    }

    Config::from_value(Value::Object(map)).context("invalid CAS configuration")
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = command.arg(
        Arg::new(ARG_CONFIG)
            .short('c')
            .long(ARG_CONFIG)
            .help("JSON file with CAS_* and SESSION_* keys")
            .env("CASGATE_CONFIG"),
    );

    SETTINGS.iter().fold(command, |command, (id, key, help)| {
        command.arg(Arg::new(*id).long(*id).help(*help).env(*key))
    })
}
