//! Turns a [`Config`] into a configured protocol engine.
//!
//! Order matters: debug switches first so the rest is logged, then client
//! initialization, the SAML logout allowlist, endpoint overrides and finally
//! the TLS trust policy.

use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::{Host, Url};

use super::{
    config::Config,
    error::{Error, Result},
    protocol::{ClientSetup, LogoutPolicy, ProtocolEngine, ServerValidation, VersionToken},
};

/// What the engine was configured with.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Plan {
    pub setup: ClientSetup,
    /// The configured version string was missing or unknown.
    pub version_fallback: bool,
    pub logout_policy: Option<LogoutPolicy>,
    pub login_url: Option<String>,
    pub fixed_service_url: Option<String>,
    pub logout_url: Option<String>,
    pub validation: ServerValidation,
}

/// Resolve the configured version string to a token.
///
/// SAML always wins over the configured version.
///
/// # Errors
/// Returns [`Error::UnrecognizedProtocolVersion`] when the string is missing or unknown.
pub fn resolve_version(config: &Config) -> Result<VersionToken> {
    if config.saml_enabled {
        return Ok(VersionToken::Saml11);
    }

    let raw = config.protocol_version.as_deref().unwrap_or_default();
    VersionToken::lookup(raw).ok_or_else(|| Error::UnrecognizedProtocolVersion(raw.to_string()))
}

fn logout_policy(config: &Config) -> Result<Option<LogoutPolicy>> {
    if !config.saml_enabled {
        return Ok(None);
    }

    for host in &config.real_hosts {
        Host::parse(host).map_err(|err| {
            Error::Configuration(format!("invalid CAS_REAL_HOSTS entry {host:?}: {err}"))
        })?;
    }

    if config.real_hosts.is_empty() {
        warn!("SAML logout enabled without CAS_REAL_HOSTS, every logout request will be rejected");
    }

    Ok(Some(LogoutPolicy::restricted(config.real_hosts.clone())))
}

fn check_url(key: &str, value: &str) -> Result<()> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|err| Error::Configuration(format!("invalid {key} {value:?}: {err}")))
}

/// Configure `engine` from `config`.
///
/// An unknown protocol version is not an error: it is logged and replaced by
/// `CAS_VERSION_2_0`.
///
/// Endpoint overrides are only pushed when configured. Without `logout_url`
/// the engine keeps its own logout endpoint under the server base URL.
///
/// # Errors
/// Returns [`Error::Configuration`] when an endpoint is malformed or the engine
/// rejects the setup.
#[instrument(skip_all, fields(host = %config.host))]
pub fn configure<E>(config: &Config, engine: &mut E) -> Result<Plan>
where
    E: ProtocolEngine + ?Sized,
{
    engine.set_debug(config.debug);
    if config.debug {
        debug!(config = ?config.redacted(), "Loaded configuration");
    }
    engine.set_verbose(config.verbose);

    let (version, version_fallback) = match resolve_version(config) {
        Ok(version) => (version, false),
        Err(err) => {
            warn!("{err}; reverting to {}", VersionToken::Cas20);
            (VersionToken::Cas20, true)
        }
    };

    let setup = ClientSetup {
        mode: config.mode,
        version,
        host: config.host.trim().to_string(),
        port: config.port,
        context: config.context_path.clone(),
        control_session: config.control_session,
    };
    engine.configure(&setup)?;
    debug!(mode = %setup.mode, version = %setup.version, "CAS {} initialized", setup.mode);

    let logout_policy = logout_policy(config)?;
    if let Some(policy) = &logout_policy {
        engine.handle_logout_requests(policy.clone());
    }

    if let Some(login_url) = &config.login_url {
        check_url("CAS_LOGIN_URL", login_url)?;
        engine.set_server_login_url(login_url)?;
    }

    if let Some(service_url) = &config.redirect_path {
        check_url("CAS_REDIRECT_PATH", service_url)?;
        engine.set_fixed_service_url(service_url)?;
    }

    if let Some(logout_url) = &config.logout_url {
        check_url("CAS_LOGOUT_URL", logout_url)?;
        engine.set_server_logout_url(logout_url)?;
    }

    let validation = match &config.cert_path {
        Some(path) => ServerValidation::CaCert {
            path: path.clone(),
            validate_cn: config.cert_validate_cn,
        },
        None => {
            warn!("CAS server certificate validation is DISABLED; never run this in production");
            ServerValidation::Disabled
        }
    };
    engine.set_server_validation(validation.clone());

    Ok(Plan {
        setup,
        version_fallback,
        logout_policy,
        login_url: config.login_url.clone(),
        fixed_service_url: config.redirect_path.clone(),
        logout_url: config.logout_url.clone(),
        validation,
    })
}
