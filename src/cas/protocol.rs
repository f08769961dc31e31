//! Protocol engine capability and the values exchanged with it.
//!
//! The engine owns the CAS wire protocol: ticket validation, SAML parsing and
//! the HTTP calls to the identity server. The gateway only configures it and
//! orchestrates when it is consulted.

use axum::{
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{error, warn};

use super::{
    error::{Error, Result},
    request::RequestContext,
};

/// Whether the gateway acts as a plain client or may issue proxy tickets.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Client,
    Proxy,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Client => write!(f, "client"),
            Mode::Proxy => write!(f, "proxy"),
        }
    }
}

/// Protocol version tokens understood by the engine.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum VersionToken {
    #[serde(rename = "CAS_VERSION_1_0")]
    Cas10,
    #[default]
    #[serde(rename = "CAS_VERSION_2_0")]
    Cas20,
    #[serde(rename = "CAS_VERSION_3_0")]
    Cas30,
    #[serde(rename = "SAML_VERSION_1_1")]
    Saml11,
}

impl VersionToken {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cas10 => "CAS_VERSION_1_0",
            Self::Cas20 => "CAS_VERSION_2_0",
            Self::Cas30 => "CAS_VERSION_3_0",
            Self::Saml11 => "SAML_VERSION_1_1",
        }
    }

    /// Look up a token by its constant name or its short form (`2.0`, `S1`).
    #[must_use]
    pub fn lookup(value: &str) -> Option<Self> {
        match value.trim() {
            "CAS_VERSION_1_0" | "1.0" => Some(Self::Cas10),
            "CAS_VERSION_2_0" | "2.0" => Some(Self::Cas20),
            "CAS_VERSION_3_0" | "3.0" => Some(Self::Cas30),
            "SAML_VERSION_1_1" | "S1" => Some(Self::Saml11),
            _ => None,
        }
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of the engine's client/proxy initialization.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ClientSetup {
    pub mode: Mode,
    pub version: VersionToken,
    pub host: String,
    pub port: u16,
    pub context: String,
    pub control_session: bool,
}

/// How the engine must trust the identity server's TLS certificate.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerValidation {
    CaCert { path: String, validate_cn: bool },
    /// No validation at all. Never acceptable in production.
    Disabled,
}

/// Source hosts allowed to send server-initiated (SAML) logout requests.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LogoutPolicy {
    pub restrict: bool,
    pub allowed_hosts: Vec<String>,
}

impl LogoutPolicy {
    /// Policy that only accepts the given hosts.
    #[must_use]
    pub fn restricted(allowed_hosts: Vec<String>) -> Self {
        Self {
            restrict: true,
            allowed_hosts,
        }
    }

    /// Check a notification's source host before anything reads its payload.
    ///
    /// # Errors
    /// Returns [`Error::UnauthorizedLogoutSource`] when the host is not allowed.
    pub fn authorize(&self, source_host: &str) -> Result<()> {
        if !self.restrict {
            return Ok(());
        }

        let source_host = source_host.trim();
        if self
            .allowed_hosts
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(source_host))
        {
            Ok(())
        } else {
            warn!(host = source_host, "rejected logout request from unauthorized host");
            Err(Error::UnauthorizedLogoutSource {
                host: source_host.to_string(),
            })
        }
    }
}

/// Parameters of a protocol-level logout.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LogoutParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Control transfer to another location. The request ends here.
#[must_use = "a redirect terminates the request and has to be returned as the response"]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Redirect {
    location: String,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        match HeaderValue::from_str(&self.location) {
            Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
            Err(err) => {
                error!("Invalid redirect location: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Engine answer to an authentication request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Authentication {
    Authenticated,
    Unauthenticated,
    Redirect(Redirect),
}

/// The CAS protocol engine, as consumed by the gateway.
pub trait ProtocolEngine {
    /// Initialize the engine as client or proxy.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] when the engine rejects the setup.
    fn configure(&mut self, setup: &ClientSetup) -> Result<()>;

    /// # Errors
    /// Returns [`Error::Configuration`] on a malformed URL.
    fn set_server_login_url(&mut self, url: &str) -> Result<()>;

    /// Pin the service URL the identity server returns to.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] on a malformed URL.
    fn set_fixed_service_url(&mut self, url: &str) -> Result<()>;

    /// # Errors
    /// Returns [`Error::Configuration`] on a malformed URL.
    fn set_server_logout_url(&mut self, url: &str) -> Result<()>;

    fn set_server_validation(&mut self, validation: ServerValidation);

    fn handle_logout_requests(&mut self, policy: LogoutPolicy);

    fn set_debug(&mut self, enabled: bool);

    fn set_verbose(&mut self, enabled: bool);

    /// Force authentication, redirecting to the identity server if needed.
    ///
    /// # Errors
    /// Returns an error if ticket validation cannot be performed.
    fn force_authentication(&mut self, request: &RequestContext) -> Result<Authentication>;

    /// Check authentication, possibly validating a ticket on the request.
    ///
    /// # Errors
    /// Returns an error if ticket validation cannot be performed.
    fn check_authentication(&mut self, request: &RequestContext) -> Result<Authentication>;

    /// Local, session-bound check. Never contacts the identity server.
    fn is_authenticated(&self) -> bool;

    /// Whether the session itself carries an authenticated user.
    fn is_session_authenticated(&self) -> bool;

    fn user(&self) -> Option<String>;

    /// Protocol-level logout.
    ///
    /// # Errors
    /// Returns an error if the logout URL cannot be built.
    fn logout(&mut self, params: &LogoutParams) -> Result<Redirect>;

    /// Consume a server-initiated logout payload whose source was already authorized.
    ///
    /// # Errors
    /// Returns an error if the payload is rejected.
    fn logout_notification(&mut self, payload: &str) -> Result<()>;

    fn server_login_url(&self) -> String;

    fn server_logout_url(&self) -> String;

    /// Engine specific operations not modelled by the gateway.
    ///
    /// # Errors
    /// Returns [`Error::MethodNotSupported`] unless the engine knows `method`.
    fn call(&mut self, method: &str, _args: &[Value]) -> Result<Value> {
        Err(Error::MethodNotSupported {
            method: method.to_string(),
        })
    }
}
