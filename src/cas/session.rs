//! Session naming and cookie hardening.
//!
//! Cookie attributes can only change before the host's session store hands out
//! a session identifier and before response headers are committed. Hardening
//! after that point is skipped with a warning instead of failing the request.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{
    config::{Config, Deployment},
    error::Error,
};

/// Key under which the protocol engine keeps its state in the session.
pub const PROTOCOL_SESSION_KEY: &str = "cas";

/// Cookie attributes applied to the session cookie.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CookieParams {
    /// Seconds, 0 for a browser session cookie.
    pub max_life: u64,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl CookieParams {
    #[must_use]
    pub fn from_config(config: &Config, deployment: &Deployment) -> Self {
        Self {
            max_life: config.session_max_life,
            path: config.session_path.clone(),
            domain: deployment.app_domain.clone(),
            secure: deployment.https_only_cookies,
            http_only: config.session_http_only,
        }
    }

    /// Render a `Set-Cookie` value for the session identifier.
    #[must_use]
    pub fn set_cookie_header(&self, name: &str, session_id: &str) -> String {
        let mut cookie = format!("{name}={session_id}; Path={}", self.path);
        if self.max_life > 0 {
            cookie.push_str(&format!("; Max-Age={}", self.max_life));
        }
        if let Some(domain) = &self.domain {
            cookie.push_str(&format!("; Domain={domain}"));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str("; SameSite=Lax");
        cookie
    }
}

/// The host's session storage, injected into the gateway.
pub trait SessionStore {
    /// A session identifier already exists for this request.
    fn is_started(&self) -> bool;

    /// Response headers were already committed.
    fn headers_sent(&self) -> bool;

    fn set_name(&mut self, name: &str);

    fn set_cookie_params(&mut self, params: &CookieParams);

    fn get(&self, key: &str) -> Option<&Value>;
}

/// Result of a hardening attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Hardening {
    Applied,
    Skipped,
}

/// Apply session name and cookie attributes, unless it is too late to do so.
pub fn harden_session(
    config: &Config,
    deployment: &Deployment,
    store: &mut dyn SessionStore,
) -> Hardening {
    if store.headers_sent() || store.is_started() {
        warn!(
            session_name = %config.session_name,
            "{}, skipping cookie hardening",
            Error::SessionAlreadyStarted
        );
        return Hardening::Skipped;
    }

    let params = CookieParams::from_config(config, deployment);
    debug!(session_name = %config.session_name, ?params, "hardening session cookie");

    store.set_name(&config.session_name);
    store.set_cookie_params(&params);

    Hardening::Applied
}

/// In-process session store, keyed by nothing but the current request.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    name: Option<String>,
    cookie: Option<CookieParams>,
    id: Option<String>,
    headers_sent: bool,
    data: HashMap<String, Value>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the session under `id`; cookie attributes are frozen afterwards.
    pub fn start(&mut self, id: impl Into<String>) {
        self.id.get_or_insert_with(|| id.into());
    }

    pub fn commit_headers(&mut self) {
        self.headers_sent = true;
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn cookie_params(&self) -> Option<&CookieParams> {
        self.cookie.as_ref()
    }

    /// `Set-Cookie` value for the started session.
    #[must_use]
    pub fn set_cookie_header(&self) -> Option<String> {
        let id = self.id.as_deref()?;
        let name = self.name.as_deref()?;
        let params = self.cookie.as_ref()?;
        Some(params.set_cookie_header(name, id))
    }
}

impl SessionStore for MemorySessionStore {
    fn is_started(&self) -> bool {
        self.id.is_some()
    }

    fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn set_cookie_params(&mut self, params: &CookieParams) {
        self.cookie = Some(params.clone());
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}
