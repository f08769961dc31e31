//! Typed gateway configuration.
//!
//! The configuration arrives as a flat key/value mapping using the deployment
//! keys (`CAS_HOST`, `SESSION_NAME`, ...). Values are lenient about their JSON
//! type because they usually come from environment files: ports may be strings,
//! flags may be `"1"` or `"on"`, and empty strings mean "not set".

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::env;

use super::{
    error::{Error, Result},
    protocol::Mode,
};

const DEFAULT_PORT: u16 = 443;
const DEFAULT_CONTEXT: &str = "/cas";
const DEFAULT_SESSION_NAME: &str = "CASGATESESSID";
const DEFAULT_SESSION_PATH: &str = "/";
const REDACTED: &str = "[redacted]";
const MODE_KEY: &str = "CAS_MODE";
const PROXY_KEY: &str = "CAS_PROXY";

/// Read-only configuration snapshot, fixed at construction.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Loaded from `CAS_MODE` and `CAS_PROXY`, see [`Config::from_value`].
    #[serde(rename = "CAS_MODE", default, deserialize_with = "de::mode")]
    pub mode: Mode,
    /// Raw version string; resolved (with fallback) by the configurator.
    #[serde(rename = "CAS_VERSION", default, deserialize_with = "de::opt_string")]
    pub protocol_version: Option<String>,
    #[serde(rename = "CAS_ENABLE_SAML", default, deserialize_with = "de::flag")]
    pub saml_enabled: bool,
    #[serde(rename = "CAS_HOST", default, deserialize_with = "de::string")]
    pub host: String,
    #[serde(rename = "CAS_PORT", default = "default_port", deserialize_with = "de::port")]
    pub port: u16,
    #[serde(
        rename = "CAS_CONTEXT",
        default = "default_context",
        deserialize_with = "de::string"
    )]
    pub context_path: String,
    #[serde(
        rename = "CAS_CONTROL_SESSION",
        default = "default_true",
        deserialize_with = "de::flag"
    )]
    pub control_session: bool,
    /// Hosts allowed to send SAML logout requests.
    #[serde(rename = "CAS_REAL_HOSTS", default, deserialize_with = "de::host_list")]
    pub real_hosts: Vec<String>,
    #[serde(rename = "CAS_LOGIN_URL", default, deserialize_with = "de::opt_string")]
    pub login_url: Option<String>,
    /// Fixed service URL handed to the identity server.
    #[serde(rename = "CAS_REDIRECT_PATH", default, deserialize_with = "de::opt_string")]
    pub redirect_path: Option<String>,
    #[serde(rename = "CAS_LOGOUT_URL", default, deserialize_with = "de::opt_string")]
    pub logout_url: Option<String>,
    #[serde(rename = "CAS_LOGOUT_REDIRECT", default, deserialize_with = "de::opt_string")]
    pub logout_redirect_url: Option<String>,
    #[serde(rename = "CAS_CERT_PATH", default, deserialize_with = "de::opt_string")]
    pub cert_path: Option<String>,
    #[serde(
        rename = "CAS_CERT_VALIDATE_CN",
        default = "default_true",
        deserialize_with = "de::flag"
    )]
    pub cert_validate_cn: bool,
    #[serde(rename = "CAS_MASK_DUMMY", default, deserialize_with = "de::opt_string")]
    pub mask_dummy_user: Option<String>,
    #[serde(rename = "CAS_DEBUG", default, deserialize_with = "de::flag")]
    pub debug: bool,
    #[serde(rename = "CAS_VERBOSE", default, deserialize_with = "de::flag")]
    pub verbose: bool,
    #[serde(
        rename = "SESSION_NAME",
        default = "default_session_name",
        deserialize_with = "de::string"
    )]
    pub session_name: String,
    /// Cookie lifetime in seconds, 0 for a browser session cookie.
    #[serde(rename = "SESSION_MAX_LIFE", default, deserialize_with = "de::seconds")]
    pub session_max_life: u64,
    #[serde(
        rename = "SESSION_PATH",
        default = "default_session_path",
        deserialize_with = "de::string"
    )]
    pub session_path: String,
    #[serde(
        rename = "SESSION_HTTPONLY",
        default = "default_true",
        deserialize_with = "de::flag"
    )]
    pub session_http_only: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_context() -> String {
    DEFAULT_CONTEXT.to_string()
}

fn default_session_name() -> String {
    DEFAULT_SESSION_NAME.to_string()
}

fn default_session_path() -> String {
    DEFAULT_SESSION_PATH.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Client,
            protocol_version: None,
            saml_enabled: false,
            host: String::new(),
            port: DEFAULT_PORT,
            context_path: default_context(),
            control_session: true,
            real_hosts: Vec::new(),
            login_url: None,
            redirect_path: None,
            logout_url: None,
            logout_redirect_url: None,
            cert_path: None,
            cert_validate_cn: true,
            mask_dummy_user: None,
            debug: false,
            verbose: false,
            session_name: default_session_name(),
            session_max_life: 0,
            session_path: default_session_path(),
            session_http_only: true,
        }
    }
}

impl Config {
    /// Configuration for `host` with every other option at its default.
    #[must_use]
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Load and validate the configuration from a key/value mapping.
    ///
    /// `CAS_MODE` and `CAS_PROXY` may both be present; proxy mode wins if
    /// either one selects it.
    ///
    /// # Errors
    /// Returns an error if a value has the wrong shape or the host is missing.
    pub fn from_value(mut value: Value) -> Result<Self> {
        if let Value::Object(map) = &mut value {
            fold_mode_keys(map);
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns an error if the JSON is malformed or [`Config::from_value`] fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// # Errors
    /// Returns [`Error::Configuration`] if the identity-server host is missing.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Configuration(
                "CAS_HOST is required to reach the identity server".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy safe to log: the masquerade identity is hidden.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            mask_dummy_user: self.mask_dummy_user.as_ref().map(|_| REDACTED.to_string()),
            ..self.clone()
        }
    }
}

fn fold_mode_keys(map: &mut Map<String, Value>) {
    let values: Vec<Value> = [MODE_KEY, PROXY_KEY]
        .iter()
        .filter_map(|key| map.remove(*key))
        .collect();

    if !values.is_empty() {
        let proxy = values.iter().any(de::selects_proxy);
        map.insert(MODE_KEY.to_string(), Value::Bool(proxy));
    }
}

/// Cookie attributes that come from the deployment, not from the gateway config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub app_domain: Option<String>,
    pub https_only_cookies: bool,
}

impl Deployment {
    /// Read `APP_DOMAIN` and `HTTPS_ONLY_COOKIES`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            app_domain: env::var("APP_DOMAIN")
                .ok()
                .map(|domain| domain.trim().to_string())
                .filter(|domain| !domain.is_empty()),
            https_only_cookies: env::var("HTTPS_ONLY_COOKIES")
                .map(|value| de::truthy(&value))
                .unwrap_or(false),
        }
    }
}

mod de {
    use super::{Deserialize, Deserializer, Mode, Value};
    use serde::de::Error as _;

    pub(super) fn truthy(value: &str) -> bool {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    }

    fn as_trimmed(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub(super) fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(d)?;
        match value {
            Value::Null | Value::String(_) | Value::Number(_) => Ok(as_trimmed(&value)),
            Value::Bool(false) => Ok(None),
            other => Err(D::Error::custom(format!("expected a string, got {other}"))),
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        opt_string(d).map(Option::unwrap_or_default)
    }

    pub(super) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|n| n != 0.0)),
            Value::String(s) => Ok(truthy(&s)),
            other => Err(D::Error::custom(format!("expected a flag, got {other}"))),
        }
    }

    /// `"proxy"` or any truthy flag value; everything else is client mode.
    pub(super) fn selects_proxy(value: &Value) -> bool {
        match value {
            Value::String(s) => s.trim().eq_ignore_ascii_case("proxy") || truthy(s),
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }

    pub(super) fn mode<'de, D: Deserializer<'de>>(d: D) -> Result<Mode, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(if selects_proxy(&value) {
            Mode::Proxy
        } else {
            Mode::Client
        })
    }

    fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected a positive integer, got {n}"))),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected a positive integer, got {s:?}"))),
            other => Err(D::Error::custom(format!(
                "expected a positive integer, got {other}"
            ))),
        }
    }

    pub(super) fn port<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
        match number(d)? {
            None => Ok(super::DEFAULT_PORT),
            Some(port) => u16::try_from(port)
                .map_err(|_| D::Error::custom(format!("port out of range: {port}"))),
        }
    }

    pub(super) fn seconds<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        number(d).map(Option::unwrap_or_default)
    }

    pub(super) fn host_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let entries: Vec<String> = match Value::deserialize(d)? {
            Value::Null => Vec::new(),
            Value::String(s) => s.split(',').map(str::to_string).collect(),
            Value::Array(items) => items.iter().filter_map(as_trimmed).collect(),
            other => {
                return Err(D::Error::custom(format!(
                    "expected a comma separated host list, got {other}"
                )))
            }
        };

        Ok(entries
            .into_iter()
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .collect())
    }
}
