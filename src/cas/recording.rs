//! In-memory protocol engine.
//!
//! Records every call it receives and answers from local state: it never talks
//! to an identity server. `casgate` runs the construction sequence against it
//! for configuration dry runs, and the test suite uses it as the engine.

use serde_json::{json, Value};
use std::cell::RefCell;
use tracing::debug;
use url::Url;

use super::{
    error::{Error, Result},
    protocol::{
        Authentication, ClientSetup, LogoutParams, LogoutPolicy, ProtocolEngine, Redirect,
        ServerValidation,
    },
    request::RequestContext,
};

/// One call received by the engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Configure(ClientSetup),
    SetServerLoginUrl(String),
    SetFixedServiceUrl(String),
    SetServerLogoutUrl(String),
    SetServerValidation(ServerValidation),
    HandleLogoutRequests(LogoutPolicy),
    SetDebug(bool),
    SetVerbose(bool),
    ForceAuthentication,
    CheckAuthentication,
    IsAuthenticated,
    User,
    Logout(LogoutParams),
    LogoutNotification(String),
    Passthrough(String),
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: RefCell<Vec<Call>>,
    base_url: Option<Url>,
    login_url: Option<String>,
    logout_url: Option<String>,
    fixed_service_url: Option<String>,
    user: Option<String>,
    session_authenticated: bool,
}

impl RecordingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose session already carries `user`.
    #[must_use]
    pub fn authenticated_as(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            session_authenticated: true,
            ..Self::default()
        }
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Whether any authentication or identity question reached the engine.
    #[must_use]
    pub fn was_consulted(&self) -> bool {
        self.calls().iter().any(|call| {
            matches!(
                call,
                Call::ForceAuthentication
                    | Call::CheckAuthentication
                    | Call::IsAuthenticated
                    | Call::User
            )
        })
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn endpoint(&self, path: &str) -> String {
        self.base_url
            .as_ref()
            .and_then(|base| base.join(path).ok())
            .map(String::from)
            .unwrap_or_default()
    }

    fn service_url(&self, request: &RequestContext) -> String {
        self.fixed_service_url
            .clone()
            .unwrap_or_else(|| request.self_url())
    }

    fn login_redirect(&self, request: &RequestContext) -> Result<Redirect> {
        let mut login = Url::parse(&self.server_login_url())
            .map_err(|err| Error::Configuration(format!("login URL: {err}")))?;
        login
            .query_pairs_mut()
            .append_pair("service", &self.service_url(request));
        Ok(Redirect::to(login))
    }
}

fn parse_url(value: &str) -> Result<String> {
    Url::parse(value)
        .map(String::from)
        .map_err(|err| Error::Configuration(format!("{value:?}: {err}")))
}

impl ProtocolEngine for RecordingEngine {
    fn configure(&mut self, setup: &ClientSetup) -> Result<()> {
        self.record(Call::Configure(setup.clone()));

        if setup.host.is_empty() {
            return Err(Error::Configuration("empty CAS host".to_string()));
        }

        let context = setup.context.trim_matches('/');
        let base = if context.is_empty() {
            format!("https://{}:{}/", setup.host, setup.port)
        } else {
            format!("https://{}:{}/{context}/", setup.host, setup.port)
        };
        let base = Url::parse(&base)
            .map_err(|err| Error::Configuration(format!("CAS endpoint {base:?}: {err}")))?;

        debug!(endpoint = %base, "recording engine configured");
        self.base_url = Some(base);
        Ok(())
    }

    fn set_server_login_url(&mut self, url: &str) -> Result<()> {
        self.record(Call::SetServerLoginUrl(url.to_string()));
        self.login_url = Some(parse_url(url)?);
        Ok(())
    }

    fn set_fixed_service_url(&mut self, url: &str) -> Result<()> {
        self.record(Call::SetFixedServiceUrl(url.to_string()));
        self.fixed_service_url = Some(parse_url(url)?);
        Ok(())
    }

    fn set_server_logout_url(&mut self, url: &str) -> Result<()> {
        self.record(Call::SetServerLogoutUrl(url.to_string()));
        self.logout_url = Some(parse_url(url)?);
        Ok(())
    }

    fn set_server_validation(&mut self, validation: ServerValidation) {
        self.record(Call::SetServerValidation(validation));
    }

    fn handle_logout_requests(&mut self, policy: LogoutPolicy) {
        self.record(Call::HandleLogoutRequests(policy));
    }

    fn set_debug(&mut self, enabled: bool) {
        self.record(Call::SetDebug(enabled));
    }

    fn set_verbose(&mut self, enabled: bool) {
        self.record(Call::SetVerbose(enabled));
    }

    fn force_authentication(&mut self, request: &RequestContext) -> Result<Authentication> {
        self.record(Call::ForceAuthentication);
        if self.user.is_some() {
            return Ok(Authentication::Authenticated);
        }
        Ok(Authentication::Redirect(self.login_redirect(request)?))
    }

    fn check_authentication(&mut self, _request: &RequestContext) -> Result<Authentication> {
        self.record(Call::CheckAuthentication);
        if self.user.is_some() {
            Ok(Authentication::Authenticated)
        } else {
            Ok(Authentication::Unauthenticated)
        }
    }

    fn is_authenticated(&self) -> bool {
        self.record(Call::IsAuthenticated);
        self.user.is_some()
    }

    fn is_session_authenticated(&self) -> bool {
        self.session_authenticated
    }

    fn user(&self) -> Option<String> {
        self.record(Call::User);
        self.user.clone()
    }

    fn logout(&mut self, params: &LogoutParams) -> Result<Redirect> {
        self.record(Call::Logout(params.clone()));
        self.user = None;
        self.session_authenticated = false;

        let mut logout = Url::parse(&self.server_logout_url())
            .map_err(|err| Error::Configuration(format!("logout URL: {err}")))?;
        {
            let mut query = logout.query_pairs_mut();
            if let Some(service) = &params.service {
                query.append_pair("service", service);
            }
            if let Some(url) = &params.url {
                query.append_pair("url", url);
            }
        }
        if logout.query() == Some("") {
            logout.set_query(None);
        }
        Ok(Redirect::to(logout))
    }

    fn logout_notification(&mut self, payload: &str) -> Result<()> {
        self.record(Call::LogoutNotification(payload.to_string()));
        self.user = None;
        self.session_authenticated = false;
        Ok(())
    }

    fn server_login_url(&self) -> String {
        self.login_url
            .clone()
            .unwrap_or_else(|| self.endpoint("login"))
    }

    fn server_logout_url(&self) -> String {
        self.logout_url
            .clone()
            .unwrap_or_else(|| self.endpoint("logout"))
    }

    fn call(&mut self, method: &str, _args: &[Value]) -> Result<Value> {
        self.record(Call::Passthrough(method.to_string()));
        match method {
            "getVersion" => Ok(json!(env!("CARGO_PKG_VERSION"))),
            "getServerBaseURL" => Ok(json!(self.endpoint(""))),
            _ => Err(Error::MethodNotSupported {
                method: method.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::protocol::{Mode, VersionToken};
    use axum::http::Method;

    fn setup(context: &str) -> ClientSetup {
        ClientSetup {
            mode: Mode::Client,
            version: VersionToken::Cas20,
            host: "cas.example.org".to_string(),
            port: 8443,
            context: context.to_string(),
            control_session: true,
        }
    }

    #[test]
    fn default_endpoints_follow_setup() {
        let mut engine = RecordingEngine::new();
        assert!(engine.configure(&setup("/cas")).is_ok());
        assert_eq!(
            engine.server_login_url(),
            "https://cas.example.org:8443/cas/login"
        );
        assert_eq!(
            engine.server_logout_url(),
            "https://cas.example.org:8443/cas/logout"
        );

        let mut root = RecordingEngine::new();
        assert!(root.configure(&setup("")).is_ok());
        assert_eq!(root.server_login_url(), "https://cas.example.org:8443/login");
    }

    #[test]
    fn rejects_unusable_host() {
        let mut engine = RecordingEngine::new();
        let mut bad = setup("/cas");
        bad.host = "bad host".to_string();
        assert!(matches!(engine.configure(&bad), Err(Error::Configuration(_))));

        bad.host = String::new();
        assert!(matches!(engine.configure(&bad), Err(Error::Configuration(_))));
    }

    #[test]
    fn force_authentication_redirects_with_service() {
        let mut engine = RecordingEngine::new();
        assert!(engine.configure(&setup("/cas")).is_ok());
        let request = RequestContext::new(Method::GET, "app.example.org", "/home").with_tls(true);

        let redirect = match engine.force_authentication(&request) {
            Ok(Authentication::Redirect(redirect)) => redirect,
            other => panic!("expected a login redirect, got {other:?}"),
        };
        assert_eq!(
            redirect.location(),
            "https://cas.example.org:8443/cas/login?service=https%3A%2F%2Fapp.example.org%2Fhome"
        );
    }

    #[test]
    fn logout_without_params_has_no_query() {
        let mut engine = RecordingEngine::authenticated_as("alice");
        assert!(engine.configure(&setup("/cas")).is_ok());
        let redirect = engine.logout(&LogoutParams::default()).ok();
        assert_eq!(
            redirect.as_ref().map(Redirect::location),
            Some("https://cas.example.org:8443/cas/logout")
        );
        assert!(!engine.is_authenticated());
    }

    #[test]
    fn unknown_passthrough_is_not_supported() {
        let mut engine = RecordingEngine::new();
        assert!(engine.call("getVersion", &[]).is_ok());
        assert!(matches!(
            engine.call("renameUser", &[]),
            Err(Error::MethodNotSupported { method }) if method == "renameUser"
        ));
    }
}
