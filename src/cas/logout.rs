//! Session teardown.
//!
//! The post-logout `service` is, in priority order: the caller's explicit
//! service, the configured `CAS_LOGOUT_REDIRECT`, or the current request URL
//! when the caller gave no explicit `url` either. An explicit `url` travels
//! next to `service` as its own parameter.

use tracing::{instrument, warn};

use super::{
    error::Result,
    gateway::Cas,
    protocol::{LogoutParams, ProtocolEngine, Redirect},
    request::RequestContext,
    session::{SessionStore, PROTOCOL_SESSION_KEY},
};

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Resolve the parameters of a protocol logout.
#[must_use]
pub fn logout_params(
    request: &RequestContext,
    configured_redirect: Option<&str>,
    url: Option<&str>,
    service: Option<&str>,
) -> LogoutParams {
    let url = non_empty(url);

    let service = non_empty(service)
        .or_else(|| non_empty(configured_redirect))
        .map(str::to_string)
        .or_else(|| url.is_none().then(|| request.self_url()));

    LogoutParams {
        service,
        url: url.map(str::to_string),
    }
}

impl<E: ProtocolEngine> Cas<E> {
    /// Log out of CAS and the local session.
    ///
    /// Returns the redirect that ends the request, or `None` for an inert
    /// gateway. Masquerading does not skip the protocol logout.
    ///
    /// # Errors
    /// Returns the engine's error if the logout redirect cannot be built.
    #[instrument(skip(self, request, session))]
    pub fn logout(
        &mut self,
        request: &RequestContext,
        session: &dyn SessionStore,
        url: Option<&str>,
        service: Option<&str>,
    ) -> Result<Option<Redirect>> {
        let Some(active) = self.active_mut() else {
            return Ok(None);
        };

        if active.engine.is_session_authenticated() && session.get(PROTOCOL_SESSION_KEY).is_none() {
            warn!("Logout requested, but no CAS session data found for the authenticated user");
        }

        let params = logout_params(
            request,
            active.config.logout_redirect_url.as_deref(),
            url,
            service,
        );

        active.engine.logout(&params).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn request() -> RequestContext {
        RequestContext::new(Method::GET, "app.example.org", "/account/logout")
    }

    #[test]
    fn explicit_service_and_url_are_both_sent() {
        let params = logout_params(
            &request(),
            Some("https://configured.example.org/"),
            Some("https://b"),
            Some("https://a"),
        );
        assert_eq!(params.service.as_deref(), Some("https://a"));
        assert_eq!(params.url.as_deref(), Some("https://b"));
    }

    #[test]
    fn configured_redirect_beats_derived_service() {
        let params = logout_params(&request(), Some("https://configured.example.org/"), None, None);
        assert_eq!(
            params.service.as_deref(),
            Some("https://configured.example.org/")
        );
        assert_eq!(params.url, None);
    }

    #[test]
    fn service_derived_from_request_when_nothing_given() {
        let params = logout_params(&request(), None, None, None);
        assert_eq!(
            params.service.as_deref(),
            Some("http://app.example.org/account/logout")
        );

        let params = logout_params(&request().with_tls(true), None, Some(""), Some(" "));
        assert_eq!(
            params.service.as_deref(),
            Some("https://app.example.org/account/logout")
        );
    }

    #[test]
    fn explicit_url_suppresses_derived_service() {
        let params = logout_params(&request(), None, Some("https://b"), None);
        assert_eq!(params.service, None);
        assert_eq!(params.url.as_deref(), Some("https://b"));
    }
}
