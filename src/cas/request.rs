//! The parts of the inbound HTTP request the gateway observes.

use axum::http::{
    header::{HOST, USER_AGENT},
    request::Parts,
    HeaderName, Method,
};

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub method: Method,
    pub user_agent: Option<String>,
    pub tls: bool,
    pub host: String,
    pub path: String,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: Method, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            user_agent: None,
            tls: false,
            host: host.into(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Build the context from request parts. TLS termination is not visible in
    /// the parts, so the listener has to say whether the request came over TLS.
    #[must_use]
    pub fn from_parts(parts: &Parts, tls: bool) -> Self {
        let header = |name: HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let host = header(HOST)
            .or_else(|| parts.uri.authority().map(ToString::to_string))
            .unwrap_or_default();

        Self {
            method: parts.method.clone(),
            user_agent: header(USER_AGENT),
            tls,
            host,
            path: parts.uri.path().to_string(),
        }
    }

    /// POST requests only get the local authentication check.
    #[must_use]
    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }

    /// `<scheme>://<host><path>` of the current request.
    #[must_use]
    pub fn self_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}{}", self.host, self.path)
    }
}
