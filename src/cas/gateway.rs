//! Gateway construction and the operations that are not about a single
//! authentication decision.

use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{
    bot,
    config::{Config, Deployment},
    configurator::{self, Plan},
    error::Result,
    masquerade,
    protocol::ProtocolEngine,
    request::RequestContext,
    session::{self, SessionStore},
};

/// CAS gateway for one inbound request.
#[derive(Debug)]
pub struct Cas<E> {
    pub(super) state: State<E>,
}

#[derive(Debug)]
pub(super) enum State<E> {
    /// Crawler traffic: every operation is a no-op.
    Inert,
    Active(Active<E>),
}

#[derive(Debug)]
pub(super) struct Active<E> {
    pub(super) config: Config,
    pub(super) plan: Plan,
    pub(super) engine: E,
    pub(super) masquerade: Option<String>,
}

impl<E: ProtocolEngine> Cas<E> {
    /// Build the gateway for `request`.
    ///
    /// Crawlers get an inert gateway without touching the session or the
    /// engine. Otherwise the session cookie is hardened before the engine is
    /// configured, and the masquerade override is applied last.
    ///
    /// # Errors
    /// Returns [`super::Error::Configuration`] when the engine cannot be configured.
    #[instrument(skip_all, fields(host = %config.host, path = %request.path))]
    pub fn new(
        config: Config,
        mut engine: E,
        request: &RequestContext,
        session: &mut dyn SessionStore,
        deployment: &Deployment,
    ) -> Result<Self> {
        if !bot::is_likely_real_user(request.user_agent.as_deref()) {
            info!("Not a real user, CAS disabled for this request");
            return Ok(Self {
                state: State::Inert,
            });
        }

        session::harden_session(&config, deployment, session);

        let plan = configurator::configure(&config, &mut engine)?;

        let masquerade = masquerade::masquerade(&config);

        debug!(
            version = %plan.setup.version,
            masquerade = masquerade.is_some(),
            "CAS gateway ready"
        );

        Ok(Self {
            state: State::Active(Active {
                config,
                plan,
                engine,
                masquerade,
            }),
        })
    }

    /// True when the bot gate vetoed this request.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        matches!(self.state, State::Inert)
    }

    #[must_use]
    pub fn config(&self) -> Option<&Config> {
        self.active().map(|active| &active.config)
    }

    /// What the engine was configured with.
    #[must_use]
    pub fn plan(&self) -> Option<&Plan> {
        self.active().map(|active| &active.plan)
    }

    #[must_use]
    pub fn engine(&self) -> Option<&E> {
        self.active().map(|active| &active.engine)
    }

    /// The masquerade identity, if one is active.
    #[must_use]
    pub fn masquerade(&self) -> Option<&str> {
        self.active()?.masquerade.as_deref()
    }

    /// Login endpoint of the identity server, e.g. for a "Log in" link.
    #[must_use]
    pub fn login_url(&self) -> Option<String> {
        self.active().map(|active| active.engine.server_login_url())
    }

    /// Logout endpoint of the identity server.
    #[must_use]
    pub fn logout_url(&self) -> Option<String> {
        self.active().map(|active| active.engine.server_logout_url())
    }

    /// Forward an engine operation the gateway does not model.
    ///
    /// # Errors
    /// Returns [`super::Error::MethodNotSupported`] if the engine does not know `method`.
    pub fn call(&mut self, method: &str, args: &[Value]) -> Result<Value> {
        match self.active_mut() {
            Some(active) => active.engine.call(method, args),
            None => Ok(Value::Null),
        }
    }

    /// Server-initiated (SAML) logout. The source host is checked against the
    /// allowlist before the payload reaches the engine.
    ///
    /// # Errors
    /// Returns [`super::Error::UnauthorizedLogoutSource`] for hosts outside the
    /// allowlist, or the engine's error if it rejects the payload.
    #[instrument(skip(self, payload))]
    pub fn logout_notification(&mut self, source_host: &str, payload: &str) -> Result<()> {
        let Some(active) = self.active_mut() else {
            return Ok(());
        };

        let Some(policy) = &active.plan.logout_policy else {
            debug!("SAML logout not enabled, ignoring logout request");
            return Ok(());
        };
        policy.authorize(source_host)?;

        active.engine.logout_notification(payload)
    }

    pub(super) fn active(&self) -> Option<&Active<E>> {
        match &self.state {
            State::Active(active) => Some(active),
            State::Inert => None,
        }
    }

    pub(super) fn active_mut(&mut self) -> Option<&mut Active<E>> {
        match &mut self.state {
            State::Active(active) => Some(active),
            State::Inert => None,
        }
    }
}
