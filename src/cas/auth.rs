//! Authentication decisions for the current request.
//!
//! Every decision consults the masquerade override first; only then is the
//! protocol engine asked. An inert (crawler) gateway answers with
//! [`AuthOutcome::Bypassed`] and never reaches the engine.
//!
//! POST requests are checked locally only. A full protocol check could bounce
//! a form submission through the identity server and lose the body, so the
//! gateway accepts that a login performed on another site between page render
//! and submit is not noticed until the next non-POST request.

use tracing::{debug, instrument};

use super::{
    error::{Error, Result},
    gateway::Cas,
    protocol::{Authentication, ProtocolEngine, Redirect},
    request::RequestContext,
};

/// Authentication state derived for one call. Never cached.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthOutcome {
    Unauthenticated,
    Authenticated(String),
    /// Send the user to the identity server; nothing else may be written.
    MustRedirect(Redirect),
    /// Crawler request, CAS was skipped.
    Bypassed,
}

impl AuthOutcome {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Whether the application may serve the request.
    #[must_use]
    pub fn allows_request(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::Bypassed)
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

fn outcome<E: ProtocolEngine>(engine: &E, authentication: Authentication) -> AuthOutcome {
    match authentication {
        Authentication::Authenticated => engine
            .user()
            .map_or(AuthOutcome::Unauthenticated, AuthOutcome::Authenticated),
        Authentication::Unauthenticated => AuthOutcome::Unauthenticated,
        Authentication::Redirect(redirect) => AuthOutcome::MustRedirect(redirect),
    }
}

impl<E: ProtocolEngine> Cas<E> {
    /// Force authentication, redirecting to the identity server when needed.
    ///
    /// # Errors
    /// Returns the engine's error if ticket validation cannot be performed.
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub fn authenticate(&mut self, request: &RequestContext) -> Result<AuthOutcome> {
        let Some(active) = self.active_mut() else {
            return Ok(AuthOutcome::Bypassed);
        };

        if let Some(user) = &active.masquerade {
            return Ok(AuthOutcome::Authenticated(user.clone()));
        }

        let authentication = active.engine.force_authentication(request)?;
        Ok(outcome(&active.engine, authentication))
    }

    /// Check whether the user is globally logged in to CAS.
    ///
    /// # Errors
    /// Returns the engine's error if ticket validation cannot be performed.
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub fn check_authentication(&mut self, request: &RequestContext) -> Result<AuthOutcome> {
        let Some(active) = self.active_mut() else {
            return Ok(AuthOutcome::Bypassed);
        };

        if let Some(user) = &active.masquerade {
            return Ok(AuthOutcome::Authenticated(user.clone()));
        }

        if request.is_post() {
            debug!("POST request, local authentication check only");
            let authentication = if active.engine.is_authenticated() {
                Authentication::Authenticated
            } else {
                Authentication::Unauthenticated
            };
            return Ok(outcome(&active.engine, authentication));
        }

        let authentication = active.engine.check_authentication(request)?;
        Ok(outcome(&active.engine, authentication))
    }

    /// Local check; never contacts the identity server.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        match self.active() {
            Some(active) if active.masquerade.is_some() => true,
            Some(active) => active.engine.is_authenticated(),
            None => false,
        }
    }

    /// The authenticated identity: the masquerade user or the CAS user.
    ///
    /// # Errors
    /// Returns [`Error::NotAuthenticated`] when nobody is authenticated.
    pub fn user(&self) -> Result<String> {
        let active = self.active().ok_or(Error::NotAuthenticated)?;

        if let Some(user) = &active.masquerade {
            return Ok(user.clone());
        }

        active.engine.user().ok_or(Error::NotAuthenticated)
    }
}
