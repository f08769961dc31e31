//! CAS gateway core.
//!
//! Flow Overview: [`Cas::new`] runs the bot gate, hardens the session cookie,
//! configures the protocol engine and finally applies the masquerade override.
//! Request-time operations live in [`auth`] (authentication decisions) and
//! [`logout`] (session teardown).

pub mod auth;
pub mod bot;
pub mod config;
pub mod configurator;
pub mod error;
pub mod logout;
pub mod masquerade;
pub mod protocol;
pub mod recording;
pub mod request;
pub mod session;

mod gateway;

pub use self::auth::AuthOutcome;
pub use self::config::{Config, Deployment};
pub use self::configurator::Plan;
pub use self::error::{Error, Result};
pub use self::gateway::Cas;
pub use self::protocol::{
    Authentication, ClientSetup, LogoutParams, LogoutPolicy, Mode, ProtocolEngine, Redirect,
    ServerValidation, VersionToken,
};
pub use self::recording::RecordingEngine;
pub use self::request::RequestContext;
pub use self::session::{CookieParams, MemorySessionStore, SessionStore};
