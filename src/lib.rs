//! # Casgate (CAS Single Sign-On Session Gateway)
//!
//! `casgate` sits in front of an application and speaks the client side of the
//! Central Authentication Service (CAS) protocol. It redirects unauthenticated
//! users to the identity server, lets the protocol engine validate the returned
//! service ticket, establishes the local session and later tears it down.
//!
//! ## Construction
//!
//! A [`cas::Cas`] gateway is built once per inbound request:
//!
//! 1. **Bot gate:** known crawler `User-Agent`s turn the gateway inert; every
//!    later operation is a no-op and the protocol engine is never touched.
//! 2. **Session hardening:** session name and cookie attributes are applied
//!    while the session store has not been started yet.
//! 3. **Protocol configuration:** mode, version token, endpoints, TLS trust
//!    policy and the SAML logout allowlist are pushed into the engine.
//! 4. **Masquerade:** a configured dummy identity dominates every later
//!    authentication decision.
//!
//! ## Protocol Engine
//!
//! Ticket validation, XML parsing and HTTP transport belong to the protocol
//! engine, consumed through the [`cas::ProtocolEngine`] capability. The crate
//! ships [`cas::RecordingEngine`], an in-memory engine used for configuration
//! dry runs and tests.

pub mod cas;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
