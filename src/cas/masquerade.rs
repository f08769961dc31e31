use tracing::info;

use super::config::Config;

/// Fixed identity that replaces CAS for every authentication decision.
///
/// Only meant for development and tests; the protocol engine is never asked
/// about identity while a masquerade is active.
#[must_use]
pub fn masquerade(config: &Config) -> Option<String> {
    let user = config
        .mask_dummy_user
        .as_deref()
        .map(str::trim)
        .filter(|user| !user.is_empty())?;

    info!(user, "Masquerading as user");

    Some(user.to_string())
}
