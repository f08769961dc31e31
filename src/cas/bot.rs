//! Pre-authentication gate for crawler traffic.
//!
//! Known crawlers are never sent to the identity server. The denylist is plain
//! data; extend [`SPIDERS`] to recognise more agents.

use std::sync::OnceLock;
use tracing::debug;

/// Crawler identity tokens, matched case-insensitively as substrings.
pub const SPIDERS: &[&str] = &[
    "Googlebot",
    "msnbot",
    "Baiduspider",
    "bingbot",
    "Sogou web spider",
    "Sogou inst spider",
    "Sogou Pic Spider",
    "JikeSpider",
    "Sosospider",
    "Slurp",
    "360Spider",
    "YodaoBot",
    "OutfoxBot",
    "fast-webcrawler",
    "lycos_spider",
    "scooter",
    "ia_archiver",
    "MJ12bot",
    "AhrefsBot",
    "Yisouspider",
];

fn lowercase_spiders() -> &'static [String] {
    static SPIDERS_LOWER: OnceLock<Vec<String>> = OnceLock::new();
    SPIDERS_LOWER.get_or_init(|| SPIDERS.iter().map(|spider| spider.to_lowercase()).collect())
}

/// Returns `false` when the `User-Agent` belongs to a known crawler.
///
/// A missing or empty header counts as a real user.
#[must_use]
pub fn is_likely_real_user(user_agent: Option<&str>) -> bool {
    let Some(agent) = user_agent.filter(|agent| !agent.is_empty()) else {
        return true;
    };

    let lowered = agent.to_lowercase();
    let matched = lowercase_spiders()
        .iter()
        .any(|spider| lowered.contains(spider.as_str()));

    if matched {
        debug!(user_agent = agent, "crawler detected, skipping CAS");
    }

    !matched
}
