use clap::{builder::BoolishValueParser, Arg, ArgMatches, Command};

use crate::cas::Deployment;

pub const ARG_APP_DOMAIN: &str = "app-domain";
pub const ARG_HTTPS_ONLY_COOKIES: &str = "https-only-cookies";

#[must_use]
pub fn parse(matches: &ArgMatches) -> Deployment {
    Deployment {
        app_domain: matches
            .get_one::<String>(ARG_APP_DOMAIN)
            .map(|domain| domain.trim().to_string())
            .filter(|domain| !domain.is_empty()),
        https_only_cookies: matches
            .get_one::<bool>(ARG_HTTPS_ONLY_COOKIES)
            .copied()
            .unwrap_or(false),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_APP_DOMAIN)
                .long(ARG_APP_DOMAIN)
                .help("Session cookie domain")
                .env("APP_DOMAIN"),
        )
        .arg(
            Arg::new(ARG_HTTPS_ONLY_COOKIES)
                .long(ARG_HTTPS_ONLY_COOKIES)
                .help("Mark the session cookie Secure")
                .env("HTTPS_ONLY_COOKIES")
                .num_args(0..=1)
                .default_value("false")
                .default_missing_value("true")
                .value_parser(BoolishValueParser::new()),
        )
}
