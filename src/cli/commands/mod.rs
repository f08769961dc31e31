pub mod cas;
pub mod deployment;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_USER_AGENT: &str = "user-agent";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("casgate")
        .about("CAS single sign-on session gateway")
        .long_about(
            "Resolves the CAS gateway configuration, runs the full construction sequence \
             against a recording engine and prints the resulting plan as JSON.",
        )
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_USER_AGENT)
                .long(ARG_USER_AGENT)
                .help("User-Agent of the simulated request, to try the bot gate"),
        );

    let command = cas::with_args(command);
    let command = deployment::with_args(command);
    logging::with_args(command)
}
