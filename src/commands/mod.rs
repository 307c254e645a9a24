//! Subcommand implementations shared by the `gempipe` and `gemask` binaries.

use owo_colors::{OwoColorize, Stream};

/// `config check`.
pub mod config;
/// Raw prompt generation.
pub mod generate;
/// Tool subcommands and the `tools` listing.
pub mod tool;

mod shared;

pub use shared::ConnectionArgs;

/// Prints a fatal command error to stderr with an `error:` prefix.
pub fn report_error(message: &str) {
    eprintln!(
        "{} {message}",
        "error:".if_supports_color(Stream::Stderr, |text| text.red())
    );
}
