use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

/// How much the binaries log to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// `quiet` wins over `verbose`.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    fn default_directive(self) -> &'static str {
        match self {
            Self::Quiet => "off",
            Self::Normal => "gempipe=warn",
            Self::Verbose => "gempipe=debug",
        }
    }
}

/// Installs the global stderr subscriber.
///
/// `RUST_LOG` replaces the default filter unless `verbosity` is quiet.
pub fn init(verbosity: Verbosity) {
    let filter = match verbosity {
        Verbosity::Quiet => EnvFilter::new(verbosity.default_directive()),
        _ => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive())),
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .try_init();
}
