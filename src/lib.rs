//! Agent tools backed by a remotely hosted Gemma generation endpoint.
//!
//! The library exposes the authenticated generation client, the tool
//! wrappers built on top of it, and the configuration and CLI layers used by
//! the `gempipe` and `gemask` binaries.

/// CLI command implementations.
pub mod commands;
/// Profile, environment and flag resolution.
pub mod config;
/// Generation client and identity credentials.
pub mod llm;
/// Tracing subscriber setup for the binaries.
pub mod logging;
/// Tool wrappers and their declarations.
pub mod tools;

/// Version string with build metadata, shared by both binaries.
pub const VERSION_INFO: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("GP_GIT_SHA"),
    "\nbuilt: ",
    env!("GP_BUILD_TS"),
);
