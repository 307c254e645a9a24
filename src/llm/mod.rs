//! Authenticated access to the remote generation endpoint.
//!
//! [`GenerationClient`] performs one `POST /api/generate` round trip per
//! call and reports the outcome as a typed result. [`CredentialProvider`]
//! attaches a service identity token when the ambient environment can
//! provide one.

/// Generation client, request and response types.
pub mod client;
/// Identity token sources and header construction.
pub mod credentials;
pub(crate) mod runtime;

pub use client::{
    ClientConfig, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS, Generation,
    GenerationError, GenerationErrorKind, GenerationClient, NO_RESPONSE_PLACEHOLDER, Usage,
};
pub use credentials::{CredentialError, CredentialProvider, IdentitySource, MetadataIdentity};
pub use runtime::RetryConfig;
