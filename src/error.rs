//! Error taxonomy for the ingestion side of the system.
//!
//! [`SourceError`] covers everything a single adapter can fail with. These
//! errors are recovered locally (the pipeline substitutes synthetic fallback
//! content) and never propagate past the best-effort ingestion boundary.
//! Batch and top-level pipeline failures use `anyhow` at their call sites.

use thiserror::Error;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

// Hand-written Display/Error impls: `Payload::source` is a data field (the
// adapter name), not an error source, but thiserror's derive unconditionally
// treats any field named `source` as the error source and fails to compile.
#[derive(Debug)]
pub enum SourceError {
    Network(String),

    Payload { source: &'static str, message: String },

    MissingConfig(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Network(msg) => write!(f, "network error: {msg}"),
            SourceError::Payload { source, message } => {
                write!(f, "{source} returned an unexpected payload: {message}")
            }
            SourceError::MissingConfig(msg) => write!(f, "missing configuration: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

/// No onboarding context exists for the given user. Surfaced to callers as
/// a distinct "not started" outcome, not a generic failure.
#[derive(Debug, Error)]
#[error("no onboarding context for user {0}")]
pub struct ContextNotFound(pub String);

/// No such user.
#[derive(Debug, Error)]
#[error("no user with id {0}")]
pub struct UserNotFound(pub String);
