//! Error types for the resource authorization SDK.

use thiserror::Error;

/// Infrastructure failures of the resource store.
///
/// A missing node or property is not an error; lookups report it as
/// `Ok(None)` so callers can fall back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No session could be obtained.
    #[error("store session unavailable: {0}")]
    Unavailable(String),

    /// A repository operation faulted.
    #[error("repository error: {0}")]
    Repository(String),
}

/// A policy document could not be loaded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyLoadError {
    /// The document is not well-formed XML.
    #[error("malformed policy document: {0}")]
    Malformed(String),

    /// The root element is neither `Policy` nor `PolicySet`.
    #[error("unrecognized policy root element '{0}'")]
    UnknownRoot(String),

    /// The root element carries no identifier.
    #[error("policy document has no identifier")]
    MissingId,
}

/// A policy id does not carry the expected scheme prefix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyIdError {
    #[error("policy id '{id}' does not start with '{prefix}'")]
    MissingPrefix { id: String, prefix: String },
}

/// The PDP factory could not produce a decision engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PdpError {
    #[error("policy decision point unavailable: {0}")]
    Unavailable(String),

    #[error("invalid policy decision point configuration: {0}")]
    Configuration(String),
}
