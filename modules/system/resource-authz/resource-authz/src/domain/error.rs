//! Domain errors for the resource `AuthZ` module.
//!
//! Only startup paths fail with these; per-request failures become a
//! [`resource_authz_sdk::Status`] on the affected result.

use std::path::PathBuf;

use resource_authz_sdk::{PdpError, PolicyIdError, PolicyLoadError, StoreError};

/// The authorization delegate could not be constructed.
#[derive(thiserror::Error, Debug)]
pub enum DelegateError {
    #[error("cannot initialize authorization delegate: {0}")]
    PdpUnavailable(#[source] PdpError),
}

/// Default policies could not be loaded.
#[derive(thiserror::Error, Debug)]
pub enum BootstrapError {
    #[error("policies directory '{}' does not exist", .0.display())]
    PoliciesDirMissing(PathBuf),

    #[error("policies directory '{}' contains no policy files", .0.display())]
    PoliciesDirEmpty(PathBuf),

    #[error("root policy file '{}' does not exist", .0.display())]
    RootPolicyMissing(PathBuf),

    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy file '{}': {source}", path.display())]
    Policy {
        path: PathBuf,
        #[source]
        source: PolicyLoadError,
    },

    #[error(transparent)]
    PolicyId(#[from] PolicyIdError),

    #[error("store error during bootstrap: {0}")]
    Store(#[from] StoreError),
}
