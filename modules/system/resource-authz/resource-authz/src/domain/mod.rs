//! Domain layer for the resource `AuthZ` module.

pub mod bootstrap;
pub mod builder;
pub mod delegate;
pub mod error;

pub use bootstrap::WorkspaceInitializer;
pub use builder::EvaluationContextBuilder;
pub use delegate::{AuthorizationDelegate, AuthzSession, RolesProvider, aggregate, effective_roles};
pub use error::{BootstrapError, DelegateError};
