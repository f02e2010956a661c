//! Resource `AuthZ` Module
//!
//! Decides whether a principal may perform actions on a node of a
//! hierarchical resource store. The policy governing a node is the one
//! assigned to its nearest ancestor (itself included); rule evaluation is
//! delegated to an external policy decision point, and its per-action results
//! are combined fail-closed.
//!
//! ```text
//! AuthorizationDelegate
//!   -> EvaluationContextBuilder (+ finder chain)
//!   -> PolicyDecisionPoint
//!        -> HierarchicalPolicyFinder / DescendantResourceFinder
//!   -> aggregate
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod finders;

pub use config::{BootstrapConfig, ConfigError, ResourceAuthzConfig};
pub use domain::{
    AuthorizationDelegate, AuthzSession, BootstrapError, DelegateError, EvaluationContextBuilder,
    RolesProvider, WorkspaceInitializer,
};
