#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Resource `AuthZ` SDK
//!
//! Public contract of the `resource_authz` module:
//!
//! - [`attributes`] - typed attributes, bags, designators and selectors
//! - [`models`] - [`RequestContext`], [`Decision`], [`DecisionResult`], [`Status`]
//! - [`finder`] - [`AttributeFinder`] modules and the [`EvaluationContext`]
//! - [`pdp`] - [`PolicyDecisionPoint`], [`PdpFactory`] and their resolver backends
//! - [`policy`] - [`PolicyDocument`] classification and [`PolicyIdMapper`]
//! - [`store`] - the hierarchical [`ResourceStore`] collaborator
//! - [`path`] - store path helpers (parent trimming, property pseudo-segments)

pub mod attributes;
pub mod error;
pub mod finder;
pub mod models;
pub mod path;
pub mod pdp;
pub mod policy;
pub mod store;

// Re-export main types at crate root
pub use attributes::{
    Attribute, AttributeBag, AttributeDesignator, AttributeSelector, AttributeValue, DataType,
    DesignatorCategory, SCOPE_DESCENDANTS, ids,
};
pub use error::{PdpError, PolicyIdError, PolicyLoadError, StoreError};
pub use finder::{AttributeFinder, EvaluationContext, FinderResult};
pub use models::{Decision, DecisionResult, RequestContext, Status, StatusCode, Subject};
pub use pdp::{
    PdpBackends, PdpFactory, PolicyDecisionPoint, PolicyFinderResult, PolicyResolver,
    ResourceFinderResult, ResourceResolver, TargetMatch, TargetMatcher,
};
pub use policy::{
    DEFAULT_POLICY_URI_PREFIX, PolicyDocument, PolicyIdMapper, PolicyKind, policy_id_of,
};
pub use store::{
    AdminSession, GraphObject, GraphView, Node, PropertyValue, ResourceStore, StoreSession, Triple,
};
