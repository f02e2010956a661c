//! Policy Decision Point contract.
//!
//! The PDP is an external engine. It receives a fully built
//! [`EvaluationContext`] and returns one [`DecisionResult`] per evaluated
//! resource/action. It resolves policies and descendant resources through the
//! [`PolicyResolver`] and [`ResourceResolver`] backends handed to its
//! [`PdpFactory`] at startup.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::PdpError;
use crate::finder::EvaluationContext;
use crate::models::{DecisionResult, Status};
use crate::policy::{PolicyDocument, PolicyKind};

/// Outcome of matching a policy target against a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMatch {
    Match,
    NoMatch,
    Indeterminate(Status),
}

/// Target matching, provided by the evaluation engine.
pub trait TargetMatcher {
    fn match_target(&self, policy: &PolicyDocument, ctx: &EvaluationContext) -> TargetMatch;
}

/// Outcome of a policy lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyFinderResult {
    NotApplicable,
    Indeterminate(Status),
    Found(Arc<PolicyDocument>),
}

impl PolicyFinderResult {
    #[must_use]
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }

    #[must_use]
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Indeterminate(_))
    }

    #[must_use]
    pub fn policy(&self) -> Option<&PolicyDocument> {
        match self {
            Self::Found(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Policy lookup backend used by the PDP.
pub trait PolicyResolver: Send + Sync {
    /// Find the policy governing the request's resource.
    fn find_policy(&self, ctx: &EvaluationContext, matcher: &dyn TargetMatcher)
    -> PolicyFinderResult;

    /// Resolve a cross-referenced policy by id.
    ///
    /// Must be safe to call while another policy of the same request is
    /// being evaluated.
    fn find_policy_by_id(&self, id: &str, kind: PolicyKind) -> PolicyFinderResult;
}

/// Resource ids found below a parent, plus per-resource failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFinderResult {
    pub resources: BTreeSet<String>,
    pub failures: BTreeMap<String, Status>,
}

impl ResourceFinderResult {
    #[must_use]
    pub fn failed(resource_id: impl Into<String>, status: Status) -> Self {
        let resource_id = resource_id.into();
        let mut failures = BTreeMap::new();
        failures.insert(resource_id.clone(), status.for_resource(resource_id));
        Self {
            resources: BTreeSet::new(),
            failures,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.failures.is_empty()
    }
}

/// Child/descendant enumeration backend used by the PDP for scoped requests.
pub trait ResourceResolver: Send + Sync {
    fn is_child_supported(&self) -> bool {
        true
    }

    fn is_descendant_supported(&self) -> bool {
        true
    }

    fn find_child_resources(&self, parent_id: &str) -> ResourceFinderResult;

    fn find_descendant_resources(&self, parent_id: &str) -> ResourceFinderResult;
}

/// Backends wired into the PDP at construction.
#[derive(Clone)]
pub struct PdpBackends {
    pub policy_finder: Arc<dyn PolicyResolver>,
    pub resource_finder: Arc<dyn ResourceResolver>,
}

impl std::fmt::Debug for PdpBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdpBackends").finish_non_exhaustive()
    }
}

/// The decision engine.
///
/// Constructed once at startup and shared across concurrent checks.
pub trait PolicyDecisionPoint: Send + Sync {
    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<DecisionResult>;
}

/// Builds the decision engine.
pub trait PdpFactory: Send + Sync {
    /// # Errors
    ///
    /// [`PdpError`] if no engine can be produced; callers must abort startup.
    fn make_pdp(&self, backends: PdpBackends) -> Result<Arc<dyn PolicyDecisionPoint>, PdpError>;
}
