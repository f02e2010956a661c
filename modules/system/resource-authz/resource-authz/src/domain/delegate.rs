//! Authorization delegate.
//!
//! The entry point of an authorization check: builds the evaluation context,
//! hands it to the policy decision point and folds the returned results into
//! one allow/deny answer.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use resource_authz_sdk::{
    AttributeFinder, DecisionResult, PdpBackends, PdpFactory, PolicyDecisionPoint, ResourceStore,
    StoreSession,
};

use super::builder::EvaluationContextBuilder;
use super::error::DelegateError;
use crate::config::ResourceAuthzConfig;
use crate::finders::{
    CurrentEnvFinder, DescendantResourceFinder, HierarchicalPolicyFinder, StoreQueryFinder,
    TripleAttributeFinder,
};

/// The identity and store session a check runs under.
///
/// The store session is request scoped and must not be shared between
/// concurrent checks.
#[derive(Clone)]
pub struct AuthzSession {
    principal: String,
    groups: Vec<String>,
    remote_addr: Option<String>,
    store: Arc<dyn StoreSession>,
}

impl AuthzSession {
    #[must_use]
    pub fn new(principal: impl Into<String>, store: Arc<dyn StoreSession>) -> Self {
        Self {
            principal: principal.into(),
            groups: Vec::new(),
            remote_addr: None,
            store,
        }
    }

    /// Additional principals (groups) the user holds.
    #[must_use]
    pub fn with_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// The user principal followed by its groups.
    pub fn principals(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.principal.as_str()).chain(self.groups.iter().map(String::as_str))
    }

    #[must_use]
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    #[must_use]
    pub fn workspace(&self) -> &str {
        self.store.workspace_name()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn StoreSession> {
        &self.store
    }
}

impl std::fmt::Debug for AuthzSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthzSession")
            .field("principal", &self.principal)
            .field("groups", &self.groups)
            .field("remote_addr", &self.remote_addr)
            .field("workspace", &self.workspace())
            .finish_non_exhaustive()
    }
}

/// Computes the roles each principal holds at a path, typically by walking
/// access-control assignments.
pub trait RolesProvider: Send + Sync {
    fn roles_for_path(
        &self,
        path: &str,
        session: &dyn StoreSession,
    ) -> BTreeMap<String, Vec<String>>;
}

/// Union of the roles of every session principal and of the everyone
/// principal.
#[must_use]
pub fn effective_roles<'a>(
    roles_by_principal: &BTreeMap<String, Vec<String>>,
    principals: impl IntoIterator<Item = &'a str>,
    everyone_principal: &'a str,
) -> BTreeSet<String> {
    principals
        .into_iter()
        .chain(std::iter::once(everyone_principal))
        .filter_map(|p| roles_by_principal.get(p))
        .flatten()
        .cloned()
        .collect()
}

/// Fail-closed combination of PDP results: permitted only when there is at
/// least one result and every result is a Permit.
///
/// An empty result set denies. Engines that answer nothing have not
/// evaluated anything, so this departs from permit-unless-denied folding.
#[must_use]
pub fn aggregate(results: &[DecisionResult]) -> bool {
    for result in results.iter().filter(|r| !r.is_permit()) {
        tracing::debug!(
            decision = ?result.decision,
            resource_id = result.resource_id.as_deref().unwrap_or_default(),
            status = ?result.status,
            "Result does not permit"
        );
    }
    !results.is_empty() && results.iter().all(DecisionResult::is_permit)
}

/// Decides whether a principal may perform actions on a resource.
pub struct AuthorizationDelegate {
    pdp: Arc<dyn PolicyDecisionPoint>,
    finders: Vec<Arc<dyn AttributeFinder>>,
    remove_action: String,
    everyone_principal: String,
    dump_requests: bool,
}

impl AuthorizationDelegate {
    /// Wire the policy and descendant finders into a PDP and build the
    /// attribute finder chain.
    ///
    /// # Errors
    ///
    /// [`DelegateError::PdpUnavailable`] if the factory produces no engine.
    /// Callers must abort startup.
    pub fn new(
        cfg: &ResourceAuthzConfig,
        store: &Arc<dyn ResourceStore>,
        factory: &dyn PdpFactory,
    ) -> Result<Self, DelegateError> {
        let backends = PdpBackends {
            policy_finder: Arc::new(HierarchicalPolicyFinder::new(Arc::clone(store), cfg)),
            resource_finder: Arc::new(DescendantResourceFinder::new(Arc::clone(store), cfg)),
        };
        let pdp = factory.make_pdp(backends).map_err(|e| {
            tracing::error!(error = %e, "Policy decision point could not be created");
            DelegateError::PdpUnavailable(e)
        })?;

        // Priority order: clock, store query, then the graph catch-all.
        let finders: Vec<Arc<dyn AttributeFinder>> = vec![
            Arc::new(CurrentEnvFinder),
            Arc::new(StoreQueryFinder),
            Arc::new(TripleAttributeFinder::new(cfg.parent_addressed_actions.clone())),
        ];

        tracing::info!(
            finders = finders.len(),
            policy_cache = cfg.policy_cache,
            "Policy decision point initialized"
        );

        Ok(Self {
            pdp,
            finders,
            remove_action: cfg.remove_action.clone(),
            everyone_principal: cfg.everyone_principal.clone(),
            dump_requests: cfg.dump_requests,
        })
    }

    /// Decide with a caller-computed effective role set.
    #[must_use]
    #[tracing::instrument(
        skip_all,
        fields(principal = %session.principal(), path = %path, actions = ?actions)
    )]
    pub fn roles_have_permission(
        &self,
        session: &AuthzSession,
        path: &str,
        actions: &[&str],
        roles: &BTreeSet<String>,
    ) -> bool {
        let mut builder = self
            .finders
            .iter()
            .fold(EvaluationContextBuilder::new(), |b, f| b.finder(Arc::clone(f)))
            .remove_action(self.remove_action.as_str())
            .dump_requests(self.dump_requests)
            .session(Arc::clone(session.store()))
            .subject(session.principal(), roles)
            .resource_id(path)
            .workspace(session.workspace())
            .actions(actions);
        if let Some(addr) = session.remote_addr() {
            builder = builder.original_request_ip(addr);
        }
        let ctx = builder.build();

        let results = self.pdp.evaluate(&ctx);
        if self.dump_requests && tracing::enabled!(tracing::Level::DEBUG) {
            for result in &results {
                let dump = serde_json::to_string_pretty(result)
                    .unwrap_or_else(|e| format!("<unserializable result: {e}>"));
                tracing::debug!("Evaluation result dump:\n{dump}");
            }
        }

        let permitted = aggregate(&results);
        tracing::debug!(permitted, results = results.len(), "Authorization decided");
        permitted
    }

    /// Decide using the roles `roles` maps to the session's principals at
    /// `path`, plus those of the everyone principal.
    #[must_use]
    pub fn has_permission(
        &self,
        session: &AuthzSession,
        path: &str,
        actions: &[&str],
        roles: &dyn RolesProvider,
    ) -> bool {
        let by_principal = roles.roles_for_path(path, session.store().as_ref());
        let effective = effective_roles(&by_principal, session.principals(), &self.everyone_principal);
        self.roles_have_permission(session, path, actions, &effective)
    }
}

impl std::fmt::Debug for AuthorizationDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationDelegate")
            .field("finders", &self.finders.iter().map(|f| f.name()).collect::<Vec<_>>())
            .field("remove_action", &self.remove_action)
            .field("everyone_principal", &self.everyone_principal)
            .field("dump_requests", &self.dump_requests)
            .finish_non_exhaustive()
    }
}
