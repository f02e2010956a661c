//! Hierarchical policy finder.
//!
//! The governing policy of a resource is the one assigned to the nearest node
//! on the path from the resource up to the root. Assignment is a reference
//! property on the node; the referenced node's content is the policy document.

use std::sync::Arc;

use dashmap::DashMap;
use resource_authz_sdk::{
    EvaluationContext, PolicyDocument, PolicyFinderResult, PolicyIdMapper, PolicyKind,
    PolicyLoadError, PolicyResolver, PropertyValue, ResourceStore, Status, StoreError,
    StoreSession, TargetMatch, TargetMatcher,
};
use xxhash_rust::xxh3::xxh3_64;

use super::first_real_node;
use crate::config::ResourceAuthzConfig;

/// Why a policy could not be produced.
#[derive(Debug)]
enum LoadFailure {
    Store(StoreError),
    Parse(PolicyLoadError),
}

impl From<StoreError> for LoadFailure {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Parsed policies keyed by store path, invalidated when the content changes.
#[derive(Debug, Default)]
struct PolicyCache {
    entries: DashMap<String, (u64, Arc<PolicyDocument>)>,
}

impl PolicyCache {
    fn get_or_parse(&self, path: &str, content: &[u8]) -> Result<Arc<PolicyDocument>, PolicyLoadError> {
        let fingerprint = xxh3_64(content);
        if let Some(entry) = self.entries.get(path)
            && entry.0 == fingerprint
        {
            return Ok(Arc::clone(&entry.1));
        }
        let doc = Arc::new(PolicyDocument::parse(content)?.with_source_path(path));
        self.entries
            .insert(path.to_owned(), (fingerprint, Arc::clone(&doc)));
        Ok(doc)
    }
}

/// Finds the policy governing a resource by walking the store hierarchy, and
/// resolves policy references by id.
pub struct HierarchicalPolicyFinder {
    store: Arc<dyn ResourceStore>,
    mapper: PolicyIdMapper,
    policy_property: String,
    cache: Option<PolicyCache>,
}

impl HierarchicalPolicyFinder {
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, cfg: &ResourceAuthzConfig) -> Self {
        Self {
            store,
            mapper: PolicyIdMapper::new(cfg.policy_uri_prefix.clone()),
            policy_property: cfg.policy_property.clone(),
            cache: cfg.policy_cache.then(PolicyCache::default),
        }
    }

    /// Walk up from the nearest real node of `resource_id` to the first node
    /// with an assigned policy, and load that policy.
    fn governing_policy(
        &self,
        session: &dyn StoreSession,
        resource_id: &str,
    ) -> Result<Option<Arc<PolicyDocument>>, LoadFailure> {
        let mut node = first_real_node(session, resource_id)?;
        loop {
            if let Some(assigned) = session.property(&node, &self.policy_property)? {
                let policy_path = self.policy_path(&assigned);
                tracing::debug!(
                    resource_id,
                    governing_node = %node.path,
                    policy_path = %policy_path,
                    "Found assigned policy"
                );
                return self.load(session, &policy_path);
            }
            match session.parent(&node)? {
                Some(parent) => node = parent,
                None => {
                    tracing::warn!(resource_id, "No policy assigned anywhere up to the root");
                    return Ok(None);
                }
            }
        }
    }

    /// Store path of an assigned-policy property value.
    fn policy_path(&self, assigned: &PropertyValue) -> String {
        let raw = match assigned {
            PropertyValue::Reference(p) | PropertyValue::String(p) | PropertyValue::Uri(p) => {
                p.as_str()
            }
            other => return other.lexical(),
        };
        self.mapper.path_for_id(raw).unwrap_or(raw).to_owned()
    }

    fn load(
        &self,
        session: &dyn StoreSession,
        policy_path: &str,
    ) -> Result<Option<Arc<PolicyDocument>>, LoadFailure> {
        let Some(content) = session.content(policy_path)? else {
            tracing::warn!(policy_path, "Assigned policy has no content");
            return Ok(None);
        };
        let doc = match &self.cache {
            Some(cache) => cache.get_or_parse(policy_path, &content),
            None => PolicyDocument::parse(&content)
                .map(|d| Arc::new(d.with_source_path(policy_path))),
        };
        doc.map(Some).map_err(LoadFailure::Parse)
    }

    fn session(&self) -> Option<Arc<dyn StoreSession>> {
        self.store
            .internal_session()
            .inspect_err(|e| tracing::warn!(error = %e, "Cannot open store session for policy lookup"))
            .ok()
    }
}

impl PolicyResolver for HierarchicalPolicyFinder {
    #[tracing::instrument(skip_all, fields(resource_id = %ctx.resource_id()))]
    fn find_policy(
        &self,
        ctx: &EvaluationContext,
        matcher: &dyn TargetMatcher,
    ) -> PolicyFinderResult {
        let Some(session) = self.session() else {
            return PolicyFinderResult::NotApplicable;
        };

        let doc = match self.governing_policy(session.as_ref(), ctx.resource_id()) {
            Ok(Some(doc)) => doc,
            Ok(None) => return PolicyFinderResult::NotApplicable,
            Err(LoadFailure::Store(e)) => {
                tracing::warn!(error = %e, "Policy lookup failed");
                return PolicyFinderResult::NotApplicable;
            }
            Err(LoadFailure::Parse(e)) => {
                tracing::warn!(error = %e, "Assigned policy is malformed");
                return PolicyFinderResult::Indeterminate(
                    Status::processing_error(e.to_string()).for_resource(ctx.resource_id()),
                );
            }
        };

        match matcher.match_target(&doc, ctx) {
            TargetMatch::Match => PolicyFinderResult::Found(doc),
            TargetMatch::NoMatch => {
                tracing::debug!(policy_id = %doc.id, "Policy target does not match request");
                PolicyFinderResult::NotApplicable
            }
            TargetMatch::Indeterminate(status) => PolicyFinderResult::Indeterminate(status),
        }
    }

    #[tracing::instrument(skip(self))]
    fn find_policy_by_id(&self, id: &str, kind: PolicyKind) -> PolicyFinderResult {
        let policy_path = match self.mapper.path_for_id(id) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected policy reference");
                return PolicyFinderResult::Indeterminate(Status::syntax_error(e.to_string()));
            }
        };
        let Some(session) = self.session() else {
            return PolicyFinderResult::NotApplicable;
        };

        match self.load(session.as_ref(), policy_path) {
            Ok(Some(doc)) if doc.kind == kind => PolicyFinderResult::Found(doc),
            Ok(Some(doc)) => {
                tracing::debug!(found = ?doc.kind, "Referenced document is of another kind");
                PolicyFinderResult::NotApplicable
            }
            Ok(None) => PolicyFinderResult::NotApplicable,
            Err(LoadFailure::Store(e)) => {
                tracing::warn!(error = %e, "Policy reference lookup failed");
                PolicyFinderResult::NotApplicable
            }
            Err(LoadFailure::Parse(e)) => {
                PolicyFinderResult::Indeterminate(Status::processing_error(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for HierarchicalPolicyFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchicalPolicyFinder")
            .field("mapper", &self.mapper)
            .field("policy_property", &self.policy_property)
            .field("cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}
