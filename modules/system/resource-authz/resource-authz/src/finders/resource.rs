//! Child and descendant resource finder.

use std::sync::Arc;

use resource_authz_sdk::{
    Node, ResourceFinderResult, ResourceResolver, ResourceStore, Status, StoreError, StoreSession,
};

use crate::config::ResourceAuthzConfig;

/// Enumerates the resources below a parent so the PDP can evaluate scoped
/// requests (such as a recursive remove) against every affected node.
///
/// Store-internal children, identified by name or node type, are neither
/// reported nor descended into.
pub struct DescendantResourceFinder {
    store: Arc<dyn ResourceStore>,
    excluded_child_names: Vec<String>,
    excluded_node_types: Vec<String>,
}

impl DescendantResourceFinder {
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, cfg: &ResourceAuthzConfig) -> Self {
        Self {
            store,
            excluded_child_names: cfg.excluded_child_names.clone(),
            excluded_node_types: cfg.excluded_node_types.clone(),
        }
    }

    fn is_excluded(&self, node: &Node) -> bool {
        self.excluded_child_names.iter().any(|n| n == node.name())
            || self
                .excluded_node_types
                .iter()
                .any(|t| node.is_node_type(t))
    }

    fn visible_children(
        &self,
        session: &dyn StoreSession,
        node: &Node,
    ) -> Result<Vec<Node>, StoreError> {
        Ok(session
            .children(node)?
            .into_iter()
            .filter(|child| !self.is_excluded(child))
            .collect())
    }

    fn collect(&self, parent_id: &str, recursive: bool) -> Result<Vec<String>, StoreError> {
        let session = self.store.internal_session()?;
        let Some(parent) = session.node(parent_id)? else {
            tracing::debug!(parent_id, "Parent resource does not exist");
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        let mut pending = vec![parent];
        while let Some(node) = pending.pop() {
            for child in self.visible_children(session.as_ref(), &node)? {
                found.push(child.path.clone());
                if recursive {
                    pending.push(child);
                }
            }
        }
        Ok(found)
    }

    fn result(&self, parent_id: &str, recursive: bool) -> ResourceFinderResult {
        match self.collect(parent_id, recursive) {
            Ok(found) => {
                tracing::debug!(parent_id, recursive, count = found.len(), "Resources found");
                ResourceFinderResult {
                    resources: found.into_iter().collect(),
                    ..ResourceFinderResult::default()
                }
            }
            Err(e) => {
                tracing::warn!(parent_id, error = %e, "Resource enumeration failed");
                ResourceFinderResult::failed(parent_id, Status::processing_error(e.to_string()))
            }
        }
    }
}

impl ResourceResolver for DescendantResourceFinder {
    fn find_child_resources(&self, parent_id: &str) -> ResourceFinderResult {
        self.result(parent_id, false)
    }

    fn find_descendant_resources(&self, parent_id: &str) -> ResourceFinderResult {
        self.result(parent_id, true)
    }
}

impl std::fmt::Debug for DescendantResourceFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescendantResourceFinder")
            .field("excluded_child_names", &self.excluded_child_names)
            .field("excluded_node_types", &self.excluded_node_types)
            .finish_non_exhaustive()
    }
}
