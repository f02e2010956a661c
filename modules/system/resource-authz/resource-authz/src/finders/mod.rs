//! Attribute, policy and resource finder modules.

pub mod current_env;
pub mod policy;
pub mod query;
pub mod resource;
pub mod triple;

pub use current_env::CurrentEnvFinder;
pub use policy::HierarchicalPolicyFinder;
pub use query::StoreQueryFinder;
pub use resource::DescendantResourceFinder;
pub use triple::TripleAttributeFinder;

use resource_authz_sdk::{Node, StoreError, StoreSession, path};

/// The nearest existing node for a possibly property-qualified path, falling
/// back to the root when none exists. Never fails for a missing node.
pub(crate) fn first_real_node(session: &dyn StoreSession, raw: &str) -> Result<Node, StoreError> {
    for candidate in path::real_node_candidates(raw) {
        if let Some(node) = session.node(candidate)? {
            return Ok(node);
        }
    }
    session.root_node()
}

/// Like [`first_real_node`], but only falls back to the root when the path
/// addresses a root property; a missing node yields `None`.
pub(crate) fn existing_node(
    session: &dyn StoreSession,
    raw: &str,
) -> Result<Option<Node>, StoreError> {
    for candidate in path::real_node_candidates(raw) {
        if let Some(node) = session.node(candidate)? {
            return Ok(Some(node));
        }
    }
    if path::is_root(path::property_stem(raw)) {
        return session.root_node().map(Some);
    }
    Ok(None)
}
