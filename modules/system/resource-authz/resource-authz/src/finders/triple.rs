//! Graph-backed resource attribute finder.

use resource_authz_sdk::{
    AttributeBag, AttributeDesignator, AttributeFinder, AttributeValue, DesignatorCategory,
    EvaluationContext, FinderResult, Status, path,
};

use super::existing_node;

/// Resolves resource attributes from the graph view of the addressed node.
///
/// The attribute id is matched against triple predicates and every object is
/// returned, converted to the designator's data type. Actions that create a
/// child or property address something that does not exist yet, so for them
/// the lookup moves to the parent.
#[derive(Debug, Clone)]
pub struct TripleAttributeFinder {
    parent_addressed_actions: Vec<String>,
}

impl TripleAttributeFinder {
    #[must_use]
    pub fn new(parent_addressed_actions: Vec<String>) -> Self {
        Self {
            parent_addressed_actions,
        }
    }

    /// The path whose node carries the attributes for this request.
    #[must_use]
    pub fn target_path<'a>(&self, actions: &[&str], resource_id: &'a str) -> &'a str {
        let parent_addressed = actions
            .iter()
            .any(|a| self.parent_addressed_actions.iter().any(|p| p == a));
        if parent_addressed {
            path::parent_path(resource_id).unwrap_or(path::ROOT_PATH)
        } else {
            resource_id
        }
    }
}

impl AttributeFinder for TripleAttributeFinder {
    fn name(&self) -> &'static str {
        "triple"
    }

    fn supported_designator_types(&self) -> &[DesignatorCategory] {
        &[DesignatorCategory::Resource]
    }

    #[tracing::instrument(skip_all, fields(attribute_id = %designator.attribute_id))]
    fn find_attribute(
        &self,
        designator: &AttributeDesignator,
        ctx: &EvaluationContext,
    ) -> FinderResult {
        if designator.category != DesignatorCategory::Resource {
            return Ok(AttributeBag::empty(designator.data_type));
        }
        let Some(session) = ctx.session() else {
            return Err(Status::processing_error("no store session attached to request"));
        };

        let target = self.target_path(&ctx.action_ids(), ctx.resource_id());
        let store_failure = |e: resource_authz_sdk::StoreError| {
            tracing::warn!(path = target, error = %e, "Graph lookup failed");
            Status::processing_error(e.to_string()).for_resource(target)
        };

        let Some(node) = existing_node(session, target).map_err(store_failure)? else {
            tracing::debug!(path = target, "No node for graph lookup");
            return Ok(AttributeBag::empty(designator.data_type));
        };
        let graph = session.graph(&node).map_err(store_failure)?;

        let values = graph
            .objects(&designator.attribute_id)
            .filter_map(|object| {
                let parsed = AttributeValue::parse(designator.data_type, object.lexical());
                if parsed.is_none() {
                    tracing::debug!(
                        value = object.lexical(),
                        data_type = designator.data_type.uri(),
                        "Skipping value not convertible to requested type"
                    );
                }
                parsed
            })
            .collect();
        Ok(AttributeBag::new(designator.data_type, values))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;

    use in_memory_store_plugin::InMemoryStore;
    use resource_authz_sdk::{DataType, PropertyValue, StatusCode, StoreError, StoreSession};

    use super::*;
    use crate::domain::EvaluationContextBuilder;

    fn finder() -> TripleAttributeFinder {
        TripleAttributeFinder::new(vec!["add_node".to_owned(), "set_property".to_owned()])
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::default();
        store.insert_node("/a/b", "nt:folder");
        store
            .set_property("/a", "ex:owner", PropertyValue::String("alice".to_owned()))
            .unwrap();
        store
            .set_property("/a/b", "ex:owner", PropertyValue::String("bob".to_owned()))
            .unwrap();
        store
            .set_property("/a/b", "ex:size", PropertyValue::Long(7))
            .unwrap();
        store
    }

    fn ctx(session: Arc<dyn StoreSession>, resource: &str, action: &str) -> EvaluationContext {
        EvaluationContextBuilder::new()
            .session(session)
            .finder(Arc::new(finder()))
            .resource_id(resource)
            .actions([action])
            .build()
    }

    fn owner() -> AttributeDesignator {
        AttributeDesignator::resource("ex:owner", DataType::String)
    }

    #[test]
    fn parent_addressed_actions_trim_last_segment() {
        let f = finder();
        assert_eq!(f.target_path(&["set_property"], "/a/{ns}b/{ns}c"), "/a/{ns}b");
        assert_eq!(f.target_path(&["add_node"], "/{ns}onlyprop"), "/");
        assert_eq!(f.target_path(&["read"], "/a/b"), "/a/b");
    }

    #[test]
    fn read_resolves_node_graph() {
        let store = store();
        let bag = ctx(store.open_session(), "/a/b", "read")
            .attribute(&owner())
            .unwrap();
        assert_eq!(bag.values, vec![AttributeValue::string("bob")]);
    }

    #[test]
    fn add_node_resolves_parent_graph() {
        let store = store();
        let bag = ctx(store.open_session(), "/a/b", "add_node")
            .attribute(&owner())
            .unwrap();
        assert_eq!(bag.values, vec![AttributeValue::string("alice")]);
    }

    #[test]
    fn property_path_resolves_owning_node() {
        let store = store();
        let designator = AttributeDesignator::resource("ex:size", DataType::Integer);
        let bag = ctx(store.open_session(), "/a/b/{ns}title", "read")
            .attribute(&designator)
            .unwrap();
        assert_eq!(bag.values, vec![AttributeValue::Integer(7)]);
    }

    #[test]
    fn missing_resource_yields_empty_bag() {
        let store = store();
        let bag = ctx(store.open_session(), "/nope/deeper", "read")
            .attribute(&owner())
            .unwrap();
        assert!(bag.is_empty());
    }

    #[test]
    fn unconvertible_values_are_skipped() {
        let store = store();
        let designator = AttributeDesignator::resource("ex:owner", DataType::Integer);
        let bag = ctx(store.open_session(), "/a/b", "read")
            .attribute(&designator)
            .unwrap();
        assert!(bag.is_empty());
    }

    #[test]
    fn other_categories_yield_empty_bag() {
        let store = store();
        let designator =
            AttributeDesignator::new(DesignatorCategory::Action, "ex:owner", DataType::String);
        let bag = finder()
            .find_attribute(&designator, &ctx(store.open_session(), "/a/b", "read"))
            .unwrap();
        assert!(bag.is_empty());
    }

    #[test]
    fn store_failure_is_processing_error() {
        let store = store();
        let ctx = ctx(store.open_session(), "/a/b", "read");
        store.inject_fault(Some(StoreError::Repository("boom".to_owned())));

        let status = ctx.attribute(&owner()).unwrap_err();
        assert_eq!(status.code, StatusCode::ProcessingError);
    }

    #[test]
    fn missing_session_is_processing_error() {
        let ctx = EvaluationContextBuilder::new()
            .finder(Arc::new(finder()))
            .resource_id("/a")
            .build();
        let status = ctx.attribute(&owner()).unwrap_err();
        assert_eq!(status.code, StatusCode::ProcessingError);
    }

    #[test]
    fn selectors_are_not_supported() {
        assert!(!finder().is_selector_supported());
    }
}
