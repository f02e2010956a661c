//! Store query attribute finder.

use resource_authz_sdk::{
    AttributeBag, AttributeDesignator, AttributeFinder, AttributeSelector, AttributeValue,
    DesignatorCategory, EvaluationContext, FinderResult, Status,
};

use super::existing_node;

/// Answers attribute selectors by evaluating their context path as a store
/// query relative to the request's resource.
///
/// Registered for resource designators so it sits in the chain, but it never
/// resolves one.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreQueryFinder;

impl AttributeFinder for StoreQueryFinder {
    fn name(&self) -> &'static str {
        "store-query"
    }

    fn is_selector_supported(&self) -> bool {
        true
    }

    fn supported_designator_types(&self) -> &[DesignatorCategory] {
        &[DesignatorCategory::Resource]
    }

    fn find_attribute(
        &self,
        designator: &AttributeDesignator,
        _ctx: &EvaluationContext,
    ) -> FinderResult {
        Ok(AttributeBag::empty(designator.data_type))
    }

    #[tracing::instrument(skip_all, fields(context_path = %selector.context_path))]
    fn find_selector(&self, selector: &AttributeSelector, ctx: &EvaluationContext) -> FinderResult {
        let Some(session) = ctx.session() else {
            return Err(Status::processing_error("no store session attached to request"));
        };
        let resource_id = ctx.resource_id();
        let store_failure = |e: resource_authz_sdk::StoreError| {
            tracing::warn!(path = resource_id, error = %e, "Store query failed");
            Status::processing_error(e.to_string()).for_resource(resource_id)
        };

        let Some(node) = existing_node(session, resource_id).map_err(store_failure)? else {
            return Ok(AttributeBag::empty(selector.data_type));
        };
        let values = session
            .query(&node, &selector.context_path)
            .map_err(store_failure)?
            .iter()
            .filter_map(|raw| AttributeValue::parse(selector.data_type, raw))
            .collect();
        Ok(AttributeBag::new(selector.data_type, values))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;

    use in_memory_store_plugin::InMemoryStore;
    use resource_authz_sdk::{DataType, PropertyValue, StatusCode};

    use super::*;
    use crate::domain::EvaluationContextBuilder;

    fn store() -> InMemoryStore {
        let store = InMemoryStore::default();
        store.insert_node("/obj/ds", "nt:folder");
        store
            .set_property("/obj/ds", "ex:size", PropertyValue::Long(512))
            .unwrap();
        store
    }

    fn ctx(store: &InMemoryStore, resource: &str) -> EvaluationContext {
        EvaluationContextBuilder::new()
            .session(store.open_session())
            .finder(Arc::new(StoreQueryFinder))
            .resource_id(resource)
            .build()
    }

    fn selector(context_path: &str) -> AttributeSelector {
        AttributeSelector {
            context_path: context_path.to_owned(),
            data_type: DataType::Integer,
        }
    }

    #[test]
    fn selector_is_evaluated_against_resource() {
        let store = store();
        let bag = ctx(&store, "/obj").select(&selector("ds@ex:size")).unwrap();
        assert_eq!(bag.values, vec![AttributeValue::Integer(512)]);
    }

    #[test]
    fn designators_pass_through_empty() {
        let store = store();
        let ctx = ctx(&store, "/obj/ds");
        let bag = StoreQueryFinder
            .find_attribute(
                &AttributeDesignator::resource("ex:size", DataType::Integer),
                &ctx,
            )
            .unwrap();
        assert!(bag.is_empty());
    }

    #[test]
    fn bad_expression_is_processing_error() {
        let store = store();
        let status = ctx(&store, "/obj").select(&selector("not a query")).unwrap_err();
        assert_eq!(status.code, StatusCode::ProcessingError);
        assert_eq!(status.resource_id.as_deref(), Some("/obj"));
    }

    #[test]
    fn missing_resource_yields_empty_bag() {
        let store = store();
        let bag = ctx(&store, "/gone").select(&selector("@ex:size")).unwrap();
        assert!(bag.is_empty());
    }
}
