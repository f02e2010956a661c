//! Evaluation context builder.
//!
//! Assembles the four attribute lists of a request from primitive inputs and
//! freezes them, together with the attribute finder chain and the request's
//! store session, into an [`EvaluationContext`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use resource_authz_sdk::{
    Attribute, AttributeFinder, AttributeValue, EvaluationContext, RequestContext,
    SCOPE_DESCENDANTS, StoreSession, Subject, ids, path,
};

/// Incremental builder for an [`EvaluationContext`].
///
/// Callers supply a principal and a (possibly empty) role set; nothing here
/// fails.
#[derive(Default)]
pub struct EvaluationContextBuilder {
    request: RequestContext,
    finders: Vec<Arc<dyn AttributeFinder>>,
    session: Option<Arc<dyn StoreSession>>,
    remove_action: Option<String>,
    dump: bool,
}

impl EvaluationContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the action that forces the descendants scope (default `remove`).
    #[must_use]
    pub fn remove_action(mut self, action: impl Into<String>) -> Self {
        self.remove_action = Some(action.into());
        self
    }

    /// Dump the built request at DEBUG.
    #[must_use]
    pub fn dump_requests(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }

    /// Register an attribute finder; registration order is priority order.
    #[must_use]
    pub fn finder(mut self, module: Arc<dyn AttributeFinder>) -> Self {
        self.finders.push(module);
        self
    }

    /// Attach the request-scoped store session.
    #[must_use]
    pub fn session(mut self, session: Arc<dyn StoreSession>) -> Self {
        self.session = Some(session);
        self
    }

    /// Add the subject: one subject-id attribute and one role attribute per role.
    #[must_use]
    pub fn subject<I>(mut self, principal: &str, roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut attributes = vec![Attribute::new(
            ids::SUBJECT_ID,
            AttributeValue::string(principal),
        )];
        attributes.extend(
            roles
                .into_iter()
                .map(|role| Attribute::new(ids::SUBJECT_ROLE, AttributeValue::string(role.as_ref()))),
        );
        self.request.subjects.push(Subject::access(attributes));
        self
    }

    /// Add the raw node or property path as resource id, unmodified except
    /// that an empty path becomes the root path.
    #[must_use]
    pub fn resource_id(mut self, raw_path: &str) -> Self {
        self.request.resource.push(Attribute::new(
            ids::RESOURCE_ID,
            AttributeValue::string(path::or_root(raw_path)),
        ));
        self
    }

    #[must_use]
    pub fn workspace(mut self, name: &str) -> Self {
        self.request.resource.push(Attribute::new(
            ids::RESOURCE_WORKSPACE,
            AttributeValue::string(name),
        ));
        self
    }

    /// Add one action-id attribute per action. A remove action also adds the
    /// descendants scope, at most once per request.
    #[must_use]
    pub fn actions<I>(mut self, actions: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let remove = self.remove_action.as_deref().unwrap_or("remove").to_owned();
        for action in actions {
            let action = action.as_ref();
            self.request.action.push(Attribute::new(
                ids::ACTION_ID,
                AttributeValue::string(action),
            ));
            if action == remove && !self.has_scope() {
                self.request.resource.push(Attribute::new(
                    ids::RESOURCE_SCOPE,
                    AttributeValue::string(SCOPE_DESCENDANTS),
                ));
            }
        }
        self
    }

    #[must_use]
    pub fn original_request_ip(mut self, remote_addr: &str) -> Self {
        self.request.environment.push(Attribute::new(
            ids::ORIGINAL_IP_ADDRESS,
            AttributeValue::string(remote_addr),
        ));
        self
    }

    fn has_scope(&self) -> bool {
        self.request
            .resource_values(ids::RESOURCE_SCOPE)
            .next()
            .is_some()
    }

    /// Freeze the request, stamped with the current time.
    #[must_use]
    pub fn build(self) -> EvaluationContext {
        self.build_at(Utc::now())
    }

    /// Freeze the request with an explicit evaluation time.
    #[must_use]
    pub fn build_at(mut self, evaluation_time: DateTime<Utc>) -> EvaluationContext {
        if self.request.resource_id().is_none() {
            self.request.resource.insert(
                0,
                Attribute::new(ids::RESOURCE_ID, AttributeValue::string(path::ROOT_PATH)),
            );
        }

        let ctx = EvaluationContext::new(self.request, self.finders, self.session, evaluation_time);
        if self.dump && tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("Evaluation request dump:\n{}", ctx.dump());
        }
        ctx
    }
}

impl std::fmt::Debug for EvaluationContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContextBuilder")
            .field("request", &self.request)
            .field("finders", &self.finders.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use resource_authz_sdk::{AttributeDesignator, DataType, DesignatorCategory};

    fn scope_values(ctx: &EvaluationContext) -> Vec<&AttributeValue> {
        ctx.request().resource_values(ids::RESOURCE_SCOPE).collect()
    }

    #[test]
    fn read_request_has_no_scope() {
        let roles: BTreeSet<String> = ["reader".to_owned()].into();
        let ctx = EvaluationContextBuilder::new()
            .subject("alice", &roles)
            .resource_id("/obj/ds/prop1")
            .workspace("default")
            .actions(["read"])
            .build();

        let action = ctx
            .attribute(&AttributeDesignator::new(
                DesignatorCategory::Action,
                ids::ACTION_ID,
                DataType::String,
            ))
            .unwrap();
        assert_eq!(action.values, vec![AttributeValue::string("read")]);
        assert!(scope_values(&ctx).is_empty());
        assert_eq!(ctx.request().resource_id(), Some("/obj/ds/prop1"));
        assert_eq!(
            ctx.request()
                .resource_values(ids::RESOURCE_WORKSPACE)
                .collect::<Vec<_>>(),
            vec![&AttributeValue::string("default")]
        );
    }

    #[test]
    fn subject_gets_one_attribute_per_role() {
        let ctx = EvaluationContextBuilder::new()
            .subject("alice", ["reader", "writer"])
            .build();
        let subject = &ctx.request().subjects[0];
        assert_eq!(subject.category, ids::ACCESS_SUBJECT);
        assert_eq!(subject.attributes.len(), 3);
        assert_eq!(
            ctx.request()
                .subject_values(ids::SUBJECT_ROLE, None)
                .count(),
            2
        );
    }

    #[test]
    fn empty_role_set_yields_only_subject_id() {
        let ctx = EvaluationContextBuilder::new()
            .subject("anonymous", Vec::<String>::new())
            .build();
        assert_eq!(ctx.request().subjects[0].attributes.len(), 1);
    }

    #[test]
    fn remove_adds_descendants_scope_once() {
        let ctx = EvaluationContextBuilder::new()
            .resource_id("/obj")
            .actions(["read", "remove"])
            .actions(["remove"])
            .build();
        assert_eq!(
            scope_values(&ctx),
            vec![&AttributeValue::string(SCOPE_DESCENDANTS)]
        );
        assert_eq!(ctx.action_ids(), vec!["read", "remove", "remove"]);
    }

    #[test]
    fn custom_remove_action_is_honoured() {
        let ctx = EvaluationContextBuilder::new()
            .remove_action("delete")
            .actions(["remove"])
            .build();
        assert!(scope_values(&ctx).is_empty());
    }

    #[test]
    fn property_paths_are_passed_through() {
        let ctx = EvaluationContextBuilder::new()
            .resource_id("/obj/{http://purl.org/dc/elements/1.1/}title")
            .build();
        assert_eq!(
            ctx.request().resource_id(),
            Some("/obj/{http://purl.org/dc/elements/1.1/}title")
        );
    }

    #[test]
    fn missing_resource_id_defaults_to_root() {
        let ctx = EvaluationContextBuilder::new().actions(["read"]).build();
        assert_eq!(ctx.request().resource_id(), Some("/"));
    }

    #[test]
    fn empty_resource_id_becomes_root() {
        let ctx = EvaluationContextBuilder::new()
            .resource_id("")
            .actions(["read"])
            .build();
        assert_eq!(ctx.request().resource_id(), Some("/"));

        let looked_up = ctx
            .attribute(&AttributeDesignator::resource(ids::RESOURCE_ID, DataType::String))
            .unwrap();
        assert_eq!(looked_up.values, vec![AttributeValue::string("/")]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn dump_is_logged_when_enabled() {
        let _ctx = EvaluationContextBuilder::new()
            .dump_requests(true)
            .subject("alice", ["reader"])
            .resource_id("/obj")
            .build();
        assert!(logs_contain("Evaluation request dump"));
    }

    #[test]
    fn original_ip_is_an_environment_attribute() {
        let ctx = EvaluationContextBuilder::new()
            .original_request_ip("10.0.0.7")
            .build();
        assert_eq!(
            ctx.request()
                .environment_values(ids::ORIGINAL_IP_ADDRESS)
                .collect::<Vec<_>>(),
            vec![&AttributeValue::string("10.0.0.7")]
        );
        assert!(ctx.request().action.is_empty());
    }
}
