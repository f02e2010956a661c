#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Shared fixture: a bootstrapped in-memory store and a small first-applicable
//! rule engine standing in for the policy decision point.
//!
//! A rule `Action` only matches when every requested action equals it.
//!
//! Policies understood by the engine:
//!
//! ```xml
//! <Policy PolicyId="..." TargetAction="remove">
//!   <Rule Effect="Permit" Role="reader" Action="read"/>
//!   <Rule Effect="Permit" OwnerAttribute="ex:owner"/>
//!   <Rule Effect="Deny"/>
//! </Policy>
//! <PolicySet PolicySetId="...">
//!   <PolicyIdReference Id="..."/>
//! </PolicySet>
//! ```

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use in_memory_store_plugin::InMemoryStore;
use quick_xml::Reader;
use quick_xml::events::Event;
use resource_authz::{AuthorizationDelegate, ResourceAuthzConfig, WorkspaceInitializer};
use resource_authz_sdk::{
    AttributeDesignator, DataType, Decision, DecisionResult, EvaluationContext, PdpBackends,
    PdpError, PdpFactory, PolicyDecisionPoint, PolicyDocument, PolicyFinderResult, PolicyKind,
    PropertyValue, ResourceStore, SCOPE_DESCENDANTS, Status, TargetMatch, TargetMatcher, ids,
};
use tempfile::TempDir;

pub const ROOT_POLICY: &str = r#"<Policy PolicyId="info:fedora/policies/RootPolicy">
  <Rule Effect="Permit" Role="admin"/>
  <Rule Effect="Permit" Role="reader" Action="read"/>
  <Rule Effect="Deny"/>
</Policy>"#;

pub const PROJECT_POLICY_SET: &str = r#"<PolicySet PolicySetId="info:fedora/policies/ProjectPolicySet">
  <PolicyIdReference Id="info:fedora/policies/OwnerPolicy"/>
</PolicySet>"#;

pub const OWNER_POLICY: &str = r#"<Policy PolicyId="info:fedora/policies/OwnerPolicy">
  <Rule Effect="Permit" OwnerAttribute="ex:owner"/>
  <Rule Effect="Deny"/>
</Policy>"#;

pub const LOCKED_POLICY: &str = r#"<Policy PolicyId="info:fedora/policies/LockedPolicy" TargetAction="remove">
  <Rule Effect="Deny"/>
</Policy>"#;

#[derive(Debug, Default)]
struct Rule {
    effect: Option<Decision>,
    role: Option<String>,
    action: Option<String>,
    owner_attribute: Option<String>,
}

#[derive(Debug, Default)]
struct Parsed {
    target_action: Option<String>,
    rules: Vec<Rule>,
    references: Vec<String>,
}

fn parse(doc: &PolicyDocument) -> Result<Parsed> {
    let mut reader = Reader::from_reader(&doc.content[..]);
    let mut buf = Vec::new();
    let mut parsed = Parsed::default();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let attr = |name: &str| -> Result<Option<String>> {
                    Ok(match e.try_get_attribute(name)? {
                        Some(a) => Some(a.unescape_value()?.into_owned()),
                        None => None,
                    })
                };
                match e.local_name().as_ref() {
                    b"Policy" | b"PolicySet" => parsed.target_action = attr("TargetAction")?,
                    b"Rule" => parsed.rules.push(Rule {
                        effect: match attr("Effect")?.as_deref() {
                            Some("Permit") => Some(Decision::Permit),
                            Some("Deny") => Some(Decision::Deny),
                            _ => None,
                        },
                        role: attr("Role")?,
                        action: attr("Action")?,
                        owner_attribute: attr("OwnerAttribute")?,
                    }),
                    b"PolicyIdReference" => {
                        if let Some(id) = attr("Id")? {
                            parsed.references.push(id);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(parsed)
}

/// First-applicable rule engine over the policy and resource finders.
pub struct MiniPdp {
    backends: PdpBackends,
}

impl TargetMatcher for MiniPdp {
    fn match_target(&self, policy: &PolicyDocument, ctx: &EvaluationContext) -> TargetMatch {
        match parse(policy) {
            Ok(Parsed {
                target_action: Some(action),
                ..
            }) if !ctx.action_ids().contains(&action.as_str()) => TargetMatch::NoMatch,
            Ok(_) => TargetMatch::Match,
            Err(e) => TargetMatch::Indeterminate(Status::syntax_error(e.to_string())),
        }
    }
}

impl MiniPdp {
    fn decide(&self, ctx: &EvaluationContext) -> DecisionResult {
        match self.backends.policy_finder.find_policy(ctx, self) {
            PolicyFinderResult::NotApplicable => DecisionResult::new(Decision::NotApplicable),
            PolicyFinderResult::Indeterminate(status) => {
                DecisionResult::new(Decision::Indeterminate).with_status(status)
            }
            PolicyFinderResult::Found(doc) => self.apply(&doc, ctx),
        }
    }

    fn apply(&self, doc: &PolicyDocument, ctx: &EvaluationContext) -> DecisionResult {
        let parsed = match parse(doc) {
            Ok(p) => p,
            Err(e) => {
                return DecisionResult::new(Decision::Indeterminate)
                    .with_status(Status::syntax_error(e.to_string()));
            }
        };

        for id in &parsed.references {
            match self.backends.policy_finder.find_policy_by_id(id, PolicyKind::Policy) {
                PolicyFinderResult::Found(child) => {
                    let result = self.apply(&child, ctx);
                    if result.decision != Decision::NotApplicable {
                        return result;
                    }
                }
                PolicyFinderResult::Indeterminate(status) => {
                    return DecisionResult::new(Decision::Indeterminate).with_status(status);
                }
                PolicyFinderResult::NotApplicable => {}
            }
        }

        for rule in &parsed.rules {
            match rule_applies(rule, ctx) {
                Ok(true) => {
                    return DecisionResult::new(rule.effect.unwrap_or(Decision::Indeterminate));
                }
                Ok(false) => {}
                Err(status) => {
                    return DecisionResult::new(Decision::Indeterminate).with_status(status);
                }
            }
        }
        DecisionResult::new(Decision::NotApplicable)
    }
}

fn rule_applies(rule: &Rule, ctx: &EvaluationContext) -> Result<bool, Status> {
    if let Some(role) = &rule.role {
        let has_role = ctx
            .request()
            .subject_values(ids::SUBJECT_ROLE, None)
            .any(|v| v.as_str() == Some(role.as_str()));
        if !has_role {
            return Ok(false);
        }
    }
    if let Some(action) = &rule.action
        && ctx.action_ids().iter().any(|a| *a != action.as_str())
    {
        return Ok(false);
    }
    if let Some(attribute) = &rule.owner_attribute {
        let owners = ctx.attribute(&AttributeDesignator::resource(
            attribute.as_str(),
            DataType::String,
        ))?;
        let subject = ctx
            .request()
            .subject_values(ids::SUBJECT_ID, None)
            .find_map(|v| v.as_str());
        return Ok(owners.iter().any(|o| o.as_str() == subject));
    }
    Ok(true)
}

impl PolicyDecisionPoint for MiniPdp {
    fn evaluate(&self, ctx: &EvaluationContext) -> Vec<DecisionResult> {
        let mut results = Vec::new();
        let mut resources = vec![ctx.resource_id().to_owned()];

        let scoped = ctx
            .request()
            .resource_values(ids::RESOURCE_SCOPE)
            .any(|v| v.as_str() == Some(SCOPE_DESCENDANTS));
        if scoped {
            let found = self
                .backends
                .resource_finder
                .find_descendant_resources(ctx.resource_id());
            results.extend(found.failures.into_iter().map(|(id, status)| {
                DecisionResult::new(Decision::Indeterminate)
                    .with_status(status)
                    .for_resource(id)
            }));
            resources.extend(found.resources);
        }

        for resource in resources {
            let result = self.decide(&ctx.with_resource_id(&resource));
            results.push(result.for_resource(resource));
        }
        results
    }
}

pub struct MiniPdpFactory;

impl PdpFactory for MiniPdpFactory {
    fn make_pdp(&self, backends: PdpBackends) -> Result<Arc<dyn PolicyDecisionPoint>, PdpError> {
        Ok(Arc::new(MiniPdp { backends }))
    }
}

/// A bootstrapped store with policies assigned below the root.
pub struct Fixture {
    pub store: InMemoryStore,
    pub delegate: AuthorizationDelegate,
    _policies: TempDir,
}

pub fn policies_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (file, content) in [
        ("RootPolicy.xml", ROOT_POLICY),
        ("ProjectPolicySet.xml", PROJECT_POLICY_SET),
        ("OwnerPolicy.xml", OWNER_POLICY),
        ("LockedPolicy.xml", LOCKED_POLICY),
    ] {
        fs::write(dir.path().join(file), content).unwrap();
    }
    dir
}

pub fn reference(path: &str) -> PropertyValue {
    PropertyValue::Reference(path.to_owned())
}

pub fn fixture() -> Fixture {
    let cfg = ResourceAuthzConfig::default();
    let policies = policies_dir();
    let store = InMemoryStore::default();

    WorkspaceInitializer::new(policies.path(), policies.path().join("RootPolicy.xml"), &cfg)
        .unwrap()
        .init(&store)
        .unwrap();

    store.insert_node("/projects/apollo/docs", "nt:folder");
    store.insert_node("/other", "nt:folder");
    store.insert_node("/foo/bar/baz", "nt:folder");
    store.insert_node("/foo/bar/jcr:content", "nt:resource");
    store
        .set_property("/projects", "authz:policy", reference("/policies/ProjectPolicySet"))
        .unwrap();
    store
        .set_property(
            "/projects/apollo",
            "ex:owner",
            PropertyValue::String("alice".to_owned()),
        )
        .unwrap();

    let shared: Arc<dyn ResourceStore> = Arc::new(store.clone());
    let delegate = AuthorizationDelegate::new(&cfg, &shared, &MiniPdpFactory).unwrap();

    Fixture {
        store,
        delegate,
        _policies: policies,
    }
}
