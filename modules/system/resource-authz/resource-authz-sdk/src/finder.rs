//! Attribute finder modules and the evaluation context they resolve against.
//!
//! When the PDP needs an attribute that is not present in the literal request
//! it asks the [`EvaluationContext`], which consults its ordered chain of
//! [`AttributeFinder`] modules. Order is priority: the first module that
//! reports an error or returns a non-empty bag wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::attributes::{
    Attribute, AttributeBag, AttributeDesignator, AttributeSelector, AttributeValue,
    DesignatorCategory, ids,
};
use crate::models::{RequestContext, Status};
use crate::path;
use crate::store::StoreSession;

/// Result of an attribute lookup: a value bag, or an error status.
pub type FinderResult = Result<AttributeBag, Status>;

/// A pluggable attribute resolver.
///
/// Implementations are plain values holding their dependencies; per-request
/// state such as the store session is reached through the context argument.
pub trait AttributeFinder: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    fn is_designator_supported(&self) -> bool {
        true
    }

    fn is_selector_supported(&self) -> bool {
        false
    }

    /// Designator categories this module answers.
    fn supported_designator_types(&self) -> &[DesignatorCategory];

    /// Attribute ids this module answers; `None` means any id.
    fn supported_ids(&self) -> Option<&[&'static str]> {
        None
    }

    /// Resolve a designator.
    ///
    /// # Errors
    ///
    /// A [`Status`] for infrastructure failures. Unknown or absent values are
    /// an empty bag, not an error.
    fn find_attribute(
        &self,
        designator: &AttributeDesignator,
        ctx: &EvaluationContext,
    ) -> FinderResult;

    /// Resolve a selector.
    ///
    /// # Errors
    ///
    /// A [`Status`] for infrastructure failures.
    fn find_selector(&self, selector: &AttributeSelector, _ctx: &EvaluationContext) -> FinderResult {
        Ok(AttributeBag::empty(selector.data_type))
    }

    /// Whether this module should be asked for `designator`.
    fn supports(&self, designator: &AttributeDesignator) -> bool {
        self.is_designator_supported()
            && self
                .supported_designator_types()
                .contains(&designator.category)
            && self
                .supported_ids()
                .is_none_or(|ids| ids.iter().any(|id| *id == designator.attribute_id))
    }
}

/// An immutable, fully assembled authorization request.
///
/// Holds the literal attributes, the finder chain, the request-scoped store
/// session and the evaluation time.
#[derive(Clone)]
pub struct EvaluationContext {
    request: RequestContext,
    finders: Vec<Arc<dyn AttributeFinder>>,
    session: Option<Arc<dyn StoreSession>>,
    evaluation_time: DateTime<Utc>,
}

impl EvaluationContext {
    #[must_use]
    pub fn new(
        request: RequestContext,
        finders: Vec<Arc<dyn AttributeFinder>>,
        session: Option<Arc<dyn StoreSession>>,
        evaluation_time: DateTime<Utc>,
    ) -> Self {
        Self {
            request,
            finders,
            session,
            evaluation_time,
        }
    }

    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Store session of the request, if one was attached.
    #[must_use]
    pub fn session(&self) -> Option<&dyn StoreSession> {
        self.session.as_deref()
    }

    #[must_use]
    pub fn evaluation_time(&self) -> DateTime<Utc> {
        self.evaluation_time
    }

    /// Names of the attached finder modules, in priority order.
    #[must_use]
    pub fn finder_names(&self) -> Vec<&'static str> {
        self.finders.iter().map(|f| f.name()).collect()
    }

    /// The resource id, or the root path when absent or empty.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        path::or_root(self.request.resource_id().unwrap_or_default())
    }

    #[must_use]
    pub fn action_ids(&self) -> Vec<&str> {
        self.request.action_ids()
    }

    /// A copy of this context addressing `resource_id` instead, for engines
    /// that evaluate a scoped request once per affected resource.
    #[must_use]
    pub fn with_resource_id(&self, resource_id: &str) -> Self {
        let mut request = self.request.clone();
        request.resource.retain(|a| a.id != ids::RESOURCE_ID);
        request.resource.insert(
            0,
            Attribute::new(ids::RESOURCE_ID, AttributeValue::string(resource_id)),
        );
        Self {
            request,
            ..self.clone()
        }
    }

    /// Resolve a designator: literal request attributes first, then the
    /// finder chain.
    ///
    /// # Errors
    ///
    /// The status of the first finder that failed.
    pub fn attribute(&self, designator: &AttributeDesignator) -> FinderResult {
        let literal: Vec<AttributeValue> = self
            .literal_values(designator)
            .filter(|v| v.data_type() == designator.data_type)
            .cloned()
            .collect();
        if !literal.is_empty() {
            return Ok(AttributeBag::new(designator.data_type, literal));
        }

        for finder in self.finders.iter().filter(|f| f.supports(designator)) {
            let bag = finder.find_attribute(designator, self).inspect_err(|status| {
                tracing::debug!(
                    finder = finder.name(),
                    attribute_id = %designator.attribute_id,
                    %status,
                    "Attribute finder failed"
                );
            })?;
            if !bag.is_empty() {
                return Ok(bag);
            }
        }
        Ok(AttributeBag::empty(designator.data_type))
    }

    /// Resolve a selector through the finder chain.
    ///
    /// # Errors
    ///
    /// The status of the first finder that failed.
    pub fn select(&self, selector: &AttributeSelector) -> FinderResult {
        for finder in self.finders.iter().filter(|f| f.is_selector_supported()) {
            let bag = finder.find_selector(selector, self)?;
            if !bag.is_empty() {
                return Ok(bag);
            }
        }
        Ok(AttributeBag::empty(selector.data_type))
    }

    fn literal_values<'a>(
        &'a self,
        designator: &'a AttributeDesignator,
    ) -> Box<dyn Iterator<Item = &'a AttributeValue> + 'a> {
        let id = designator.attribute_id.as_str();
        match designator.category {
            DesignatorCategory::Subject => Box::new(
                self.request
                    .subject_values(id, designator.subject_category.as_deref()),
            ),
            DesignatorCategory::Resource => Box::new(self.request.resource_values(id)),
            DesignatorCategory::Action => Box::new(self.request.action_values(id)),
            DesignatorCategory::Environment => Box::new(self.request.environment_values(id)),
        }
    }
}

/// Serializable view used for diagnostic dumps.
#[derive(Serialize)]
struct ContextDump<'a> {
    request: &'a RequestContext,
    finders: Vec<&'static str>,
    evaluation_time: DateTime<Utc>,
}

impl EvaluationContext {
    /// Pretty JSON dump of the request for diagnostics.
    #[must_use]
    pub fn dump(&self) -> String {
        let view = ContextDump {
            request: &self.request,
            finders: self.finder_names(),
            evaluation_time: self.evaluation_time,
        };
        serde_json::to_string_pretty(&view)
            .unwrap_or_else(|e| format!("<unserializable request: {e}>"))
    }
}

impl std::fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("request", &self.request)
            .field("finders", &self.finder_names())
            .field("evaluation_time", &self.evaluation_time)
            .finish_non_exhaustive()
    }
}
