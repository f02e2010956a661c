//! Request and decision models.
//!
//! A [`RequestContext`] is the four-part attribute multiset handed to the PDP:
//! subjects, resource, action and environment attributes. The PDP answers with
//! one [`DecisionResult`] per evaluated resource/action.

use serde::{Deserialize, Serialize};

use crate::attributes::{Attribute, AttributeValue, ids};

/// A requesting subject and its attributes (principal id, roles, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub category: String,
    pub attributes: Vec<Attribute>,
}

impl Subject {
    /// Create an access subject.
    #[must_use]
    pub fn access(attributes: Vec<Attribute>) -> Self {
        Self {
            category: ids::ACCESS_SUBJECT.to_owned(),
            attributes,
        }
    }
}

/// The literal attributes of an authorization request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub subjects: Vec<Subject>,
    pub resource: Vec<Attribute>,
    pub action: Vec<Attribute>,
    pub environment: Vec<Attribute>,
}

impl RequestContext {
    /// Values of every resource attribute with the given id.
    pub fn resource_values<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a AttributeValue> {
        values_of(&self.resource, id)
    }

    /// Values of every action attribute with the given id.
    pub fn action_values<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a AttributeValue> {
        values_of(&self.action, id)
    }

    /// Values of every environment attribute with the given id.
    pub fn environment_values<'a>(
        &'a self,
        id: &'a str,
    ) -> impl Iterator<Item = &'a AttributeValue> {
        values_of(&self.environment, id)
    }

    /// Values of every subject attribute with the given id, optionally
    /// restricted to one subject category.
    pub fn subject_values<'a>(
        &'a self,
        id: &'a str,
        category: Option<&'a str>,
    ) -> impl Iterator<Item = &'a AttributeValue> {
        self.subjects
            .iter()
            .filter(move |s| category.is_none_or(|c| s.category == c))
            .flat_map(move |s| values_of(&s.attributes, id))
    }

    /// The raw resource id, if one was supplied.
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_values(ids::RESOURCE_ID)
            .find_map(AttributeValue::as_str)
    }

    /// All requested action names.
    #[must_use]
    pub fn action_ids(&self) -> Vec<&str> {
        self.action_values(ids::ACTION_ID)
            .filter_map(AttributeValue::as_str)
            .collect()
    }
}

fn values_of<'a>(attrs: &'a [Attribute], id: &'a str) -> impl Iterator<Item = &'a AttributeValue> {
    attrs.iter().filter(move |a| a.id == id).map(|a| &a.value)
}

/// Outcome of evaluating one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Permit,
    Deny,
    Indeterminate,
    NotApplicable,
}

/// Status codes attached to indeterminate results and failed lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    MissingAttribute,
    SyntaxError,
    ProcessingError,
}

impl StatusCode {
    #[must_use]
    pub fn uri(self) -> &'static str {
        match self {
            Self::Ok => "urn:oasis:names:tc:xacml:1.0:status:ok",
            Self::MissingAttribute => "urn:oasis:names:tc:xacml:1.0:status:missing-attribute",
            Self::SyntaxError => "urn:oasis:names:tc:xacml:1.0:status:syntax-error",
            Self::ProcessingError => "urn:oasis:names:tc:xacml:1.0:status:processing-error",
        }
    }
}

/// Diagnostic status carried by results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Resource id the status applies to, when it is keyed to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl Status {
    #[must_use]
    pub fn processing_error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::ProcessingError,
            message: Some(message.into()),
            resource_id: None,
        }
    }

    #[must_use]
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::SyntaxError,
            message: Some(message.into()),
            resource_id: None,
        }
    }

    #[must_use]
    pub fn for_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code.uri())?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// One decision returned by the PDP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl DecisionResult {
    #[must_use]
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            resource_id: None,
            status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn for_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    #[must_use]
    pub fn is_permit(&self) -> bool {
        self.decision == Decision::Permit
    }
}
