//! Resource store collaborator.
//!
//! The store is a key-indexed tree with parent/child navigation, typed node
//! properties, content blobs and an RDF-like graph view of each node. Lookups
//! return `Ok(None)` for missing nodes; `Err` is reserved for infrastructure
//! failures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::path;

/// A node in the resource tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub path: String,
    pub primary_type: String,
    #[serde(default)]
    pub mixins: Vec<String>,
}

impl Node {
    #[must_use]
    pub fn new(path: impl Into<String>, primary_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            primary_type: primary_type.into(),
            mixins: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        path::name_of(&self.path)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        path::is_root(&self.path)
    }

    /// Whether the node's primary type or one of its mixins is `node_type`.
    #[must_use]
    pub fn is_node_type(&self, node_type: &str) -> bool {
        self.primary_type == node_type || self.mixins.iter().any(|m| m == node_type)
    }
}

/// A typed node property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    String(String),
    /// Reference to another node, by path.
    Reference(String),
    Uri(String),
    Boolean(bool),
    Long(i64),
    Date(DateTime<Utc>),
}

impl PropertyValue {
    /// Lexical form of the value.
    #[must_use]
    pub fn lexical(&self) -> String {
        match self {
            Self::String(s) | Self::Reference(s) | Self::Uri(s) => s.clone(),
            Self::Boolean(b) => b.to_string(),
            Self::Long(l) => l.to_string(),
            Self::Date(d) => d.to_rfc3339(),
        }
    }
}

/// Object position of a graph triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphObject {
    Resource(String),
    Literal {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
    },
}

impl GraphObject {
    #[must_use]
    pub fn lexical(&self) -> &str {
        match self {
            Self::Resource(uri) => uri,
            Self::Literal { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: GraphObject,
}

/// Graph representation of one node's properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub triples: Vec<Triple>,
}

impl GraphView {
    /// Objects of every triple whose predicate is `predicate`.
    pub fn objects<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a GraphObject> {
        self.triples
            .iter()
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.object)
    }
}

/// A read/lookup session into the store.
///
/// Sessions may carry request-scoped identity or transaction state and must
/// not be shared across concurrent authorization checks.
pub trait StoreSession: Send + Sync {
    /// Name of the workspace this session is bound to.
    fn workspace_name(&self) -> &str;

    /// Look up a node by path.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure. A missing node is `Ok(None)`.
    fn node(&self, path: &str) -> Result<Option<Node>, StoreError>;

    /// The root node, which always exists.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure.
    fn root_node(&self) -> Result<Node, StoreError>;

    /// The parent of `node`, looked up by trimming its last path segment.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure.
    fn parent(&self, node: &Node) -> Result<Option<Node>, StoreError> {
        match path::parent_path(&node.path) {
            Some(parent) => self.node(parent),
            None => Ok(None),
        }
    }

    /// Immediate children of `node`.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure.
    fn children(&self, node: &Node) -> Result<Vec<Node>, StoreError>;

    /// A single property of `node`.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure. An absent property is `Ok(None)`.
    fn property(&self, node: &Node, name: &str) -> Result<Option<PropertyValue>, StoreError>;

    /// Graph view of `node`'s properties.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure.
    fn graph(&self, node: &Node) -> Result<GraphView, StoreError>;

    /// Binary content stored at `path`.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure. Missing content is `Ok(None)`.
    fn content(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Evaluate a store-specific query expression relative to `node`.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure or an unsupported expression.
    fn query(&self, node: &Node, expression: &str) -> Result<Vec<String>, StoreError>;
}

/// A privileged session able to write. Used only by bootstrap.
pub trait AdminSession: StoreSession {
    /// Create or replace content at `path`, creating missing ancestors.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure.
    fn put_content(
        &self,
        path: &str,
        media_type: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Node, StoreError>;

    /// Add a mixin type to the node at `path`.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure or a missing node.
    fn add_mixin(&self, path: &str, mixin: &str) -> Result<(), StoreError>;

    /// Set a property on the node at `path`.
    ///
    /// # Errors
    ///
    /// [`StoreError`] on infrastructure failure or a missing node.
    fn set_property(&self, path: &str, name: &str, value: PropertyValue)
    -> Result<(), StoreError>;

    /// Persist pending changes.
    ///
    /// # Errors
    ///
    /// [`StoreError`] if the changes cannot be persisted.
    fn save(&self) -> Result<(), StoreError>;
}

/// Session factory for the store.
pub trait ResourceStore: Send + Sync {
    /// A privileged read session used by the policy and descendant finders.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if no session can be opened.
    fn internal_session(&self) -> Result<Arc<dyn StoreSession>, StoreError>;

    /// A privileged write session used by bootstrap.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if no session can be opened.
    fn admin_session(&self) -> Result<Box<dyn AdminSession>, StoreError>;
}
