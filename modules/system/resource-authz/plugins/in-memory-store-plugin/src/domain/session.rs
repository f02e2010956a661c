//! Store sessions over the shared tree.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use resource_authz_sdk::{
    AdminSession, GraphObject, GraphView, Node, PropertyValue, StoreError, StoreSession, Triple,
    path,
};

use super::tree::Tree;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// State shared by the store and all of its sessions.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) workspace: String,
    pub(crate) tree: RwLock<Tree>,
    pub(crate) fault: RwLock<Option<StoreError>>,
}

impl Shared {
    pub(crate) fn check(&self) -> Result<(), StoreError> {
        match self.fault.read().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// A session into the in-memory store.
///
/// Writes are staged on a private copy of the tree and become visible to
/// other sessions on [`AdminSession::save`]; the last save wins.
#[derive(Debug)]
pub struct MemorySession {
    shared: Arc<Shared>,
    staged: Mutex<Option<Tree>>,
}

impl MemorySession {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            staged: Mutex::new(None),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Tree) -> T) -> Result<T, StoreError> {
        self.shared.check()?;
        let staged = self.staged.lock();
        match staged.as_ref() {
            Some(tree) => Ok(f(tree)),
            None => Ok(f(&self.shared.tree.read())),
        }
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tree) -> Result<T, StoreError>) -> Result<T, StoreError> {
        self.shared.check()?;
        let mut staged = self.staged.lock();
        let tree = staged.get_or_insert_with(|| self.shared.tree.read().clone());
        f(tree)
    }
}

fn graph_object(value: &PropertyValue) -> GraphObject {
    let typed = |value: String, xsd_type: &str| GraphObject::Literal {
        value,
        datatype: Some(format!("{XSD}{xsd_type}")),
    };
    match value {
        PropertyValue::Reference(target) | PropertyValue::Uri(target) => {
            GraphObject::Resource(target.clone())
        }
        PropertyValue::String(s) => GraphObject::Literal {
            value: s.clone(),
            datatype: None,
        },
        PropertyValue::Boolean(_) => typed(value.lexical(), "boolean"),
        PropertyValue::Long(_) => typed(value.lexical(), "long"),
        PropertyValue::Date(_) => typed(value.lexical(), "dateTime"),
    }
}

impl StoreSession for MemorySession {
    fn workspace_name(&self) -> &str {
        &self.shared.workspace
    }

    fn node(&self, p: &str) -> Result<Option<Node>, StoreError> {
        self.read(|tree| tree.node(p))
    }

    fn root_node(&self) -> Result<Node, StoreError> {
        self.read(|tree| tree.node(path::ROOT_PATH))?
            .ok_or_else(|| StoreError::Repository("root node missing".to_owned()))
    }

    fn children(&self, node: &Node) -> Result<Vec<Node>, StoreError> {
        self.read(|tree| tree.children(&node.path))
    }

    fn property(&self, node: &Node, name: &str) -> Result<Option<PropertyValue>, StoreError> {
        self.read(|tree| tree.property(&node.path, name))
    }

    fn graph(&self, node: &Node) -> Result<GraphView, StoreError> {
        self.read(|tree| {
            let triples = tree
                .properties(&node.path)
                .into_iter()
                .flatten()
                .map(|(name, value)| Triple {
                    subject: node.path.clone(),
                    predicate: name.clone(),
                    object: graph_object(value),
                })
                .collect();
            GraphView { triples }
        })
    }

    fn content(&self, p: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.read(|tree| tree.content(p))
    }

    fn query(&self, node: &Node, expression: &str) -> Result<Vec<String>, StoreError> {
        let unsupported =
            || StoreError::Repository(format!("unsupported query expression '{expression}'"));
        let (relative, property) = expression.rsplit_once('@').ok_or_else(unsupported)?;
        if property.is_empty() {
            return Err(unsupported());
        }

        let relative = relative.trim_end_matches('/');
        let target = if relative.is_empty() {
            node.path.clone()
        } else if relative.starts_with('/') {
            relative.to_owned()
        } else {
            path::join(&node.path, relative)
        };

        self.read(|tree| {
            tree.property(&target, property)
                .map(|v| vec![v.lexical()])
                .unwrap_or_default()
        })
    }
}

impl AdminSession for MemorySession {
    fn put_content(
        &self,
        p: &str,
        media_type: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Node, StoreError> {
        self.write(|tree| Ok(tree.put_content(p, media_type, file_name, content)))
    }

    fn add_mixin(&self, p: &str, mixin: &str) -> Result<(), StoreError> {
        self.write(|tree| tree.add_mixin(p, mixin))
    }

    fn set_property(&self, p: &str, name: &str, value: PropertyValue) -> Result<(), StoreError> {
        self.write(|tree| tree.set_property(p, name, value))
    }

    fn save(&self) -> Result<(), StoreError> {
        self.shared.check()?;
        if let Some(tree) = self.staged.lock().take() {
            *self.shared.tree.write() = tree;
            tracing::debug!(workspace = %self.shared.workspace, "Saved staged store changes");
        }
        Ok(())
    }
}
