//! The node tree backing the store.

use std::collections::BTreeMap;

use resource_authz_sdk::{Node, PropertyValue, StoreError, path};

use crate::config::default_folder_type;

/// Primary type of nodes created by `put_content`.
pub const FILE_NODE_TYPE: &str = "nt:file";
pub const MIME_TYPE_PROPERTY: &str = "jcr:mimeType";
pub const FILE_NAME_PROPERTY: &str = "ebucore:filename";

#[derive(Debug, Clone)]
struct StoredNode {
    node: Node,
    properties: BTreeMap<String, PropertyValue>,
}

/// Nodes keyed by normalized path, plus content blobs keyed the same way.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: BTreeMap<String, StoredNode>,
    contents: BTreeMap<String, Vec<u8>>,
}

fn normalize(raw: &str) -> &str {
    let trimmed = raw.strip_suffix('/').unwrap_or(raw);
    path::or_root(trimmed)
}

fn not_found(p: &str) -> StoreError {
    StoreError::Repository(format!("no node at '{p}'"))
}

impl Tree {
    pub fn with_root(root_type: &str) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            path::ROOT_PATH.to_owned(),
            StoredNode {
                node: Node::new(path::ROOT_PATH, root_type),
                properties: BTreeMap::new(),
            },
        );
        Self {
            nodes,
            contents: BTreeMap::new(),
        }
    }

    pub fn node(&self, raw: &str) -> Option<Node> {
        self.nodes.get(normalize(raw)).map(|s| s.node.clone())
    }

    /// Create the node at `raw` unless it exists, creating missing ancestors
    /// as folders. An existing node keeps its type.
    pub fn ensure_node(&mut self, raw: &str, primary_type: &str) -> Node {
        let p = normalize(raw);
        if let Some(parent) = path::parent_path(p)
            && !self.nodes.contains_key(parent)
        {
            self.ensure_node(parent, &default_folder_type());
        }
        self.nodes
            .entry(p.to_owned())
            .or_insert_with(|| StoredNode {
                node: Node::new(p, primary_type),
                properties: BTreeMap::new(),
            })
            .node
            .clone()
    }

    pub fn children(&self, raw: &str) -> Vec<Node> {
        let p = normalize(raw);
        let prefix = if path::is_root(p) {
            path::ROOT_PATH.to_owned()
        } else {
            format!("{p}/")
        };
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| {
                let rest = &k[prefix.len()..];
                !rest.is_empty() && !rest.contains('/')
            })
            .map(|(_, s)| s.node.clone())
            .collect()
    }

    pub fn properties(&self, raw: &str) -> Option<&BTreeMap<String, PropertyValue>> {
        self.nodes.get(normalize(raw)).map(|s| &s.properties)
    }

    pub fn property(&self, raw: &str, name: &str) -> Option<PropertyValue> {
        self.properties(raw).and_then(|props| props.get(name).cloned())
    }

    pub fn set_property(
        &mut self,
        raw: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), StoreError> {
        let stored = self.nodes.get_mut(normalize(raw)).ok_or_else(|| not_found(raw))?;
        stored.properties.insert(name.to_owned(), value);
        Ok(())
    }

    pub fn add_mixin(&mut self, raw: &str, mixin: &str) -> Result<(), StoreError> {
        let stored = self.nodes.get_mut(normalize(raw)).ok_or_else(|| not_found(raw))?;
        if !stored.node.mixins.iter().any(|m| m == mixin) {
            stored.node.mixins.push(mixin.to_owned());
        }
        Ok(())
    }

    pub fn put_content(
        &mut self,
        raw: &str,
        media_type: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Node {
        let node = self.ensure_node(raw, FILE_NODE_TYPE);
        if let Some(stored) = self.nodes.get_mut(node.path.as_str()) {
            stored.properties.insert(
                MIME_TYPE_PROPERTY.to_owned(),
                PropertyValue::String(media_type.to_owned()),
            );
            stored.properties.insert(
                FILE_NAME_PROPERTY.to_owned(),
                PropertyValue::String(file_name.to_owned()),
            );
        }
        self.contents.insert(node.path.clone(), content);
        node
    }

    pub fn content(&self, raw: &str) -> Option<Vec<u8>> {
        self.contents.get(normalize(raw)).cloned()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn ensure_node_creates_ancestors() {
        let mut tree = Tree::with_root("mode:root");
        tree.ensure_node("/foo/bar/baz", "nt:file");

        assert_eq!(tree.node("/foo").unwrap().primary_type, "nt:folder");
        assert_eq!(tree.node("/foo/bar/baz").unwrap().primary_type, "nt:file");
        assert_eq!(tree.node("/foo/bar/").unwrap().path, "/foo/bar");
    }

    #[test]
    fn children_are_immediate_only() {
        let mut tree = Tree::with_root("mode:root");
        tree.ensure_node("/foo/bar/baz", "nt:folder");
        tree.ensure_node("/foobar", "nt:folder");

        let root: Vec<_> = tree.children("/").into_iter().map(|n| n.path).collect();
        assert_eq!(root, vec!["/foo", "/foobar"]);
        let foo: Vec<_> = tree.children("/foo").into_iter().map(|n| n.path).collect();
        assert_eq!(foo, vec!["/foo/bar"]);
        assert!(tree.children("/foo/bar/baz").is_empty());
    }

    #[test]
    fn writes_to_missing_nodes_fail() {
        let mut tree = Tree::with_root("mode:root");
        assert!(tree.add_mixin("/missing", "ex:mixin").is_err());
        assert!(
            tree.set_property("/missing", "ex:p", PropertyValue::Boolean(true))
                .is_err()
        );
    }

    #[test]
    fn content_records_media_type() {
        let mut tree = Tree::with_root("mode:root");
        tree.put_content("/policies/p", "application/xml", "p.xml", b"<Policy/>".to_vec());

        assert_eq!(tree.content("/policies/p").unwrap(), b"<Policy/>");
        assert_eq!(
            tree.property("/policies/p", MIME_TYPE_PROPERTY),
            Some(PropertyValue::String("application/xml".to_owned()))
        );
    }
}
