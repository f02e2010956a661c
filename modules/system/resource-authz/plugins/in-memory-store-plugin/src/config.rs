//! Configuration for the in-memory store plugin.

use std::collections::BTreeMap;

use resource_authz_sdk::PropertyValue;
use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InMemoryStorePluginConfig {
    /// Workspace name reported by every session.
    pub workspace: String,

    /// Primary type of the root node.
    pub root_type: String,

    /// Nodes created at startup; missing ancestors become folders.
    pub nodes: Vec<NodeSeed>,

    /// Content blobs created at startup.
    pub contents: Vec<ContentSeed>,
}

impl Default for InMemoryStorePluginConfig {
    fn default() -> Self {
        Self {
            workspace: "default".to_owned(),
            root_type: "mode:root".to_owned(),
            nodes: Vec::new(),
            contents: Vec::new(),
        }
    }
}

/// A node seeded from configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSeed {
    pub path: String,

    #[serde(default = "default_folder_type")]
    pub primary_type: String,

    #[serde(default)]
    pub mixins: Vec<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

/// A content blob seeded from configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentSeed {
    pub path: String,

    #[serde(default = "default_media_type")]
    pub media_type: String,

    pub text: String,
}

pub(crate) fn default_folder_type() -> String {
    "nt:folder".to_owned()
}

fn default_media_type() -> String {
    "application/xml".to_owned()
}
