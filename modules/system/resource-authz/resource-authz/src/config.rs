//! Configuration for the resource `AuthZ` module.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use resource_authz_sdk::DEFAULT_POLICY_URI_PREFIX;
use serde::{Deserialize, Serialize};

/// Prefix of environment variables overriding file configuration.
pub const ENV_PREFIX: &str = "RESOURCE_AUTHZ__";

/// Configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceAuthzConfig {
    /// Scheme prefix of policy ids; stripping it yields the store path.
    pub policy_uri_prefix: String,

    /// Node property holding the assigned-policy reference.
    pub policy_property: String,

    /// Mixin marking a node as able to carry an assigned policy.
    pub assignable_mixin: String,

    /// Action that forces the descendants scope.
    pub remove_action: String,

    /// Actions that address a not-yet-existing child or property, so the
    /// parent is looked up instead.
    pub parent_addressed_actions: Vec<String>,

    /// Child names never reported by the descendant finder.
    pub excluded_child_names: Vec<String>,

    /// Node types never reported by the descendant finder.
    pub excluded_node_types: Vec<String>,

    /// Principal whose roles apply to every subject.
    pub everyone_principal: String,

    /// Dump requests and results at DEBUG.
    pub dump_requests: bool,

    /// Cache parsed policies by store path.
    pub policy_cache: bool,

    /// Default policies loaded at startup.
    pub bootstrap: Option<BootstrapConfig>,
}

impl Default for ResourceAuthzConfig {
    fn default() -> Self {
        Self {
            policy_uri_prefix: DEFAULT_POLICY_URI_PREFIX.to_owned(),
            policy_property: "authz:policy".to_owned(),
            assignable_mixin: "authz:xacmlAssignable".to_owned(),
            remove_action: "remove".to_owned(),
            parent_addressed_actions: vec!["add_node".to_owned(), "set_property".to_owned()],
            excluded_child_names: vec!["jcr:content".to_owned(), "jcr:system".to_owned()],
            excluded_node_types: vec!["mode:system".to_owned(), "nt:frozenNode".to_owned()],
            everyone_principal: "EVERYONE".to_owned(),
            dump_requests: false,
            policy_cache: true,
            bootstrap: None,
        }
    }
}

/// Default policy bootstrap configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Directory whose files are loaded as policies.
    pub policies_dir: PathBuf,
    /// Policy assigned to the store root.
    pub root_policy_file: PathBuf,
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
#[error("invalid resource authz configuration: {0}")]
pub struct ConfigError(#[from] Box<figment::Error>);

impl ResourceAuthzConfig {
    /// Load from a YAML file, with `RESOURCE_AUTHZ__*` environment overrides.
    ///
    /// Missing keys fall back to defaults; a missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the merged configuration does not deserialize.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::figment()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError(Box::new(e)))
    }

    /// Parse from a YAML string, without environment overrides.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the document does not deserialize.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Self::figment()
            .merge(Yaml::string(yaml))
            .extract()
            .map_err(|e| ConfigError(Box::new(e)))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }
}
