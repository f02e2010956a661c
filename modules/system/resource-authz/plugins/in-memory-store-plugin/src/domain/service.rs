//! Service implementation for the in-memory store plugin.

use std::sync::Arc;

use parking_lot::RwLock;
use resource_authz_sdk::{AdminSession, PropertyValue, ResourceStore, StoreError, StoreSession};

use super::session::{MemorySession, Shared};
use super::tree::Tree;
use crate::config::InMemoryStorePluginConfig;

/// In-memory resource store.
///
/// Cloning yields another handle onto the same tree.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::from_config(&InMemoryStorePluginConfig::default())
    }
}

impl InMemoryStore {
    /// Create a store seeded from plugin configuration.
    #[must_use]
    pub fn from_config(cfg: &InMemoryStorePluginConfig) -> Self {
        let mut tree = Tree::with_root(&cfg.root_type);
        for seed in &cfg.nodes {
            let node = tree.ensure_node(&seed.path, &seed.primary_type);
            let written = seed
                .mixins
                .iter()
                .try_for_each(|mixin| tree.add_mixin(&node.path, mixin))
                .and_then(|()| {
                    seed.properties.iter().try_for_each(|(name, value)| {
                        tree.set_property(&node.path, name, value.clone())
                    })
                });
            if let Err(e) = written {
                tracing::warn!(path = %seed.path, error = %e, "Skipped node seed");
            }
        }
        for seed in &cfg.contents {
            let file_name = resource_authz_sdk::path::name_of(&seed.path).to_owned();
            tree.put_content(
                &seed.path,
                &seed.media_type,
                &file_name,
                seed.text.clone().into_bytes(),
            );
        }

        tracing::debug!(
            workspace = %cfg.workspace,
            nodes = cfg.nodes.len(),
            contents = cfg.contents.len(),
            "In-memory store seeded"
        );

        Self {
            shared: Arc::new(Shared {
                workspace: cfg.workspace.clone(),
                tree: RwLock::new(tree),
                fault: RwLock::new(None),
            }),
        }
    }

    /// Open a request session.
    #[must_use]
    pub fn open_session(&self) -> Arc<dyn StoreSession> {
        Arc::new(MemorySession::new(Arc::clone(&self.shared)))
    }

    /// Create a node (and missing ancestors) directly in the committed tree.
    pub fn insert_node(&self, path: &str, primary_type: &str) {
        self.shared.tree.write().ensure_node(path, primary_type);
    }

    /// Add a mixin directly in the committed tree.
    ///
    /// # Errors
    ///
    /// [`StoreError::Repository`] if no node exists at `path`.
    pub fn add_mixin(&self, path: &str, mixin: &str) -> Result<(), StoreError> {
        self.shared.tree.write().add_mixin(path, mixin)
    }

    /// Set a property directly in the committed tree.
    ///
    /// # Errors
    ///
    /// [`StoreError::Repository`] if no node exists at `path`.
    pub fn set_property(
        &self,
        path: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), StoreError> {
        self.shared.tree.write().set_property(path, name, value)
    }

    /// Store content directly in the committed tree.
    pub fn put_content(&self, path: &str, media_type: &str, content: &[u8]) {
        let file_name = resource_authz_sdk::path::name_of(path).to_owned();
        self.shared
            .tree
            .write()
            .put_content(path, media_type, &file_name, content.to_vec());
    }

    /// Make every subsequent session operation fail with `fault`; `None` heals.
    pub fn inject_fault(&self, fault: Option<StoreError>) {
        *self.shared.fault.write() = fault;
    }

    fn check_available(&self) -> Result<(), StoreError> {
        match self.shared.fault.read().as_ref() {
            Some(err @ StoreError::Unavailable(_)) => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

impl ResourceStore for InMemoryStore {
    fn internal_session(&self) -> Result<Arc<dyn StoreSession>, StoreError> {
        self.check_available()?;
        Ok(self.open_session())
    }

    fn admin_session(&self) -> Result<Box<dyn AdminSession>, StoreError> {
        self.check_available()?;
        Ok(Box::new(MemorySession::new(Arc::clone(&self.shared))))
    }
}
