//! Default policy bootstrap.
//!
//! Loads the policy files of a directory into the store, each at the path its
//! declared id maps to, and assigns the root policy to the store root so that
//! every policy lookup terminates with a governing policy.

use std::fs;
use std::path::{Path, PathBuf};

use resource_authz_sdk::{
    AdminSession, PolicyIdMapper, PropertyValue, ResourceStore, policy_id_of,
};

use super::error::BootstrapError;
use crate::config::ResourceAuthzConfig;

/// Media type policies are stored with.
pub const POLICY_MEDIA_TYPE: &str = "application/xml";

/// Loads default policies into a store workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceInitializer {
    policies_dir: PathBuf,
    root_policy_file: PathBuf,
    mapper: PolicyIdMapper,
    assignable_mixin: String,
    policy_property: String,
}

impl WorkspaceInitializer {
    /// # Errors
    ///
    /// [`BootstrapError`] if the directory is missing or holds no files, or
    /// if the root policy file does not exist.
    pub fn new(
        policies_dir: impl Into<PathBuf>,
        root_policy_file: impl Into<PathBuf>,
        cfg: &ResourceAuthzConfig,
    ) -> Result<Self, BootstrapError> {
        let policies_dir = policies_dir.into();
        let root_policy_file = root_policy_file.into();

        if !policies_dir.is_dir() {
            return Err(BootstrapError::PoliciesDirMissing(policies_dir));
        }
        if policy_files(&policies_dir)?.is_empty() {
            return Err(BootstrapError::PoliciesDirEmpty(policies_dir));
        }
        if !root_policy_file.is_file() {
            return Err(BootstrapError::RootPolicyMissing(root_policy_file));
        }

        Ok(Self {
            policies_dir,
            root_policy_file,
            mapper: PolicyIdMapper::new(cfg.policy_uri_prefix.clone()),
            assignable_mixin: cfg.assignable_mixin.clone(),
            policy_property: cfg.policy_property.clone(),
        })
    }

    /// The initializer described by `cfg.bootstrap`, if any.
    ///
    /// # Errors
    ///
    /// See [`WorkspaceInitializer::new`].
    pub fn from_config(cfg: &ResourceAuthzConfig) -> Result<Option<Self>, BootstrapError> {
        cfg.bootstrap
            .as_ref()
            .map(|b| Self::new(&b.policies_dir, &b.root_policy_file, cfg))
            .transpose()
    }

    /// Store every policy, then assign the root policy to the root node.
    ///
    /// Each phase is saved on its own. Running again overwrites the same
    /// paths.
    ///
    /// # Errors
    ///
    /// [`BootstrapError`] if a file cannot be read or parsed, an id lacks
    /// the policy prefix, or the store rejects a write.
    #[tracing::instrument(skip_all, fields(policies_dir = %self.policies_dir.display()))]
    pub fn init(&self, store: &dyn ResourceStore) -> Result<(), BootstrapError> {
        let session = store.admin_session()?;

        let mut loaded = 0_usize;
        for file in policy_files(&self.policies_dir)? {
            self.store_policy(session.as_ref(), &file)?;
            loaded += 1;
        }
        session.save()?;

        let root_path = self.store_policy(session.as_ref(), &self.root_policy_file)?;
        let root = session.root_node()?;
        session.add_mixin(&root.path, &self.assignable_mixin)?;
        session.set_property(
            &root.path,
            &self.policy_property,
            PropertyValue::Reference(root_path.clone()),
        )?;
        session.save()?;

        tracing::info!(loaded, root_policy = %root_path, "Default policies loaded");
        Ok(())
    }

    /// Store one policy file and return the path it was stored at.
    fn store_policy(&self, session: &dyn AdminSession, file: &Path) -> Result<String, BootstrapError> {
        let content = fs::read(file).map_err(|source| BootstrapError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let id = policy_id_of(&content).map_err(|source| BootstrapError::Policy {
            path: file.to_path_buf(),
            source,
        })?;
        let store_path = self.mapper.path_for_id(&id)?.to_owned();
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        session.put_content(&store_path, POLICY_MEDIA_TYPE, &file_name, content)?;
        tracing::debug!(policy_id = %id, store_path = %store_path, "Stored policy");
        Ok(store_path)
    }
}

/// Regular files of `dir`, sorted by path.
fn policy_files(dir: &Path) -> Result<Vec<PathBuf>, BootstrapError> {
    let io = |source| BootstrapError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
