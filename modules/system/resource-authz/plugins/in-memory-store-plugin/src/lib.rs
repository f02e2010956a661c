#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! In-Memory Resource Store Plugin
//!
//! Keeps the resource tree, its properties and content blobs in memory. Meant
//! for development and tests of the `resource_authz` module.
//!
//! ## Query expressions
//!
//! Sessions answer `[relative/path]@property`: the lexical value(s) of
//! `property` on the node found by joining the relative path to the queried
//! node.
//!
//! ## Configuration
//!
//! ```yaml
//! workspace: default
//! nodes:
//!   - path: /projects/apollo
//!     primary_type: nt:folder
//!     properties:
//!       ex:owner: { type: string, value: alice }
//! contents:
//!   - path: /policies/RootPolicy
//!     text: "<Policy PolicyId=\"info:fedora/policies/RootPolicy\"/>"
//! ```

pub mod config;
pub mod domain;

pub use config::InMemoryStorePluginConfig;
pub use domain::InMemoryStore;
