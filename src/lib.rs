//! Artifact metadata registries and dependency resolution.
//!
//! Registries are folders (or `.tar.gz` snapshots of folders) of JSON
//! metadata documents. Each is indexed by a typed in-memory [`index`] that
//! answers version-range and string queries. The [`resolve`] module walks the
//! dependency graph of selected artifacts and produces an installation plan
//! ordered dependencies first.

pub mod artifact;
pub mod config;
pub mod error;
pub mod index;
pub mod registry;
pub mod resolve;
pub mod session;
pub mod version;

pub use error::{Error, Result};
