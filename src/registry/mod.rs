//! Artifact registries and their naming scopes.
//!
//! A registry is a searchable collection of artifact metadata documents at
//! one canonical [`Location`]. Two variants exist:
//!
//! - [`LocalRegistry`]: a folder of `*.json` documents plus an `index.json`.
//! - [`RemoteRegistry`]: a `.tar.gz` snapshot unpacked into the cache, then
//!   served exactly like a local folder.
//!
//! The [`RegistryDatabase`] loads each location at most once per session,
//! and a [`RegistryResolver`] gives registries short names within one scope
//! (project or global).

use std::sync::Arc;

use async_trait::async_trait;
use semver::Version;

use crate::artifact::ArtifactMetadata;
use crate::error::Result;
use crate::version::VersionRange;

mod catalog;
mod database;
mod local;
mod location;
mod remote;
mod resolver;

pub use catalog::{ArtifactIndex, ArtifactKeys, INDEX_FILE};
pub use database::RegistryDatabase;
pub use local::LocalRegistry;
pub use location::{Location, LocationKind};
pub use remote::{LocalFileFetcher, RemoteRegistry, SnapshotFetcher};
pub use resolver::{CombinedScope, RegistryResolver, RegistryScope};

// ─── Registry ──────────────────────────────────────────────────────

#[async_trait]
pub trait Registry: Send + Sync {
    fn location(&self) -> &Location;

    fn is_loaded(&self) -> bool;

    /// Number of indexed documents.
    fn count(&self) -> usize;

    /// Make the index queryable, from `index.json` or by regenerating.
    async fn load(&self) -> Result<()>;

    /// Persist the index next to the documents.
    async fn save(&self) -> Result<()>;

    /// Refresh from the source of truth, then save. `display_name` is only
    /// used for log output.
    async fn update(&self, display_name: Option<&str>) -> Result<()>;

    /// Rebuild the index from every document. With `normalize`, documents are
    /// rewritten in canonical form.
    async fn regenerate(&self, normalize: bool) -> Result<()>;

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<ArtifactGroup>>;

    async fn metadata(&self, target: &str) -> Result<Arc<ArtifactMetadata>>;
}

// ─── Search ────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct SearchCriteria {
    /// Exact identity, or a short name when nothing matches exactly.
    pub id_or_short_name: Option<String>,
    pub version: Option<VersionRange>,
    /// Case-insensitive substring of the identity, summary or description.
    pub keyword: Option<String>,
}

impl SearchCriteria {
    pub fn id(id: &str) -> Self {
        Self {
            id_or_short_name: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, range: VersionRange) -> Self {
        self.version = Some(range);
        self
    }

    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.keyword = Some(keyword.to_string());
        self
    }
}

/// One document found by a search.
#[derive(Clone, Debug)]
pub struct Listing {
    pub target: String,
    pub metadata: Arc<ArtifactMetadata>,
}

impl Listing {
    pub fn version(&self) -> &Version {
        &self.metadata.version
    }
}

/// All matching versions of one identity, newest first.
#[derive(Clone, Debug)]
pub struct ArtifactGroup {
    pub id: String,
    pub listings: Vec<Listing>,
}

impl ArtifactGroup {
    pub fn latest(&self) -> Option<&Listing> {
        self.listings.first()
    }
}
