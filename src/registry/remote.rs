use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::artifact::ArtifactMetadata;
use crate::error::{Error, Result};

use super::catalog::INDEX_FILE;
use super::local::LocalRegistry;
use super::{ArtifactGroup, Location, Registry, SearchCriteria};

// ─── Snapshot Fetching ─────────────────────────────────────────────

/// Retrieves the raw bytes of a registry snapshot archive.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>>;
}

/// Serves `file://` snapshots; every other scheme is unsupported.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileFetcher;

#[async_trait]
impl SnapshotFetcher for LocalFileFetcher {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>> {
        let url = location.url()?;
        if url.scheme() != "file" {
            return Err(Error::UnsupportedLocation(location.to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|()| Error::UnsupportedLocation(location.to_string()))?;
        std::fs::read(&path).map_err(|e| Error::io(path, e))
    }
}

// ─── Remote Registry ───────────────────────────────────────────────

/// A registry published as a `.tar.gz` snapshot.
///
/// The snapshot is unpacked into a per-location cache folder; from then on
/// every query is served by a [`LocalRegistry`] over that folder.
pub struct RemoteRegistry {
    cache_folder: PathBuf,
    fetcher: Arc<dyn SnapshotFetcher>,
    local: LocalRegistry,
}

impl RemoteRegistry {
    pub fn new(location: Location, cache_folder: PathBuf, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        Self {
            local: LocalRegistry::new(location, cache_folder.clone()),
            cache_folder,
            fetcher,
        }
    }

    pub fn cache_folder(&self) -> &Path {
        &self.cache_folder
    }

    fn has_snapshot(&self) -> bool {
        self.cache_folder.join(INDEX_FILE).is_file()
    }

    fn archive_error(&self, reason: impl ToString) -> Error {
        Error::Archive {
            location: self.location().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Registry for RemoteRegistry {
    fn location(&self) -> &Location {
        self.local.location()
    }

    fn is_loaded(&self) -> bool {
        self.local.is_loaded()
    }

    fn count(&self) -> usize {
        self.local.count()
    }

    async fn load(&self) -> Result<()> {
        if self.has_snapshot() {
            debug!(registry = %self.location(), "using cached snapshot");
            self.local.load().await
        } else {
            self.update(None).await
        }
    }

    async fn save(&self) -> Result<()> {
        self.local.save().await
    }

    async fn update(&self, display_name: Option<&str>) -> Result<()> {
        let bytes = self.fetcher.fetch(self.location()).await?;
        let staging = self.cache_folder.with_extension("staging");
        let target = self.cache_folder.clone();
        tokio::task::spawn_blocking(move || unpack_and_swap(&bytes, &staging, &target))
            .await
            .map_err(|e| self.archive_error(e))?
            .map_err(|e| self.archive_error(e))?;

        self.local.load().await?;
        if !self.has_snapshot() {
            self.local.save().await?;
        }
        info!(
            registry = display_name.unwrap_or(self.location().as_str()),
            artifacts = self.count(),
            "updated registry snapshot"
        );
        Ok(())
    }

    async fn regenerate(&self, normalize: bool) -> Result<()> {
        self.local.regenerate(normalize).await
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<ArtifactGroup>> {
        self.local.search(criteria).await
    }

    async fn metadata(&self, target: &str) -> Result<Arc<ArtifactMetadata>> {
        self.local.metadata(target).await
    }
}

/// Unpack a gzip'd tarball into `staging`, then move it over `target`.
///
/// The previous snapshot is only removed once the new one unpacked cleanly.
fn unpack_and_swap(bytes: &[u8], staging: &Path, target: &Path) -> std::io::Result<()> {
    if staging.exists() {
        std::fs::remove_dir_all(staging)?;
    }
    std::fs::create_dir_all(staging)?;

    let mut decoder = GzDecoder::new(bytes);
    let mut tarball = Vec::new();
    decoder.read_to_end(&mut tarball)?;
    let mut archive = tar::Archive::new(tarball.as_slice());
    archive.set_preserve_permissions(false);
    if let Err(e) = archive.unpack(staging) {
        let _ = std::fs::remove_dir_all(staging);
        return Err(e);
    }

    swap_into_place(staging, target)
}

/// Move `staging` to `target`. An existing `target` is set aside first and
/// put back if the move fails; it is deleted only once `staging` is in place.
pub(super) fn swap_into_place(staging: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let previous = target.with_extension("previous");
    if previous.exists() {
        std::fs::remove_dir_all(&previous)?;
    }

    let had_previous = target.exists();
    if had_previous {
        std::fs::rename(target, &previous)?;
    }
    if let Err(e) = std::fs::rename(staging, target) {
        if had_previous {
            std::fs::rename(&previous, target)?;
        }
        return Err(e);
    }
    if had_previous {
        std::fs::remove_dir_all(&previous)?;
    }
    Ok(())
}
