use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::artifact::ArtifactMetadata;
use crate::error::{Error, Result};
use crate::index::SerializedIndex;

use super::catalog::{ArtifactIndex, INDEX_FILE};
use super::{ArtifactGroup, Listing, Location, Registry, SearchCriteria};

/// A registry backed by a folder of artifact documents.
///
/// Layout:
/// ```text
/// registry/
/// ├── index.json
/// ├── cmake.json
/// └── compilers/
///     └── gcc-10.json
/// ```
/// Targets are the forward-slash paths of documents relative to the folder.
pub struct LocalRegistry {
    location: Location,
    folder: PathBuf,
    catalog: RwLock<ArtifactIndex>,
    loaded: AtomicBool,
    documents: Mutex<HashMap<String, Arc<ArtifactMetadata>>>,
}

impl LocalRegistry {
    /// A registry reporting `location` whose documents live in `folder`.
    pub fn new(location: Location, folder: impl Into<PathBuf>) -> Self {
        Self {
            location,
            folder: folder.into(),
            catalog: RwLock::new(ArtifactIndex::new()),
            loaded: AtomicBool::new(false),
            documents: Mutex::new(HashMap::new()),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn index_path(&self) -> PathBuf {
        self.folder.join(INDEX_FILE)
    }

    fn read_index(&self) -> Result<SerializedIndex> {
        let path = self.index_path();
        let text = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        serde_json::from_str(&text).map_err(|e| Error::MalformedIndex(format!("{}: {}", path.display(), e)))
    }

    fn install(&self, catalog: ArtifactIndex, documents: HashMap<String, Arc<ArtifactMetadata>>) {
        *self.catalog.write() = catalog;
        *self.documents.lock() = documents;
        self.loaded.store(true, Ordering::Release);
    }
}

#[async_trait]
impl Registry for LocalRegistry {
    fn location(&self) -> &Location {
        &self.location
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    fn count(&self) -> usize {
        self.catalog.read().index.len()
    }

    async fn load(&self) -> Result<()> {
        if !self.index_path().is_file() {
            debug!(folder = %self.folder.display(), "no index file, regenerating");
            return self.regenerate(false).await;
        }

        let loaded = self.read_index().and_then(|data| {
            let mut catalog = ArtifactIndex::new();
            catalog.index.load_serialized(data)?;
            Ok(catalog)
        });
        match loaded {
            Ok(catalog) => {
                info!(registry = %self.location, artifacts = catalog.index.len(), "loaded registry index");
                self.install(catalog, HashMap::new());
                Ok(())
            }
            Err(Error::MalformedIndex(reason)) => {
                warn!(registry = %self.location, %reason, "ignoring unreadable index, regenerating");
                self.regenerate(false).await
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self) -> Result<()> {
        let data = self.catalog.read().index.serialize();
        let text = serde_json::to_string(&data)?;
        let path = self.index_path();
        std::fs::write(&path, text).map_err(|e| Error::io(&path, e))?;
        debug!(path = %path.display(), "wrote registry index");
        Ok(())
    }

    async fn update(&self, display_name: Option<&str>) -> Result<()> {
        self.regenerate(false).await?;
        self.save().await?;
        info!(
            registry = display_name.unwrap_or(self.location.as_str()),
            artifacts = self.count(),
            "updated registry"
        );
        Ok(())
    }

    async fn regenerate(&self, normalize: bool) -> Result<()> {
        let folder = self.folder.clone();
        let documents = tokio::task::spawn_blocking(move || scan(&folder, normalize))
            .await
            .map_err(|e| Error::io(&self.folder, std::io::Error::other(e)))??;

        let mut catalog = ArtifactIndex::new();
        for (target, metadata) in &documents {
            catalog.index.insert(metadata, target);
        }
        catalog.index.done_insertion();
        info!(registry = %self.location, artifacts = documents.len(), "regenerated registry index");

        let documents = documents
            .into_iter()
            .map(|(target, metadata)| (target, Arc::new(metadata)))
            .collect();
        self.install(catalog, documents);
        Ok(())
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<ArtifactGroup>> {
        let targets = self.catalog.read().select(criteria);
        let keyword = criteria.keyword.as_ref().map(|k| k.to_lowercase());

        let mut groups: BTreeMap<String, Vec<Listing>> = BTreeMap::new();
        for target in targets {
            let metadata = self.metadata(&target).await?;
            if let Some(keyword) = &keyword {
                if !mentions(&metadata, keyword) {
                    continue;
                }
            }
            groups
                .entry(metadata.id.clone())
                .or_default()
                .push(Listing { target, metadata });
        }

        Ok(groups
            .into_iter()
            .map(|(id, mut listings)| {
                listings.sort_by(|a, b| b.version().cmp(a.version()));
                ArtifactGroup { id, listings }
            })
            .collect())
    }

    async fn metadata(&self, target: &str) -> Result<Arc<ArtifactMetadata>> {
        if let Some(found) = self.documents.lock().get(target) {
            return Ok(found.clone());
        }
        let path = self.folder.join(target);
        let text = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let metadata = Arc::new(ArtifactMetadata::from_json(target, &text)?);
        self.documents
            .lock()
            .insert(target.to_string(), metadata.clone());
        Ok(metadata)
    }
}

fn mentions(metadata: &ArtifactMetadata, keyword: &str) -> bool {
    let hit = |text: &str| text.to_lowercase().contains(keyword);
    hit(&metadata.id)
        || metadata.summary.as_deref().is_some_and(hit)
        || metadata.description.as_deref().is_some_and(hit)
}

/// Read every artifact document under `folder`, sorted by target.
///
/// Documents that cannot be read or parsed are logged and skipped.
fn scan(folder: &Path, normalize: bool) -> Result<Vec<(String, ArtifactMetadata)>> {
    if !folder.is_dir() {
        return Err(Error::io(
            folder,
            std::io::Error::new(std::io::ErrorKind::NotFound, "registry folder not found"),
        ));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable registry entry");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(folder) else {
            continue;
        };
        let target = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if target == INDEX_FILE {
            continue;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(target = %target, error = %e, "skipping unreadable artifact document");
                continue;
            }
        };
        let metadata = match ArtifactMetadata::from_json(&target, &text) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(error = %e, "skipping malformed artifact document");
                continue;
            }
        };

        if normalize {
            let pretty = metadata.to_pretty_json()?;
            if pretty != text {
                std::fs::write(path, &pretty).map_err(|e| Error::io(path, e))?;
                debug!(target = %target, "normalized artifact document");
            }
        }
        documents.push((target, metadata));
    }
    Ok(documents)
}
