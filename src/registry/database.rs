use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{Error, Result};

use super::{LocalRegistry, Location, LocationKind, Registry, RemoteRegistry, SnapshotFetcher};

type Slot = Arc<OnceCell<Arc<dyn Registry>>>;

/// Session-scoped cache of loaded registries, keyed by canonical location.
///
/// Loads are single-flight: concurrent `load` calls for one location share a
/// single construction and load. A failed load leaves the slot empty, so a
/// later call tries again.
pub struct RegistryDatabase {
    cache_folder: PathBuf,
    fetcher: Arc<dyn SnapshotFetcher>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl RegistryDatabase {
    /// `cache_folder` receives unpacked remote snapshots under `registries/`.
    pub fn new(cache_folder: impl Into<PathBuf>, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        Self {
            cache_folder: cache_folder.into(),
            fetcher,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_folder(&self) -> &Path {
        &self.cache_folder
    }

    /// Folder a remote snapshot of `location` unpacks into.
    pub fn snapshot_folder(&self, location: &Location) -> PathBuf {
        let hash = blake3::hash(location.as_str().as_bytes()).to_hex();
        self.cache_folder.join("registries").join(&hash.as_str()[..16])
    }

    /// Construct the registry variant for `location` without loading it.
    pub fn open(&self, location: &Location) -> Result<Arc<dyn Registry>> {
        Ok(match location.kind()? {
            LocationKind::Folder(folder) => Arc::new(LocalRegistry::new(location.clone(), folder)),
            LocationKind::Archive(_) => Arc::new(RemoteRegistry::new(
                location.clone(),
                self.snapshot_folder(location),
                self.fetcher.clone(),
            )),
        })
    }

    /// The loaded registry at `location`, loading it on first use.
    pub async fn load(&self, location: &Location) -> Result<Arc<dyn Registry>> {
        let slot = self
            .slots
            .lock()
            .entry(location.as_str().to_string())
            .or_default()
            .clone();

        if let Some(registry) = slot.get() {
            debug!(registry = %location, "registry cache hit");
            return Ok(registry.clone());
        }

        let registry = slot
            .get_or_try_init(|| async {
                let registry = self.open(location)?;
                registry.load().await?;
                Ok::<_, Error>(registry)
            })
            .await?;
        Ok(registry.clone())
    }

    /// The registry at `location` if it has already been loaded.
    pub fn get(&self, location: &Location) -> Option<Arc<dyn Registry>> {
        self.slots
            .lock()
            .get(location.as_str())
            .and_then(|slot| slot.get().cloned())
    }

    /// Every loaded registry, ordered by location.
    pub fn loaded(&self) -> Vec<Arc<dyn Registry>> {
        let slots = self.slots.lock();
        let mut registries: Vec<Arc<dyn Registry>> =
            slots.values().filter_map(|slot| slot.get().cloned()).collect();
        registries.sort_by(|a, b| a.location().cmp(b.location()));
        registries
    }
}
