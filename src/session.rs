//! A session owns the state one command runs against: the registry
//! database, the global and project scopes, and the host platform.
//!
//! Nothing here is process-global; two sessions in one process share
//! nothing but the filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::artifact::{Artifact, DependencySpec, HostContext};
use crate::config::{self, GlobalConfig, ProjectConfig};
use crate::error::{Error, Result};
use crate::registry::{LocalFileFetcher, RegistryDatabase, RegistryResolver, RegistryScope, SnapshotFetcher};
use crate::resolve::{find_artifact, DependencyResolver, ResolvedArtifact};
use crate::version::VersionReference;

/// Registry name used for requirements without a `registry:` qualifier.
pub const DEFAULT_REGISTRY: &str = "default";

/// Explicit inputs for [`Session::new`]; unset fields are discovered.
#[derive(Clone, Default)]
pub struct SessionOptions {
    pub home: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    /// Where to start looking for `quiver.toml`. `None` uses the working directory.
    pub project_dir: Option<PathBuf>,
    pub fetcher: Option<Arc<dyn SnapshotFetcher>>,
    pub host: Option<HostContext>,
}

pub struct Session {
    home: PathBuf,
    database: Arc<RegistryDatabase>,
    global: RegistryResolver,
    project: Option<(ProjectConfig, RegistryResolver)>,
    host: HostContext,
}

impl Session {
    pub fn new(options: SessionOptions) -> Result<Self> {
        let explicit_home = options.home.is_some();
        let home = options
            .home
            .or_else(config::home_dir)
            .ok_or_else(|| Error::Config {
                path: PathBuf::from("~"),
                reason: "cannot determine home directory; set QUIVER_HOME".to_string(),
            })?;
        // An explicit home keeps its cache inside it unless a cache is given too.
        let cache = match options.cache {
            Some(cache) => cache,
            None if explicit_home => home.join("cache"),
            None => config::cache_dir().unwrap_or_else(|| home.join("cache")),
        };
        let fetcher = options.fetcher.unwrap_or_else(|| Arc::new(LocalFileFetcher));
        let database = Arc::new(RegistryDatabase::new(cache, fetcher));

        let mut global = RegistryResolver::new(database.clone());
        GlobalConfig::load(&config::global_config_path(&home))?.register(&mut global, &home)?;

        let start = match options.project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(|e| Error::io(".", e))?,
        };
        let project = match ProjectConfig::find(&start) {
            Some(path) => {
                debug!(path = %path.display(), "using project config");
                let project = ProjectConfig::load(&path)?;
                let mut scope = RegistryResolver::new(database.clone());
                project.register(&mut scope)?;
                Some((project, scope))
            }
            None => None,
        };

        Ok(Self {
            home,
            database,
            global,
            project,
            host: options.host.unwrap_or_else(HostContext::current),
        })
    }

    /// Session for the current user and working directory.
    pub fn discover() -> Result<Self> {
        Self::new(SessionOptions::default())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn database(&self) -> &Arc<RegistryDatabase> {
        &self.database
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    pub fn global_scope(&self) -> &RegistryResolver {
        &self.global
    }

    pub fn project(&self) -> Option<&ProjectConfig> {
        self.project.as_ref().map(|(config, _)| config)
    }

    /// The project scope over the global scope, or just the global scope.
    pub fn scope(&self) -> Arc<dyn RegistryScope> {
        match &self.project {
            Some((_, project)) => Arc::new(project.with(Arc::new(self.global.clone()))),
            None => Arc::new(self.global.clone()),
        }
    }

    /// Find the root artifact for each `(spec, reference)` requirement.
    pub async fn select(&self, requirements: &[(String, VersionReference)]) -> Result<Vec<Artifact>> {
        let scope = self.scope();
        let requester = self
            .project()
            .map(ProjectConfig::name)
            .unwrap_or_else(|| "command line".to_string());

        let mut roots = Vec::with_capacity(requirements.len());
        for (spec, reference) in requirements {
            let spec = DependencySpec::parse(spec);
            let name = spec.registry.as_deref().unwrap_or(DEFAULT_REGISTRY);
            let registry = scope
                .registry_by_name(name)
                .await?
                .ok_or_else(|| Error::UnresolvableRegistry {
                    name: name.to_string(),
                    requester: requester.clone(),
                })?;
            let artifact = find_artifact(&registry, &self.database, &spec.id, reference)
                .await?
                .ok_or_else(|| Error::UnresolvableDependency {
                    id: spec.id.clone(),
                    range: reference.to_string(),
                    registry: scope.display_name(registry.location()),
                })?;
            roots.push(artifact);
        }
        Ok(roots)
    }

    /// Select `requirements` and resolve their installation plan.
    pub async fn resolve(
        &self,
        requirements: &[(String, VersionReference)],
        cutoff_depth: usize,
    ) -> Result<Vec<ResolvedArtifact>> {
        let roots = self.select(requirements).await?;
        DependencyResolver::new(self.host.clone())
            .resolve(roots, self.scope(), cutoff_depth)
            .await
    }
}
