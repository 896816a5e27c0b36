//! Dependency graph resolution.
//!
//! Turns a set of requested artifacts into an ordered, deduplicated
//! installation plan. The walk is breadth-first and layer-synchronous:
//!
//! 1. Every node of a layer records `(depth, priority)` for its unique id,
//!    overwriting any earlier record, so the last (deepest) layer a node is
//!    reached at wins.
//! 2. A node seen before is not expanded again; this ends cycles and
//!    collapses diamonds.
//! 3. Dependency lookups for the nodes of one layer run concurrently; the
//!    next layer starts only once they have all finished.
//! 4. Before the layer at `cutoff_depth` runs, the set of nodes resolved so
//!    far becomes the initial selection. A graph shallower than the cutoff
//!    selects everything.
//!
//! The plan is sorted by depth descending, then priority ascending, so every
//! dependency lands before the artifacts that need it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::artifact::{Artifact, DependencySpec, HostContext};
use crate::error::{Error, Result};
use crate::registry::{Registry, RegistryDatabase, RegistryScope, SearchCriteria};
use crate::version::VersionReference;

mod plan;

pub use plan::render_plan;

// ─── Resolved Artifact ─────────────────────────────────────────────

/// One entry of an installation plan.
#[derive(Clone, Debug)]
pub struct ResolvedArtifact {
    pub artifact: Artifact,
    /// `registryLocation::identity::version`.
    pub unique_id: String,
    /// Requested directly, or reached above the cutoff depth.
    pub initial_selection: bool,
    /// Deepest BFS layer the artifact was reached at, counting roots as 1.
    pub depth: usize,
    pub priority: i64,
}

impl ResolvedArtifact {
    /// Short `registryName:identity` form as seen from `scope`.
    pub fn reference(&self, scope: &dyn RegistryScope) -> String {
        format!(
            "{}:{}",
            scope.display_name(self.artifact.registry.location()),
            self.artifact.id()
        )
    }
}

// ─── Resolver ──────────────────────────────────────────────────────

/// Resolves installation plans for one host platform.
#[derive(Clone, Debug)]
pub struct DependencyResolver {
    host: HostContext,
}

impl DependencyResolver {
    pub fn new(host: HostContext) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    /// Resolve `roots` and everything they transitively require.
    ///
    /// `root_scope` supplies registry names the roots may use in addition to
    /// the registries they declare themselves. Transitive artifacts only see
    /// their own declarations.
    pub async fn resolve(
        &self,
        roots: Vec<Artifact>,
        root_scope: Arc<dyn RegistryScope>,
        cutoff_depth: usize,
    ) -> Result<Vec<ResolvedArtifact>> {
        let mut resolved: Vec<(String, Artifact)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut orderer: HashMap<String, (usize, i64)> = HashMap::new();
        let mut initial: Option<HashSet<String>> = None;

        let mut layer = roots;
        let mut depth = 1;
        while !layer.is_empty() {
            if depth == cutoff_depth {
                initial = Some(seen.clone());
            }

            let mut expand = Vec::new();
            for artifact in layer {
                let unique_id = artifact.unique_id();
                orderer.insert(unique_id.clone(), (depth, artifact.priority()));
                if !seen.insert(unique_id.clone()) {
                    debug!(artifact = %unique_id, depth, "already resolved");
                    continue;
                }
                debug!(artifact = %unique_id, depth, "resolving");
                resolved.push((unique_id, artifact.clone()));
                expand.push(artifact);
            }

            let scope = (depth == 1).then(|| root_scope.clone());
            let lookups = expand
                .iter()
                .map(|artifact| self.dependencies_of(artifact, scope.clone()));
            layer = try_join_all(lookups).await?.into_iter().flatten().collect();
            depth += 1;
        }

        let initial = initial.unwrap_or(seen);
        let mut plan: Vec<ResolvedArtifact> = resolved
            .into_iter()
            .map(|(unique_id, artifact)| {
                let (depth, priority) = orderer[&unique_id];
                ResolvedArtifact {
                    initial_selection: initial.contains(&unique_id),
                    artifact,
                    unique_id,
                    depth,
                    priority,
                }
            })
            .collect();
        plan.sort_by(|a, b| b.depth.cmp(&a.depth).then(a.priority.cmp(&b.priority)));

        info!(artifacts = plan.len(), layers = depth - 1, "resolved installation plan");
        Ok(plan)
    }

    /// Look up every requirement `artifact` has on this host.
    async fn dependencies_of(
        &self,
        artifact: &Artifact,
        root_scope: Option<Arc<dyn RegistryScope>>,
    ) -> Result<Vec<Artifact>> {
        let demands = artifact.metadata.applicable_demands(&self.host)?;
        let scope: Arc<dyn RegistryScope> = match root_scope {
            Some(root) => Arc::new(artifact.scope.with(root)),
            None => Arc::new(artifact.scope.clone()),
        };

        let mut dependencies = Vec::with_capacity(demands.requires.len());
        for (spec, reference) in &demands.requires {
            let spec = DependencySpec::parse(spec);
            let registry = match &spec.registry {
                Some(name) => scope.registry_by_name(name).await?.ok_or_else(|| {
                    Error::UnresolvableRegistry {
                        name: name.clone(),
                        requester: artifact.id().to_string(),
                    }
                })?,
                None => artifact.registry.clone(),
            };

            let found = find_artifact(&registry, scope.database(), &spec.id, reference).await?;
            let dependency = found.ok_or_else(|| Error::UnresolvableDependency {
                id: spec.id.clone(),
                range: reference.to_string(),
                registry: scope.display_name(registry.location()),
            })?;
            debug!(
                requester = %artifact.id(),
                dependency = %dependency.unique_id(),
                "found dependency"
            );
            dependencies.push(dependency);
        }
        Ok(dependencies)
    }
}

/// Resolve for the host this process runs on.
pub async fn resolve_dependencies(
    roots: Vec<Artifact>,
    root_scope: Arc<dyn RegistryScope>,
    cutoff_depth: usize,
) -> Result<Vec<ResolvedArtifact>> {
    DependencyResolver::new(HostContext::current())
        .resolve(roots, root_scope, cutoff_depth)
        .await
}

/// The highest version of `id` in `registry` that satisfies `reference`.
///
/// `id` may be a short name; if it names more than one identity the lookup
/// is ambiguous. `Ok(None)` means nothing matched.
pub async fn find_artifact(
    registry: &Arc<dyn Registry>,
    database: &Arc<RegistryDatabase>,
    id: &str,
    reference: &VersionReference,
) -> Result<Option<Artifact>> {
    let criteria = SearchCriteria::id(id).with_version(reference.lookup_range());
    let mut groups = registry.search(&criteria).await?;
    if groups.len() > 1 {
        return Err(Error::AmbiguousArtifact {
            query: id.to_string(),
            matches: groups.into_iter().map(|g| g.id).collect(),
        });
    }
    let Some(listing) = groups.pop().and_then(|g| g.listings.into_iter().next()) else {
        return Ok(None);
    };
    Artifact::new(listing.metadata, registry.clone(), &listing.target, database.clone()).map(Some)
}
