use std::sync::Arc;

use quiver::registry::{ArtifactGroup, Registry, RegistryScope, SearchCriteria};
use quiver::session::Session;
use quiver::version::VersionRange;

use super::{block_on, fail, open_session};

pub fn cmd_search(query: String, registry: Option<String>, range: Option<String>) {
    let session = open_session();

    let mut criteria = SearchCriteria::default().with_keyword(&query);
    if let Some(range) = range {
        match VersionRange::parse(&range) {
            Ok(range) => criteria = criteria.with_version(range),
            Err(e) => fail(e),
        }
    }

    let results = match block_on(search(&session, registry.as_deref(), &criteria)) {
        Ok(results) => results,
        Err(e) => fail(e),
    };
    if results.is_empty() {
        println!("No artifacts found for '{}'.", query);
        return;
    }
    for (registry, group) in &results {
        let Some(latest) = group.latest() else {
            continue;
        };
        let summary = latest.metadata.summary.as_deref().unwrap_or("");
        let reference = format!("{}:{}", registry, group.id);
        println!("  {:<40} {:<12} {}", reference, latest.version(), summary);
    }
}

/// Matches per registry, labelled with the registry's display name.
async fn search(
    session: &Session,
    name: Option<&str>,
    criteria: &SearchCriteria,
) -> quiver::Result<Vec<(String, ArtifactGroup)>> {
    let scope = session.scope();
    let mut results = Vec::new();
    for registry in registries(session, name).await? {
        let label = scope.display_name(registry.location());
        for group in registry.search(criteria).await? {
            results.push((label.clone(), group));
        }
    }
    Ok(results)
}

/// The named registry, or every registry the session knows by name.
async fn registries(session: &Session, name: Option<&str>) -> quiver::Result<Vec<Arc<dyn Registry>>> {
    let scope = session.scope();
    if let Some(name) = name {
        return match scope.registry_by_name(name).await? {
            Some(registry) => Ok(vec![registry]),
            None => Err(quiver::Error::UnresolvableRegistry {
                name: name.to_string(),
                requester: "command line".to_string(),
            }),
        };
    }

    let mut names: Vec<&str> = Vec::new();
    if let Some(project) = session.project() {
        names.extend(project.registries.keys().map(String::as_str));
    }
    names.extend(session.global_scope().entries().filter_map(|(name, _)| name));
    names.sort_unstable();
    names.dedup();

    let mut registries: Vec<Arc<dyn Registry>> = Vec::new();
    for name in names {
        if let Some(registry) = scope.registry_by_name(name).await? {
            if !registries.iter().any(|r| r.location() == registry.location()) {
                registries.push(registry);
            }
        }
    }
    Ok(registries)
}
