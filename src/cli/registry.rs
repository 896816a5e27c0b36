use std::path::PathBuf;

use clap::Subcommand;
use quiver::registry::{Location, Registry, RegistryScope};

use super::{block_on, fail, open_session};

#[derive(Subcommand)]
pub enum RegistryAction {
    /// List the registries known by name
    List,
    /// Rebuild the index of a registry folder from its documents
    Regenerate {
        /// Registry folder
        path: PathBuf,
        /// Rewrite every document in canonical pretty-printed form
        #[arg(long)]
        normalize: bool,
    },
    /// Refresh registry snapshots (all named registries by default)
    Update {
        /// Registry name
        name: Option<String>,
    },
}

pub fn cmd_registry(action: RegistryAction) {
    match action {
        RegistryAction::List => cmd_registry_list(),
        RegistryAction::Regenerate { path, normalize } => cmd_registry_regenerate(path, normalize),
        RegistryAction::Update { name } => cmd_registry_update(name),
    }
}

fn cmd_registry_list() {
    let session = open_session();
    let mut any = false;
    if let Some(project) = session.project() {
        for (name, raw) in &project.registries {
            println!("  {:<16} {:<8} {}", name, "project", raw);
            any = true;
        }
    }
    for (name, location) in session.global_scope().entries() {
        if let Some(name) = name {
            println!("  {:<16} {:<8} {}", name, "global", location);
            any = true;
        }
    }
    if !any {
        println!("No registries configured.");
    }
}

fn cmd_registry_regenerate(path: PathBuf, normalize: bool) {
    let session = open_session();
    let location = match Location::parse(&path.to_string_lossy(), None) {
        Ok(location) => location,
        Err(e) => fail(e),
    };
    if location.is_archive() {
        fail(format!("'{}' is an archive; only folders can be regenerated", location));
    }
    let registry = match session.database().open(&location) {
        Ok(registry) => registry,
        Err(e) => fail(e),
    };
    let result = block_on(async {
        registry.regenerate(normalize).await?;
        registry.save().await?;
        Ok::<_, quiver::Error>(registry.count())
    });
    match result {
        Ok(count) => eprintln!("Indexed {} artifact(s) in {}", count, location),
        Err(e) => fail(e),
    }
}

fn cmd_registry_update(name: Option<String>) {
    let session = open_session();
    let scope = session.scope();

    let names: Vec<String> = match name {
        Some(name) => vec![name],
        None => {
            let mut names: Vec<String> = session
                .project()
                .map(|p| p.registries.keys().cloned().collect())
                .unwrap_or_default();
            names.extend(
                session
                    .global_scope()
                    .entries()
                    .filter_map(|(name, _)| name.map(str::to_string)),
            );
            names.sort();
            names.dedup();
            names
        }
    };

    let result = block_on(async {
        for name in &names {
            let Some(location) = scope.location_for_name(name) else {
                return Err(quiver::Error::UnresolvableRegistry {
                    name: name.clone(),
                    requester: "command line".to_string(),
                });
            };
            let registry = session.database().open(&location)?;
            registry.update(Some(name)).await?;
            eprintln!("Updated {} ({} artifacts)", name, registry.count());
        }
        Ok(())
    });
    if let Err(e) = result {
        fail(e);
    }
}
