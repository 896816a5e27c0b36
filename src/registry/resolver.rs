use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::{Location, Registry, RegistryDatabase};

// ─── Scope Trait ───────────────────────────────────────────────────

/// A naming context that maps short registry names to locations.
///
/// Implemented by a single [`RegistryResolver`] and by the read-only
/// [`CombinedScope`] view over two scopes.
#[async_trait]
pub trait RegistryScope: Send + Sync {
    /// The database registries of this scope load through.
    fn database(&self) -> &Arc<RegistryDatabase>;

    fn location_for_name(&self, name: &str) -> Option<Location>;

    /// The name this scope can safely print for `location`.
    fn name_for_location(&self, location: &Location) -> Option<String>;

    fn knows(&self, location: &Location) -> bool;

    /// Friendly name, or the bracketed location when there is none.
    fn display_name(&self, location: &Location) -> String {
        self.name_for_location(location)
            .unwrap_or_else(|| format!("[{}]", location))
    }

    /// `None` when the name is unknown to this scope.
    async fn registry_by_name(&self, name: &str) -> Result<Option<Arc<dyn Registry>>> {
        match self.location_for_name(name) {
            Some(location) => Ok(Some(self.database().load(&location).await?)),
            None => Ok(None),
        }
    }

    async fn registry_by_location(&self, location: &Location) -> Result<Arc<dyn Registry>> {
        self.database().load(location).await
    }

    /// A view where `self` takes precedence over `other`.
    fn with(&self, other: Arc<dyn RegistryScope>) -> CombinedScope
    where
        Self: Clone + Sized + 'static,
    {
        CombinedScope::new(Arc::new(self.clone()), other)
    }
}

// ─── Registry Resolver ─────────────────────────────────────────────

/// One scope's registry names.
///
/// A name is unique within the scope. A location may be registered without
/// a name, and keeps the first name it was given.
#[derive(Clone)]
pub struct RegistryResolver {
    database: Arc<RegistryDatabase>,
    locations: BTreeMap<Location, Option<String>>,
    names: BTreeMap<String, Location>,
}

impl RegistryResolver {
    pub fn new(database: Arc<RegistryDatabase>) -> Self {
        Self {
            database,
            locations: BTreeMap::new(),
            names: BTreeMap::new(),
        }
    }

    /// Register `location`, optionally under `name`.
    pub fn add(&mut self, location: Location, name: Option<&str>) -> Result<()> {
        if let Some(name) = name {
            match self.names.get(name) {
                Some(existing) if *existing != location => {
                    return Err(Error::DuplicateRegistryName {
                        name: name.to_string(),
                        existing: existing.to_string(),
                        attempted: location.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    self.names.insert(name.to_string(), location.clone());
                }
            }
        }
        let slot = self.locations.entry(location).or_insert(None);
        if slot.is_none() {
            *slot = name.map(str::to_string);
        }
        Ok(())
    }

    /// Registered `(name, location)` pairs, ordered by location.
    pub fn entries(&self) -> impl Iterator<Item = (Option<&str>, &Location)> {
        self.locations
            .iter()
            .map(|(location, name)| (name.as_deref(), location))
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[async_trait]
impl RegistryScope for RegistryResolver {
    fn database(&self) -> &Arc<RegistryDatabase> {
        &self.database
    }

    fn location_for_name(&self, name: &str) -> Option<Location> {
        self.names.get(name).cloned()
    }

    fn name_for_location(&self, location: &Location) -> Option<String> {
        self.locations.get(location).cloned().flatten()
    }

    fn knows(&self, location: &Location) -> bool {
        self.locations.contains_key(location)
    }
}

// ─── Combined Scope ────────────────────────────────────────────────

/// Read-only union of two scopes, `primary` taking precedence.
///
/// A name resolves through the primary scope first. A location prints the
/// primary's name for it; the secondary's name is used only if the primary
/// does not bind that same name to a different location. Otherwise the
/// location has no safe name and displays as `[location]`.
#[derive(Clone)]
pub struct CombinedScope {
    primary: Arc<dyn RegistryScope>,
    secondary: Arc<dyn RegistryScope>,
}

impl CombinedScope {
    pub fn new(primary: Arc<dyn RegistryScope>, secondary: Arc<dyn RegistryScope>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl RegistryScope for CombinedScope {
    fn database(&self) -> &Arc<RegistryDatabase> {
        self.primary.database()
    }

    fn location_for_name(&self, name: &str) -> Option<Location> {
        self.primary
            .location_for_name(name)
            .or_else(|| self.secondary.location_for_name(name))
    }

    fn name_for_location(&self, location: &Location) -> Option<String> {
        if let Some(name) = self.primary.name_for_location(location) {
            return Some(name);
        }
        let name = self.secondary.name_for_location(location)?;
        match self.primary.location_for_name(&name) {
            Some(shadowing) if shadowing != *location => None,
            _ => Some(name),
        }
    }

    fn knows(&self, location: &Location) -> bool {
        self.primary.knows(location) || self.secondary.knows(location)
    }
}
