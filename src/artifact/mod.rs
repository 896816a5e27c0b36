//! Artifact metadata documents and loaded artifact handles.
//!
//! Each artifact in a registry is one JSON document:
//!
//! ```text
//! { "id": "compilers/gcc", "version": "10.2.0", "priority": 0,
//!   "summary": "GNU compiler collection",
//!   "contacts": { "Jane": { "email": "jane@contoso.com", "role": ["author"] } },
//!   "registries": { "tools": "https://contoso.com/tools.tar.gz" },
//!   "requires": { "tools:cmake": "^3.20" },
//!   "demands": { "windows and x64": { "requires": { "tools:ninja": "*" } } } }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::registry::{Location, Registry, RegistryDatabase, RegistryResolver};
use crate::version::VersionReference;

mod host;

pub use host::HostContext;

// ─── Metadata Document ─────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Path-like identity (`compilers/arm/gcc`); the last segment is the short name.
    pub id: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Install-order tiebreak among equal-depth artifacts; lower installs first.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contacts: BTreeMap<String, Contact>,
    /// Registries this artifact's requirements may name, by local name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub registries: BTreeMap<String, String>,
    /// Dependency spec (`[registry:]id`) to version reference.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requires: BTreeMap<String, VersionReference>,
    /// Opaque to resolution; only counted for ambiguity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<Value>,
    /// Conditional blocks keyed by host condition.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub demands: BTreeMap<String, DemandBlock>,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandBlock {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requires: BTreeMap<String, VersionReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<Value>,
}

/// The top-level demands merged with every block whose condition holds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppliedDemands {
    pub requires: BTreeMap<String, VersionReference>,
    pub install: Option<Value>,
}

impl ArtifactMetadata {
    pub fn from_json(target: &str, text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| Error::Metadata {
            target: target.to_string(),
            source,
        })
    }

    /// Canonical pretty form written by `regenerate --normalize`.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Final `/` segment of the identity.
    pub fn short_name(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }

    /// Requirements and install section that apply on `host`.
    ///
    /// Later matching blocks override earlier requirements for the same spec.
    /// More than one install section among the top level and the matching
    /// blocks is an error.
    pub fn applicable_demands(&self, host: &HostContext) -> Result<AppliedDemands> {
        let mut requires = self.requires.clone();
        let mut installs: Vec<(String, &Value)> = Vec::new();
        if let Some(install) = &self.install {
            installs.push(("<unconditional>".to_string(), install));
        }

        for (condition, block) in &self.demands {
            if !host.matches(condition) {
                continue;
            }
            requires.extend(block.requires.iter().map(|(k, v)| (k.clone(), v.clone())));
            if let Some(install) = &block.install {
                installs.push((condition.clone(), install));
            }
        }

        if installs.len() > 1 {
            return Err(Error::AmbiguousInstallation {
                id: self.id.clone(),
                conditions: installs.into_iter().map(|(c, _)| c).collect(),
            });
        }

        Ok(AppliedDemands {
            requires,
            install: installs.pop().map(|(_, v)| v.clone()),
        })
    }
}

// ─── Dependency Spec ───────────────────────────────────────────────

/// A requirement key: `id` or `registry:id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencySpec {
    pub registry: Option<String>,
    pub id: String,
}

impl DependencySpec {
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        match spec.split_once(':') {
            Some((registry, id)) if !registry.is_empty() => Self {
                registry: Some(registry.trim().to_string()),
                id: id.trim().to_string(),
            },
            Some((_, id)) => Self {
                registry: None,
                id: id.trim().to_string(),
            },
            None => Self {
                registry: None,
                id: spec.to_string(),
            },
        }
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.registry {
            Some(registry) => write!(f, "{}:{}", registry, self.id),
            None => f.write_str(&self.id),
        }
    }
}

// ─── Artifact ──────────────────────────────────────────────────────

/// A metadata document bound to the registry it was found in.
#[derive(Clone)]
pub struct Artifact {
    pub metadata: Arc<ArtifactMetadata>,
    pub registry: Arc<dyn Registry>,
    /// Where the document lives inside the registry.
    pub target: String,
    /// The registries this artifact declares, by its own names for them.
    pub scope: RegistryResolver,
}

impl Artifact {
    /// Bind `metadata` to `registry`, building the artifact's declared scope.
    ///
    /// Relative registry locations resolve against the owning registry.
    pub fn new(
        metadata: Arc<ArtifactMetadata>,
        registry: Arc<dyn Registry>,
        target: &str,
        database: Arc<RegistryDatabase>,
    ) -> Result<Self> {
        let mut scope = RegistryResolver::new(database);
        for (name, raw) in &metadata.registries {
            let location = Location::resolve(raw, registry.location())?;
            scope.add(location, Some(name))?;
        }
        Ok(Self {
            metadata,
            registry,
            target: target.to_string(),
            scope,
        })
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn version(&self) -> &Version {
        &self.metadata.version
    }

    pub fn priority(&self) -> i64 {
        self.metadata.priority
    }

    /// `registryLocation::identity::version`, the resolution dedup key.
    pub fn unique_id(&self) -> String {
        format!(
            "{}::{}::{}",
            self.registry.location(),
            self.metadata.id,
            self.metadata.version
        )
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("unique_id", &self.unique_id())
            .field("target", &self.target)
            .finish()
    }
}

#[cfg(test)]
mod tests;
