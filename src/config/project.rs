use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::registry::{Location, RegistryResolver};
use crate::version::VersionReference;

/// File name of a project's configuration.
pub const PROJECT_FILE: &str = "quiver.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default)]
    pub name: Option<String>,
}

/// Project configuration from quiver.toml.
///
/// ```toml
/// [project]
/// name = "app"
///
/// [registries]
/// tools = "./registry"
///
/// [requires]
/// "tools:compilers/gcc" = "^10"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub registries: BTreeMap<String, String>,
    #[serde(default)]
    pub requires: BTreeMap<String, VersionReference>,
    /// Directory containing the config file; relative registries resolve here.
    #[serde(skip)]
    pub root_dir: PathBuf,
}

impl ProjectConfig {
    /// Load project config from a quiver.toml file.
    pub fn load(toml_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(toml_path).map_err(|e| Error::io(toml_path, e))?;
        let mut config: ProjectConfig = toml::from_str(&content).map_err(|e| Error::Config {
            path: toml_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.root_dir = toml_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Ok(config)
    }

    /// Try to find a quiver.toml in the given directory or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(PROJECT_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Display name: the declared name, else the directory name.
    pub fn name(&self) -> String {
        self.project
            .name
            .clone()
            .or_else(|| {
                self.root_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "project".to_string())
    }

    /// Register every declared registry in `scope`.
    pub fn register(&self, scope: &mut RegistryResolver) -> Result<()> {
        for (name, raw) in &self.registries {
            scope.add(Location::parse(raw, Some(&self.root_dir))?, Some(name))?;
        }
        Ok(())
    }

    /// `(spec, reference)` pairs in declaration-key order.
    pub fn requirements(&self) -> Vec<(String, VersionReference)> {
        self.requires
            .iter()
            .map(|(spec, reference)| (spec.clone(), reference.clone()))
            .collect()
    }
}
