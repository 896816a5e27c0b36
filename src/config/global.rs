use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::registry::{Location, RegistryResolver};

/// The user's `config.toml`.
///
/// ```toml
/// [registries]
/// default = "https://contoso.com/registry.tar.gz"
/// local = "/srv/registry"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    #[serde(default)]
    pub registries: BTreeMap<String, String>,
}

impl GlobalConfig {
    /// Load from `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Register every declared registry in `scope`. Relative paths resolve
    /// against `base`.
    pub fn register(&self, scope: &mut RegistryResolver, base: &Path) -> Result<()> {
        for (name, raw) in &self.registries {
            scope.add(Location::parse(raw, Some(base))?, Some(name))?;
        }
        Ok(())
    }
}
