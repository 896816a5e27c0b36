use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::version::parse_version;

use super::schema::{IndexSchema, KeyKind};
use super::store::{KeyStore, TargetId};
use super::Index;

/// Version of the serialized layout; bumped on incompatible changes.
pub const INDEX_FORMAT: u32 = 1;

// ─── Serialized Form ───────────────────────────────────────────────

/// On-disk index: targets plus, per key, parallel sorted value/target arrays.
///
/// ```text
/// { "format": 1,
///   "targets": ["gcc/10.json", "cmake.json"],
///   "keys": { "id":      { "kind": "identity", "values": ["cmake", "compilers/gcc"], "targets": [1, 0] },
///             "version": { "kind": "semver",   "values": ["3.20.0", "10.2.0"],       "targets": [1, 0] } } }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedIndex {
    pub format: u32,
    pub targets: Vec<String>,
    pub keys: BTreeMap<String, SerializedKey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedKey {
    pub kind: KeyKind,
    pub values: Vec<String>,
    /// Positions into [`SerializedIndex::targets`], parallel to `values`.
    pub targets: Vec<u32>,
}

impl<R> Index<R> {
    /// Project the finalized index into its serialized form.
    pub fn serialize(&self) -> SerializedIndex {
        assert!(self.finalized, "index serialized before done_insertion()");
        let keys = self
            .schema
            .keys
            .iter()
            .zip(&self.stores)
            .map(|(def, store)| {
                let (values, targets) = match store {
                    KeyStore::Strings(s) => s.entries.iter().map(|(v, t)| (v.clone(), *t)).unzip(),
                    KeyStore::Semver(s) => s.entries.iter().map(|(v, t)| (v.to_string(), *t)).unzip(),
                };
                (
                    def.name.clone(),
                    SerializedKey {
                        kind: def.kind,
                        values,
                        targets,
                    },
                )
            })
            .collect();

        SerializedIndex {
            format: INDEX_FORMAT,
            targets: self.targets.clone(),
            keys,
        }
    }

    /// Build a finalized index from its serialized form.
    pub fn deserialize(schema: Arc<IndexSchema<R>>, data: SerializedIndex) -> Result<Self> {
        let mut index = Index::new(schema);
        index.load_serialized(data)?;
        Ok(index)
    }

    /// Replace this index's contents with `data`.
    ///
    /// Validation happens against a scratch copy; on error `self` is left
    /// exactly as it was.
    pub fn load_serialized(&mut self, data: SerializedIndex) -> Result<()> {
        let malformed = |msg: String| Error::MalformedIndex(msg);

        if data.format != INDEX_FORMAT {
            return Err(malformed(format!(
                "unsupported format {} (expected {})",
                data.format, INDEX_FORMAT
            )));
        }

        let mut target_ids: HashMap<String, TargetId> = HashMap::with_capacity(data.targets.len());
        for (pos, target) in data.targets.iter().enumerate() {
            if target_ids.insert(target.clone(), pos as TargetId).is_some() {
                return Err(malformed(format!("duplicate target '{}'", target)));
            }
        }

        if let Some(unknown) = data
            .keys
            .keys()
            .find(|name| self.schema.key_named(name).is_none())
        {
            return Err(malformed(format!("unknown key '{}'", unknown)));
        }

        let mut stores = Vec::with_capacity(self.schema.keys.len());
        for def in &self.schema.keys {
            let key = data
                .keys
                .get(&def.name)
                .ok_or_else(|| malformed(format!("missing key '{}'", def.name)))?;
            if key.kind != def.kind {
                return Err(malformed(format!(
                    "key '{}' is {} but the schema declares {}",
                    def.name, key.kind, def.kind
                )));
            }
            if key.values.len() != key.targets.len() {
                return Err(malformed(format!(
                    "key '{}' has {} values but {} targets",
                    def.name,
                    key.values.len(),
                    key.targets.len()
                )));
            }
            if let Some(bad) = key.targets.iter().find(|t| **t as usize >= data.targets.len()) {
                return Err(malformed(format!(
                    "key '{}' refers to target #{} of {}",
                    def.name,
                    bad,
                    data.targets.len()
                )));
            }

            let mut store = KeyStore::new(def.kind);
            match &mut store {
                KeyStore::Strings(s) => {
                    for (value, target) in key.values.iter().zip(&key.targets) {
                        s.push(value.clone(), *target);
                    }
                }
                KeyStore::Semver(s) => {
                    for (value, target) in key.values.iter().zip(&key.targets) {
                        let version = parse_version(value).map_err(|e| {
                            malformed(format!("key '{}': {}", def.name, e))
                        })?;
                        s.push(version, *target);
                    }
                }
            }
            store.finalize();
            stores.push(store);
        }

        self.targets = data.targets;
        self.target_ids = target_ids;
        self.stores = stores;
        self.finalized = true;
        Ok(())
    }
}
