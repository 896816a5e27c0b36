//! Typed secondary index over opaque records.
//!
//! An [`Index`] projects each inserted record through the keys declared in
//! its [`IndexSchema`] and remembers, per key, which *target* (an opaque
//! string such as a manifest path) produced which value. The record itself
//! is not kept: queries answer with targets, and the caller re-loads full
//! records from wherever the targets point.
//!
//! Lifecycle:
//!   1. `insert(record, target)` any number of times (write-only phase).
//!   2. `done_insertion()` sorts every key's entries.
//!   3. `query()` narrows the target set one predicate at a time.
//!
//! Querying before `done_insertion` is a caller bug and panics.
//!
//! The serialized form ([`SerializedIndex`]) keeps only the projected
//! values and targets, so a registry can answer queries straight from its
//! on-disk index without opening a single record.

use std::collections::HashMap;
use std::sync::Arc;

mod persist;
mod query;
mod schema;
mod store;

pub use persist::{SerializedIndex, SerializedKey, INDEX_FORMAT};
pub use query::{IdentityClause, Query, SemverClause, StringClause};
pub use schema::{IdentityKey, IndexSchema, KeyKind, Namespace, SemverKey, StringKey};

use schema::Extractor;
use store::{KeyStore, TargetId};

// ─── Index ─────────────────────────────────────────────────────────

pub struct Index<R> {
    schema: Arc<IndexSchema<R>>,
    /// Target strings in first-insertion order; position is the target id.
    targets: Vec<String>,
    target_ids: HashMap<String, TargetId>,
    /// One store per schema key, same order as the schema.
    stores: Vec<KeyStore>,
    finalized: bool,
}

impl<R> Index<R> {
    /// Create an empty index. An empty index is already finalized.
    pub fn new(schema: Arc<IndexSchema<R>>) -> Self {
        let stores = schema.keys.iter().map(|k| KeyStore::new(k.kind)).collect();
        Self {
            schema,
            targets: Vec::new(),
            target_ids: HashMap::new(),
            stores,
            finalized: true,
        }
    }

    pub fn schema(&self) -> &Arc<IndexSchema<R>> {
        &self.schema
    }

    /// Record `record` under `target`.
    ///
    /// Inserting under a target that is already present replaces that
    /// target's previous entries.
    pub fn insert(&mut self, record: &R, target: &str) {
        self.finalized = false;
        let id = match self.target_ids.get(target) {
            Some(&id) => {
                for store in &mut self.stores {
                    store.forget(id);
                }
                id
            }
            None => {
                let id = self.targets.len() as TargetId;
                self.targets.push(target.to_string());
                self.target_ids.insert(target.to_string(), id);
                id
            }
        };

        for (def, store) in self.schema.keys.iter().zip(self.stores.iter_mut()) {
            match (&def.extract, store) {
                (Extractor::Strings(extract), KeyStore::Strings(store)) => {
                    for value in extract(record) {
                        store.push(value, id);
                    }
                }
                (Extractor::Semver(extract), KeyStore::Semver(store)) => {
                    if let Some(version) = extract(record) {
                        store.push(version, id);
                    }
                }
                _ => unreachable!("store kind follows key kind"),
            }
        }
    }

    /// Finish the write phase: sort every key so queries can binary-search.
    pub fn done_insertion(&mut self) {
        for store in &mut self.stores {
            store.finalize();
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Drop every entry and target. The index stays finalized (and empty).
    pub fn clear(&mut self) {
        self.targets.clear();
        self.target_ids.clear();
        for store in &mut self.stores {
            store.clear();
        }
        self.finalized = true;
    }

    /// Number of distinct targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// All targets in first-insertion order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    /// Start a query. Panics if the index has pending, unsorted inserts.
    pub fn query(&self) -> Query<'_, R> {
        assert!(
            self.finalized,
            "index queried before done_insertion(); call done_insertion() after inserting"
        );
        Query::new(self)
    }

    pub fn string_key_named(&self, name: &str) -> Option<StringKey> {
        match self.schema.key_named(name)? {
            (slot, KeyKind::String | KeyKind::Identity) => Some(StringKey { slot }),
            _ => None,
        }
    }

    pub fn identity_key_named(&self, name: &str) -> Option<IdentityKey> {
        match self.schema.key_named(name)? {
            (slot, KeyKind::Identity) => Some(IdentityKey { slot }),
            _ => None,
        }
    }

    pub fn semver_key_named(&self, name: &str) -> Option<SemverKey> {
        match self.schema.key_named(name)? {
            (slot, KeyKind::Semver) => Some(SemverKey { slot }),
            _ => None,
        }
    }

    fn target(&self, id: TargetId) -> &str {
        &self.targets[id as usize]
    }
}

#[cfg(test)]
mod tests;
