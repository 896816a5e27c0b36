use std::fmt;
use std::sync::Arc;

use semver::Version;
use serde::{Deserialize, Serialize};

// ─── Key Kinds and Handles ─────────────────────────────────────────

/// How a key's values are stored and which predicates it supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Plain strings: equals / starts_with / ends_with / contains.
    String,
    /// Path-like identities (`a/b/c`): string predicates plus short-name lookup.
    Identity,
    /// Semantic versions, ordered by semver precedence.
    Semver,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyKind::String => "string",
            KeyKind::Identity => "identity",
            KeyKind::Semver => "semver",
        })
    }
}

/// Typed handle to a registered string key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringKey {
    pub(super) slot: usize,
}

/// Typed handle to a registered identity key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityKey {
    pub(super) slot: usize,
}

/// Typed handle to a registered semver key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SemverKey {
    pub(super) slot: usize,
}

impl From<IdentityKey> for StringKey {
    fn from(key: IdentityKey) -> Self {
        StringKey { slot: key.slot }
    }
}

// ─── Schema ────────────────────────────────────────────────────────

type StringsFn<R> = Arc<dyn Fn(&R) -> Vec<String> + Send + Sync>;
type SemverFn<R> = Arc<dyn Fn(&R) -> Option<Version> + Send + Sync>;

pub(super) enum Extractor<R> {
    Strings(StringsFn<R>),
    Semver(SemverFn<R>),
}

pub(super) struct KeyDef<R> {
    pub(super) name: String,
    pub(super) kind: KeyKind,
    pub(super) extract: Extractor<R>,
}

/// The set of keys an [`Index`](super::Index) maintains over records of type `R`.
///
/// Keys are registered once, up front; each registration returns a `Copy`
/// handle that queries use to address the key. Registering the same name
/// twice is a programming error and panics.
pub struct IndexSchema<R> {
    pub(super) keys: Vec<KeyDef<R>>,
}

impl<R> Default for IndexSchema<R> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<R> IndexSchema<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a multi-valued string key.
    pub fn string_key<F>(&mut self, name: &str, extract: F) -> StringKey
    where
        F: Fn(&R) -> Vec<String> + Send + Sync + 'static,
    {
        let slot = self.register(name, KeyKind::String, Extractor::Strings(Arc::new(extract)));
        StringKey { slot }
    }

    /// Register an identity key; `short_name_is` matches on its final `/` segment.
    pub fn identity_key<F>(&mut self, name: &str, extract: F) -> IdentityKey
    where
        F: Fn(&R) -> Vec<String> + Send + Sync + 'static,
    {
        let slot = self.register(name, KeyKind::Identity, Extractor::Strings(Arc::new(extract)));
        IdentityKey { slot }
    }

    /// Register a semver key. Records without a version produce no entry.
    pub fn semver_key<F>(&mut self, name: &str, extract: F) -> SemverKey
    where
        F: Fn(&R) -> Option<Version> + Send + Sync + 'static,
    {
        let slot = self.register(name, KeyKind::Semver, Extractor::Semver(Arc::new(extract)));
        SemverKey { slot }
    }

    /// Register keys under a dotted namespace (`contacts.email`).
    pub fn namespace<T>(&mut self, prefix: &str, build: impl FnOnce(&mut Namespace<'_, R>) -> T) -> T {
        let mut ns = Namespace {
            schema: self,
            prefix: prefix.to_string(),
        };
        build(&mut ns)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.name.as_str())
    }

    /// Look up a key by its (dotted) name.
    pub fn key_named(&self, name: &str) -> Option<(usize, KeyKind)> {
        self.keys
            .iter()
            .position(|k| k.name == name)
            .map(|slot| (slot, self.keys[slot].kind))
    }

    fn register(&mut self, name: &str, kind: KeyKind, extract: Extractor<R>) -> usize {
        assert!(
            self.key_named(name).is_none(),
            "index key '{}' registered twice",
            name
        );
        self.keys.push(KeyDef {
            name: name.to_string(),
            kind,
            extract,
        });
        self.keys.len() - 1
    }
}

/// Registration scope that prefixes key names with `<prefix>.`.
pub struct Namespace<'s, R> {
    schema: &'s mut IndexSchema<R>,
    prefix: String,
}

impl<R> Namespace<'_, R> {
    fn qualify(&self, name: &str) -> String {
        format!("{}.{}", self.prefix, name)
    }

    pub fn string_key<F>(&mut self, name: &str, extract: F) -> StringKey
    where
        F: Fn(&R) -> Vec<String> + Send + Sync + 'static,
    {
        let name = self.qualify(name);
        self.schema.string_key(&name, extract)
    }

    pub fn identity_key<F>(&mut self, name: &str, extract: F) -> IdentityKey
    where
        F: Fn(&R) -> Vec<String> + Send + Sync + 'static,
    {
        let name = self.qualify(name);
        self.schema.identity_key(&name, extract)
    }

    pub fn semver_key<F>(&mut self, name: &str, extract: F) -> SemverKey
    where
        F: Fn(&R) -> Option<Version> + Send + Sync + 'static,
    {
        let name = self.qualify(name);
        self.schema.semver_key(&name, extract)
    }

    pub fn namespace<T>(&mut self, prefix: &str, build: impl FnOnce(&mut Namespace<'_, R>) -> T) -> T {
        let mut ns = Namespace {
            prefix: self.qualify(prefix),
            schema: &mut *self.schema,
        };
        build(&mut ns)
    }
}
