use std::collections::HashSet;

use semver::Version;

use crate::version::VersionRange;

use super::schema::{IdentityKey, SemverKey, StringKey};
use super::store::{KeyStore, SemverStore, StringStore, TargetId};
use super::Index;

// ─── Query Builder ─────────────────────────────────────────────────

/// Fluent narrowing query over a finalized [`Index`].
///
/// The first predicate seeds the candidate set in that predicate's natural
/// order (ascending value); each later predicate intersects, keeping the
/// seeded order. With no predicates, `items()` yields every target.
pub struct Query<'a, R> {
    index: &'a Index<R>,
    selection: Option<Vec<TargetId>>,
}

impl<'a, R> Query<'a, R> {
    pub(super) fn new(index: &'a Index<R>) -> Self {
        Self {
            index,
            selection: None,
        }
    }

    pub fn string(self, key: impl Into<StringKey>) -> StringClause<'a, R> {
        StringClause {
            slot: key.into().slot,
            query: self,
        }
    }

    pub fn identity(self, key: IdentityKey) -> IdentityClause<'a, R> {
        IdentityClause {
            inner: self.string(key),
        }
    }

    pub fn semver(self, key: SemverKey) -> SemverClause<'a, R> {
        SemverClause {
            slot: key.slot,
            query: self,
        }
    }

    /// Materialize the ordered, de-duplicated target list.
    pub fn items(self) -> Vec<&'a str> {
        match self.selection {
            Some(ids) => ids.into_iter().map(|id| self.index.target(id)).collect(),
            None => self.index.targets().collect(),
        }
    }

    fn narrow(mut self, matches: Vec<TargetId>) -> Self {
        self.selection = Some(match self.selection.take() {
            None => {
                let mut seen = HashSet::with_capacity(matches.len());
                matches.into_iter().filter(|id| seen.insert(*id)).collect()
            }
            Some(mut current) => {
                let keep: HashSet<TargetId> = matches.into_iter().collect();
                current.retain(|id| keep.contains(id));
                current
            }
        });
        self
    }

    fn strings(&self, slot: usize) -> &'a StringStore {
        match &self.index.stores[slot] {
            KeyStore::Strings(store) => store,
            KeyStore::Semver(_) => unreachable!("string handle on a semver key"),
        }
    }

    fn versions(&self, slot: usize) -> &'a SemverStore {
        match &self.index.stores[slot] {
            KeyStore::Semver(store) => store,
            KeyStore::Strings(_) => unreachable!("semver handle on a string key"),
        }
    }
}

// ─── String Predicates ─────────────────────────────────────────────

pub struct StringClause<'a, R> {
    query: Query<'a, R>,
    slot: usize,
}

impl<'a, R> StringClause<'a, R> {
    pub fn equals(self, value: &str) -> Query<'a, R> {
        let matches = self.query.strings(self.slot).equals(value);
        self.query.narrow(matches)
    }

    pub fn starts_with(self, prefix: &str) -> Query<'a, R> {
        let matches = self.query.strings(self.slot).starts_with(prefix);
        self.query.narrow(matches)
    }

    pub fn ends_with(self, suffix: &str) -> Query<'a, R> {
        let matches = self.query.strings(self.slot).ends_with(suffix);
        self.query.narrow(matches)
    }

    pub fn contains(self, needle: &str) -> Query<'a, R> {
        let matches = self.query.strings(self.slot).contains(needle);
        self.query.narrow(matches)
    }
}

pub struct IdentityClause<'a, R> {
    inner: StringClause<'a, R>,
}

impl<'a, R> IdentityClause<'a, R> {
    /// Identity equals `name` exactly, or ends with `/<name>`.
    pub fn short_name_is(self, name: &str) -> Query<'a, R> {
        let StringClause { query, slot } = self.inner;
        let matches = query.strings(slot).short_name_is(name);
        query.narrow(matches)
    }

    pub fn equals(self, value: &str) -> Query<'a, R> {
        self.inner.equals(value)
    }

    pub fn starts_with(self, prefix: &str) -> Query<'a, R> {
        self.inner.starts_with(prefix)
    }

    pub fn ends_with(self, suffix: &str) -> Query<'a, R> {
        self.inner.ends_with(suffix)
    }

    pub fn contains(self, needle: &str) -> Query<'a, R> {
        self.inner.contains(needle)
    }
}

// ─── Semver Predicates ─────────────────────────────────────────────

pub struct SemverClause<'a, R> {
    query: Query<'a, R>,
    slot: usize,
}

impl<'a, R> SemverClause<'a, R> {
    pub fn equals(self, version: &Version) -> Query<'a, R> {
        let matches = self.query.versions(self.slot).equals(version);
        self.query.narrow(matches)
    }

    /// Strictly greater than `version` in semver precedence.
    pub fn greater_than(self, version: &Version) -> Query<'a, R> {
        let matches = self.query.versions(self.slot).greater_than(version);
        self.query.narrow(matches)
    }

    /// Strictly less than `version` in semver precedence.
    pub fn less_than(self, version: &Version) -> Query<'a, R> {
        let matches = self.query.versions(self.slot).less_than(version);
        self.query.narrow(matches)
    }

    pub fn range_match(self, range: &VersionRange) -> Query<'a, R> {
        let matches = self.query.versions(self.slot).range_match(range);
        self.query.narrow(matches)
    }
}
