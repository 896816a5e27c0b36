use std::cmp::Ordering;

use semver::Version;

use crate::version::VersionRange;

use super::schema::KeyKind;

// ─── Key Stores ────────────────────────────────────────────────────
//
// Each key keeps a flat vector of (value, target-id) entries. Inserts append;
// `finalize` sorts by value so every exact and bounded predicate is a pair of
// binary searches over the vector.

pub(super) type TargetId = u32;

#[derive(Clone, Debug)]
pub(super) enum KeyStore {
    Strings(StringStore),
    Semver(SemverStore),
}

impl KeyStore {
    pub(super) fn new(kind: KeyKind) -> Self {
        match kind {
            KeyKind::String => KeyStore::Strings(StringStore::new(false)),
            KeyKind::Identity => KeyStore::Strings(StringStore::new(true)),
            KeyKind::Semver => KeyStore::Semver(SemverStore::default()),
        }
    }

    pub(super) fn finalize(&mut self) {
        match self {
            KeyStore::Strings(store) => store.finalize(),
            KeyStore::Semver(store) => store.finalize(),
        }
    }

    pub(super) fn forget(&mut self, target: TargetId) {
        match self {
            KeyStore::Strings(store) => store.entries.retain(|(_, t)| *t != target),
            KeyStore::Semver(store) => store.entries.retain(|(_, t)| *t != target),
        }
    }

    pub(super) fn clear(&mut self) {
        match self {
            KeyStore::Strings(store) => {
                store.entries.clear();
                if let Some(short) = store.short_names.as_mut() {
                    short.clear();
                }
            }
            KeyStore::Semver(store) => store.entries.clear(),
        }
    }
}

// ─── Strings ───────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub(super) struct StringStore {
    pub(super) entries: Vec<(String, TargetId)>,
    /// (final path segment, position in `entries`); identity keys only.
    short_names: Option<Vec<(String, usize)>>,
}

impl StringStore {
    fn new(identity: bool) -> Self {
        Self {
            entries: Vec::new(),
            short_names: identity.then(Vec::new),
        }
    }

    pub(super) fn push(&mut self, value: String, target: TargetId) {
        self.entries.push((value, target));
    }

    pub(super) fn finalize(&mut self) {
        self.entries.sort();
        self.entries.dedup();
        if let Some(short) = self.short_names.as_mut() {
            short.clear();
            short.extend(
                self.entries
                    .iter()
                    .enumerate()
                    .map(|(pos, (value, _))| (short_name(value).to_string(), pos)),
            );
            short.sort();
        }
    }

    fn range(&self, lo: usize, hi: usize) -> impl Iterator<Item = TargetId> + '_ {
        self.entries[lo..hi].iter().map(|(_, t)| *t)
    }

    pub(super) fn equals(&self, value: &str) -> Vec<TargetId> {
        let lo = self.entries.partition_point(|(v, _)| v.as_str() < value);
        let hi = self.entries.partition_point(|(v, _)| v.as_str() <= value);
        self.range(lo, hi).collect()
    }

    pub(super) fn starts_with(&self, prefix: &str) -> Vec<TargetId> {
        let lo = self.entries.partition_point(|(v, _)| v.as_str() < prefix);
        self.entries[lo..]
            .iter()
            .take_while(|(v, _)| v.starts_with(prefix))
            .map(|(_, t)| *t)
            .collect()
    }

    pub(super) fn ends_with(&self, suffix: &str) -> Vec<TargetId> {
        self.entries
            .iter()
            .filter(|(v, _)| v.ends_with(suffix))
            .map(|(_, t)| *t)
            .collect()
    }

    pub(super) fn contains(&self, needle: &str) -> Vec<TargetId> {
        self.entries
            .iter()
            .filter(|(v, _)| v.contains(needle))
            .map(|(_, t)| *t)
            .collect()
    }

    /// Identity equals `name`, or identity is `<anything>/<name>`.
    pub(super) fn short_name_is(&self, name: &str) -> Vec<TargetId> {
        let Some(short) = self.short_names.as_ref() else {
            return Vec::new();
        };
        let last = short_name(name);
        let lo = short.partition_point(|(s, _)| s.as_str() < last);
        let hi = short.partition_point(|(s, _)| s.as_str() <= last);

        let suffix = format!("/{}", name);
        let mut positions: Vec<usize> = short[lo..hi]
            .iter()
            .map(|(_, pos)| *pos)
            .filter(|pos| {
                let value = &self.entries[*pos].0;
                value == name || value.ends_with(&suffix)
            })
            .collect();
        positions.sort_unstable();
        positions.into_iter().map(|pos| self.entries[pos].1).collect()
    }
}

pub(super) fn short_name(identity: &str) -> &str {
    identity.rsplit('/').next().unwrap_or(identity)
}

// ─── Semantic Versions ─────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub(super) struct SemverStore {
    pub(super) entries: Vec<(Version, TargetId)>,
}

impl SemverStore {
    pub(super) fn push(&mut self, value: Version, target: TargetId) {
        self.entries.push((value, target));
    }

    /// Sort by semver precedence. Build metadata does not take part in
    /// precedence; it only orders entries that otherwise tie.
    pub(super) fn finalize(&mut self) {
        self.entries.sort_by(|(a, ta), (b, tb)| {
            a.cmp_precedence(b).then_with(|| a.cmp(b)).then(ta.cmp(tb))
        });
        self.entries.dedup();
    }

    fn range(&self, lo: usize, hi: usize) -> impl Iterator<Item = TargetId> + '_ {
        self.entries[lo..hi].iter().map(|(_, t)| *t)
    }

    fn lower(&self, bound: &Version) -> usize {
        self.entries
            .partition_point(|(v, _)| v.cmp_precedence(bound) == Ordering::Less)
    }

    fn upper(&self, bound: &Version) -> usize {
        self.entries
            .partition_point(|(v, _)| v.cmp_precedence(bound) != Ordering::Greater)
    }

    pub(super) fn equals(&self, version: &Version) -> Vec<TargetId> {
        self.range(self.lower(version), self.upper(version)).collect()
    }

    pub(super) fn greater_than(&self, version: &Version) -> Vec<TargetId> {
        self.range(self.upper(version), self.entries.len()).collect()
    }

    pub(super) fn less_than(&self, version: &Version) -> Vec<TargetId> {
        self.range(0, self.lower(version)).collect()
    }

    pub(super) fn range_match(&self, range: &VersionRange) -> Vec<TargetId> {
        let window = range.window();
        let lo = window.lower.as_ref().map_or(0, |v| self.lower(v));
        let hi = window
            .upper
            .as_ref()
            .map_or(self.entries.len(), |v| self.lower(v));
        if lo >= hi {
            return Vec::new();
        }
        self.entries[lo..hi]
            .iter()
            .filter(|(v, _)| range.matches(v))
            .map(|(_, t)| *t)
            .collect()
    }
}
