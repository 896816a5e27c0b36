use std::sync::Arc;

use crate::artifact::ArtifactMetadata;
use crate::index::{IdentityKey, Index, IndexSchema, SemverKey, StringKey};

use super::SearchCriteria;

/// File name of the serialized index inside a registry folder.
pub const INDEX_FILE: &str = "index.json";

/// Handles to the keys every registry index carries.
#[derive(Clone, Copy, Debug)]
pub struct ArtifactKeys {
    pub id: IdentityKey,
    pub version: SemverKey,
    pub summary: StringKey,
    pub description: StringKey,
    pub contact_name: StringKey,
    pub contact_email: StringKey,
}

/// The index a registry keeps over its artifact documents.
pub struct ArtifactIndex {
    pub index: Index<ArtifactMetadata>,
    pub keys: ArtifactKeys,
}

impl ArtifactIndex {
    pub fn new() -> Self {
        let mut schema = IndexSchema::new();
        let id = schema.identity_key("id", |m: &ArtifactMetadata| vec![m.id.clone()]);
        let version = schema.semver_key("version", |m: &ArtifactMetadata| Some(m.version.clone()));
        let summary = schema.string_key("summary", |m: &ArtifactMetadata| {
            m.summary.iter().cloned().collect()
        });
        let description = schema.string_key("description", |m: &ArtifactMetadata| {
            m.description.iter().cloned().collect()
        });
        let (contact_name, contact_email) = schema.namespace("contacts", |ns| {
            let name = ns.string_key("name", |m: &ArtifactMetadata| {
                m.contacts.keys().cloned().collect()
            });
            let email = ns.string_key("email", |m: &ArtifactMetadata| {
                m.contacts.values().filter_map(|c| c.email.clone()).collect()
            });
            (name, email)
        });

        Self {
            index: Index::new(Arc::new(schema)),
            keys: ArtifactKeys {
                id,
                version,
                summary,
                description,
                contact_name,
                contact_email,
            },
        }
    }

    /// Targets matching the identity and version parts of `criteria`.
    ///
    /// An exact identity match wins; only when there is none is the name
    /// treated as a short name. Keyword filtering needs the documents and is
    /// left to the caller.
    pub fn select(&self, criteria: &SearchCriteria) -> Vec<String> {
        let mut query = self.index.query();
        if let Some(name) = &criteria.id_or_short_name {
            let exact = !self.index.query().identity(self.keys.id).equals(name).items().is_empty();
            query = if exact {
                query.identity(self.keys.id).equals(name)
            } else {
                query.identity(self.keys.id).short_name_is(name)
            };
        }
        if let Some(range) = &criteria.version {
            query = query.semver(self.keys.version).range_match(range);
        }
        query.items().into_iter().map(str::to_string).collect()
    }
}

impl Default for ArtifactIndex {
    fn default() -> Self {
        Self::new()
    }
}
