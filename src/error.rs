use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by registry loading, index persistence and dependency resolution.
#[derive(Debug, Error)]
pub enum Error {
    #[error("artifact '{id}' has more than one applicable install block ({})", .conditions.join(", "))]
    AmbiguousInstallation { id: String, conditions: Vec<String> },

    #[error("'{requester}' requires registry '{name}', which it does not declare")]
    UnresolvableRegistry { name: String, requester: String },

    #[error("unable to resolve dependency '{id}' ({range}) in {registry}")]
    UnresolvableDependency {
        id: String,
        range: String,
        registry: String,
    },

    #[error("artifact identity '{query}' matched more than one result ({})", .matches.join(", "))]
    AmbiguousArtifact { query: String, matches: Vec<String> },

    #[error("malformed index: {0}")]
    MalformedIndex(String),

    #[error("invalid version range '{range}': {reason}")]
    InvalidVersionRange { range: String, reason: String },

    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("invalid registry location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("unsupported registry location '{0}'")]
    UnsupportedLocation(String),

    #[error("registry name '{name}' is already bound to {existing} (cannot bind it to {attempted})")]
    DuplicateRegistryName {
        name: String,
        existing: String,
        attempted: String,
    },

    #[error("cannot read artifact metadata '{target}': {source}")]
    Metadata {
        target: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration '{}': {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("registry snapshot {location}: {reason}")]
    Archive { location: String, reason: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
