use std::fmt;
use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// How a registry at a location is materialized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocationKind {
    /// A folder of metadata documents on the local filesystem.
    Folder(PathBuf),
    /// A `.tar.gz` snapshot, fetched and unpacked into the cache.
    Archive(Url),
}

/// Canonical registry location.
///
/// Two locations are the same registry exactly when their canonical strings
/// are equal. The canonical string is the URL form (`file:///…` for paths)
/// without a trailing `/`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    canonical: String,
}

impl Location {
    /// Parse a URL or filesystem path. Relative paths resolve against `base`
    /// (or the working directory when `base` is `None`).
    pub fn parse(raw: &str, base: Option<&Path>) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid(raw, "empty location"));
        }
        if raw.contains("://") {
            let url = Url::parse(raw).map_err(|e| invalid(raw, &e.to_string()))?;
            return Self::from_url(url);
        }

        let path = Path::new(raw);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let base = match base {
                Some(base) => base.to_path_buf(),
                None => std::env::current_dir().map_err(|e| Error::io(".", e))?,
            };
            base.join(path)
        };
        Self::from_path(&absolute)
    }

    /// Resolve a location declared inside a registry.
    ///
    /// Relative paths are taken relative to the declaring registry: its folder
    /// for folder registries, its URL for archive registries.
    pub fn resolve(raw: &str, declared_in: &Location) -> Result<Self> {
        let raw = raw.trim();
        if raw.contains("://") || Path::new(raw).is_absolute() {
            return Self::parse(raw, None);
        }
        match declared_in.kind()? {
            LocationKind::Folder(folder) => Self::parse(raw, Some(folder.as_path())),
            LocationKind::Archive(url) => {
                let joined = url.join(raw).map_err(|e| invalid(raw, &e.to_string()))?;
                Self::from_url(joined)
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let url = Url::from_file_path(normalize(path))
            .map_err(|()| invalid(&display, "not an absolute path"))?;
        Self::from_url(url)
    }

    fn from_url(url: Url) -> Result<Self> {
        match url.scheme() {
            "http" | "https" | "file" => {}
            _ => return Err(Error::UnsupportedLocation(url.to_string())),
        }
        let canonical = url.as_str().trim_end_matches('/').to_string();
        Ok(Self { canonical })
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.canonical).map_err(|e| invalid(&self.canonical, &e.to_string()))
    }

    pub fn kind(&self) -> Result<LocationKind> {
        let url = self.url()?;
        if url.scheme() != "file" {
            return Ok(LocationKind::Archive(url));
        }
        let path = url
            .to_file_path()
            .map_err(|()| invalid(&self.canonical, "not a local path"))?;
        if is_archive_name(&path) {
            Ok(LocationKind::Archive(url))
        } else {
            Ok(LocationKind::Folder(path))
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self.kind(), Ok(LocationKind::Archive(_)))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

fn invalid(location: &str, reason: &str) -> Error {
    Error::InvalidLocation {
        location: location.to_string(),
        reason: reason.to_string(),
    }
}

fn is_archive_name(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Lexically drop `.` and fold `..`; the path need not exist.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
