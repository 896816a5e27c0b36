//! Configuration: where quiver keeps its files, and which registries the
//! user and the current project declare.
//!
//! Layout:
//! ```text
//! ~/.quiver/                     ($QUIVER_HOME)
//! ├── config.toml                global registries
//! └── cache/                     ($QUIVER_CACHE_DIR)
//!     └── registries/
//!         └── <location hash>/   unpacked remote snapshot
//! ```
//!
//! A project declares its own registries and requirements in `quiver.toml`,
//! found in the working directory or any of its ancestors.

use std::path::{Path, PathBuf};

mod global;
mod project;

pub use global::GlobalConfig;
pub use project::{ProjectConfig, ProjectSection, PROJECT_FILE};

// ─── Directories ───────────────────────────────────────────────────

/// Resolve the home directory.
///
/// Priority:
/// 1. `$QUIVER_HOME` environment variable
/// 2. `~/.quiver/`
pub fn home_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("QUIVER_HOME") {
        return Some(PathBuf::from(dir));
    }
    dirs_home().map(|home| home.join(".quiver"))
}

/// Resolve the cache directory.
///
/// Priority:
/// 1. `$QUIVER_CACHE_DIR` environment variable
/// 2. `<home>/cache/`
pub fn cache_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("QUIVER_CACHE_DIR") {
        return Some(PathBuf::from(dir));
    }
    home_dir().map(|home| home.join("cache"))
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from)
}

/// The global config file inside `home`.
pub fn global_config_path(home: &Path) -> PathBuf {
    home.join("config.toml")
}
