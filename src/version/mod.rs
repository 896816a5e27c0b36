//! Semantic-version ranges and version references.
//!
//! Registry documents write requirements in the node-style range grammar
//! (`1.2.3`, `^1.2`, `>=1.0.0 <2.0.0`, `1.0.0 - 2.0.0`, `1.x || 2.x`).
//! [`VersionRange`] normalizes that grammar onto `semver::VersionReq`
//! alternatives so matching follows full semver precedence, including the
//! pre-release rule.
//!
//! A [`VersionReference`] is what an artifact's `requires` map points at: a
//! range, optionally followed by the exact version it was pinned to
//! (`"^1.0 1.2.3"`).

use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

mod bounds;
mod parse;

pub use bounds::VersionWindow;

// ─── Version Range ─────────────────────────────────────────────────

/// A parsed range expression: a disjunction of semver requirements.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Parse a range expression.
    pub fn parse(raw: &str) -> Result<Self> {
        let alternatives = parse::parse_alternatives(raw)?;
        Ok(Self {
            raw: raw.trim().to_string(),
            alternatives,
        })
    }

    /// The range that accepts every release version.
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            alternatives: vec![VersionReq::STAR],
        }
    }

    /// A range that only accepts `version`.
    pub fn exact(version: &Version) -> Self {
        let mut raw = format!("={}.{}.{}", version.major, version.minor, version.patch);
        if !version.pre.is_empty() {
            raw.push('-');
            raw.push_str(version.pre.as_str());
        }
        Self {
            raw,
            alternatives: vec![VersionReq {
                comparators: vec![semver::Comparator {
                    op: semver::Op::Exact,
                    major: version.major,
                    minor: Some(version.minor),
                    patch: Some(version.patch),
                    pre: version.pre.clone(),
                }],
            }],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Conservative window containing every version this range can match.
    pub fn window(&self) -> VersionWindow {
        bounds::window_of(&self.alternatives)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(value: VersionRange) -> Self {
        value.raw
    }
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.alternatives == other.alternatives
    }
}

impl Eq for VersionRange {}

// ─── Version Reference ─────────────────────────────────────────────

/// A requirement value: a range plus the version it was pinned to, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionReference {
    pub range: VersionRange,
    pub resolved: Option<Version>,
}

impl VersionReference {
    /// Parse `<range>` or `<range> <resolved>`.
    ///
    /// The trailing token is treated as a pin only when it is a complete
    /// version and what precedes it is a complete range on its own (so
    /// hyphen ranges such as `1.0.0 - 2.0.0` stay ranges).
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Some((head, tail)) = raw.rsplit_once(char::is_whitespace) {
            let head = head.trim_end();
            let pinnable = !head.is_empty() && !head.ends_with('-') && !head.ends_with("||");
            if pinnable {
                if let (Ok(resolved), Ok(range)) = (Version::parse(tail), VersionRange::parse(head)) {
                    if !range.matches(&resolved) {
                        return Err(Error::InvalidVersionRange {
                            range: raw.to_string(),
                            reason: format!("pinned version {} does not satisfy '{}'", resolved, head),
                        });
                    }
                    return Ok(Self {
                        range,
                        resolved: Some(resolved),
                    });
                }
            }
        }
        Ok(Self {
            range: VersionRange::parse(raw)?,
            resolved: None,
        })
    }

    pub fn any() -> Self {
        Self {
            range: VersionRange::any(),
            resolved: None,
        }
    }

    /// The range a registry lookup should use: the pin when present.
    pub fn lookup_range(&self) -> VersionRange {
        match &self.resolved {
            Some(version) => VersionRange::exact(version),
            None => self.range.clone(),
        }
    }
}

impl fmt::Display for VersionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resolved {
            Some(version) => write!(f, "{} {}", self.range, version),
            None => write!(f, "{}", self.range),
        }
    }
}

impl FromStr for VersionReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionReference {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionReference> for String {
    fn from(value: VersionReference) -> Self {
        value.to_string()
    }
}

/// Parse a single version, mapping the error into the crate error.
pub fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).map_err(|e| Error::InvalidVersion {
        version: raw.to_string(),
        reason: e.to_string(),
    })
}
