use semver::VersionReq;

use crate::error::{Error, Result};

// ─── Range Grammar ─────────────────────────────────────────────────

/// Split a range expression on `||` and normalize each alternative into a
/// `semver::VersionReq`.
pub(super) fn parse_alternatives(raw: &str) -> Result<Vec<VersionReq>> {
    let invalid = |reason: String| Error::InvalidVersionRange {
        range: raw.to_string(),
        reason,
    };

    let mut alternatives = Vec::new();
    for alternative in raw.split("||") {
        let normalized = normalize_alternative(alternative.trim()).map_err(invalid)?;
        let req = VersionReq::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
        alternatives.push(req);
    }
    Ok(alternatives)
}

/// Rewrite one alternative into the comma-separated comparator list the
/// `semver` crate accepts.
///
///   ""  / "*" / "x"        -> "*"
///   "1.2.3"                -> "=1.2.3"   (bare versions are exact)
///   ">= 1.0 <2"            -> ">=1.0, <2"
///   "1.0.0 - 2.0.0"        -> ">=1.0.0, <=2.0.0"
pub(super) fn normalize_alternative(alternative: &str) -> std::result::Result<String, String> {
    if alternative.is_empty() || is_wildcard(alternative) {
        return Ok("*".to_string());
    }

    if let Some((lower, upper)) = alternative.split_once(" - ") {
        let lower = strip_v(lower.trim());
        let upper = strip_v(upper.trim());
        if lower.is_empty() || upper.is_empty() {
            return Err("hyphen range needs both bounds".to_string());
        }
        return Ok(format!(">={}, <={}", lower, upper));
    }

    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op: Option<String> = None;
    for token in alternative
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(is_op_char) {
            if pending_op.is_some() {
                return Err(format!("dangling operator before '{}'", token));
            }
            pending_op = Some(token.to_string());
            continue;
        }
        let comparator = match pending_op.take() {
            Some(op) => format!("{}{}", op, strip_v(token)),
            None => normalize_comparator(token),
        };
        comparators.push(comparator);
    }
    if let Some(op) = pending_op {
        return Err(format!("operator '{}' has no version", op));
    }
    if comparators.is_empty() {
        return Ok("*".to_string());
    }
    Ok(comparators.join(", "))
}

fn normalize_comparator(token: &str) -> String {
    let op_len = token.chars().take_while(|c| is_op_char(*c)).count();
    let (op, version) = token.split_at(op_len);
    let version = strip_v(version);
    if !op.is_empty() {
        return format!("{}{}", op, version);
    }
    if is_wildcard(version) || version.split('.').any(is_wildcard) {
        return version.to_string();
    }
    format!("={}", version)
}

fn is_op_char(c: char) -> bool {
    matches!(c, '=' | '>' | '<' | '~' | '^')
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "*" | "x" | "X")
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}
