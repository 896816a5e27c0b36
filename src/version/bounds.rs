use std::cmp::Ordering;

use semver::{Comparator, Op, Version, VersionReq};

// ─── Version Window ────────────────────────────────────────────────

/// A conservative `[lower, upper)` window around a range.
///
/// Every version the range matches lies inside the window; the window may
/// also contain versions the range rejects, so callers still test each
/// candidate. `None` means unbounded on that side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionWindow {
    pub lower: Option<Version>,
    pub upper: Option<Version>,
}

impl VersionWindow {
    pub fn contains(&self, version: &Version) -> bool {
        self.lower
            .as_ref()
            .map_or(true, |lower| version.cmp_precedence(lower) != Ordering::Less)
            && self
                .upper
                .as_ref()
                .map_or(true, |upper| version.cmp_precedence(upper) == Ordering::Less)
    }
}

pub(super) fn window_of(alternatives: &[VersionReq]) -> VersionWindow {
    let mut windows = alternatives.iter().map(window_of_req);
    let Some(first) = windows.next() else {
        return VersionWindow::default();
    };
    // Union: the lowest lower bound and the highest upper bound.
    windows.fold(first, |acc, w| VersionWindow {
        lower: match (acc.lower, w.lower) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        },
        upper: match (acc.upper, w.upper) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        },
    })
}

fn window_of_req(req: &VersionReq) -> VersionWindow {
    // Intersection: the highest lower bound and the lowest upper bound.
    let mut window = VersionWindow::default();
    for comparator in &req.comparators {
        if let Some(lower) = lower_bound(comparator) {
            window.lower = Some(match window.lower.take() {
                Some(current) => current.max(lower),
                None => lower,
            });
        }
        if let Some(upper) = upper_bound(comparator) {
            window.upper = Some(match window.upper.take() {
                Some(current) => current.min(upper),
                None => upper,
            });
        }
    }
    window
}

fn floor(c: &Comparator) -> Version {
    let mut v = Version::new(c.major, c.minor.unwrap_or(0), c.patch.unwrap_or(0));
    v.pre = c.pre.clone();
    v
}

fn lower_bound(c: &Comparator) -> Option<Version> {
    match c.op {
        Op::Less | Op::LessEq => None,
        _ => Some(floor(c)),
    }
}

/// Exclusive upper bound: the first version past the last one `c` accepts.
///
/// `None` when there is no such bound, including when the next component
/// would overflow `u64`.
fn upper_bound(c: &Comparator) -> Option<Version> {
    let next_major = || Some(Version::new(c.major.checked_add(1)?, 0, 0));
    let next_minor = |minor: u64| Some(Version::new(c.major, minor.checked_add(1)?, 0));
    let next_patch =
        |minor: u64, patch: u64| Some(Version::new(c.major, minor, patch.checked_add(1)?));

    match c.op {
        Op::Greater | Op::GreaterEq => None,
        Op::Less => Some(floor(c)),
        Op::Exact | Op::LessEq | Op::Wildcard => match (c.minor, c.patch) {
            (None, _) => next_major(),
            (Some(minor), None) => next_minor(minor),
            (Some(minor), Some(patch)) => next_patch(minor, patch),
        },
        Op::Tilde => match c.minor {
            None => next_major(),
            Some(minor) => next_minor(minor),
        },
        Op::Caret => match (c.major, c.minor, c.patch) {
            (0, None, _) => next_major(),
            (0, Some(0), None) => next_minor(0),
            (0, Some(0), Some(patch)) => next_patch(0, patch),
            (0, Some(minor), _) => next_minor(minor),
            _ => next_major(),
        },
        _ => None,
    }
}
