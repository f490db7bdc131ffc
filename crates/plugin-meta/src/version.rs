//! Version range parsing and checking.
//!
//! Plugins declare framework compatibility with npm-style ranges:
//!
//! - caret/tilde ranges: `^5.0.0`, `~5.2`
//! - comparator sets, space or comma separated: `>=5.0.0 <6.0.0`
//! - hyphen ranges: `5.0.0 - 5.9.9`
//! - alternatives: `^4.0.0 || ^5.0.0`
//! - wildcards: `*`, `5.x`, `latest`
//!
//! Each alternative is normalised into a [`semver::VersionReq`]. A bare
//! version means an exact match, as it does for npm.
//!
//! # Examples
//!
//! ```
//! use plugin_meta::version::VersionConstraint;
//!
//! let constraint = VersionConstraint::parse(">=5.0.0 <6").unwrap();
//! assert!(constraint.satisfies("5.31.2"));
//! assert!(!constraint.satisfies("6.0.0"));
//!
//! let constraint = VersionConstraint::parse("^4.0.0 || ^5.0.0").unwrap();
//! assert!(constraint.satisfies("4.4.1"));
//! assert!(!constraint.satisfies("3.9.0"));
//! ```

use semver::{Version, VersionReq};

use crate::error::{Error, Result};

/// A parsed version range that can be checked against concrete versions.
///
/// Any one alternative matching is enough.
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    alternatives: Vec<VersionReq>,
    /// The original constraint string for display.
    raw: String,
}

impl VersionConstraint {
    /// Parse an npm-style version range.
    pub fn parse(constraint: &str) -> Result<Self> {
        let raw = constraint.trim().to_string();
        let mut alternatives = Vec::new();

        for part in raw.split("||") {
            let normalized = normalize_range(part).map_err(|reason| {
                Error::VersionConstraintParse {
                    constraint: raw.clone(),
                    reason,
                }
            })?;
            let req = VersionReq::parse(&normalized).map_err(|e| Error::VersionConstraintParse {
                constraint: raw.clone(),
                reason: e.to_string(),
            })?;
            alternatives.push(req);
        }

        Ok(Self { alternatives, raw })
    }

    /// Check if a version string satisfies this range.
    ///
    /// Returns `false` if the version string cannot be parsed.
    pub fn satisfies(&self, version: &str) -> bool {
        match parse_version(version) {
            Ok(v) => self.satisfies_version(&v),
            Err(_) => false,
        }
    }

    /// Check if a `semver::Version` satisfies this range.
    pub fn satisfies_version(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Return the original constraint string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse a concrete version, tolerating a leading `v` and a missing patch
/// component (`5.2` -> `5.2.0`).
pub fn parse_version(s: &str) -> Result<Version> {
    let s = s.trim();
    let s = s.strip_prefix('v').unwrap_or(s);

    if let Ok(v) = Version::parse(s) {
        return Ok(v);
    }

    let with_patch = format!("{s}.0");
    Version::parse(&with_patch).map_err(|source| Error::InvalidVersion {
        version: s.to_string(),
        source,
    })
}

/// Turn one npm range alternative into `semver` comparator syntax.
fn normalize_range(part: &str) -> std::result::Result<String, String> {
    let part = part.trim();
    if part.is_empty() || matches!(part, "*" | "x" | "X" | "latest") {
        return Ok("*".to_string());
    }

    // Hyphen range: "1.2.3 - 2.3.4"
    if let Some((low, high)) = part.split_once(" - ") {
        let low = strip_v(low.trim());
        let high = strip_v(high.trim());
        if low.is_empty() || high.is_empty() {
            return Err(format!("incomplete hyphen range '{part}'"));
        }
        return Ok(format!(">={low}, <={high}"));
    }

    // Glue operators to their versions: ">= 1.0" -> ">=1.0"
    let mut glued = String::with_capacity(part.len());
    let mut pending_op = false;
    for c in part.chars() {
        if matches!(c, '<' | '>' | '=' | '^' | '~') {
            pending_op = true;
            glued.push(c);
        } else if c.is_whitespace() && pending_op {
            continue;
        } else {
            pending_op = false;
            glued.push(c);
        }
    }

    let comparators: Vec<String> = glued
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(normalize_comparator)
        .collect();

    if comparators.is_empty() {
        return Err(format!("no comparators in '{part}'"));
    }

    Ok(comparators.join(", "))
}

fn normalize_comparator(token: &str) -> String {
    let op_len = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(op_len);
    let version = strip_v(version);

    if !op.is_empty() {
        return format!("{op}{version}");
    }

    // A bare version pins it exactly; bare wildcards stay as they are
    if version.contains(['*', 'x', 'X']) {
        version.to_string()
    } else {
        format!("={version}")
    }
}

fn strip_v(s: &str) -> &str {
    s.strip_prefix('v').unwrap_or(s)
}
