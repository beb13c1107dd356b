// src/version/mod.rs

//! Version handling and constraint satisfaction for package specs
//!
//! Versions use the `[epoch:]version[-release]` layout. Comparison is
//! numeric-aware per dot-separated component, and live ("scm") versions
//! sort above every released version.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A parsed package version with epoch, version, and release components
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub epoch: u64,
    pub version: String,
    pub release: Option<String>,
}

impl Version {
    /// Parse a version string
    ///
    /// Format: [epoch:]version[-release]
    /// Examples:
    /// - "1.2.3" → epoch=0, version="1.2.3", release=None
    /// - "2:1.2.3" → epoch=2, version="1.2.3", release=None
    /// - "1.2.3-r4" → epoch=0, version="1.2.3", release=Some("r4")
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidVersion {
            version: s.to_string(),
            reason: reason.to_string(),
        };

        let (epoch_str, rest) = match s.split_once(':') {
            Some((e, r)) => (e, r),
            None => ("0", s),
        };

        let epoch = if epoch_str.is_empty() {
            0
        } else {
            epoch_str
                .parse::<u64>()
                .map_err(|e| invalid(&format!("invalid epoch: {}", e)))?
        };

        let (version, release) = match rest.split_once('-') {
            Some((v, r)) => (v.to_string(), Some(r.to_string())),
            None => (rest.to_string(), None),
        };

        if version.is_empty() {
            return Err(invalid("empty version component"));
        }
        if version.chars().any(|c| c.is_whitespace()) {
            return Err(invalid("whitespace in version"));
        }
        if release.as_deref() == Some("") {
            return Err(invalid("empty release component"));
        }

        Ok(Self {
            epoch,
            version,
            release,
        })
    }

    /// Whether this is a live version built from a source checkout
    pub fn is_scm(&self) -> bool {
        let v = self.version.as_str();
        v == "scm" || v.ends_with("_scm") || (v.len() >= 4 && v.chars().all(|c| c == '9'))
    }

    /// Convert to a semver::Version when the version part is strictly semver
    fn to_semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version).ok()
    }

    /// Compare two versions
    pub fn compare(&self, other: &Version) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match (self.is_scm(), other.is_scm()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }

        let by_version = match (self.to_semver(), other.to_semver()) {
            (Some(v1), Some(v2)) => v1.cmp(&v2),
            _ => compare_components(&self.version, &other.version),
        };
        if by_version != Ordering::Equal {
            return by_version;
        }

        match (&self.release, &other.release) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => compare_components(
                a.trim_start_matches('r'),
                b.trim_start_matches('r'),
            ),
        }
    }

    /// Whether two versions are equal ignoring the release
    pub fn same_ignoring_release(&self, other: &Version) -> bool {
        self.epoch == other.epoch
            && compare_components(&self.version, &other.version) == Ordering::Equal
    }

    /// Whether this version starts with the components of `prefix`
    pub fn starts_with(&self, prefix: &Version) -> bool {
        if self.epoch != prefix.epoch {
            return false;
        }
        let ours: Vec<&str> = self.version.split('.').collect();
        let theirs: Vec<&str> = prefix.version.split('.').collect();
        theirs.len() <= ours.len()
            && theirs
                .iter()
                .zip(ours.iter())
                .all(|(a, b)| compare_component(a, b) == Ordering::Equal)
    }
}

/// Compare dot-separated version strings component by component
fn compare_components(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match compare_component(x, y) {
                Ordering::Equal => continue,
                ord => return ord,
            },
        }
    }
}

/// Compare one component: leading digits numerically, then any suffix lexically
fn compare_component(a: &str, b: &str) -> Ordering {
    let split = |s: &str| {
        let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let (num, rest) = s.split_at(digits);
        (num.trim_start_matches('0').to_string(), rest.to_string())
    };
    let (num_a, rest_a) = split(a);
    let (num_b, rest_b) = split(b);

    num_a
        .len()
        .cmp(&num_b.len())
        .then_with(|| num_a.cmp(&num_b))
        .then_with(|| rest_a.cmp(&rest_b))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(ref release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Fall back to the raw text so that Ord agrees with Eq ("1.01" vs "1.1")
        self.compare(other)
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.release.cmp(&other.release))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

/// Version constraint operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionConstraint {
    /// Any version is acceptable
    Any,
    /// Exact version match
    Exact(Version),
    /// Same version, any release
    Tilde(Version),
    /// Version starts with these components (`=1.2*`)
    Prefix(Version),
    /// Greater than
    GreaterThan(Version),
    /// Greater than or equal
    GreaterOrEqual(Version),
    /// Less than
    LessThan(Version),
    /// Less than or equal
    LessOrEqual(Version),
    /// Not equal
    NotEqual(Version),
    /// Both constraints must be satisfied (for ranges like ">= 1.0, < 2.0")
    And(Box<VersionConstraint>, Box<VersionConstraint>),
}

impl VersionConstraint {
    /// Parse a version constraint string
    ///
    /// Examples:
    /// - ">= 1.2.3" → GreaterOrEqual(1.2.3)
    /// - "< 2.0.0" → LessThan(2.0.0)
    /// - "~ 1.5" → Tilde(1.5)
    /// - ">= 1.0, < 2.0" → And(...)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(VersionConstraint::Any);
        }

        if let Some((left, right)) = s.split_once(',') {
            let left = Self::parse(left)?;
            let right = Self::parse(right)?;
            return Ok(VersionConstraint::And(Box::new(left), Box::new(right)));
        }

        for op in [">=", "<=", "!=", "=*", "~", ">", "<", "="] {
            if let Some(rest) = s.strip_prefix(op) {
                return Self::from_operator(op, Version::parse(rest.trim())?);
            }
        }

        Ok(VersionConstraint::Exact(Version::parse(s)?))
    }

    /// Build a constraint from an operator token and a version
    pub fn from_operator(op: &str, version: Version) -> Result<Self> {
        Ok(match op {
            "=" => VersionConstraint::Exact(version),
            "~" => VersionConstraint::Tilde(version),
            "=*" => VersionConstraint::Prefix(version),
            ">" => VersionConstraint::GreaterThan(version),
            ">=" => VersionConstraint::GreaterOrEqual(version),
            "<" => VersionConstraint::LessThan(version),
            "<=" => VersionConstraint::LessOrEqual(version),
            "!=" => VersionConstraint::NotEqual(version),
            other => {
                return Err(Error::InvalidVersion {
                    version: version.to_string(),
                    reason: format!("unknown operator '{}'", other),
                });
            }
        })
    }

    /// Check if a version satisfies this constraint
    pub fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(v) => version.compare(v) == Ordering::Equal,
            VersionConstraint::Tilde(v) => version.same_ignoring_release(v),
            VersionConstraint::Prefix(v) => version.starts_with(v),
            VersionConstraint::GreaterThan(v) => version.compare(v) == Ordering::Greater,
            VersionConstraint::GreaterOrEqual(v) => version.compare(v) != Ordering::Less,
            VersionConstraint::LessThan(v) => version.compare(v) == Ordering::Less,
            VersionConstraint::LessOrEqual(v) => version.compare(v) != Ordering::Greater,
            VersionConstraint::NotEqual(v) => version.compare(v) != Ordering::Equal,
            VersionConstraint::And(left, right) => {
                left.satisfies(version) && right.satisfies(version)
            }
        }
    }

    /// Whether this constraint says anything at all
    pub fn is_any(&self) -> bool {
        matches!(self, VersionConstraint::Any)
    }

    /// How strongly this constraint pulls towards newer versions
    ///
    /// Used when scoring `||` alternatives: an open-ended lower bound is the
    /// most attractive, a pinned version less so, an upper bound least.
    pub fn operator_bias(&self) -> i32 {
        match self {
            VersionConstraint::Any
            | VersionConstraint::GreaterThan(_)
            | VersionConstraint::GreaterOrEqual(_) => 9,
            VersionConstraint::Exact(_)
            | VersionConstraint::Tilde(_)
            | VersionConstraint::Prefix(_) => 2,
            VersionConstraint::LessThan(_)
            | VersionConstraint::LessOrEqual(_)
            | VersionConstraint::NotEqual(_) => 1,
            VersionConstraint::And(left, right) => left.operator_bias().min(right.operator_bias()),
        }
    }

    /// Render in the compact atom form used by package specs (`>=1.0`)
    pub fn atom_prefix(&self) -> Option<(String, &Version)> {
        match self {
            VersionConstraint::Exact(v) => Some(("=".to_string(), v)),
            VersionConstraint::Tilde(v) => Some(("~".to_string(), v)),
            VersionConstraint::Prefix(v) => Some(("=*".to_string(), v)),
            VersionConstraint::GreaterThan(v) => Some((">".to_string(), v)),
            VersionConstraint::GreaterOrEqual(v) => Some((">=".to_string(), v)),
            VersionConstraint::LessThan(v) => Some(("<".to_string(), v)),
            VersionConstraint::LessOrEqual(v) => Some(("<=".to_string(), v)),
            VersionConstraint::NotEqual(v) => Some(("!=".to_string(), v)),
            VersionConstraint::Any | VersionConstraint::And(_, _) => None,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Any => write!(f, "*"),
            VersionConstraint::Exact(v) => write!(f, "= {}", v),
            VersionConstraint::Tilde(v) => write!(f, "~ {}", v),
            VersionConstraint::Prefix(v) => write!(f, "=* {}", v),
            VersionConstraint::GreaterThan(v) => write!(f, "> {}", v),
            VersionConstraint::GreaterOrEqual(v) => write!(f, ">= {}", v),
            VersionConstraint::LessThan(v) => write!(f, "< {}", v),
            VersionConstraint::LessOrEqual(v) => write!(f, "<= {}", v),
            VersionConstraint::NotEqual(v) => write!(f, "!= {}", v),
            VersionConstraint::And(left, right) => write!(f, "{}, {}", left, right),
        }
    }
}
