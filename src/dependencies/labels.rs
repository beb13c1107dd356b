// src/dependencies/labels.rs

//! Dependency label definitions
//!
//! Labels say *when* a dependency is needed (to build, to run, after
//! install...) and whether it is optional (recommendations, suggestions).
//! Labels can be switched on conditionally by a choice of the package that
//! carries them.

use crate::error::{Error, Result};
use crate::package::PackageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of dependency label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelKind {
    /// Needed to build the package
    Build,

    /// Needed for the package to run
    Run,

    /// Needed eventually, may be installed after the package
    Post,

    /// Needed to run the package's test suite
    Test,

    /// Needed to fetch the package's sources
    Fetch,

    /// Linked against: needed to build and to run, and changes to it matter
    CompileAgainst,

    /// Optional, taken by default
    Recommendation,

    /// Optional, not taken by default
    Suggestion,
}

/// Choice that switches test labels on when no explicit condition is given
pub const DEFAULT_TEST_CHOICE: &str = "recommended_tests";

impl LabelKind {
    /// Get the text form used in dependency strings
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Run => "run",
            Self::Post => "post",
            Self::Test => "test",
            Self::Fetch => "fetch",
            Self::CompileAgainst => "compile-against",
            Self::Recommendation => "recommendation",
            Self::Suggestion => "suggestion",
        }
    }

    /// Parse a label kind from its text form
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "build" => Some(Self::Build),
            "run" | "runtime" => Some(Self::Run),
            "post" => Some(Self::Post),
            "test" => Some(Self::Test),
            "fetch" => Some(Self::Fetch),
            "compile-against" | "compileagainst" => Some(Self::CompileAgainst),
            "recommendation" | "recommended" => Some(Self::Recommendation),
            "suggestion" | "suggested" => Some(Self::Suggestion),
            _ => None,
        }
    }

    /// Return all label kinds
    pub fn all() -> &'static [LabelKind] {
        &[
            Self::Build,
            Self::Run,
            Self::Post,
            Self::Test,
            Self::Fetch,
            Self::CompileAgainst,
            Self::Recommendation,
            Self::Suggestion,
        ]
    }

    /// Is this label for an optional dependency?
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Recommendation | Self::Suggestion)
    }

    /// Choice consulted when the label carries no explicit condition
    pub fn default_condition(&self) -> Option<&'static str> {
        match self {
            Self::Test => Some(DEFAULT_TEST_CHOICE),
            _ => None,
        }
    }

    /// Get a human-readable description of this label kind
    pub fn description(&self) -> &'static str {
        match self {
            Self::Build => "Build dependency",
            Self::Run => "Runtime dependency",
            Self::Post => "Post-install dependency",
            Self::Test => "Test dependency",
            Self::Fetch => "Fetch dependency",
            Self::CompileAgainst => "Compiled-against dependency",
            Self::Recommendation => "Recommended dependency",
            Self::Suggestion => "Suggested dependency",
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A label as written in a dependency tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyLabel {
    pub kind: LabelKind,
    /// Choice that must be enabled on the labelled package for this label to count
    #[serde(default)]
    pub condition: Option<String>,
}

impl DependencyLabel {
    pub fn new(kind: LabelKind) -> Self {
        Self {
            kind,
            condition: None,
        }
    }

    pub fn when(kind: LabelKind, choice: impl Into<String>) -> Self {
        Self {
            kind,
            condition: Some(choice.into()),
        }
    }

    /// Whether this label is switched on for the given package
    pub fn enabled(&self, id: &PackageId) -> bool {
        match self.condition.as_deref().or(self.kind.default_condition()) {
            Some(choice) => id.choice_enabled(choice),
            None => true,
        }
    }

    /// Parse one label like `build` or `test(expensive_tests)`
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidDependencies(format!("unknown dependency label '{}'", text));

        let (kind_text, condition) = match text.split_once('(') {
            Some((kind, rest)) => {
                let choice = rest.strip_suffix(')').ok_or_else(invalid)?;
                if choice.is_empty() {
                    return Err(invalid());
                }
                (kind, Some(choice.to_string()))
            }
            None => (text, None),
        };

        let kind = LabelKind::from_prefix(kind_text).ok_or_else(invalid)?;
        Ok(Self { kind, condition })
    }

    /// Parse a `+`-separated label list like `build+run`
    pub fn parse_list(text: &str) -> Result<Vec<Self>> {
        text.split('+').map(Self::parse).collect()
    }
}

impl fmt::Display for DependencyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.condition {
            Some(ref choice) => write!(f, "{}({})", self.kind, choice),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Render a label list in its `+`-separated text form
pub fn labels_to_string(labels: &[DependencyLabel]) -> String {
    labels
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_kind_prefix_round_trip() {
        for kind in LabelKind::all() {
            assert_eq!(LabelKind::from_prefix(kind.prefix()), Some(*kind));
        }
        assert_eq!(LabelKind::from_prefix("RUNTIME"), Some(LabelKind::Run));
        assert_eq!(LabelKind::from_prefix("sometimes"), None);
    }

    #[test]
    fn test_parse_list_with_condition() {
        let labels = DependencyLabel::parse_list("build+test(expensive_tests)").unwrap();
        assert_eq!(
            labels,
            vec![
                DependencyLabel::new(LabelKind::Build),
                DependencyLabel::when(LabelKind::Test, "expensive_tests"),
            ]
        );
        assert_eq!(labels_to_string(&labels), "build+test(expensive_tests)");
    }

    #[test]
    fn test_parse_rejects_bad_labels() {
        assert!(DependencyLabel::parse("nonsense").is_err());
        assert!(DependencyLabel::parse("test(").is_err());
        assert!(DependencyLabel::parse("test()").is_err());
    }

    #[test]
    fn test_enabled_uses_conditions() {
        let plain = PackageId::new("cat/pkg", "1", "repo").unwrap();
        let with_tests = plain.clone().with_choice(DEFAULT_TEST_CHOICE, true);

        assert!(DependencyLabel::new(LabelKind::Build).enabled(&plain));
        assert!(!DependencyLabel::new(LabelKind::Test).enabled(&plain));
        assert!(DependencyLabel::new(LabelKind::Test).enabled(&with_tests));

        let conditional_run = DependencyLabel::when(LabelKind::Run, "daemon");
        assert!(!conditional_run.enabled(&plain));
        assert!(conditional_run.enabled(&plain.clone().with_choice("daemon", true)));
    }

    #[test]
    fn test_optional_kinds() {
        assert!(LabelKind::Suggestion.is_optional());
        assert!(LabelKind::Recommendation.is_optional());
        assert!(!LabelKind::Post.is_optional());
    }
}
