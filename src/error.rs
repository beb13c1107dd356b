// src/error.rs

//! Error types for the resolver
//!
//! Resolvent-local failures (unsatisfiable constraints) are not errors: they
//! are recorded as decisions. Everything here either aborts the run or is a
//! user-facing problem with the input.

use thiserror::Error;

/// Errors that can occur while resolving
#[derive(Debug, Error)]
pub enum Error {
    /// A resolver invariant was violated. Never recoverable.
    #[error("Internal resolver error: {0}")]
    Internal(String),

    #[error("Ambiguous target '{spec}': could be any of {}", candidates.join(", "))]
    AmbiguousTarget {
        spec: String,
        candidates: Vec<String>,
    },

    #[error("No package matches target '{0}'")]
    NoSuchTarget(String),

    #[error("Invalid package spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Invalid dependency string: {0}")]
    InvalidDependencies(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Resolution did not settle after {restarts} restarts (last restart was for {resolvent})")]
    TooManyRestarts { restarts: usize, resolvent: String },

    #[error("No suitable destination repository for {0}")]
    NoDestination(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an internal invariant violation
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error is a violated invariant rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Result type for resolver operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_target_message() {
        let err = Error::AmbiguousTarget {
            spec: "foo".to_string(),
            candidates: vec!["cat-a/foo".to_string(), "cat-b/foo".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous target 'foo': could be any of cat-a/foo, cat-b/foo"
        );
        assert!(!err.is_internal());
    }

    #[test]
    fn test_internal_helper() {
        let err = Error::internal("empty label set");
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "Internal resolver error: empty label set");
    }
}
