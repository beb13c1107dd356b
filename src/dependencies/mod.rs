// src/dependencies/mod.rs

//! Dependency trees, labels and their classification
//!
//! A package's dependencies are stored as labelled trees (see [`tree`]).
//! Before the resolver looks at them they are sanitised into a flat list of
//! [`SanitisedDependency`] values, each carrying the labels active where it
//! was written. The [`LabelsClassifier`] then answers questions like "is
//! this only needed at build time?" about those labels.
//!
//! # Example
//!
//! ```ignore
//! use pkgplan::dependencies::{DependencyTree, DependencyLabel};
//!
//! let tree = DependencyTree::parse("build: cat/compiler run: cat/lib")?;
//! let labels = DependencyLabel::parse_list("build+run")?;
//! ```

mod classifier;
mod labels;
mod sanitised;
pub mod tree;

pub use classifier::{LabelsClassification, LabelsClassifier};
pub use labels::{DEFAULT_TEST_CHOICE, DependencyLabel, LabelKind, labels_to_string};
pub use sanitised::{SanitisedDependency, sanitise};
pub use tree::{DependencyKey, DependencyTree};
