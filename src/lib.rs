// src/lib.rs

//! pkgplan: package dependency resolution
//!
//! Works out what to install, keep, or remove to satisfy a set of targets
//! against installed and available packages, then orders the changes into
//! a job list an executor can run with bounded parallelism.
//!
//! # Architecture
//!
//! - Environment: packages, repositories, and sets come from an
//!   [`Environment`]; [`PackageDatabase`] is an in-memory one
//! - Policy: every judgement call goes through [`ResolverFunctions`],
//!   configured by [`ResolverConfig`]
//! - Decisions: one per resolvent (package, slot, destination), revised by
//!   restarting when a later constraint invalidates one already relied on
//! - Jobs: fetch, install, and uninstall jobs with requirement tags that
//!   decide what still runs after a failure

pub mod config;
pub mod dependencies;
pub mod environment;
mod error;
pub mod name;
pub mod package;
pub mod resolver;
pub mod spec;
pub mod tribool;
pub mod version;

pub use config::ResolverConfig;
pub use dependencies::{LabelsClassifier, SanitisedDependency};
pub use environment::{Environment, PackageDatabase};
pub use error::{Error, Result};
pub use name::{PackageName, RepositoryName, SlotName};
pub use package::{PackageId, Repository, RepositoryKind};
pub use resolver::{
    ContinueOnFailure, Decision, JobList, JobSchedule, Resolved, Resolver, ResolverFunctions,
    StandardFunctions,
};
pub use spec::{BlockDepSpec, DepSpec, PackageDepSpec};
pub use tribool::Tribool;
pub use version::{Version, VersionConstraint};
