// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use pkgplan::dependencies::DependencyKey;
use pkgplan::resolver::{DecisionKind, Job, Resolvent};
use pkgplan::{
    Decision, PackageDatabase, PackageId, Repository, RepositoryKind, Resolved, Resolver,
    ResolverConfig,
};

/// Builds a package database with one source repository ("repo") and the
/// installed repository ("installed").
pub struct Universe {
    db: PackageDatabase,
}

impl Universe {
    pub fn new() -> Self {
        let db = PackageDatabase::new()
            .with_repository(Repository::new("repo", RepositoryKind::Source).with_importance(10))
            .with_repository(Repository::new("installed", RepositoryKind::Installed));
        Self { db }
    }

    fn add(mut self, name: &str, version: &str, repository: &str, deps: &str) -> Self {
        let mut id = PackageId::new(name, version, repository).unwrap();
        if !deps.is_empty() {
            id = id.with_dependencies(DependencyKey::Dependencies, deps).unwrap();
        }
        self.db.add_id(id).unwrap();
        self
    }

    /// Available from the source repository
    pub fn available(self, name: &str, version: &str, deps: &str) -> Self {
        self.add(name, version, "repo", deps)
    }

    pub fn installed(self, name: &str, version: &str, deps: &str) -> Self {
        self.add(name, version, "installed", deps)
    }

    pub fn with_id(mut self, id: PackageId) -> Self {
        self.db.add_id(id).unwrap();
        self
    }

    pub fn build(self) -> PackageDatabase {
        self.db
    }
}

pub fn resolve(env: &PackageDatabase, config: &ResolverConfig, targets: &[&str]) -> Resolved {
    Resolver::from_config(env, config)
        .unwrap()
        .resolve(targets)
        .unwrap()
}

pub fn resolve_default(env: &PackageDatabase, targets: &[&str]) -> Resolved {
    resolve(env, &ResolverConfig::default(), targets)
}

/// The only decision made for a package name
pub fn decision<'a>(resolved: &'a Resolved, name: &str) -> &'a Decision {
    let decisions = resolved.decisions_for(name);
    assert_eq!(decisions.len(), 1, "expected one decision for {}", name);
    decisions[0]
}

pub fn kind(resolved: &Resolved, name: &str) -> DecisionKind {
    decision(resolved, name).kind()
}

pub fn resolvent(resolved: &Resolved, name: &str) -> Resolvent {
    decision(resolved, name).resolvent().clone()
}

/// Jobs as "fetch cat/app" style strings, in order
pub fn job_names(resolved: &Resolved) -> Vec<String> {
    resolved
        .job_list
        .iter()
        .map(|entry| {
            let (verb, resolvent) = match entry.job {
                Job::Fetch { ref resolvent, .. } => ("fetch", resolvent),
                Job::Install { ref resolvent, .. } => ("install", resolvent),
                Job::Uninstall { ref resolvent, .. } => ("uninstall", resolvent),
            };
            format!("{} {}", verb, resolvent.package)
        })
        .collect()
}

/// Package names of the taken changes and removals, in order
pub fn ordered_names(resolved: &Resolved) -> Vec<String> {
    resolved
        .taken_change_or_remove_decisions
        .iter()
        .map(|d| d.resolvent.package.to_string())
        .collect()
}
