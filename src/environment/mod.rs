// src/environment/mod.rs

//! The resolver's view of the outside world
//!
//! An [`Environment`] answers questions about repositories, package ids,
//! installed state and named sets. The resolver never mutates it.

mod database;

pub use database::PackageDatabase;

use crate::name::{PackageName, RepositoryName};
use crate::package::{PackageId, Repository, RepositoryKind};
use crate::spec::{DepSpec, PackageDepSpec};
use crate::tribool::Tribool;
use std::sync::Arc;

/// Repositories, ids and sets available to a resolver run
pub trait Environment {
    /// All repositories, in no particular order
    fn repositories(&self) -> &[Repository];

    /// Every id with this name, across all repositories
    fn package_ids(&self, name: &PackageName) -> Vec<Arc<PackageId>>;

    /// Every package name known to any repository
    fn package_names(&self) -> Vec<PackageName>;

    /// The members of a named set
    fn set(&self, name: &str) -> Option<Vec<DepSpec>>;

    /// Site-wide opinion on whether a suggestion or recommendation should be taken
    fn interest_in_suggestion(&self, _from: &PackageId, _spec: &PackageDepSpec) -> Tribool {
        Tribool::Indeterminate
    }

    fn repository(&self, name: &RepositoryName) -> Option<&Repository> {
        self.repositories().iter().find(|r| &r.name == name)
    }

    fn repository_kind(&self, id: &PackageId) -> Option<RepositoryKind> {
        self.repository(&id.repository).map(|r| r.kind)
    }

    fn is_installed(&self, id: &PackageId) -> bool {
        self.repository_kind(id) == Some(RepositoryKind::Installed)
    }

    /// Every installed id, sorted
    fn installed_ids(&self) -> Vec<Arc<PackageId>> {
        let mut ids: Vec<_> = self
            .package_names()
            .iter()
            .flat_map(|name| self.package_ids(name))
            .filter(|id| self.is_installed(id))
            .collect();
        ids.sort();
        ids
    }

    /// Ids with this name held in repositories of the given kind
    fn ids_in(&self, name: &PackageName, kind: RepositoryKind) -> Vec<Arc<PackageId>> {
        self.package_ids(name)
            .into_iter()
            .filter(|id| self.repository_kind(id) == Some(kind))
            .collect()
    }

    /// Installed ids matching a spec, choice requirements included
    fn installed_matching(
        &self,
        spec: &PackageDepSpec,
        from_id: Option<&PackageId>,
    ) -> Vec<Arc<PackageId>> {
        self.ids_in(&spec.name, RepositoryKind::Installed)
            .into_iter()
            .filter(|id| spec.matches(id, from_id))
            .collect()
    }

    /// Installed ids matching a spec, disregarding choice requirements
    fn installed_matching_ignoring_choices(&self, spec: &PackageDepSpec) -> Vec<Arc<PackageId>> {
        self.ids_in(&spec.name, RepositoryKind::Installed)
            .into_iter()
            .filter(|id| spec.matches_ignoring_choices(id))
            .collect()
    }

    /// Unmasked ids that could be installed, oldest first
    ///
    /// Versions tie-break on repository importance, so the last entry is
    /// the one to prefer.
    fn installable_ids(&self, name: &PackageName) -> Vec<Arc<PackageId>> {
        let mut ids: Vec<_> = self
            .package_ids(name)
            .into_iter()
            .filter(|id| !id.masked)
            .filter(|id| {
                matches!(
                    self.repository_kind(id),
                    Some(RepositoryKind::Source | RepositoryKind::Binary)
                )
            })
            .collect();
        ids.sort_by(|a, b| {
            a.version
                .cmp(&b.version)
                .then_with(|| self.importance(a).cmp(&self.importance(b)))
                .then_with(|| a.cmp(b))
        });
        ids
    }

    fn importance(&self, id: &PackageId) -> i32 {
        self.repository(&id.repository)
            .map(|r| r.importance)
            .unwrap_or_default()
    }
}
