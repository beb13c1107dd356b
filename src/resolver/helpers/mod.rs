// src/resolver/helpers/mod.rs

//! Building blocks for the standard policy functions

pub mod constraints;
pub mod destinations;
pub mod interest;
pub mod ordering;
pub mod permissions;
pub mod resolvents;
pub mod use_existing;

use crate::error::Result;
use crate::name::PackageName;
use crate::package::PackageId;
use crate::spec::{PackageDepSpec, parse_specs};

/// A parsed list of specs from configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecList(Vec<PackageDepSpec>);

impl SpecList {
    pub fn parse<S: AsRef<str>>(texts: &[S]) -> Result<Self> {
        Ok(Self(parse_specs(texts)?))
    }

    /// Whether any spec matches the id, ignoring choice requirements
    pub fn matches(&self, id: &PackageId) -> bool {
        self.0.iter().any(|spec| spec.matches_ignoring_choices(id))
    }

    pub fn matches_any(&self, ids: &[std::sync::Arc<PackageId>]) -> bool {
        ids.iter().any(|id| self.matches(id))
    }

    pub fn matches_name(&self, name: &PackageName) -> bool {
        self.0.iter().any(|spec| &spec.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PackageDepSpec> {
        self.0.iter()
    }
}

impl From<Vec<PackageDepSpec>> for SpecList {
    fn from(specs: Vec<PackageDepSpec>) -> Self {
        Self(specs)
    }
}
