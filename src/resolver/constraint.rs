// src/resolver/constraint.rs

//! Constraints accumulated on a resolution

use super::reason::Reason;
use super::resolvent::DestinationType;
use crate::package::PackageId;
use crate::spec::DepSpec;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// When an installed id may stand in for a new one
///
/// Variants are ordered strictest first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UseExisting {
    Never,
    /// Only if the installed id is transient
    IfTransient,
    /// Only if version and choices are unchanged
    IfSame,
    IfSameVersion,
    IfPossible,
}

/// One requirement on a resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub destination_type: DestinationType,
    pub spec: DepSpec,
    pub reason: Reason,
    /// Recorded but not acted upon unless something else takes it
    pub untaken: bool,
    pub use_existing: UseExisting,
    /// Having nothing at all also satisfies this
    pub nothing_is_fine_too: bool,
    /// No decision other than unable-to-make is acceptable
    pub force_unable: bool,
    pub suppress_dependencies: bool,
    pub suppress_blockers: bool,
}

impl Constraint {
    pub fn new(destination_type: DestinationType, spec: DepSpec, reason: Reason) -> Self {
        Self {
            destination_type,
            spec,
            reason,
            untaken: false,
            use_existing: UseExisting::IfPossible,
            nothing_is_fine_too: false,
            force_unable: false,
            suppress_dependencies: false,
            suppress_blockers: false,
        }
    }

    pub fn untaken(mut self, untaken: bool) -> Self {
        self.untaken = untaken;
        self
    }

    pub fn use_existing(mut self, use_existing: UseExisting) -> Self {
        self.use_existing = use_existing;
        self
    }

    pub fn nothing_is_fine_too(mut self, nothing_is_fine_too: bool) -> Self {
        self.nothing_is_fine_too = nothing_is_fine_too;
        self
    }

    pub fn suppressed(mut self) -> Self {
        self.suppress_dependencies = true;
        self.suppress_blockers = true;
        self
    }

    /// Whether an id satisfies the spec part of this constraint
    pub fn allows(&self, id: &PackageId) -> bool {
        let from_id = match self.reason {
            Reason::Dependency { ref from_id, .. } => Some(from_id.as_ref()),
            _ => None,
        };
        match self.spec {
            DepSpec::Package(ref spec) => spec.matches(id, from_id),
            DepSpec::Block(ref block) => !block.blocking.matches(id, from_id),
        }
    }
}

/// The constraints of one resolution, in the order they arrived
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constraints(Vec<Constraint>);

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, constraint: Constraint) {
        self.0.push(constraint);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, constraint: &Constraint) -> bool {
        self.0.contains(constraint)
    }

    /// True if every constraint is untaken (and there is at least one)
    pub fn all_untaken(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|c| c.untaken)
    }

    /// True if no constraint insists on something being there
    pub fn nothing_is_fine_too(&self) -> bool {
        self.0.iter().all(|c| c.nothing_is_fine_too)
    }

    pub fn strictest_use_existing(&self) -> UseExisting {
        self.0
            .iter()
            .map(|c| c.use_existing)
            .min()
            .unwrap_or(UseExisting::IfPossible)
    }

    pub fn any_force_unable(&self) -> bool {
        self.0.iter().any(|c| c.force_unable)
    }

    pub fn all_suppress_dependencies(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|c| c.suppress_dependencies)
    }

    pub fn all_suppress_blockers(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|c| c.suppress_blockers)
    }

    /// Constraints an id fails to satisfy
    pub fn unmet_by(&self, id: &PackageId) -> Constraints {
        Constraints(self.0.iter().filter(|c| !c.allows(id)).cloned().collect())
    }

    pub fn allow(&self, id: &PackageId) -> bool {
        self.0.iter().all(|c| c.allows(id))
    }
}

impl<'a> IntoIterator for &'a Constraints {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Constraint> for Constraints {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
