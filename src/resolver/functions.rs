// src/resolver/functions.rs

//! Policy hooks the decision engine consults
//!
//! The engine itself only knows how to fold constraints into decisions.
//! Everything that is a matter of policy (which slots to consider, whether
//! to take a suggestion, what may be removed) goes through
//! [`ResolverFunctions`]. [`StandardFunctions`](super::StandardFunctions)
//! implements it from a [`ResolverConfig`](crate::config::ResolverConfig).

use super::constraint::{Constraints, UseExisting};
use super::decision::{ChangesToMakeDecision, RequiredConfirmation};
use super::reason::{ChangeByResolvent, Reason};
use super::resolution::{Resolution, ResolutionsByResolvent};
use super::resolvent::Resolvent;
use crate::dependencies::{LabelsClassifier, SanitisedDependency};
use crate::environment::Environment;
use crate::error::Result;
use crate::name::{PackageName, RepositoryName};
use crate::package::{PackageId, Repository};
use crate::spec::{BlockDepSpec, DepSpec, PackageDepSpec};
use crate::tribool::Tribool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::Display;

/// Read-only state handed to every policy hook
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    pub env: &'a dyn Environment,
    pub classifier: &'a LabelsClassifier,
    pub resolutions: &'a ResolutionsByResolvent,
}

/// What to do with one dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SpecInterest {
    /// Resolve it now
    Take,
    /// Drop it
    Ignore,
    /// Record it, but only act on it if something else takes it
    Untaken,
}

pub trait ResolverFunctions {
    /// Constraints a resolvent starts out with
    fn get_initial_constraints_for(
        &self,
        ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
    ) -> Result<Constraints>;

    /// Resolvents a package spec applies to, and whether that was ambiguous
    fn get_resolvents_for(
        &self,
        ctx: &ResolverContext<'_>,
        spec: &PackageDepSpec,
        from_id: Option<&PackageId>,
        reason: &Reason,
    ) -> Result<(Vec<Resolvent>, bool)>;

    /// Resolvents a blocker applies to
    fn get_resolvents_for_blocker(
        &self,
        ctx: &ResolverContext<'_>,
        block: &BlockDepSpec,
        reason: &Reason,
    ) -> Result<Vec<Resolvent>>;

    /// Use-existing policy and whether having nothing is acceptable
    fn get_use_existing_nothing(
        &self,
        ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
        spec: &DepSpec,
        reason: &Reason,
    ) -> (UseExisting, bool);

    fn get_constraints_for_dependent(
        &self,
        ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
        id: &Arc<PackageId>,
        dependent_upon: &[ChangeByResolvent],
    ) -> Result<Constraints>;

    fn get_constraints_for_purge(
        &self,
        ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
        id: &Arc<PackageId>,
        was_used_by: &[ChangeByResolvent],
    ) -> Result<Constraints>;

    fn get_constraints_for_via_binary(
        &self,
        ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
        other: &Resolution,
    ) -> Result<Constraints>;

    /// The binary repository a live install should go through, if any
    fn wants_via_binary(
        &self,
        ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        decision: &ChangesToMakeDecision,
    ) -> Option<RepositoryName>;

    /// Ids in `repository` that installing `id` there replaces
    fn find_replacing(
        &self,
        ctx: &ResolverContext<'_>,
        id: &PackageId,
        repository: &Repository,
    ) -> Vec<Arc<PackageId>>;

    fn find_repository_for(
        &self,
        ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        decision: &ChangesToMakeDecision,
    ) -> Result<RepositoryName>;

    fn interest_in_spec(
        &self,
        ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        id: &PackageId,
        dependency: &SanitisedDependency,
    ) -> Result<SpecInterest>;

    fn allowed_to_remove(
        &self,
        ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        id: &PackageId,
    ) -> bool;

    fn allowed_to_break(
        &self,
        ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        id: &PackageId,
    ) -> bool;

    fn allowed_to_restart(&self, ctx: &ResolverContext<'_>, resolution: &Resolution) -> bool;

    /// Whether a confirmation is granted without asking
    fn confirm(
        &self,
        ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        confirmation: RequiredConfirmation,
    ) -> bool;

    /// True to schedule as early as possible, false as late as possible
    fn order_early(&self, ctx: &ResolverContext<'_>, resolution: &Resolution) -> Tribool;

    fn prefer_or_avoid(&self, ctx: &ResolverContext<'_>, name: &PackageName) -> Tribool;

    /// Whether an id may be chosen at all
    fn can_use(&self, ctx: &ResolverContext<'_>, id: &PackageId) -> bool;
}
