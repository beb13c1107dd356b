// src/resolver/standard.rs

//! The default policy, driven entirely by [`ResolverConfig`]

use super::constraint::{Constraints, UseExisting};
use super::decision::{ChangesToMakeDecision, RequiredConfirmation};
use super::functions::{ResolverContext, ResolverFunctions, SpecInterest};
use super::helpers::constraints::{
    InitialConstraints, constraints_for_dependent, constraints_for_purge,
    constraints_for_via_binary,
};
use super::helpers::destinations;
use super::helpers::interest::InterestPolicy;
use super::helpers::ordering::{OrderingPolicy, PreferencePolicy};
use super::helpers::permissions::{ConfirmPolicy, RemovalPolicy};
use super::helpers::resolvents::{DestinationSelection, resolvents_for, resolvents_for_blocker};
use super::helpers::use_existing::use_existing_nothing;
use super::helpers::SpecList;
use super::reason::{ChangeByResolvent, Reason};
use super::resolution::Resolution;
use super::resolvent::Resolvent;
use crate::config::{ResolverConfig, SlotsConfig, UseExistingConfig};
use crate::dependencies::SanitisedDependency;
use crate::error::Result;
use crate::name::{PackageName, RepositoryName};
use crate::package::{PackageId, Repository};
use crate::spec::{BlockDepSpec, DepSpec, PackageDepSpec};
use crate::tribool::Tribool;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// [`ResolverFunctions`] backed by a parsed [`ResolverConfig`]
#[derive(Debug, Clone)]
pub struct StandardFunctions {
    cannot_use: SpecList,
    interest: InterestPolicy,
    use_existing: UseExistingConfig,
    slots: SlotsConfig,
    destinations: DestinationSelection,
    make_binaries: SpecList,
    removal: RemovalPolicy,
    confirm: ConfirmPolicy,
    ordering: OrderingPolicy,
    preference: PreferencePolicy,
    initial: InitialConstraints,
    allow_restarts: bool,
}

impl StandardFunctions {
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cannot_use: SpecList::parse(&config.cannot_use)?,
            interest: InterestPolicy::from_config(&config.interest)?,
            use_existing: config.use_existing.clone(),
            slots: config.slots.clone(),
            destinations: DestinationSelection {
                targets: config.destinations.targets,
                dependencies_to_slash: config.destinations.dependencies_to_slash,
            },
            make_binaries: SpecList::parse(&config.destinations.make_binaries)?,
            removal: RemovalPolicy::from_config(&config.removal)?,
            confirm: ConfirmPolicy::from_config(&config.confirm)?,
            ordering: OrderingPolicy::from_config(&config.ordering)?,
            preference: PreferencePolicy::from_config(&config.preference)?,
            initial: InitialConstraints::from_config(&config.initial, Utc::now())?,
            allow_restarts: config.engine.max_restarts > 0,
        })
    }

    /// Fix the clock used for scm age checks
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.initial = self.initial.with_now(now);
        self
    }
}

impl ResolverFunctions for StandardFunctions {
    fn get_initial_constraints_for(
        &self,
        ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
    ) -> Result<Constraints> {
        Ok(self.initial.constraints_for(ctx, resolvent))
    }

    fn get_resolvents_for(
        &self,
        ctx: &ResolverContext<'_>,
        spec: &PackageDepSpec,
        from_id: Option<&PackageId>,
        reason: &Reason,
    ) -> Result<(Vec<Resolvent>, bool)> {
        resolvents_for(ctx, &self.slots, &self.destinations, spec, from_id, reason)
    }

    fn get_resolvents_for_blocker(
        &self,
        ctx: &ResolverContext<'_>,
        block: &BlockDepSpec,
        reason: &Reason,
    ) -> Result<Vec<Resolvent>> {
        Ok(resolvents_for_blocker(ctx, block, reason))
    }

    fn get_use_existing_nothing(
        &self,
        _ctx: &ResolverContext<'_>,
        _resolvent: &Resolvent,
        spec: &DepSpec,
        reason: &Reason,
    ) -> (UseExisting, bool) {
        use_existing_nothing(&self.use_existing, spec, reason)
    }

    fn get_constraints_for_dependent(
        &self,
        _ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
        id: &Arc<PackageId>,
        dependent_upon: &[ChangeByResolvent],
    ) -> Result<Constraints> {
        Ok(constraints_for_dependent(
            &self.removal.remove_if_dependent,
            resolvent,
            id,
            dependent_upon,
        ))
    }

    fn get_constraints_for_purge(
        &self,
        _ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
        id: &Arc<PackageId>,
        was_used_by: &[ChangeByResolvent],
    ) -> Result<Constraints> {
        Ok(constraints_for_purge(
            &self.removal.purge,
            resolvent,
            id,
            was_used_by,
        ))
    }

    fn get_constraints_for_via_binary(
        &self,
        _ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
        other: &Resolution,
    ) -> Result<Constraints> {
        constraints_for_via_binary(resolvent, other)
    }

    fn wants_via_binary(
        &self,
        ctx: &ResolverContext<'_>,
        _resolution: &Resolution,
        decision: &ChangesToMakeDecision,
    ) -> Option<RepositoryName> {
        destinations::wants_via_binary(ctx, &self.make_binaries, decision)
    }

    fn find_replacing(
        &self,
        ctx: &ResolverContext<'_>,
        id: &PackageId,
        repository: &Repository,
    ) -> Vec<Arc<PackageId>> {
        destinations::find_replacing(ctx, id, repository)
    }

    fn find_repository_for(
        &self,
        ctx: &ResolverContext<'_>,
        _resolution: &Resolution,
        decision: &ChangesToMakeDecision,
    ) -> Result<RepositoryName> {
        destinations::find_repository_for(ctx, decision)
    }

    fn interest_in_spec(
        &self,
        ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        id: &PackageId,
        dependency: &SanitisedDependency,
    ) -> Result<SpecInterest> {
        self.interest.interest_in_spec(ctx, resolution, id, dependency)
    }

    fn allowed_to_remove(
        &self,
        _ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        id: &PackageId,
    ) -> bool {
        self.removal.allowed_to_remove(resolution, id)
    }

    fn allowed_to_break(
        &self,
        _ctx: &ResolverContext<'_>,
        _resolution: &Resolution,
        id: &PackageId,
    ) -> bool {
        self.removal.allowed_to_break(id)
    }

    fn allowed_to_restart(&self, _ctx: &ResolverContext<'_>, _resolution: &Resolution) -> bool {
        self.allow_restarts
    }

    fn confirm(
        &self,
        _ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        confirmation: RequiredConfirmation,
    ) -> bool {
        self.confirm.confirm(&self.removal, resolution, confirmation)
    }

    fn order_early(&self, _ctx: &ResolverContext<'_>, resolution: &Resolution) -> Tribool {
        self.ordering.order_early(resolution)
    }

    fn prefer_or_avoid(&self, _ctx: &ResolverContext<'_>, name: &PackageName) -> Tribool {
        self.preference.prefer_or_avoid(name)
    }

    fn can_use(&self, _ctx: &ResolverContext<'_>, id: &PackageId) -> bool {
        !self.cannot_use.matches(id)
    }
}
