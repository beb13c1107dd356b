// src/resolver/decider.rs

//! The decision engine
//!
//! Constraints are folded into resolutions one at a time. Each resolution
//! gets a decision as soon as it is reached; when a later constraint
//! contradicts a decision that other work already relied upon, the engine
//! gives up on the whole attempt and asks the driver to restart with that
//! constraint applied from the beginning.
//!
//! After dependencies settle, further passes add constraints for installed
//! packages that depend on things going away, for companion binaries and
//! for purging unused packages. The passes repeat until nothing changes.

use super::constraint::{Constraint, Constraints, UseExisting};
use super::decision::{
    BreakDecision, ChangeType, ChangesToMakeDecision, Decision, Destination,
    ExistingNoChangeDecision, NothingNoChangeDecision, RemoveDecision, UnableToMakeDecision,
    UnsuitableCandidate,
};
use super::depped_upon::{accumulate_depped_upon, dependent_upon, depped_upon_by};
use super::functions::{ResolverContext, ResolverFunctions, SpecInterest};
use super::helpers::permissions::confirmations_needed;
use super::reason::{ChangeByResolvent, Reason};
use super::resolution::{Resolution, ResolutionsByResolvent};
use super::resolvent::{DestinationType, Resolvent};
use crate::dependencies::{LabelsClassifier, SanitisedDependency, sanitise};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::package::{PackageId, RepositoryKind};
use crate::spec::{DepSpec, PackageDepSpec};
use crate::tribool::Tribool;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// A decision had to change after others relied on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestRestart {
    pub resolvent: Resolvent,
    pub previous_decision: Decision,
    pub problematic_constraint: Constraint,
    pub new_decision: Decision,
    /// Constraint to apply from the start next time
    pub suggested_preset: Constraint,
}

/// Outcome of one unit of work
#[derive(Debug)]
pub enum Exploration {
    Continue,
    Restart(Box<SuggestRestart>),
}

/// Outcome of one post-dependency pass
#[derive(Debug)]
enum Step {
    Unchanged,
    Changed,
    Restart(Box<SuggestRestart>),
}

impl From<Exploration> for Step {
    fn from(value: Exploration) -> Self {
        match value {
            Exploration::Continue => Step::Unchanged,
            Exploration::Restart(restart) => Step::Restart(restart),
        }
    }
}

/// Propagate a restart out of the current function
macro_rules! explore {
    ($e:expr) => {
        if let Exploration::Restart(restart) = $e? {
            return Ok(Exploration::Restart(restart).into());
        }
    };
}

/// One attempt at a resolution
pub struct Decider<'a> {
    env: &'a dyn Environment,
    fns: &'a dyn ResolverFunctions,
    classifier: &'a LabelsClassifier,
    presets: &'a HashMap<Resolvent, Constraints>,
    resolutions: ResolutionsByResolvent,
    explored: HashSet<usize>,
}

impl<'a> Decider<'a> {
    pub fn new(
        env: &'a dyn Environment,
        fns: &'a dyn ResolverFunctions,
        classifier: &'a LabelsClassifier,
        presets: &'a HashMap<Resolvent, Constraints>,
    ) -> Self {
        Self {
            env,
            fns,
            classifier,
            presets,
            resolutions: ResolutionsByResolvent::new(),
            explored: HashSet::new(),
        }
    }

    fn ctx(&self) -> ResolverContext<'_> {
        ResolverContext {
            env: self.env,
            classifier: self.classifier,
            resolutions: &self.resolutions,
        }
    }

    pub fn into_resolutions(self) -> ResolutionsByResolvent {
        self.resolutions
    }

    fn resolution(&self, i: usize) -> Result<&Resolution> {
        self.resolutions
            .by_index(i)
            .ok_or_else(|| Error::internal(format!("no resolution at index {}", i)))
    }

    fn resolution_mut(&mut self, i: usize) -> Result<&mut Resolution> {
        self.resolutions
            .by_index_mut(i)
            .ok_or_else(|| Error::internal(format!("no resolution at index {}", i)))
    }

    fn set_decision(&mut self, i: usize, decision: Decision) -> Result<()> {
        debug!("Decided {} for {}", decision.kind(), decision.resolvent());
        self.resolution_mut(i)?.decision = Some(decision);
        self.explored.remove(&i);
        Ok(())
    }

    /// Index of the resolution for `resolvent`, creating it with its
    /// initial and preset constraints if needed
    fn resolution_index(&mut self, resolvent: &Resolvent) -> Result<usize> {
        if let Some(i) = self.resolutions.index_of(resolvent) {
            return Ok(i);
        }

        let initial = self.fns.get_initial_constraints_for(&self.ctx(), resolvent)?;
        let mut constraints: Vec<Constraint> = initial.iter().cloned().collect();
        if let Some(presets) = self.presets.get(resolvent) {
            constraints.extend(presets.iter().cloned());
        }

        trace!("New resolution for {}", resolvent);
        let i = self.resolutions.insert_new(resolvent.clone());
        let resolution = self.resolution_mut(i)?;
        for constraint in constraints {
            resolution.constraints.add(constraint);
        }
        Ok(i)
    }

    /// Run every pass until nothing changes
    pub fn resolve(&mut self) -> Result<Exploration> {
        loop {
            explore!(self.resolve_decide_with_dependencies());

            match self.resolve_dependents()? {
                Step::Restart(restart) => return Ok(Exploration::Restart(restart)),
                Step::Changed => continue,
                Step::Unchanged => {}
            }
            match self.resolve_vias()? {
                Step::Restart(restart) => return Ok(Exploration::Restart(restart)),
                Step::Changed => continue,
                Step::Unchanged => {}
            }
            match self.resolve_purges()? {
                Step::Restart(restart) => return Ok(Exploration::Restart(restart)),
                Step::Changed => continue,
                Step::Unchanged => break,
            }
        }

        self.resolve_destinations()?;
        self.resolve_confirmations();
        Ok(Exploration::Continue)
    }

    // Targets

    pub fn add_target(&mut self, spec: &DepSpec, reason: Reason) -> Result<Exploration> {
        let resolvents = match spec {
            DepSpec::Package(package) => {
                let (resolvents, ambiguous) =
                    self.fns.get_resolvents_for(&self.ctx(), package, None, &reason)?;
                if ambiguous {
                    debug!("Target {} applies to {} resolvents", spec, resolvents.len());
                }
                resolvents
            }
            DepSpec::Block(block) => self.fns.get_resolvents_for_blocker(&self.ctx(), block, &reason)?,
        };

        if resolvents.is_empty() {
            debug!("Target {} does not need anything doing", spec);
        }
        for resolvent in resolvents {
            explore!(self.add_constraint_for(&resolvent, spec, &reason, false));
        }
        Ok(Exploration::Continue)
    }

    fn add_constraint_for(
        &mut self,
        resolvent: &Resolvent,
        spec: &DepSpec,
        reason: &Reason,
        untaken: bool,
    ) -> Result<Exploration> {
        let (use_existing, nothing_is_fine_too) =
            self.fns
                .get_use_existing_nothing(&self.ctx(), resolvent, spec, reason);
        let constraint = Constraint::new(resolvent.destination_type, spec.clone(), reason.clone())
            .untaken(untaken)
            .use_existing(use_existing)
            .nothing_is_fine_too(nothing_is_fine_too);
        self.apply_resolution_constraint(resolvent, constraint)
    }

    fn apply_resolution_constraint(
        &mut self,
        resolvent: &Resolvent,
        constraint: Constraint,
    ) -> Result<Exploration> {
        let i = self.resolution_index(resolvent)?;
        trace!("Adding constraint {} ({}) to {}", constraint.spec, constraint.reason, resolvent);

        let rethink = match self.resolution(i)?.decision {
            Some(ref decision) => !verify_new_constraint(decision, &constraint),
            None => false,
        };
        if rethink {
            explore!(self.made_wrong_decision(i, &constraint));
        }
        self.resolution_mut(i)?.constraints.add(constraint);
        Ok(Exploration::Continue)
    }

    fn made_wrong_decision(&mut self, i: usize, constraint: &Constraint) -> Result<Exploration> {
        let mut adapted = self.resolution(i)?.clone();
        let previous = adapted.decision.take().ok_or_else(|| {
            Error::internal(format!("no decision to revisit for {}", adapted.resolvent))
        })?;
        adapted.constraints.add(constraint.clone());

        let Some(decision) = self.try_to_find_decision_for(&adapted)? else {
            debug!("Nothing satisfies {} any more", adapted.resolvent);
            let unable = self.cannot_decide_for(&adapted);
            self.set_decision(i, unable)?;
            return Ok(Exploration::Continue);
        };

        let replaceable = !previous.taken()
            || matches!(
                previous,
                Decision::NothingNoChange(_) | Decision::UnableToMake(_)
            );
        if replaceable {
            debug!(
                "Replacing {} decision for {} without restarting",
                previous.kind(),
                adapted.resolvent
            );
            self.set_decision(i, decision)?;
            return Ok(Exploration::Continue);
        }

        if self.fns.allowed_to_restart(&self.ctx(), &adapted) {
            info!(
                "Decision for {} changes from {} to {}, restarting",
                adapted.resolvent,
                previous.kind(),
                decision.kind()
            );
            let mut suggested_preset = constraint.clone();
            suggested_preset.reason = Reason::Preset {
                explanation: "restarted because of".to_string(),
                maybe_reason: Some(Box::new(constraint.reason.clone())),
            };
            suggested_preset.untaken = false;
            suggested_preset.nothing_is_fine_too = true;

            return Ok(Exploration::Restart(Box::new(SuggestRestart {
                resolvent: adapted.resolvent.clone(),
                previous_decision: previous,
                problematic_constraint: constraint.clone(),
                new_decision: decision,
                suggested_preset,
            })));
        }

        warn!("Not allowed to restart for {}", adapted.resolvent);
        let unable = self.cannot_decide_for(&adapted);
        self.set_decision(i, unable)?;
        Ok(Exploration::Continue)
    }

    // Deciding

    fn resolve_decide_with_dependencies(&mut self) -> Result<Exploration> {
        let mut deciding_untaken = false;
        loop {
            let mut changed = false;
            let mut i = 0;
            while i < self.resolutions.len() {
                let (undecided, pending) = {
                    let resolution = self.resolution(i)?;
                    let undecided = resolution.decision.is_none();
                    let pending = undecided || !self.explored.contains(&i);
                    let skip = !deciding_untaken && resolution.constraints.all_untaken();
                    (undecided, pending && !skip)
                };
                if pending {
                    changed = true;
                    if undecided {
                        self.decide(i)?;
                    }
                    self.explored.insert(i);
                    explore!(self.add_dependencies_if_necessary(i));
                }
                i += 1;
            }

            if changed {
                deciding_untaken = false;
            } else if !deciding_untaken {
                deciding_untaken = true;
            } else {
                return Ok(Exploration::Continue);
            }
        }
    }

    fn decide(&mut self, i: usize) -> Result<()> {
        let resolution = self.resolution(i)?;
        let decision = match self.try_to_find_decision_for(resolution)? {
            Some(decision) => decision,
            None => self.cannot_decide_for(resolution),
        };
        self.set_decision(i, decision)
    }

    /// Ids already present at the resolvent's destination, oldest first
    fn existing_ids_for(&self, resolvent: &Resolvent) -> Vec<Arc<PackageId>> {
        let kind = match resolvent.destination_type {
            DestinationType::InstallToSlash => RepositoryKind::Installed,
            DestinationType::CreateBinary => RepositoryKind::Binary,
        };
        let mut ids: Vec<_> = self
            .env
            .ids_in(&resolvent.package, kind)
            .into_iter()
            .filter(|id| resolvent.slot.holds(id))
            .collect();
        ids.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.cmp(b)));
        ids
    }

    /// Usable candidates for the resolvent, worst first
    fn installable_ids_for(&self, resolvent: &Resolvent) -> Vec<Arc<PackageId>> {
        let ctx = self.ctx();
        self.env
            .installable_ids(&resolvent.package)
            .into_iter()
            .filter(|id| resolvent.slot.holds(id))
            .filter(|id| {
                resolvent.destination_type == DestinationType::InstallToSlash
                    || self.env.repository_kind(id) == Some(RepositoryKind::Source)
            })
            .filter(|id| self.fns.can_use(&ctx, id))
            .collect()
    }

    fn try_to_find_decision_for(&self, resolution: &Resolution) -> Result<Option<Decision>> {
        let constraints = &resolution.constraints;
        let taken = !resolution.constraints.all_untaken();
        let resolvent = &resolution.resolvent;

        if constraints.any_force_unable() {
            return Ok(None);
        }

        let existing_all = self.existing_ids_for(resolvent);
        let existing = existing_all.iter().rev().find(|id| constraints.allow(id)).cloned();
        let installable_all = self.installable_ids_for(resolvent);
        let installable = installable_all.iter().rev().find(|id| constraints.allow(id)).cloned();

        if constraints.nothing_is_fine_too() && existing_all.is_empty() {
            return Ok(Some(Decision::NothingNoChange(NothingNoChangeDecision {
                resolvent: resolvent.clone(),
                taken,
            })));
        }

        let decision = match (existing, installable) {
            (None, Some(origin)) => {
                Some(self.changes_to_make(resolution, origin, &installable_all, taken))
            }
            (Some(existing), None) => {
                let acceptable = match constraints.strictest_use_existing() {
                    UseExisting::Never => false,
                    UseExisting::IfTransient | UseExisting::IfSame | UseExisting::IfSameVersion => {
                        existing.transient
                    }
                    UseExisting::IfPossible => true,
                };
                acceptable.then(|| {
                    Decision::ExistingNoChange(ExistingNoChangeDecision {
                        resolvent: resolvent.clone(),
                        is_transient: existing.transient,
                        existing_id: existing,
                        is_same: true,
                        is_same_version: true,
                        taken,
                        required_confirmations: Vec::new(),
                    })
                })
            }
            (None, None) => self.remove_or_break(resolution, constraints, &existing_all, taken),
            (Some(existing), Some(origin)) => {
                let is_same_version = existing.version.compare(&origin.version) == Ordering::Equal;
                let is_same = is_same_version && existing.same_choices_as(&origin);
                let is_transient = existing.transient;
                let keep = match constraints.strictest_use_existing() {
                    UseExisting::Never => false,
                    UseExisting::IfTransient => is_transient,
                    UseExisting::IfSame => is_same,
                    UseExisting::IfSameVersion => is_same_version,
                    UseExisting::IfPossible => true,
                };
                if keep {
                    Some(Decision::ExistingNoChange(ExistingNoChangeDecision {
                        resolvent: resolvent.clone(),
                        existing_id: existing,
                        is_same,
                        is_same_version,
                        is_transient,
                        taken,
                        required_confirmations: Vec::new(),
                    }))
                } else {
                    Some(self.changes_to_make(resolution, origin, &installable_all, taken))
                }
            }
        };
        Ok(decision)
    }

    fn remove_or_break(
        &self,
        resolution: &Resolution,
        constraints: &Constraints,
        existing_all: &[Arc<PackageId>],
        taken: bool,
    ) -> Option<Decision> {
        let newest = existing_all.last()?;
        let ctx = self.ctx();

        if constraints.nothing_is_fine_too()
            && existing_all
                .iter()
                .all(|id| self.fns.allowed_to_remove(&ctx, resolution, id))
        {
            return Some(Decision::Remove(RemoveDecision {
                resolvent: resolution.resolvent.clone(),
                ids: existing_all.to_vec(),
                taken,
                required_confirmations: Vec::new(),
            }));
        }

        if constraints.iter().all(|c| c.reason.is_dependent())
            && self.fns.allowed_to_break(&ctx, resolution, newest)
        {
            return Some(Decision::Break(BreakDecision {
                resolvent: resolution.resolvent.clone(),
                existing_id: Arc::clone(newest),
                taken,
                required_confirmations: Vec::new(),
            }));
        }
        None
    }

    fn changes_to_make(
        &self,
        resolution: &Resolution,
        origin: Arc<PackageId>,
        installable_all: &[Arc<PackageId>],
        taken: bool,
    ) -> Decision {
        let best = installable_all.last().is_some_and(|b| *b == origin);
        let change_type = self.change_type_for(&resolution.resolvent, &origin);
        Decision::ChangesToMake(ChangesToMakeDecision {
            resolvent: resolution.resolvent.clone(),
            origin_id: origin,
            best,
            change_type,
            destination: None,
            if_via_new_binary_in: None,
            taken,
            required_confirmations: Vec::new(),
        })
    }

    fn change_type_for(&self, resolvent: &Resolvent, origin: &PackageId) -> ChangeType {
        let in_slot = self.existing_ids_for(resolvent);
        let Some(newest) = in_slot.last() else {
            let kind = match resolvent.destination_type {
                DestinationType::InstallToSlash => RepositoryKind::Installed,
                DestinationType::CreateBinary => RepositoryKind::Binary,
            };
            return if self.env.ids_in(&resolvent.package, kind).is_empty() {
                ChangeType::New
            } else {
                ChangeType::SlotNew
            };
        };
        match origin.version.compare(&newest.version) {
            Ordering::Greater => ChangeType::Upgrade,
            Ordering::Less => ChangeType::Downgrade,
            Ordering::Equal => ChangeType::Reinstall,
        }
    }

    /// Record why nothing could be chosen
    fn cannot_decide_for(&self, resolution: &Resolution) -> Decision {
        let constraints = &resolution.constraints;
        let resolvent = &resolution.resolvent;

        let mut candidates: Vec<Arc<PackageId>> = self
            .env
            .package_ids(&resolvent.package)
            .into_iter()
            .filter(|id| resolvent.slot.holds(id))
            .collect();
        candidates.sort();

        let unsuitable_candidates = candidates
            .iter()
            .map(|id| UnsuitableCandidate {
                package_id: Arc::clone(id),
                unmet_constraints: constraints.unmet_by(id),
            })
            .collect();
        let unmet_constraints = constraints
            .iter()
            .filter(|c| !candidates.iter().any(|id| c.allows(id)))
            .cloned()
            .collect();

        Decision::UnableToMake(UnableToMakeDecision {
            resolvent: resolvent.clone(),
            unsuitable_candidates,
            unmet_constraints,
            taken: !resolution.constraints.all_untaken(),
        })
    }

    // Dependencies

    fn add_dependencies_if_necessary(&mut self, i: usize) -> Result<Exploration> {
        let resolution = self.resolution(i)?.clone();
        let Some(ref decision) = resolution.decision else {
            return Err(Error::internal(format!(
                "exploring undecided resolution {}",
                resolution.resolvent
            )));
        };
        if !decision.taken() {
            return Ok(Exploration::Continue);
        }
        let id = match decision {
            Decision::ExistingNoChange(d) => Arc::clone(&d.existing_id),
            Decision::ChangesToMake(d) => Arc::clone(&d.origin_id),
            Decision::NothingNoChange(_)
            | Decision::Remove(_)
            | Decision::UnableToMake(_)
            | Decision::Break(_) => return Ok(Exploration::Continue),
        };

        let suppress_dependencies = resolution.constraints.all_suppress_dependencies();
        let suppress_blockers = resolution.constraints.all_suppress_blockers();

        let deps = sanitise(&id, |spec| Ok(self.score_alternative(spec, &id)))?;
        trace!("{} has {} dependencies to consider", id, deps.len());

        for dep in deps {
            let interest = self.fns.interest_in_spec(&self.ctx(), &resolution, &id, &dep)?;
            if interest == SpecInterest::Ignore {
                trace!("Ignoring {} from {}", dep.spec, id);
                continue;
            }
            if (dep.is_block() && suppress_blockers) || (!dep.is_block() && suppress_dependencies) {
                continue;
            }

            let reason = Reason::Dependency {
                from_id: Arc::clone(&id),
                from_resolvent: resolution.resolvent.clone(),
                already_met: self.dependency_already_met(&dep),
                dependency: dep.clone(),
            };

            let resolvents = match dep.spec {
                DepSpec::Package(ref spec) => {
                    self.fns
                        .get_resolvents_for(&self.ctx(), spec, Some(id.as_ref()), &reason)?
                        .0
                }
                DepSpec::Block(ref block) => {
                    self.fns
                        .get_resolvents_for_blocker(&self.ctx(), block, &reason)?
                }
            };

            for resolvent in resolvents {
                if resolvent == resolution.resolvent {
                    let satisfied_by_self = match dep.spec {
                        DepSpec::Package(ref spec) => spec.matches(&id, Some(id.as_ref())),
                        DepSpec::Block(_) => true,
                    };
                    if satisfied_by_self {
                        trace!("Skipping self dependency {} of {}", dep.spec, id);
                        continue;
                    }
                }
                explore!(self.add_constraint_for(
                    &resolvent,
                    &dep.spec,
                    &reason,
                    interest == SpecInterest::Untaken
                ));
            }
        }
        Ok(Exploration::Continue)
    }

    fn dependency_already_met(&self, dep: &SanitisedDependency) -> bool {
        let installed = self
            .env
            .installed_matching(dep.package_spec(), Some(&dep.from_id));
        if dep.is_block() {
            installed.is_empty()
        } else {
            !installed.is_empty()
        }
    }

    /// How attractive one member of an `||` group is; higher is better
    fn score_alternative(&self, spec: &PackageDepSpec, from_id: &PackageId) -> i32 {
        let ctx = self.ctx();
        let bonus = match self.fns.prefer_or_avoid(&ctx, &spec.name) {
            Tribool::True => 100,
            Tribool::False => return -1,
            Tribool::Indeterminate => 0,
        };
        let bias = spec.version.operator_bias();

        if !self.env.installed_matching(spec, Some(from_id)).is_empty() {
            return bonus + 50 + bias;
        }
        if spec.has_additional_requirements()
            && !self.env.installed_matching_ignoring_choices(spec).is_empty()
        {
            return bonus + 40 + bias;
        }

        let already_chosen = self.resolutions.iter().any(|r| {
            r.resolvent.package == spec.name
                && r.decision
                    .as_ref()
                    .and_then(Decision::chosen_id)
                    .is_some_and(|chosen| spec.matches(chosen, Some(from_id)))
        });
        if already_chosen {
            return bonus + 30 + bias;
        }

        let ids = self.env.package_ids(&spec.name);
        let could_decide = ids.iter().any(|id| {
            !id.masked
                && matches!(
                    self.env.repository_kind(id),
                    Some(RepositoryKind::Source | RepositoryKind::Binary)
                )
                && self.fns.can_use(&ctx, id)
                && spec.matches(id, Some(from_id))
        });
        if could_decide {
            return bonus + 20 + bias;
        }
        if ids.iter().any(|id| spec.matches_ignoring_choices(id)) {
            return bonus + 10 + bias;
        }
        bonus
    }

    // Changes to installed packages

    /// Installed ids being replaced or removed, and ids that remain or arrive
    fn collect_changes(&self) -> (Vec<ChangeByResolvent>, Vec<ChangeByResolvent>) {
        let mut going_away: Vec<ChangeByResolvent> = Vec::new();
        let mut staying: Vec<ChangeByResolvent> = Vec::new();

        for resolution in &self.resolutions {
            match resolution.decision {
                Some(Decision::ChangesToMake(ref d))
                    if d.taken && d.resolvent.destination_type == DestinationType::InstallToSlash =>
                {
                    for id in self.existing_ids_for(&d.resolvent) {
                        going_away.push(ChangeByResolvent::new(id, d.resolvent.clone()));
                    }
                    staying.push(ChangeByResolvent::new(
                        Arc::clone(&d.origin_id),
                        d.resolvent.clone(),
                    ));
                }
                Some(Decision::Remove(ref d)) if d.taken => {
                    for id in &d.ids {
                        going_away.push(ChangeByResolvent::new(Arc::clone(id), d.resolvent.clone()));
                    }
                }
                _ => {}
            }
        }

        for id in self.env.installed_ids() {
            if !going_away.iter().any(|c| c.package_id == id) {
                let resolvent = Resolvent::for_id(&id, DestinationType::InstallToSlash);
                staying.push(ChangeByResolvent::new(id, resolvent));
            }
        }
        (going_away, staying)
    }

    fn apply_new_constraints(
        &mut self,
        resolvent: &Resolvent,
        constraints: Constraints,
    ) -> Result<Step> {
        let mut changed = false;
        for constraint in constraints.iter() {
            let known = self
                .resolutions
                .get(resolvent)
                .is_some_and(|r| r.constraints.contains(constraint));
            if known {
                continue;
            }
            changed = true;
            if let Exploration::Restart(restart) =
                self.apply_resolution_constraint(resolvent, constraint.clone())?
            {
                return Ok(Step::Restart(restart));
            }
        }
        Ok(if changed { Step::Changed } else { Step::Unchanged })
    }

    fn resolve_dependents(&mut self) -> Result<Step> {
        let (going_away, staying) = self.collect_changes();
        if going_away.is_empty() {
            return Ok(Step::Unchanged);
        }

        let mut changed = false;
        for id in self.env.installed_ids() {
            if going_away.iter().any(|c| c.package_id == id) {
                continue;
            }
            let upon = dependent_upon(self.env, self.classifier, &id, &going_away, &staying)?;
            if upon.is_empty() {
                continue;
            }

            debug!("{} depends upon {} things going away", id, upon.len());
            let resolvent = Resolvent::for_id(&id, DestinationType::InstallToSlash);
            let constraints =
                self.fns
                    .get_constraints_for_dependent(&self.ctx(), &resolvent, &id, &upon)?;
            match self.apply_new_constraints(&resolvent, constraints)? {
                Step::Restart(restart) => return Ok(Step::Restart(restart)),
                Step::Changed => changed = true,
                Step::Unchanged => {}
            }
        }
        Ok(if changed { Step::Changed } else { Step::Unchanged })
    }

    fn resolve_purges(&mut self) -> Result<Step> {
        let (going_away, staying) = self.collect_changes();
        if going_away.is_empty() {
            return Ok(Step::Unchanged);
        }

        let going_ids: Vec<Arc<PackageId>> =
            going_away.iter().map(|c| Arc::clone(&c.package_id)).collect();
        let staying_ids: Vec<Arc<PackageId>> =
            staying.iter().map(|c| Arc::clone(&c.package_id)).collect();

        let used_originally = accumulate_depped_upon(self.env, self.classifier, &going_ids)?;
        let used_afterwards = accumulate_depped_upon(self.env, self.classifier, &staying_ids)?;

        let mut changed = false;
        for id in used_originally.difference(&used_afterwards) {
            if going_ids.contains(id) || !self.env.is_installed(id) {
                continue;
            }
            let resolvent = Resolvent::for_id(id, DestinationType::InstallToSlash);
            let targeted = self
                .resolutions
                .get(&resolvent)
                .is_some_and(|r| r.constraints.iter().any(|c| c.reason.is_target()));
            if targeted {
                continue;
            }

            let mut was_used_by = Vec::new();
            for change in &going_away {
                if depped_upon_by(self.env, self.classifier, &change.package_id)?.contains(id) {
                    was_used_by.push(change.clone());
                }
            }

            trace!("{} is no longer used", id);
            let constraints =
                self.fns
                    .get_constraints_for_purge(&self.ctx(), &resolvent, id, &was_used_by)?;
            match self.apply_new_constraints(&resolvent, constraints)? {
                Step::Restart(restart) => return Ok(Step::Restart(restart)),
                Step::Changed => changed = true,
                Step::Unchanged => {}
            }
        }
        Ok(if changed { Step::Changed } else { Step::Unchanged })
    }

    fn resolve_vias(&mut self) -> Result<Step> {
        let mut changed = false;
        for i in 0..self.resolutions.len() {
            let (binary_resolvent, repository, constraints) = {
                let resolution = self.resolution(i)?;
                let Some(Decision::ChangesToMake(ref d)) = resolution.decision else {
                    continue;
                };
                if !d.taken
                    || d.resolvent.destination_type != DestinationType::InstallToSlash
                    || d.if_via_new_binary_in.is_some()
                {
                    continue;
                }
                let ctx = self.ctx();
                let Some(repository) = self.fns.wants_via_binary(&ctx, resolution, d) else {
                    continue;
                };
                let binary_resolvent = d.resolvent.with_destination(DestinationType::CreateBinary);
                let constraints =
                    self.fns
                        .get_constraints_for_via_binary(&ctx, &binary_resolvent, resolution)?;
                (binary_resolvent, repository, constraints)
            };

            debug!("{} goes via a binary in {}", binary_resolvent, repository);
            if let Some(Decision::ChangesToMake(ref mut d)) = self.resolution_mut(i)?.decision {
                d.if_via_new_binary_in = Some(repository);
            }
            changed = true;
            if let Step::Restart(restart) = self.apply_new_constraints(&binary_resolvent, constraints)? {
                return Ok(Step::Restart(restart));
            }
        }
        Ok(if changed { Step::Changed } else { Step::Unchanged })
    }

    // Finishing

    fn resolve_destinations(&mut self) -> Result<()> {
        for i in 0..self.resolutions.len() {
            let destination = {
                let resolution = self.resolution(i)?;
                let Some(Decision::ChangesToMake(ref d)) = resolution.decision else {
                    continue;
                };
                if !d.taken || d.destination.is_some() {
                    continue;
                }
                let ctx = self.ctx();
                let name = self.fns.find_repository_for(&ctx, resolution, d)?;
                let repository = self.env.repository(&name).ok_or_else(|| {
                    Error::internal(format!("destination repository {} does not exist", name))
                })?;
                Destination {
                    replacing: self.fns.find_replacing(&ctx, &d.origin_id, repository),
                    repository: name,
                }
            };
            if let Some(Decision::ChangesToMake(ref mut d)) = self.resolution_mut(i)?.decision {
                d.destination = Some(destination);
            }
        }
        Ok(())
    }

    fn resolve_confirmations(&mut self) {
        let mut refused: Vec<(usize, Vec<_>)> = Vec::new();
        {
            let ctx = self.ctx();
            for (i, resolution) in self.resolutions.iter().enumerate() {
                let Some(ref decision) = resolution.decision else {
                    continue;
                };
                if !decision.taken() {
                    continue;
                }
                let needed: Vec<_> = confirmations_needed(decision)
                    .into_iter()
                    .filter(|c| !self.fns.confirm(&ctx, resolution, *c))
                    .collect();
                if !needed.is_empty() {
                    refused.push((i, needed));
                }
            }
        }

        for (i, needed) in refused {
            if let Some(decision) = self
                .resolutions
                .by_index_mut(i)
                .and_then(|r| r.decision.as_mut())
            {
                for confirmation in needed {
                    debug!("{} needs confirmation: {}", decision.resolvent(), confirmation);
                    decision.add_required_confirmation(confirmation);
                }
            }
        }
    }
}

/// Whether a new constraint is compatible with the decision already made.
/// Untaken constraints still restrict the chosen id; they only do not
/// demand that the decision be taken.
fn verify_new_constraint(decision: &Decision, constraint: &Constraint) -> bool {
    let id_ok = match decision {
        Decision::ExistingNoChange(d) => constraint.allows(&d.existing_id),
        Decision::ChangesToMake(d) => constraint.allows(&d.origin_id),
        Decision::Break(_) => constraint.reason.is_dependent(),
        Decision::NothingNoChange(_) | Decision::Remove(_) | Decision::UnableToMake(_) => {
            constraint.nothing_is_fine_too
        }
    };
    if !id_ok {
        return false;
    }

    if let Decision::ExistingNoChange(d) = decision {
        let acceptable = match constraint.use_existing {
            UseExisting::Never => false,
            UseExisting::IfTransient => d.is_transient,
            UseExisting::IfSame => d.is_same,
            UseExisting::IfSameVersion => d.is_same_version,
            UseExisting::IfPossible => true,
        };
        if !acceptable {
            return false;
        }
    }

    constraint.untaken || decision.taken()
}
