// src/resolver/helpers/interest.rs

//! Whether a dependency is taken, ignored, or left untaken

use super::SpecList;
use crate::config::InterestConfig;
use crate::dependencies::SanitisedDependency;
use crate::error::{Error, Result};
use crate::package::PackageId;
use crate::resolver::decision::Decision;
use crate::resolver::functions::{ResolverContext, SpecInterest};
use crate::resolver::resolution::Resolution;
use crate::tribool::Tribool;
use tracing::trace;

/// Parsed form of [`InterestConfig`]
#[derive(Debug, Clone)]
pub struct InterestPolicy {
    take: SpecList,
    take_from: SpecList,
    take_groups: Vec<String>,
    ignore: SpecList,
    ignore_from: SpecList,
    ignore_groups: Vec<String>,
    no_blockers_from: SpecList,
    no_dependencies_from: SpecList,
    follow_installed_build_dependencies: bool,
    follow_installed_dependencies: bool,
    take_suggestions: Tribool,
    take_recommendations: Tribool,
}

impl InterestPolicy {
    pub fn from_config(config: &InterestConfig) -> Result<Self> {
        Ok(Self {
            take: SpecList::parse(&config.take)?,
            take_from: SpecList::parse(&config.take_from)?,
            take_groups: config.take_groups.clone(),
            ignore: SpecList::parse(&config.ignore)?,
            ignore_from: SpecList::parse(&config.ignore_from)?,
            ignore_groups: config.ignore_groups.clone(),
            no_blockers_from: SpecList::parse(&config.no_blockers_from)?,
            no_dependencies_from: SpecList::parse(&config.no_dependencies_from)?,
            follow_installed_build_dependencies: config.follow_installed_build_dependencies,
            follow_installed_dependencies: config.follow_installed_dependencies,
            take_suggestions: config.take_suggestions,
            take_recommendations: config.take_recommendations,
        })
    }

    /// Whether the decision made for `resolution` wants this dependency at all
    fn care_about(
        &self,
        ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        dep: &SanitisedDependency,
    ) -> Result<bool> {
        let decision = resolution.decision.as_ref().ok_or_else(|| {
            Error::internal(format!(
                "asked about interest for {} before deciding",
                resolution.resolvent
            ))
        })?;

        match decision {
            Decision::ExistingNoChange(_) => {
                if !self.enabled_and_listed(ctx, dep)? {
                    return Ok(false);
                }
                if !self.follow_installed_build_dependencies
                    && ctx.classifier.is_just_build_dep(dep)?
                {
                    return Ok(false);
                }
                if !ctx.classifier.is_compiled_against_dep(dep)?
                    && !self.follow_installed_dependencies
                {
                    return Ok(false);
                }
                if ctx.classifier.is_suggestion(dep) || ctx.classifier.is_recommendation(dep) {
                    // Only keep optional deps of unchanged packages that are
                    // already there.
                    if dep.is_block() {
                        return Ok(false);
                    }
                    return Ok(!ctx
                        .env
                        .installed_matching(dep.package_spec(), Some(&dep.from_id))
                        .is_empty());
                }
                Ok(true)
            }
            Decision::ChangesToMake(_) => self.enabled_and_listed(ctx, dep),
            Decision::UnableToMake(_) => Ok(false),
            Decision::NothingNoChange(_) | Decision::Remove(_) | Decision::Break(_) => {
                Err(Error::internal(format!(
                    "dependencies requested for {} decision on {}",
                    decision.kind(),
                    resolution.resolvent
                )))
            }
        }
    }

    fn enabled_and_listed(&self, ctx: &ResolverContext<'_>, dep: &SanitisedDependency) -> Result<bool> {
        if !ctx.classifier.is_enabled_dep(dep)? {
            return Ok(false);
        }
        if dep.is_block() {
            Ok(!self.no_blockers_from.matches(&dep.from_id))
        } else {
            Ok(!self.no_dependencies_from.matches(&dep.from_id))
        }
    }

    pub fn interest_in_spec(
        &self,
        ctx: &ResolverContext<'_>,
        resolution: &Resolution,
        id: &PackageId,
        dep: &SanitisedDependency,
    ) -> Result<SpecInterest> {
        if !self.care_about(ctx, resolution, dep)? {
            return Ok(SpecInterest::Ignore);
        }
        if ctx.classifier.is_hard_requirement(dep) {
            return Ok(SpecInterest::Take);
        }

        let spec = dep.package_spec();
        let group = spec.suggestion_group();

        if self.take.matches_name(&spec.name) || self.take_from.matches(id) {
            return Ok(SpecInterest::Take);
        }
        if let Some(group) = group
            && self.take_groups.iter().any(|g| g == group)
        {
            return Ok(SpecInterest::Take);
        }
        if self.ignore.matches_name(&spec.name) || self.ignore_from.matches(id) {
            return Ok(SpecInterest::Ignore);
        }
        if let Some(group) = group
            && self.ignore_groups.iter().any(|g| g == group)
        {
            return Ok(SpecInterest::Ignore);
        }

        if !dep.is_block() {
            match ctx.env.interest_in_suggestion(id, spec) {
                Tribool::True => return Ok(SpecInterest::Take),
                Tribool::False => return Ok(SpecInterest::Ignore),
                Tribool::Indeterminate => {}
            }
        }

        let configured = if ctx.classifier.is_suggestion(dep) {
            self.take_suggestions
        } else {
            self.take_recommendations
        };
        match configured {
            Tribool::True => return Ok(SpecInterest::Take),
            Tribool::False => return Ok(SpecInterest::Ignore),
            Tribool::Indeterminate => {}
        }

        if !dep.is_block() && !ctx.env.installed_matching(spec, Some(id)).is_empty() {
            trace!("Taking {} because it is already installed", spec);
            return Ok(SpecInterest::Take);
        }
        Ok(SpecInterest::Untaken)
    }
}
