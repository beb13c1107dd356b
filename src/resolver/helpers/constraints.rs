// src/resolver/helpers/constraints.rs

//! Constraints the engine adds on its own initiative

use super::SpecList;
use crate::config::InitialConfig;
use crate::error::{Error, Result};
use crate::package::{PackageId, RepositoryKind};
use crate::resolver::constraint::{Constraint, Constraints, UseExisting};
use crate::resolver::functions::ResolverContext;
use crate::resolver::reason::{ChangeByResolvent, Reason};
use crate::resolver::resolution::Resolution;
use crate::resolver::resolvent::{DestinationType, Resolvent};
use crate::spec::{BlockDepSpec, BlockStrength, DepSpec, PackageDepSpec};
use crate::version::VersionConstraint;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

/// Constraints every matching resolvent starts with
#[derive(Debug, Clone)]
pub struct InitialConstraints {
    presets: Vec<DepSpec>,
    without: SpecList,
    reinstall_scm_days: Option<i64>,
    now: DateTime<Utc>,
}

impl InitialConstraints {
    pub fn from_config(config: &InitialConfig, now: DateTime<Utc>) -> Result<Self> {
        let presets = config
            .preset
            .iter()
            .map(|p| DepSpec::parse(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            presets,
            without: SpecList::parse(&config.without)?,
            reinstall_scm_days: config.reinstall_scm_days,
            now,
        })
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn constraints_for(
        &self,
        ctx: &ResolverContext<'_>,
        resolvent: &Resolvent,
    ) -> Constraints {
        let mut constraints = Constraints::new();
        let destination_type = resolvent.destination_type;

        for preset in &self.presets {
            let spec = preset.package_spec();
            let slot_matches = spec
                .slot
                .as_ref()
                .is_none_or(|slot| resolvent.slot.name() == Some(slot));
            if spec.name != resolvent.package || !slot_matches {
                continue;
            }
            constraints.add(
                Constraint::new(
                    destination_type,
                    preset.clone(),
                    Reason::Preset {
                        explanation: "preset".to_string(),
                        maybe_reason: None,
                    },
                )
                .nothing_is_fine_too(true),
            );
        }

        for spec in self.without.iter().filter(|s| s.name == resolvent.package) {
            constraints.add(
                Constraint::new(
                    destination_type,
                    DepSpec::Block(BlockDepSpec::new(spec.clone(), BlockStrength::Weak)),
                    Reason::Preset {
                        explanation: "matched by without".to_string(),
                        maybe_reason: None,
                    },
                )
                .nothing_is_fine_too(true),
            );
        }

        if let Some(days) = self.reinstall_scm_days
            && destination_type == DestinationType::InstallToSlash
        {
            let cutoff = self.now - Duration::days(days);
            for id in ctx.env.ids_in(&resolvent.package, RepositoryKind::Installed) {
                if !resolvent.slot.holds(&id) || !id.version.is_scm() {
                    continue;
                }
                if id.installed_time.is_some_and(|t| t < cutoff) {
                    debug!("{} is an scm package older than {} days", id, days);
                    let spec = PackageDepSpec::for_name(id.name.clone()).with_slot(id.slot.clone());
                    constraints.add(
                        Constraint::new(
                            destination_type,
                            DepSpec::Package(spec),
                            Reason::Preset {
                                explanation: format!(
                                    "installed scm version is older than {} days",
                                    days
                                ),
                                maybe_reason: None,
                            },
                        )
                        .use_existing(UseExisting::Never)
                        .nothing_is_fine_too(true),
                    );
                }
            }
        }

        constraints
    }
}

/// Weak block on an installed id whose dependencies are going away
///
/// Ids matching `remove_if_dependent` get a block on their whole slot, so
/// removing them satisfies it as well as rebuilding does.
pub fn constraints_for_dependent(
    remove_if_dependent: &SpecList,
    resolvent: &Resolvent,
    id: &Arc<PackageId>,
    dependent_upon: &[ChangeByResolvent],
) -> Constraints {
    let spec = if remove_if_dependent.matches(id) {
        PackageDepSpec::for_name(id.name.clone()).with_slot(id.slot.clone())
    } else {
        id.uniquely_identifying_spec()
    };
    let constraint = Constraint::new(
        resolvent.destination_type,
        DepSpec::Block(BlockDepSpec::new(spec, BlockStrength::Weak)),
        Reason::Dependent {
            id: Arc::clone(id),
            dependent_upon: dependent_upon.to_vec(),
        },
    )
    .nothing_is_fine_too(true);
    std::iter::once(constraint).collect()
}

/// Removal of an installed id nothing needs any more
///
/// Untaken unless the id is listed for purging.
pub fn constraints_for_purge(
    purge: &SpecList,
    resolvent: &Resolvent,
    id: &Arc<PackageId>,
    was_used_by: &[ChangeByResolvent],
) -> Constraints {
    let spec = PackageDepSpec::for_name(id.name.clone()).with_slot(id.slot.clone());
    let constraint = Constraint::new(
        resolvent.destination_type,
        DepSpec::Block(BlockDepSpec::new(spec, BlockStrength::Weak)),
        Reason::WasUsedBy {
            ids: was_used_by.to_vec(),
        },
    )
    .nothing_is_fine_too(true)
    .untaken(!purge.matches(id))
    .suppressed();
    std::iter::once(constraint).collect()
}

/// Build a binary of exactly what the live install chose
pub fn constraints_for_via_binary(resolvent: &Resolvent, other: &Resolution) -> Result<Constraints> {
    let origin = other
        .decision
        .as_ref()
        .and_then(|d| d.as_changes_to_make())
        .map(|d| &d.origin_id)
        .ok_or_else(|| {
            Error::internal(format!(
                "via-binary constraint for {} without a change to copy",
                other.resolvent
            ))
        })?;

    let spec = PackageDepSpec::for_name(origin.name.clone())
        .with_version(VersionConstraint::Exact(origin.version.clone()))
        .with_slot(origin.slot.clone());
    let constraint = Constraint::new(
        resolvent.destination_type,
        DepSpec::Package(spec),
        Reason::ViaBinary {
            other_resolvent: other.resolvent.clone(),
        },
    )
    .use_existing(UseExisting::IfSame);
    Ok(std::iter::once(constraint).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::LabelsClassifier;
    use crate::environment::{Environment, PackageDatabase};
    use crate::package::Repository;
    use crate::resolver::resolution::ResolutionsByResolvent;
    use chrono::TimeZone;

    #[test]
    fn test_without_and_scm_presets() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let env = PackageDatabase::new()
            .with_repository(Repository::new("installed", RepositoryKind::Installed))
            .with_id(
                PackageId::new("cat/live", "scm", "installed")
                    .unwrap()
                    .installed_at(now - Duration::days(30)),
            )
            .unwrap();
        let classifier = LabelsClassifier::new();
        let resolutions = ResolutionsByResolvent::new();
        let ctx = ResolverContext {
            env: &env,
            classifier: &classifier,
            resolutions: &resolutions,
        };

        let config = InitialConfig {
            preset: Vec::new(),
            without: vec!["cat/live".to_string()],
            reinstall_scm_days: Some(7),
        };
        let initial = InitialConstraints::from_config(&config, now).unwrap();
        let id = env.installed_ids()[0].clone();
        let resolvent = Resolvent::for_id(&id, DestinationType::InstallToSlash);

        let constraints = initial.constraints_for(&ctx, &resolvent);
        assert_eq!(constraints.len(), 2);
        assert!(constraints.nothing_is_fine_too());
        assert_eq!(constraints.strictest_use_existing(), UseExisting::Never);

        let recent = initial.with_now(now - Duration::days(25));
        assert_eq!(recent.constraints_for(&ctx, &resolvent).len(), 1);
    }

    #[test]
    fn test_purge_is_untaken_unless_listed() {
        let id = Arc::new(PackageId::new("cat/old", "1", "installed").unwrap());
        let resolvent = Resolvent::for_id(&id, DestinationType::InstallToSlash);

        let unlisted = constraints_for_purge(&SpecList::default(), &resolvent, &id, &[]);
        assert!(unlisted.all_untaken());
        assert!(unlisted.all_suppress_dependencies());

        let purge = SpecList::parse(&["cat/old"]).unwrap();
        let listed = constraints_for_purge(&purge, &resolvent, &id, &[]);
        assert!(!listed.all_untaken());
        assert!(!listed.allow(&id));
    }

    #[test]
    fn test_dependent_blocks_exact_id_unless_removable() {
        let id = Arc::new(PackageId::new("cat/app", "1", "installed").unwrap());
        let rebuilt = PackageId::new("cat/app", "1", "repo").unwrap();
        let resolvent = Resolvent::for_id(&id, DestinationType::InstallToSlash);

        let exact = constraints_for_dependent(&SpecList::default(), &resolvent, &id, &[]);
        assert!(!exact.allow(&id));
        assert!(exact.allow(&rebuilt));

        let removable = SpecList::parse(&["cat/app"]).unwrap();
        let slot = constraints_for_dependent(&removable, &resolvent, &id, &[]);
        assert!(!slot.allow(&rebuilt));
    }
}
