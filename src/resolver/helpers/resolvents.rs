// src/resolver/helpers/resolvents.rs

//! Mapping specs onto resolvents

use crate::config::{SlotSelection, SlotsConfig};
use crate::error::Result;
use crate::package::{PackageId, RepositoryKind};
use crate::resolver::functions::ResolverContext;
use crate::resolver::reason::Reason;
use crate::resolver::resolvent::{DestinationType, Resolvent, ResolventSlot};
use crate::spec::{BlockDepSpec, PackageDepSpec};
use tracing::trace;

/// Where dependencies and targets are sent
#[derive(Debug, Clone)]
pub struct DestinationSelection {
    pub targets: DestinationType,
    pub dependencies_to_slash: bool,
}

impl DestinationSelection {
    fn destination_for(&self, reason: &Reason) -> DestinationType {
        if reason.is_target() {
            return self.targets;
        }
        match reason {
            Reason::Dependency { from_resolvent, .. } if !self.dependencies_to_slash => {
                from_resolvent.destination_type
            }
            _ => DestinationType::InstallToSlash,
        }
    }
}

/// Resolvents for a package spec, and whether more than one was found
pub fn resolvents_for(
    ctx: &ResolverContext<'_>,
    slots: &SlotsConfig,
    destinations: &DestinationSelection,
    spec: &PackageDepSpec,
    from_id: Option<&PackageId>,
    reason: &Reason,
) -> Result<(Vec<Resolvent>, bool)> {
    let destination_type = destinations.destination_for(reason);
    let selection = if reason.is_target() {
        slots.targets
    } else {
        slots.dependencies
    };

    let mut found = match spec.slot {
        Some(ref slot) => vec![ResolventSlot::Named(slot.clone())],
        None => select_slots(ctx, spec, from_id, selection, destination_type),
    };
    if found.is_empty() {
        trace!("No slots for {}, using an unknown slot", spec);
        found.push(ResolventSlot::Unknown);
    }

    let resolvents: Vec<Resolvent> = found
        .into_iter()
        .map(|slot| Resolvent::new(spec.name.clone(), slot, destination_type))
        .collect();
    let ambiguous = resolvents.len() > 1;
    Ok((resolvents, ambiguous))
}

fn select_slots(
    ctx: &ResolverContext<'_>,
    spec: &PackageDepSpec,
    from_id: Option<&PackageId>,
    selection: SlotSelection,
    destination_type: DestinationType,
) -> Vec<ResolventSlot> {
    let best = ctx
        .env
        .installable_ids(&spec.name)
        .into_iter()
        .filter(|id| {
            destination_type == DestinationType::InstallToSlash
                || ctx.env.repository_kind(id) == Some(RepositoryKind::Source)
        })
        .filter(|id| spec.matches(id, from_id))
        .last()
        .map(|id| ResolventSlot::of(&id));

    let mut installed: Vec<ResolventSlot> = Vec::new();
    for id in ctx.env.installed_matching_ignoring_choices(spec) {
        let slot = ResolventSlot::of(&id);
        if !installed.contains(&slot) {
            installed.push(slot);
        }
    }
    installed.sort();

    match selection {
        SlotSelection::Best => best.into_iter().collect(),
        SlotSelection::Installed => installed,
        SlotSelection::BestOrInstalled => match best {
            Some(slot) => vec![slot],
            None => installed,
        },
        SlotSelection::InstalledOrBest => {
            if installed.is_empty() {
                best.into_iter().collect()
            } else {
                installed
            }
        }
        SlotSelection::All => {
            if let Some(slot) = best
                && !installed.contains(&slot)
            {
                installed.insert(0, slot);
            }
            installed
        }
    }
}

/// Resolvents a blocker could affect
///
/// Installed ids that match the blocker, plus anything already being
/// resolved under that name in a matching slot.
pub fn resolvents_for_blocker(
    ctx: &ResolverContext<'_>,
    block: &BlockDepSpec,
    reason: &Reason,
) -> Vec<Resolvent> {
    let spec = &block.blocking;
    let from_id = match reason {
        Reason::Dependency { from_id, .. } => Some(from_id.as_ref()),
        _ => None,
    };

    let mut resolvents: Vec<Resolvent> = Vec::new();
    for id in ctx.env.installed_matching(spec, from_id) {
        let resolvent = Resolvent::for_id(&id, DestinationType::InstallToSlash);
        if !resolvents.contains(&resolvent) {
            resolvents.push(resolvent);
        }
    }

    for resolution in ctx.resolutions {
        let resolvent = &resolution.resolvent;
        if resolvent.package != spec.name
            || resolvent.destination_type != DestinationType::InstallToSlash
        {
            continue;
        }
        let slot_matches = match spec.slot {
            Some(ref slot) => resolvent.slot.name() == Some(slot),
            None => true,
        };
        if slot_matches && !resolvents.contains(resolvent) {
            resolvents.push(resolvent.clone());
        }
    }
    resolvents
}
