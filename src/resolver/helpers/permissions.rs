// src/resolver/helpers/permissions.rs

//! What the resolver may do without asking

use super::SpecList;
use crate::config::{ConfirmConfig, RemovalConfig};
use crate::error::Result;
use crate::package::PackageId;
use crate::resolver::decision::{ChangeType, Decision, RequiredConfirmation};
use crate::resolver::resolution::Resolution;

#[derive(Debug, Clone)]
pub struct RemovalPolicy {
    pub purge: SpecList,
    pub remove_if_dependent: SpecList,
    allowed_to_remove: SpecList,
    allowed_to_break: SpecList,
    permit_any_break: bool,
}

impl RemovalPolicy {
    pub fn from_config(config: &RemovalConfig) -> Result<Self> {
        Ok(Self {
            purge: SpecList::parse(&config.purge)?,
            remove_if_dependent: SpecList::parse(&config.remove_if_dependent)?,
            allowed_to_remove: SpecList::parse(&config.allowed_to_remove)?,
            allowed_to_break: SpecList::parse(&config.allowed_to_break)?,
            permit_any_break: config.permit_any_break,
        })
    }

    /// Targets, purges and removable dependents may always be removed
    pub fn allowed_to_remove(&self, resolution: &Resolution, id: &PackageId) -> bool {
        let by_reason = resolution.constraints.iter().any(|c| {
            c.reason.is_target()
                || c.reason.is_was_used_by()
                || (c.reason.is_dependent() && self.remove_if_dependent.matches(id))
        });
        by_reason || self.allowed_to_remove.matches(id)
    }

    pub fn allowed_to_break(&self, id: &PackageId) -> bool {
        self.permit_any_break || self.allowed_to_break.matches(id)
    }

    pub fn permit_any_break(&self) -> bool {
        self.permit_any_break
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmPolicy {
    permit_downgrade: SpecList,
    permit_old_version: SpecList,
    permit_uninstall: SpecList,
    permit_new_slot: bool,
}

impl ConfirmPolicy {
    pub fn from_config(config: &ConfirmConfig) -> Result<Self> {
        Ok(Self {
            permit_downgrade: SpecList::parse(&config.permit_downgrade)?,
            permit_old_version: SpecList::parse(&config.permit_old_version)?,
            permit_uninstall: SpecList::parse(&config.permit_uninstall)?,
            permit_new_slot: config.permit_new_slot,
        })
    }

    /// Whether `confirmation` is granted for the decision on `resolution`
    pub fn confirm(
        &self,
        removal: &RemovalPolicy,
        resolution: &Resolution,
        confirmation: RequiredConfirmation,
    ) -> bool {
        let has_target = resolution.constraints.iter().any(|c| c.reason.is_target());
        let chosen = resolution.decision.as_ref().and_then(Decision::chosen_id);

        match confirmation {
            RequiredConfirmation::Downgrade => {
                chosen.is_some_and(|id| self.permit_downgrade.matches(id))
            }
            RequiredConfirmation::NotBest => {
                has_target || chosen.is_some_and(|id| self.permit_old_version.matches(id))
            }
            RequiredConfirmation::NewSlot => self.permit_new_slot,
            RequiredConfirmation::Break => removal.permit_any_break(),
            RequiredConfirmation::Uninstall => {
                let used_by = resolution.constraints.iter().any(|c| c.reason.is_was_used_by());
                let ids = resolution
                    .decision
                    .as_ref()
                    .and_then(Decision::as_remove)
                    .map(|d| d.ids.as_slice())
                    .unwrap_or_default();
                has_target || used_by || self.permit_uninstall.matches_any(ids)
            }
        }
    }
}

/// Confirmations a decision needs, before policy is consulted
pub fn confirmations_needed(decision: &Decision) -> Vec<RequiredConfirmation> {
    match decision {
        Decision::ChangesToMake(d) => {
            let mut needed = Vec::new();
            if d.change_type == ChangeType::Downgrade {
                needed.push(RequiredConfirmation::Downgrade);
            }
            if !d.best {
                needed.push(RequiredConfirmation::NotBest);
            }
            if d.change_type == ChangeType::SlotNew {
                needed.push(RequiredConfirmation::NewSlot);
            }
            needed
        }
        Decision::Remove(_) => vec![RequiredConfirmation::Uninstall],
        Decision::Break(_) => vec![RequiredConfirmation::Break],
        Decision::NothingNoChange(_)
        | Decision::ExistingNoChange(_)
        | Decision::UnableToMake(_) => Vec::new(),
    }
}
