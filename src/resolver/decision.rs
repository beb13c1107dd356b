// src/resolver/decision.rs

//! The one decision made for each resolvent

use super::constraint::Constraints;
use super::resolvent::Resolvent;
use crate::name::RepositoryName;
use crate::package::PackageId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumDiscriminants, EnumString};

/// How a change relates to what is installed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ChangeType {
    /// Nothing with this name is installed
    New,
    /// Other slots of this package are installed
    SlotNew,
    Upgrade,
    Downgrade,
    Reinstall,
}

/// Something the user has to agree to before a decision may be acted upon
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
pub enum RequiredConfirmation {
    Downgrade,
    /// A better version exists but was not chosen
    NotBest,
    NewSlot,
    /// An installed package will be left with unmet dependencies
    Break,
    Uninstall,
}

/// Where a change gets installed, and what it replaces there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub repository: RepositoryName,
    pub replacing: Vec<Arc<PackageId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NothingNoChangeDecision {
    pub resolvent: Resolvent,
    pub taken: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingNoChangeDecision {
    pub resolvent: Resolvent,
    pub existing_id: Arc<PackageId>,
    /// A candidate with the same version and choices exists
    pub is_same: bool,
    pub is_same_version: bool,
    pub is_transient: bool,
    pub taken: bool,
    #[serde(default)]
    pub required_confirmations: Vec<RequiredConfirmation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangesToMakeDecision {
    pub resolvent: Resolvent,
    pub origin_id: Arc<PackageId>,
    /// The origin is the best candidate available
    pub best: bool,
    pub change_type: ChangeType,
    /// Filled in once the decision is final
    pub destination: Option<Destination>,
    /// Installed via a binary created in this repository first
    pub if_via_new_binary_in: Option<RepositoryName>,
    pub taken: bool,
    #[serde(default)]
    pub required_confirmations: Vec<RequiredConfirmation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveDecision {
    pub resolvent: Resolvent,
    pub ids: Vec<Arc<PackageId>>,
    pub taken: bool,
    #[serde(default)]
    pub required_confirmations: Vec<RequiredConfirmation>,
}

/// A candidate that was considered and the constraints it fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsuitableCandidate {
    pub package_id: Arc<PackageId>,
    pub unmet_constraints: Constraints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnableToMakeDecision {
    pub resolvent: Resolvent,
    pub unsuitable_candidates: Vec<UnsuitableCandidate>,
    /// Constraints no candidate satisfies
    pub unmet_constraints: Constraints,
    pub taken: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakDecision {
    pub resolvent: Resolvent,
    pub existing_id: Arc<PackageId>,
    pub taken: bool,
    #[serde(default)]
    pub required_confirmations: Vec<RequiredConfirmation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(DecisionKind), derive(Hash, Display))]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Decision {
    NothingNoChange(NothingNoChangeDecision),
    ExistingNoChange(ExistingNoChangeDecision),
    ChangesToMake(ChangesToMakeDecision),
    Remove(RemoveDecision),
    UnableToMake(UnableToMakeDecision),
    Break(BreakDecision),
}

impl Decision {
    pub fn kind(&self) -> DecisionKind {
        DecisionKind::from(self)
    }

    pub fn resolvent(&self) -> &Resolvent {
        match self {
            Decision::NothingNoChange(d) => &d.resolvent,
            Decision::ExistingNoChange(d) => &d.resolvent,
            Decision::ChangesToMake(d) => &d.resolvent,
            Decision::Remove(d) => &d.resolvent,
            Decision::UnableToMake(d) => &d.resolvent,
            Decision::Break(d) => &d.resolvent,
        }
    }

    pub fn taken(&self) -> bool {
        match self {
            Decision::NothingNoChange(d) => d.taken,
            Decision::ExistingNoChange(d) => d.taken,
            Decision::ChangesToMake(d) => d.taken,
            Decision::Remove(d) => d.taken,
            Decision::UnableToMake(d) => d.taken,
            Decision::Break(d) => d.taken,
        }
    }

    /// Whether acting on this decision changes the system
    pub fn is_change_or_remove(&self) -> bool {
        matches!(self, Decision::ChangesToMake(_) | Decision::Remove(_))
    }

    /// The id this decision settles on, if it keeps or installs one
    pub fn chosen_id(&self) -> Option<&Arc<PackageId>> {
        match self {
            Decision::ExistingNoChange(d) => Some(&d.existing_id),
            Decision::ChangesToMake(d) => Some(&d.origin_id),
            Decision::NothingNoChange(_)
            | Decision::Remove(_)
            | Decision::UnableToMake(_)
            | Decision::Break(_) => None,
        }
    }

    pub fn required_confirmations(&self) -> &[RequiredConfirmation] {
        match self {
            Decision::ExistingNoChange(d) => &d.required_confirmations,
            Decision::ChangesToMake(d) => &d.required_confirmations,
            Decision::Remove(d) => &d.required_confirmations,
            Decision::Break(d) => &d.required_confirmations,
            Decision::NothingNoChange(_) | Decision::UnableToMake(_) => &[],
        }
    }

    /// Record a refused confirmation; returns false for decisions that take none
    pub fn add_required_confirmation(&mut self, confirmation: RequiredConfirmation) -> bool {
        let list = match self {
            Decision::ExistingNoChange(d) => &mut d.required_confirmations,
            Decision::ChangesToMake(d) => &mut d.required_confirmations,
            Decision::Remove(d) => &mut d.required_confirmations,
            Decision::Break(d) => &mut d.required_confirmations,
            Decision::NothingNoChange(_) | Decision::UnableToMake(_) => return false,
        };
        if !list.contains(&confirmation) {
            list.push(confirmation);
        }
        true
    }

    pub fn as_changes_to_make(&self) -> Option<&ChangesToMakeDecision> {
        match self {
            Decision::ChangesToMake(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_remove(&self) -> Option<&RemoveDecision> {
        match self {
            Decision::Remove(d) => Some(d),
            _ => None,
        }
    }
}
