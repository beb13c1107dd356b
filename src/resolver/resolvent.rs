// src/resolver/resolvent.rs

//! Resolvents: the unit the resolver makes one decision for

use crate::name::{PackageName, SlotName};
use crate::package::PackageId;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

/// Where a resolvent's package ends up
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
pub enum DestinationType {
    /// Installed onto the live system
    InstallToSlash,
    /// Built into a binary package repository
    CreateBinary,
}

/// The slot part of a resolvent
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "name")]
pub enum ResolventSlot {
    Named(SlotName),
    /// The package does not use slots
    NoSlot,
    /// Nothing matched, so the slot could not be determined
    Unknown,
}

impl ResolventSlot {
    pub fn of(id: &PackageId) -> Self {
        match id.slot {
            Some(ref slot) => ResolventSlot::Named(slot.clone()),
            None => ResolventSlot::NoSlot,
        }
    }

    /// Whether an id lives in this slot
    pub fn holds(&self, id: &PackageId) -> bool {
        match self {
            ResolventSlot::Named(slot) => id.slot.as_ref() == Some(slot),
            ResolventSlot::NoSlot => id.slot.is_none(),
            ResolventSlot::Unknown => false,
        }
    }

    pub fn name(&self) -> Option<&SlotName> {
        match self {
            ResolventSlot::Named(slot) => Some(slot),
            ResolventSlot::NoSlot | ResolventSlot::Unknown => None,
        }
    }
}

/// Package name, slot and destination: the key for one resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resolvent {
    pub package: PackageName,
    pub slot: ResolventSlot,
    pub destination_type: DestinationType,
}

impl Resolvent {
    pub fn new(package: PackageName, slot: ResolventSlot, destination_type: DestinationType) -> Self {
        Self {
            package,
            slot,
            destination_type,
        }
    }

    /// The resolvent an id would occupy at a destination
    pub fn for_id(id: &PackageId, destination_type: DestinationType) -> Self {
        Self::new(id.name.clone(), ResolventSlot::of(id), destination_type)
    }

    /// Same package and slot, another destination
    pub fn with_destination(&self, destination_type: DestinationType) -> Self {
        Self {
            destination_type,
            ..self.clone()
        }
    }

    pub fn holds(&self, id: &PackageId) -> bool {
        id.name == self.package && self.slot.holds(id)
    }
}

impl fmt::Display for Resolvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.package)?;
        match self.slot {
            ResolventSlot::Named(ref slot) => write!(f, ":{}", slot)?,
            ResolventSlot::NoSlot => {}
            ResolventSlot::Unknown => write!(f, ":(unknown)")?,
        }
        match self.destination_type {
            DestinationType::InstallToSlash => write!(f, " -> /"),
            DestinationType::CreateBinary => write!(f, " -> binary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolvent_for_id() {
        let slotted = PackageId::new("cat/pkg", "1", "repo").unwrap().with_slot("2");
        let plain = PackageId::new("cat/pkg", "1", "repo").unwrap();

        let r = Resolvent::for_id(&slotted, DestinationType::InstallToSlash);
        assert!(r.holds(&slotted));
        assert!(!r.holds(&plain));
        assert_eq!(r.to_string(), "cat/pkg:2 -> /");

        let binary = r.with_destination(DestinationType::CreateBinary);
        assert_ne!(r, binary);
        assert_eq!(binary.to_string(), "cat/pkg:2 -> binary");

        let no_slot = Resolvent::for_id(&plain, DestinationType::InstallToSlash);
        assert_eq!(no_slot.slot, ResolventSlot::NoSlot);
        assert!(no_slot.holds(&plain));
    }

    #[test]
    fn test_unknown_slot_holds_nothing() {
        let id = PackageId::new("cat/pkg", "1", "repo").unwrap();
        assert!(!ResolventSlot::Unknown.holds(&id));
    }
}
