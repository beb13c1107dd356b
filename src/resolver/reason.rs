// src/resolver/reason.rs

//! Why a constraint exists

use super::resolvent::Resolvent;
use crate::dependencies::SanitisedDependency;
use crate::package::PackageId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A package id together with the resolvent it was decided for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeByResolvent {
    pub package_id: Arc<PackageId>,
    pub resolvent: Resolvent,
}

impl ChangeByResolvent {
    pub fn new(package_id: Arc<PackageId>, resolvent: Resolvent) -> Self {
        Self {
            package_id,
            resolvent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Reason {
    /// Asked for by the user
    Target,

    /// A dependency of a decided package
    Dependency {
        from_id: Arc<PackageId>,
        from_resolvent: Resolvent,
        dependency: SanitisedDependency,
        /// Already satisfied by something installed when it was found
        already_met: bool,
    },

    /// An installed package that depends on things going away
    Dependent {
        id: Arc<PackageId>,
        dependent_upon: Vec<ChangeByResolvent>,
    },

    /// Only used by packages that are going away
    WasUsedBy { ids: Vec<ChangeByResolvent> },

    /// Companion binary for a live install
    ViaBinary { other_resolvent: Resolvent },

    /// Applied from the start, by configuration or by a restart
    Preset {
        explanation: String,
        maybe_reason: Option<Box<Reason>>,
    },

    /// A member of a named set
    Set {
        set_name: String,
        reason_for_set: Box<Reason>,
    },

    LikeOtherDestinationType {
        other_resolvent: Resolvent,
        reason_for_other: Box<Reason>,
    },
}

impl Reason {
    /// Whether this reason traces back to the user's targets
    pub fn is_target(&self) -> bool {
        match self {
            Reason::Target => true,
            Reason::Set { reason_for_set, .. } => reason_for_set.is_target(),
            Reason::LikeOtherDestinationType {
                reason_for_other, ..
            } => reason_for_other.is_target(),
            _ => false,
        }
    }

    pub fn is_dependent(&self) -> bool {
        matches!(self, Reason::Dependent { .. })
    }

    pub fn is_was_used_by(&self) -> bool {
        matches!(self, Reason::WasUsedBy { .. })
    }

    pub fn dependency(&self) -> Option<&SanitisedDependency> {
        match self {
            Reason::Dependency { dependency, .. } => Some(dependency),
            _ => None,
        }
    }

    /// The set this reason came through, if any
    pub fn set_name(&self) -> Option<&str> {
        match self {
            Reason::Set { set_name, .. } => Some(set_name),
            _ => None,
        }
    }
}

fn join(ids: &[ChangeByResolvent]) -> String {
    ids.iter()
        .map(|c| c.package_id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Target => write!(f, "target"),
            Reason::Dependency {
                from_id,
                dependency,
                ..
            } => write!(f, "dependency '{}' of {}", dependency.spec, from_id),
            Reason::Dependent { dependent_upon, .. } => {
                write!(f, "dependent upon {}", join(dependent_upon))
            }
            Reason::WasUsedBy { ids } => write!(f, "was used by {}", join(ids)),
            Reason::ViaBinary { other_resolvent } => {
                write!(f, "binary for {}", other_resolvent)
            }
            Reason::Preset {
                explanation,
                maybe_reason,
            } => match maybe_reason {
                Some(reason) => write!(f, "{} ({})", explanation, reason),
                None => write!(f, "{}", explanation),
            },
            Reason::Set {
                set_name,
                reason_for_set,
            } => write!(f, "member of @{} ({})", set_name, reason_for_set),
            Reason::LikeOtherDestinationType {
                other_resolvent,
                reason_for_other,
            } => write!(f, "like {} ({})", other_resolvent, reason_for_other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_through_set() {
        let reason = Reason::Set {
            set_name: "world".to_string(),
            reason_for_set: Box::new(Reason::Target),
        };
        assert!(reason.is_target());
        assert_eq!(reason.set_name(), Some("world"));
        assert_eq!(reason.to_string(), "member of @world (target)");

        let preset = Reason::Preset {
            explanation: "restarted because of".to_string(),
            maybe_reason: Some(Box::new(Reason::Target)),
        };
        assert!(!preset.is_target());
        assert_eq!(preset.to_string(), "restarted because of (target)");
    }

    #[test]
    fn test_reason_json_is_tagged() {
        let json = serde_json::to_value(&Reason::Target).unwrap();
        assert_eq!(json["kind"], "target");
    }
}
