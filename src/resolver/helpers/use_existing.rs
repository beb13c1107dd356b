// src/resolver/helpers/use_existing.rs

use crate::config::UseExistingConfig;
use crate::resolver::constraint::UseExisting;
use crate::resolver::reason::Reason;
use crate::spec::DepSpec;

/// Use-existing policy and nothing-is-fine-too flag for a new constraint
///
/// Blockers are always satisfied by having nothing, and never force a
/// reinstall.
pub fn use_existing_nothing(
    config: &UseExistingConfig,
    spec: &DepSpec,
    reason: &Reason,
) -> (UseExisting, bool) {
    if spec.is_block() {
        return (UseExisting::IfPossible, true);
    }
    match reason {
        Reason::Set { reason_for_set, .. } if reason_for_set.is_target() => {
            (config.set_targets, false)
        }
        _ if reason.is_target() => (config.targets, false),
        Reason::Dependency { .. } => (config.dependencies, false),
        Reason::Preset { .. } => (UseExisting::IfPossible, true),
        _ => (UseExisting::IfPossible, false),
    }
}
