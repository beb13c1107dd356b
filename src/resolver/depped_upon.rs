// src/resolver/depped_upon.rs

//! Run-time dependency relations between installed packages
//!
//! Only enabled, hard, run or post dependencies count here. Build
//! dependencies of an installed package are not needed to keep it working.

use super::reason::ChangeByResolvent;
use crate::dependencies::{LabelsClassifier, SanitisedDependency, sanitise};
use crate::environment::Environment;
use crate::error::Result;
use crate::package::PackageId;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Sanitise preferring alternatives that are already installed
fn runtime_dependencies(
    env: &dyn Environment,
    classifier: &LabelsClassifier,
    id: &Arc<PackageId>,
) -> Result<Vec<SanitisedDependency>> {
    let deps = sanitise(id, |spec| {
        Ok(i32::from(!env.installed_matching(spec, Some(id)).is_empty()))
    })?;

    let mut wanted = Vec::new();
    for dep in deps {
        if dep.is_block()
            || !classifier.is_enabled_dep(&dep)?
            || !classifier.is_hard_requirement(&dep)
            || !classifier.is_run_or_post_dep(&dep)?
        {
            continue;
        }
        wanted.push(dep);
    }
    Ok(wanted)
}

/// Installed ids that `id` needs at run time
pub fn depped_upon_by(
    env: &dyn Environment,
    classifier: &LabelsClassifier,
    id: &Arc<PackageId>,
) -> Result<Vec<Arc<PackageId>>> {
    let mut result: Vec<Arc<PackageId>> = Vec::new();
    for dep in runtime_dependencies(env, classifier, id)? {
        for installed in env.installed_matching(dep.package_spec(), Some(id)) {
            if !result.contains(&installed) && installed != *id {
                result.push(installed);
            }
        }
    }
    Ok(result)
}

/// Everything transitively needed by `start`, excluding `start` itself
/// unless something in it is needed by another member
pub fn accumulate_depped_upon(
    env: &dyn Environment,
    classifier: &LabelsClassifier,
    start: &[Arc<PackageId>],
) -> Result<BTreeSet<Arc<PackageId>>> {
    let mut result = BTreeSet::new();
    let mut stack: Vec<Arc<PackageId>> = start.to_vec();
    let mut expanded: BTreeSet<Arc<PackageId>> = BTreeSet::new();

    while let Some(id) = stack.pop() {
        if !expanded.insert(Arc::clone(&id)) {
            continue;
        }
        for dep in depped_upon_by(env, classifier, &id)? {
            result.insert(Arc::clone(&dep));
            stack.push(dep);
        }
    }
    Ok(result)
}

/// The going-away changes `id` depends upon with no staying replacement
///
/// A dependency only counts when it matches something going away and
/// nothing that stays.
pub fn dependent_upon(
    env: &dyn Environment,
    classifier: &LabelsClassifier,
    id: &Arc<PackageId>,
    going_away: &[ChangeByResolvent],
    staying: &[ChangeByResolvent],
) -> Result<Vec<ChangeByResolvent>> {
    let mut result: Vec<ChangeByResolvent> = Vec::new();
    for dep in runtime_dependencies(env, classifier, id)? {
        let spec = dep.package_spec();
        let matches = |c: &&ChangeByResolvent| spec.matches(&c.package_id, Some(id));

        if staying.iter().any(|c| matches(&c)) {
            continue;
        }
        for change in going_away.iter().filter(matches) {
            if !result.contains(change) {
                result.push(change.clone());
            }
        }
    }
    Ok(result)
}
