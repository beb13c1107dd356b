// src/dependencies/sanitised.rs

//! Flattening dependency trees into plain dependencies
//!
//! Conditionals are evaluated against the package's choices, label switches
//! are applied, and every `|| ( )` group is reduced to the one alternative
//! the caller's scorer likes best.

use super::labels::DependencyLabel;
use super::tree::{DependencyKey, DependencyTree};
use crate::error::{Error, Result};
use crate::package::PackageId;
use crate::spec::{DepSpec, PackageDepSpec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// One dependency of one package, with everything resolved but the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitisedDependency {
    pub from_id: Arc<PackageId>,
    pub spec: DepSpec,
    pub active_labels: Vec<DependencyLabel>,
    pub metadata_key: DependencyKey,
    /// The text this dependency came from; for `||` choices, the whole group
    pub original_specs_as_string: String,
}

impl SanitisedDependency {
    /// The package being required or blocked
    pub fn package_spec(&self) -> &PackageDepSpec {
        self.spec.package_spec()
    }

    pub fn is_block(&self) -> bool {
        self.spec.is_block()
    }
}

/// Sanitise every dependency of `id`
///
/// `score` rates one member of an `||` alternative; higher is better.
/// A tree under [`DependencyKey::Dependencies`] replaces all the others.
pub fn sanitise<F>(id: &Arc<PackageId>, score: F) -> Result<Vec<SanitisedDependency>>
where
    F: FnMut(&PackageDepSpec) -> Result<i32>,
{
    let mut walker = Walker {
        id,
        key: DependencyKey::Dependencies,
        score,
        out: Vec::new(),
    };

    let keys: Vec<DependencyKey> = if id.dependencies.contains_key(&DependencyKey::Dependencies) {
        vec![DependencyKey::Dependencies]
    } else {
        id.dependencies.keys().copied().collect()
    };

    for key in keys {
        let Some(tree) = id.dependencies.get(&key) else {
            continue;
        };
        walker.key = key;
        walker.walk(tree, key.initial_labels())?;
    }

    trace!("{} has {} sanitised dependencies", id, walker.out.len());
    Ok(walker.out)
}

struct Walker<'a, F> {
    id: &'a Arc<PackageId>,
    key: DependencyKey,
    score: F,
    out: Vec<SanitisedDependency>,
}

impl<F> Walker<'_, F>
where
    F: FnMut(&PackageDepSpec) -> Result<i32>,
{
    fn condition_holds(&self, flag: &str, inverse: bool) -> bool {
        self.id.choice_enabled(flag) != inverse
    }

    fn emit(&mut self, spec: DepSpec, labels: &[DependencyLabel], original: String) {
        self.out.push(SanitisedDependency {
            from_id: Arc::clone(self.id),
            spec,
            active_labels: labels.to_vec(),
            metadata_key: self.key,
            original_specs_as_string: original,
        });
    }

    /// Walk a group; label switches inside it do not leak out
    fn walk(&mut self, node: &DependencyTree, mut labels: Vec<DependencyLabel>) -> Result<()> {
        match node {
            DependencyTree::All(children) => {
                for child in children {
                    match child {
                        DependencyTree::Labels(switch) => labels = switch.clone(),
                        _ => self.walk(child, labels.clone())?,
                    }
                }
            }
            DependencyTree::Conditional {
                flag,
                inverse,
                children,
            } => {
                if self.condition_holds(flag, *inverse) {
                    for child in children {
                        match child {
                            DependencyTree::Labels(switch) => labels = switch.clone(),
                            _ => self.walk(child, labels.clone())?,
                        }
                    }
                }
            }
            DependencyTree::Any(children) => {
                let chosen = self.choose(children)?;
                let original = node.to_string();
                for spec in chosen {
                    self.emit(DepSpec::Package(spec), &labels, original.clone());
                }
            }
            DependencyTree::Spec(spec) => {
                let original = spec.to_string();
                self.emit(spec.clone(), &labels, original);
            }
            DependencyTree::Labels(_) => {}
        }
        Ok(())
    }

    /// Pick the best alternative of an `||` group
    ///
    /// An alternative scores as its worst member. An alternative with
    /// nothing active makes the whole group satisfied by nothing.
    fn choose(&mut self, children: &[DependencyTree]) -> Result<Vec<PackageDepSpec>> {
        let mut best: Option<(i32, Vec<PackageDepSpec>)> = None;

        for child in children {
            let group = self.flatten(child)?;
            if group.is_empty() {
                return Ok(Vec::new());
            }

            let mut worst = i32::MAX;
            for spec in &group {
                worst = worst.min((self.score)(spec)?);
            }

            if best.as_ref().is_none_or(|(score, _)| worst > *score) {
                best = Some((worst, group));
            }
        }

        Ok(best.map(|(_, group)| group).unwrap_or_default())
    }

    fn flatten(&mut self, node: &DependencyTree) -> Result<Vec<PackageDepSpec>> {
        match node {
            DependencyTree::Spec(DepSpec::Package(spec)) => Ok(vec![spec.clone()]),
            DependencyTree::Spec(DepSpec::Block(block)) => Err(Error::internal(format!(
                "blocker '{}' inside an || group of {}",
                block, self.id
            ))),
            DependencyTree::Labels(labels) => Err(Error::internal(format!(
                "label switch '{}' inside an || group of {}",
                super::labels::labels_to_string(labels),
                self.id
            ))),
            DependencyTree::All(children) => {
                let mut specs = Vec::new();
                for child in children {
                    specs.extend(self.flatten(child)?);
                }
                Ok(specs)
            }
            DependencyTree::Conditional {
                flag,
                inverse,
                children,
            } => {
                let mut specs = Vec::new();
                if self.condition_holds(flag, *inverse) {
                    for child in children {
                        specs.extend(self.flatten(child)?);
                    }
                }
                Ok(specs)
            }
            DependencyTree::Any(children) => self.choose(children),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::labels_to_string;

    fn id_with(key: DependencyKey, deps: &str) -> Arc<PackageId> {
        Arc::new(
            PackageId::new("cat/app", "1", "repo")
                .unwrap()
                .with_choice("ssl", true)
                .with_dependencies(key, deps)
                .unwrap(),
        )
    }

    fn no_preference(_: &PackageDepSpec) -> Result<i32> {
        Ok(0)
    }

    fn specs(deps: &[SanitisedDependency]) -> Vec<String> {
        deps.iter().map(|d| d.spec.to_string()).collect()
    }

    #[test]
    fn test_conditionals_follow_choices() {
        let id = id_with(
            DependencyKey::Dependencies,
            "ssl? ( cat/openssl ) !ssl? ( cat/nossl ) X? ( cat/x )",
        );
        let deps = sanitise(&id, no_preference).unwrap();
        assert_eq!(specs(&deps), vec!["cat/openssl"]);
        assert_eq!(labels_to_string(&deps[0].active_labels), "build+run");
    }

    #[test]
    fn test_label_switch_is_scoped_to_group() {
        let id = id_with(
            DependencyKey::Dependencies,
            "cat/a ( post: cat/b ) cat/c run: cat/d",
        );
        let deps = sanitise(&id, no_preference).unwrap();
        let labels: Vec<String> = deps.iter().map(|d| labels_to_string(&d.active_labels)).collect();
        assert_eq!(specs(&deps), vec!["cat/a", "cat/b", "cat/c", "cat/d"]);
        assert_eq!(labels, vec!["build+run", "post", "build+run", "run"]);
    }

    #[test]
    fn test_any_picks_best_scoring_group() {
        let id = id_with(DependencyKey::RunDependencies, "|| ( cat/a ( cat/b cat/c ) )");
        let deps = sanitise(&id, |spec| {
            Ok(match spec.name.as_str() {
                "cat/a" => 10,
                "cat/b" => 50,
                "cat/c" => 20,
                _ => 0,
            })
        })
        .unwrap();
        assert_eq!(specs(&deps), vec!["cat/b", "cat/c"]);
        assert_eq!(deps[0].original_specs_as_string, "|| ( cat/a ( cat/b cat/c ) )");
        assert_eq!(deps[0].metadata_key, DependencyKey::RunDependencies);
    }

    #[test]
    fn test_any_ties_go_left() {
        let id = id_with(DependencyKey::RunDependencies, "|| ( cat/a cat/b )");
        let deps = sanitise(&id, no_preference).unwrap();
        assert_eq!(specs(&deps), vec!["cat/a"]);
    }

    #[test]
    fn test_any_with_inactive_alternative_needs_nothing() {
        let id = id_with(DependencyKey::RunDependencies, "|| ( cat/a X? ( cat/b ) )");
        assert!(sanitise(&id, no_preference).unwrap().is_empty());
    }

    #[test]
    fn test_blocker_inside_any_is_internal_error() {
        let id = id_with(DependencyKey::RunDependencies, "|| ( cat/a !cat/b )");
        let err = sanitise(&id, no_preference).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_dependencies_key_overrides_split_keys() {
        let id = Arc::new(
            PackageId::new("cat/app", "1", "repo")
                .unwrap()
                .with_dependencies(DependencyKey::BuildDependencies, "cat/ignored")
                .unwrap()
                .with_dependencies(DependencyKey::Dependencies, "cat/used")
                .unwrap(),
        );
        assert_eq!(specs(&sanitise(&id, no_preference).unwrap()), vec!["cat/used"]);

        let split = Arc::new(
            PackageId::new("cat/app", "1", "repo")
                .unwrap()
                .with_dependencies(DependencyKey::PostDependencies, "cat/later")
                .unwrap()
                .with_dependencies(DependencyKey::BuildDependencies, "cat/tool")
                .unwrap(),
        );
        let deps = sanitise(&split, no_preference).unwrap();
        assert_eq!(specs(&deps), vec!["cat/tool", "cat/later"]);
        assert_eq!(labels_to_string(&deps[1].active_labels), "post");
    }
}
