// src/dependencies/classifier.rs

//! Classification of a dependency's active labels into facets
//!
//! Every label kind contributes a fixed set of facets, but only when the
//! label is enabled for the package carrying it. Classifications are plain
//! values; the classifier keeps a pool so identical facet sets share one
//! allocation for the lifetime of a resolver run.

use super::labels::{DependencyLabel, LabelKind};
use super::sanitised::SanitisedDependency;
use crate::error::{Error, Result};
use crate::package::PackageId;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Boolean facets derived from a set of active labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelsClassification {
    pub any_enabled: bool,
    pub includes_buildish: bool,
    pub includes_non_test_buildish: bool,
    pub includes_fetch: bool,
    pub includes_non_post_runish: bool,
    pub includes_postish: bool,
    pub includes_compile_against: bool,
    pub is_requirement: bool,
    pub is_recommendation: bool,
    pub is_suggestion: bool,
}

impl LabelsClassification {
    /// Fold a label list into facets for one package
    pub fn classify(labels: &[DependencyLabel], id: &PackageId) -> Self {
        let mut c = Self::default();
        for label in labels.iter().filter(|l| l.enabled(id)) {
            c.any_enabled = true;
            match label.kind {
                LabelKind::Build => {
                    c.includes_buildish = true;
                    c.includes_non_test_buildish = true;
                    c.is_requirement = true;
                }
                LabelKind::Run => {
                    c.includes_non_post_runish = true;
                    c.is_requirement = true;
                }
                LabelKind::Post => {
                    c.includes_postish = true;
                    c.is_requirement = true;
                }
                LabelKind::Test => {
                    c.includes_buildish = true;
                    c.is_requirement = true;
                }
                LabelKind::Fetch => {
                    c.includes_buildish = true;
                    c.includes_non_test_buildish = true;
                    c.includes_fetch = true;
                    c.is_requirement = true;
                }
                LabelKind::CompileAgainst => {
                    c.includes_buildish = true;
                    c.includes_non_test_buildish = true;
                    c.includes_non_post_runish = true;
                    c.includes_compile_against = true;
                    c.is_requirement = true;
                }
                LabelKind::Recommendation => c.is_recommendation = true,
                LabelKind::Suggestion => c.is_suggestion = true,
            }
        }
        c
    }
}

/// Pool of interned classifications, owned by one resolver run
#[derive(Debug, Default)]
pub struct LabelsClassifier {
    pool: RefCell<HashMap<LabelsClassification, Rc<LabelsClassification>>>,
}

impl LabelsClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a label set, or `None` if it is empty
    pub fn classify(
        &self,
        labels: &[DependencyLabel],
        id: &PackageId,
    ) -> Option<Rc<LabelsClassification>> {
        if labels.is_empty() {
            return None;
        }
        let value = LabelsClassification::classify(labels, id);
        let mut pool = self.pool.borrow_mut();
        Some(Rc::clone(
            pool.entry(value).or_insert_with(|| Rc::new(value)),
        ))
    }

    /// Number of distinct classifications seen so far
    pub fn len(&self) -> usize {
        self.pool.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.borrow().is_empty()
    }

    fn classify_dep(&self, dep: &SanitisedDependency) -> Option<Rc<LabelsClassification>> {
        self.classify(&dep.active_labels, &dep.from_id)
    }

    fn require(&self, dep: &SanitisedDependency) -> Result<Rc<LabelsClassification>> {
        self.classify_dep(dep).ok_or_else(|| {
            Error::internal(format!(
                "dependency '{}' of {} has no active labels",
                dep.spec, dep.from_id
            ))
        })
    }

    /// Suggested, and neither recommended nor required
    pub fn is_suggestion(&self, dep: &SanitisedDependency) -> bool {
        self.classify_dep(dep)
            .is_some_and(|c| c.is_suggestion && !c.is_recommendation && !c.is_requirement)
    }

    /// Recommended, and not required
    pub fn is_recommendation(&self, dep: &SanitisedDependency) -> bool {
        self.classify_dep(dep)
            .is_some_and(|c| c.is_recommendation && !c.is_requirement)
    }

    /// Neither a suggestion nor a recommendation
    pub fn is_hard_requirement(&self, dep: &SanitisedDependency) -> bool {
        !self.is_suggestion(dep) && !self.is_recommendation(dep)
    }

    pub fn is_just_build_dep(&self, dep: &SanitisedDependency) -> Result<bool> {
        let c = self.require(dep)?;
        Ok(c.includes_buildish && !c.includes_non_post_runish && !c.includes_postish)
    }

    pub fn is_compiled_against_dep(&self, dep: &SanitisedDependency) -> Result<bool> {
        Ok(self.require(dep)?.includes_compile_against)
    }

    pub fn is_enabled_dep(&self, dep: &SanitisedDependency) -> Result<bool> {
        Ok(self.require(dep)?.any_enabled)
    }

    pub fn is_run_or_post_dep(&self, dep: &SanitisedDependency) -> Result<bool> {
        let c = self.require(dep)?;
        Ok(c.includes_non_post_runish || c.includes_postish)
    }

    /// The full classification, failing on an empty label set
    pub fn classification(&self, dep: &SanitisedDependency) -> Result<Rc<LabelsClassification>> {
        self.require(dep)
    }
}
