// src/resolver/job.rs

//! Jobs derived from ordered decisions
//!
//! Each taken change becomes a fetch job followed by an install job, and
//! each taken removal becomes an uninstall job. Requirements between jobs
//! come from the ordering graph and always point at earlier jobs.

use super::decision::{ChangeType, Decision};
use super::nag::{EdgeProperties, Nag};
use super::resolution::ResolutionsByResolvent;
use super::resolvent::Resolvent;
use crate::error::{Error, Result};
use crate::name::RepositoryName;
use crate::package::PackageId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;
use tracing::debug;

/// When a requirement on an earlier job applies
///
/// `satisfied`: the earlier job must have succeeded. `independent`: the
/// earlier job must have been attempted. `always`: the requirement holds
/// even when failures are otherwise being ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredIf {
    #[serde(default)]
    pub satisfied: bool,
    #[serde(default)]
    pub independent: bool,
    #[serde(default)]
    pub always: bool,
}

impl RequiredIf {
    pub const NONE: Self = Self {
        satisfied: false,
        independent: false,
        always: false,
    };
    pub const SATISFIED: Self = Self {
        satisfied: true,
        ..Self::NONE
    };
    pub const INDEPENDENT: Self = Self {
        independent: true,
        ..Self::NONE
    };
    pub const ALWAYS: Self = Self {
        always: true,
        ..Self::NONE
    };
    pub const ALL: Self = Self {
        satisfied: true,
        independent: true,
        always: true,
    };

    pub fn is_empty(&self) -> bool {
        !(self.satisfied || self.independent || self.always)
    }

    pub fn contains(&self, other: RequiredIf) -> bool {
        (!other.satisfied || self.satisfied)
            && (!other.independent || self.independent)
            && (!other.always || self.always)
    }

    pub fn intersects(&self, other: RequiredIf) -> bool {
        (self.satisfied && other.satisfied)
            || (self.independent && other.independent)
            || (self.always && other.always)
    }
}

impl BitOr for RequiredIf {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            satisfied: self.satisfied || rhs.satisfied,
            independent: self.independent || rhs.independent,
            always: self.always || rhs.always,
        }
    }
}

impl BitOrAssign for RequiredIf {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// A dependency of one job on an earlier one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequirement {
    pub job: usize,
    pub required_if: RequiredIf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Job {
    Fetch {
        resolvent: Resolvent,
        origin_id: Arc<PackageId>,
    },
    Install {
        resolvent: Resolvent,
        origin_id: Arc<PackageId>,
        destination: RepositoryName,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        replacing: Vec<Arc<PackageId>>,
        change_type: ChangeType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        via_binary: Option<RepositoryName>,
    },
    Uninstall {
        resolvent: Resolvent,
        ids: Vec<Arc<PackageId>>,
    },
}

impl Job {
    pub fn resolvent(&self) -> &Resolvent {
        match self {
            Job::Fetch { resolvent, .. }
            | Job::Install { resolvent, .. }
            | Job::Uninstall { resolvent, .. } => resolvent,
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Job::Fetch { .. })
    }

    pub fn is_install(&self) -> bool {
        matches!(self, Job::Install { .. })
    }

    pub fn is_uninstall(&self) -> bool {
        matches!(self, Job::Uninstall { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEntry {
    pub job: Job,
    #[serde(default)]
    pub requirements: Vec<JobRequirement>,
}

impl JobEntry {
    fn require(&mut self, job: usize, required_if: RequiredIf) {
        if required_if.is_empty() {
            return;
        }
        match self.requirements.iter_mut().find(|r| r.job == job) {
            Some(existing) => existing.required_if |= required_if,
            None => self.requirements.push(JobRequirement { job, required_if }),
        }
    }
}

/// Jobs in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobList(Vec<JobEntry>);

impl JobList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, job: usize) -> Option<&JobEntry> {
        self.0.get(job)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JobEntry> {
        self.0.iter()
    }

    /// The install or uninstall job for `resolvent`
    pub fn main_job_for(&self, resolvent: &Resolvent) -> Option<usize> {
        self.0
            .iter()
            .position(|e| !e.job.is_fetch() && e.job.resolvent() == resolvent)
    }

    pub fn fetch_job_for(&self, resolvent: &Resolvent) -> Option<usize> {
        self.0
            .iter()
            .position(|e| e.job.is_fetch() && e.job.resolvent() == resolvent)
    }

    fn push(&mut self, job: Job) -> usize {
        self.0.push(JobEntry {
            job,
            requirements: Vec::new(),
        });
        self.0.len() - 1
    }

    /// Build jobs for `ordered` resolution indices, which must already be
    /// in dependency order
    pub fn build(resolutions: &ResolutionsByResolvent, nag: &Nag, ordered: &[usize]) -> Result<Self> {
        let mut list = JobList::new();
        // resolution index -> (fetch job, main job)
        let mut jobs_of: HashMap<usize, (Option<usize>, usize)> = HashMap::new();

        for &i in ordered {
            let resolution = resolutions
                .by_index(i)
                .ok_or_else(|| Error::internal(format!("no resolution {} for job", i)))?;

            match resolution.decision {
                Some(Decision::ChangesToMake(ref d)) => {
                    let destination = d.destination.as_ref().ok_or_else(|| {
                        Error::internal(format!("change for {} has no destination", d.resolvent))
                    })?;
                    let fetch = list.push(Job::Fetch {
                        resolvent: d.resolvent.clone(),
                        origin_id: Arc::clone(&d.origin_id),
                    });
                    let install = list.push(Job::Install {
                        resolvent: d.resolvent.clone(),
                        origin_id: Arc::clone(&d.origin_id),
                        destination: destination.repository.clone(),
                        replacing: destination.replacing.clone(),
                        change_type: d.change_type,
                        via_binary: d.if_via_new_binary_in.clone(),
                    });
                    list.0[install].require(fetch, RequiredIf::ALL);
                    jobs_of.insert(i, (Some(fetch), install));
                }
                Some(Decision::Remove(ref d)) => {
                    let uninstall = list.push(Job::Uninstall {
                        resolvent: d.resolvent.clone(),
                        ids: d.ids.clone(),
                    });
                    jobs_of.insert(i, (None, uninstall));
                }
                _ => {
                    return Err(Error::internal(format!(
                        "ordered decision for {} is not a change or removal",
                        resolution.resolvent
                    )));
                }
            }
        }

        for &i in ordered {
            let Some(&(fetch, main)) = jobs_of.get(&i) else {
                continue;
            };
            for (to, properties) in nag.edges_from(i) {
                match jobs_of.get(&to) {
                    Some(&(_, required)) => {
                        list.add_direct(main, fetch, required, properties);
                    }
                    None => {
                        for required in transitive_jobs(nag, &jobs_of, to) {
                            if required < main {
                                list.0[main].require(required, RequiredIf::INDEPENDENT);
                            }
                        }
                    }
                }
            }
        }

        debug!("Built {} jobs from {} ordered decisions", list.len(), ordered.len());
        Ok(list)
    }

    fn add_direct(
        &mut self,
        main: usize,
        fetch: Option<usize>,
        required: usize,
        p: &EdgeProperties,
    ) {
        let mut on_main = RequiredIf::NONE;
        let unmet = (p.build && !p.build_all_met) || (p.run && !p.run_all_met);
        if p.build || p.run {
            on_main |= RequiredIf::INDEPENDENT;
            if unmet {
                on_main |= RequiredIf::SATISFIED;
            }
        }
        if p.strong_block || p.via_binary {
            on_main |= RequiredIf::ALL;
        }
        if p.weak_block {
            on_main |= RequiredIf::INDEPENDENT | RequiredIf::ALWAYS;
        }
        if p.removal {
            on_main |= RequiredIf::SATISFIED | RequiredIf::INDEPENDENT;
        }
        if required < main {
            self.0[main].require(required, on_main);
        }

        if p.fetch
            && let Some(fetch) = fetch
            && required < fetch
        {
            let mut on_fetch = RequiredIf::INDEPENDENT;
            if !p.fetch_all_met {
                on_fetch |= RequiredIf::SATISFIED;
            }
            self.0[fetch].require(required, on_fetch);
        }
    }
}

/// Jobs reachable from `start` through nodes that have no jobs themselves
fn transitive_jobs(
    nag: &Nag,
    jobs_of: &HashMap<usize, (Option<usize>, usize)>,
    start: usize,
) -> BTreeSet<usize> {
    let mut found = BTreeSet::new();
    let mut seen = BTreeSet::new();
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        for (to, _) in nag.edges_from(node) {
            match jobs_of.get(&to) {
                Some(&(_, job)) => {
                    found.insert(job);
                }
                None => stack.push(to),
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::decision::{ChangesToMakeDecision, Destination, ExistingNoChangeDecision, RemoveDecision};
    use crate::resolver::resolvent::DestinationType;

    fn id(name: &str) -> Arc<PackageId> {
        Arc::new(PackageId::new(name, "1", "repo").unwrap())
    }

    fn change(resolutions: &mut ResolutionsByResolvent, name: &str) -> usize {
        let origin_id = id(name);
        let resolvent = Resolvent::for_id(&origin_id, DestinationType::InstallToSlash);
        let i = resolutions.insert_new(resolvent.clone());
        resolutions.by_index_mut(i).unwrap().decision = Some(Decision::ChangesToMake(ChangesToMakeDecision {
            resolvent,
            origin_id,
            best: true,
            change_type: ChangeType::New,
            destination: Some(Destination {
                repository: RepositoryName::new("installed"),
                replacing: Vec::new(),
            }),
            if_via_new_binary_in: None,
            taken: true,
            required_confirmations: Vec::new(),
        }));
        i
    }

    fn existing(resolutions: &mut ResolutionsByResolvent, name: &str) -> usize {
        let existing_id = id(name);
        let resolvent = Resolvent::for_id(&existing_id, DestinationType::InstallToSlash);
        let i = resolutions.insert_new(resolvent.clone());
        resolutions.by_index_mut(i).unwrap().decision = Some(Decision::ExistingNoChange(ExistingNoChangeDecision {
            resolvent,
            existing_id,
            is_same: true,
            is_same_version: true,
            is_transient: false,
            taken: true,
            required_confirmations: Vec::new(),
        }));
        i
    }

    fn remove(resolutions: &mut ResolutionsByResolvent, name: &str) -> usize {
        let old = id(name);
        let resolvent = Resolvent::for_id(&old, DestinationType::InstallToSlash);
        let i = resolutions.insert_new(resolvent.clone());
        resolutions.by_index_mut(i).unwrap().decision = Some(Decision::Remove(RemoveDecision {
            resolvent,
            ids: vec![old],
            taken: true,
            required_confirmations: Vec::new(),
        }));
        i
    }

    fn requirement(list: &JobList, job: usize, on: usize) -> Option<RequiredIf> {
        list.get(job)?
            .requirements
            .iter()
            .find(|r| r.job == on)
            .map(|r| r.required_if)
    }

    #[test]
    fn test_required_if_ops() {
        let both = RequiredIf::SATISFIED | RequiredIf::INDEPENDENT;
        assert!(both.contains(RequiredIf::SATISFIED));
        assert!(!both.contains(RequiredIf::ALWAYS));
        assert!(both.intersects(RequiredIf::INDEPENDENT));
        assert!(RequiredIf::NONE.is_empty());
        assert_eq!(both | RequiredIf::ALWAYS, RequiredIf::ALL);
    }

    #[test]
    fn test_install_requires_fetch_and_unmet_dependency() {
        let mut resolutions = ResolutionsByResolvent::new();
        let app = change(&mut resolutions, "cat/app");
        let lib = change(&mut resolutions, "cat/lib");
        let mut nag = Nag::new();
        nag.add_node(app);
        nag.add_node(lib);
        nag.add_edge(app, lib, EdgeProperties::dependency(true, true, false, false));

        let list = JobList::build(&resolutions, &nag, &[lib, app]).unwrap();
        assert_eq!(list.len(), 4);
        assert!(list.get(0).unwrap().job.is_fetch());
        assert_eq!(requirement(&list, 1, 0), Some(RequiredIf::ALL));
        assert_eq!(
            requirement(&list, 3, 1),
            Some(RequiredIf::SATISFIED | RequiredIf::INDEPENDENT)
        );
        assert_eq!(requirement(&list, 2, 1), None);
    }

    #[test]
    fn test_met_dependency_is_independent_only() {
        let mut resolutions = ResolutionsByResolvent::new();
        let app = change(&mut resolutions, "cat/app");
        let lib = change(&mut resolutions, "cat/lib");
        let mut nag = Nag::new();
        nag.add_node(app);
        nag.add_node(lib);
        nag.add_edge(app, lib, EdgeProperties::dependency(true, false, true, true));

        let list = JobList::build(&resolutions, &nag, &[lib, app]).unwrap();
        assert_eq!(requirement(&list, 3, 1), Some(RequiredIf::INDEPENDENT));
        assert_eq!(requirement(&list, 2, 1), Some(RequiredIf::INDEPENDENT));
    }

    #[test]
    fn test_transitive_through_unchanged() {
        let mut resolutions = ResolutionsByResolvent::new();
        let app = change(&mut resolutions, "cat/app");
        let mid = existing(&mut resolutions, "cat/mid");
        let base = change(&mut resolutions, "cat/base");
        let mut nag = Nag::new();
        for n in [app, mid, base] {
            nag.add_node(n);
        }
        let build = EdgeProperties::dependency(true, false, false, false);
        nag.add_edge(app, mid, build);
        nag.add_edge(mid, base, build);

        let list = JobList::build(&resolutions, &nag, &[base, app]).unwrap();
        assert_eq!(requirement(&list, 3, 1), Some(RequiredIf::INDEPENDENT));
    }

    #[test]
    fn test_removal_after_user() {
        let mut resolutions = ResolutionsByResolvent::new();
        let target = change(&mut resolutions, "cat/target");
        let going = remove(&mut resolutions, "cat/going");
        let mut nag = Nag::new();
        nag.add_node(target);
        nag.add_node(going);
        nag.add_edge(going, target, EdgeProperties::removal());

        let list = JobList::build(&resolutions, &nag, &[target, going]).unwrap();
        assert!(list.get(2).unwrap().job.is_uninstall());
        assert_eq!(
            requirement(&list, 2, 1),
            Some(RequiredIf::SATISFIED | RequiredIf::INDEPENDENT)
        );
        assert_eq!(list.main_job_for(&resolutions.by_index(going).unwrap().resolvent), Some(2));
    }

    #[test]
    fn test_later_jobs_are_never_required() {
        let mut resolutions = ResolutionsByResolvent::new();
        let a = change(&mut resolutions, "cat/a");
        let b = change(&mut resolutions, "cat/b");
        let mut nag = Nag::new();
        nag.add_node(a);
        nag.add_node(b);
        let run = EdgeProperties::dependency(false, true, false, false);
        nag.add_edge(a, b, run);
        nag.add_edge(b, a, run);

        let list = JobList::build(&resolutions, &nag, &[a, b]).unwrap();
        assert_eq!(requirement(&list, 1, 3), None);
        assert!(requirement(&list, 3, 1).is_some());
    }
}
