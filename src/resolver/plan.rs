// src/resolver/plan.rs

//! Resolution result types
//!
//! A finished run keeps every resolution, sorts decisions into the buckets
//! a front end reports on, and carries the job list for execution.

use super::decision::Decision;
use super::job::JobList;
use super::job_state::{ContinueOnFailure, JobSchedule};
use super::lineariser::{Linearised, OrderedDecision};
use super::resolution::ResolutionsByResolvent;
use super::resolvent::Resolvent;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Result of a resolver run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Resolved {
    pub resolutions: ResolutionsByResolvent,
    /// Changes and removals to carry out, in order
    pub taken_change_or_remove_decisions: Vec<OrderedDecision>,
    /// Taken changes caught in a cycle that could not be broken
    pub taken_unorderable_decisions: Vec<OrderedDecision>,
    /// Changes and removals that were worked out but not asked for
    pub untaken_change_or_remove_decisions: Vec<Resolvent>,
    pub taken_unable_to_make_decisions: Vec<Resolvent>,
    pub untaken_unable_to_make_decisions: Vec<Resolvent>,
    /// Taken decisions with a confirmation the policy refused
    pub taken_unconfirmed_decisions: Vec<Resolvent>,
    pub job_list: JobList,
    pub restarts: usize,
}

impl Resolved {
    pub(crate) fn new(
        resolutions: ResolutionsByResolvent,
        linearised: &Linearised,
        job_list: JobList,
        restarts: usize,
    ) -> Result<Self> {
        let taken_change_or_remove_decisions =
            Linearised::to_ordered_decisions(&linearised.ordered, &resolutions)?;
        let taken_unorderable_decisions =
            Linearised::to_ordered_decisions(&linearised.unorderable, &resolutions)?;

        let mut untaken_change_or_remove_decisions = Vec::new();
        let mut taken_unable_to_make_decisions = Vec::new();
        let mut untaken_unable_to_make_decisions = Vec::new();
        let mut taken_unconfirmed_decisions = Vec::new();

        for resolution in resolutions.iter() {
            let Some(ref decision) = resolution.decision else {
                continue;
            };
            let resolvent = resolution.resolvent.clone();
            let taken = decision.taken();

            match decision {
                Decision::UnableToMake(_) if taken => taken_unable_to_make_decisions.push(resolvent),
                Decision::UnableToMake(_) => untaken_unable_to_make_decisions.push(resolvent),
                d if d.is_change_or_remove() && !taken => {
                    untaken_change_or_remove_decisions.push(resolvent)
                }
                d if taken && !d.required_confirmations().is_empty() => {
                    taken_unconfirmed_decisions.push(resolvent)
                }
                _ => {}
            }
        }

        Ok(Self {
            resolutions,
            taken_change_or_remove_decisions,
            taken_unorderable_decisions,
            untaken_change_or_remove_decisions,
            taken_unable_to_make_decisions,
            untaken_unable_to_make_decisions,
            taken_unconfirmed_decisions,
            job_list,
            restarts,
        })
    }

    pub fn decision(&self, resolvent: &Resolvent) -> Option<&Decision> {
        self.resolutions.decision(resolvent)
    }

    /// Decisions for every resolvent of a package name
    pub fn decisions_for(&self, name: &str) -> Vec<&Decision> {
        self.resolutions
            .iter()
            .filter(|r| r.resolvent.package.as_str() == name)
            .filter_map(|r| r.decision.as_ref())
            .collect()
    }

    /// Nothing needs the user's attention before the jobs can run
    pub fn is_successful(&self) -> bool {
        self.taken_unable_to_make_decisions.is_empty()
            && self.taken_unconfirmed_decisions.is_empty()
            && self.taken_unorderable_decisions.is_empty()
    }

    /// A fresh schedule for executing the job list
    pub fn schedule(&self, mode: ContinueOnFailure) -> JobSchedule {
        JobSchedule::new(&self.job_list, mode)
    }
}
