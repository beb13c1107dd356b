// src/resolver/job_state.rs

//! Execution bookkeeping for a job list
//!
//! The schedule never runs anything itself. An executor asks for ready
//! jobs, reports outcomes, and the schedule skips whatever can no longer
//! run under the chosen [`ContinueOnFailure`] mode.

use super::job::{JobList, RequiredIf};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, info, warn};

/// Job state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl JobState {
    /// Finished, whether or not it worked
    pub fn is_attempted(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    pub fn is_unsuccessful(&self) -> bool {
        matches!(self, Self::Failed | Self::Skipped)
    }
}

/// What to keep doing once a job has failed
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ContinueOnFailure {
    /// Stop scheduling anything after the first failure
    Never,
    /// Skip jobs that need a failed job to have succeeded
    #[default]
    IfSatisfied,
    /// Skip jobs that need a failed job at all
    IfIndependent,
    /// Only skip jobs that always need the failed job
    Always,
}

impl ContinueOnFailure {
    /// Requirement tags that cancel a job whose prerequisite did not succeed
    fn cancelling(self) -> RequiredIf {
        match self {
            Self::Never => RequiredIf::ALL,
            Self::IfSatisfied => RequiredIf::SATISFIED,
            Self::IfIndependent => RequiredIf::SATISFIED | RequiredIf::INDEPENDENT,
            Self::Always => RequiredIf::ALWAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSchedule {
    mode: ContinueOnFailure,
    states: Vec<JobState>,
    #[serde(default)]
    stopped: bool,
}

impl JobSchedule {
    pub fn new(jobs: &JobList, mode: ContinueOnFailure) -> Self {
        Self {
            mode,
            states: vec![JobState::Pending; jobs.len()],
            stopped: false,
        }
    }

    pub fn mode(&self) -> ContinueOnFailure {
        self.mode
    }

    pub fn state(&self, job: usize) -> Option<JobState> {
        self.states.get(job).copied()
    }

    pub fn states(&self) -> &[JobState] {
        &self.states
    }

    pub fn is_finished(&self) -> bool {
        self.states.iter().all(JobState::is_attempted)
    }

    pub fn count(&self, state: JobState) -> usize {
        self.states.iter().filter(|s| **s == state).count()
    }

    /// Pending jobs whose prerequisites have all been attempted, in job
    /// order, keeping at most `limit` jobs running at once
    pub fn ready(&self, jobs: &JobList, limit: usize) -> Vec<usize> {
        let running = self.count(JobState::Running);
        let room = limit.saturating_sub(running);
        if self.stopped || room == 0 {
            return Vec::new();
        }

        jobs.iter()
            .enumerate()
            .filter(|(n, _)| self.states.get(*n) == Some(&JobState::Pending))
            .filter(|(_, entry)| {
                entry.requirements.iter().all(|r| {
                    self.states
                        .get(r.job)
                        .is_some_and(JobState::is_attempted)
                })
            })
            .map(|(n, _)| n)
            .take(room)
            .collect()
    }

    pub fn start(&mut self, job: usize) -> Result<()> {
        self.transition(job, JobState::Pending, JobState::Running)
    }

    pub fn succeed(&mut self, job: usize) -> Result<()> {
        self.transition(job, JobState::Running, JobState::Succeeded)?;
        debug!("Job {} succeeded", job);
        Ok(())
    }

    /// Record a failure and skip every job it cancels
    pub fn fail(&mut self, jobs: &JobList, job: usize) -> Result<()> {
        self.transition(job, JobState::Running, JobState::Failed)?;
        warn!("Job {} failed", job);
        if self.mode == ContinueOnFailure::Never {
            self.stopped = true;
        }
        self.cascade(jobs);
        Ok(())
    }

    /// Skip a pending job without running it
    pub fn skip(&mut self, jobs: &JobList, job: usize) -> Result<()> {
        self.transition(job, JobState::Pending, JobState::Skipped)?;
        self.cascade(jobs);
        Ok(())
    }

    fn transition(&mut self, job: usize, from: JobState, to: JobState) -> Result<()> {
        let state = self
            .states
            .get_mut(job)
            .ok_or_else(|| Error::internal(format!("no job {}", job)))?;
        if *state != from {
            return Err(Error::internal(format!(
                "job {} is {}, cannot become {}",
                job, state, to
            )));
        }
        *state = to;
        Ok(())
    }

    /// Requirements point backwards, so one forward pass reaches a fixpoint
    fn cascade(&mut self, jobs: &JobList) {
        let cancelling = self.mode.cancelling();
        for (n, entry) in jobs.iter().enumerate() {
            if self.states.get(n) != Some(&JobState::Pending) {
                continue;
            }
            let cancelled = self.stopped
                || entry.requirements.iter().any(|r| {
                    r.required_if.intersects(cancelling)
                        && self
                            .states
                            .get(r.job)
                            .is_some_and(JobState::is_unsuccessful)
                });
            if cancelled {
                info!("Skipping job {} after an earlier failure", n);
                self.states[n] = JobState::Skipped;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageId;
    use crate::resolver::job::{Job, JobEntry, JobRequirement};
    use crate::resolver::resolvent::{DestinationType, Resolvent};
    use std::str::FromStr;
    use std::sync::Arc;

    fn uninstall(name: &str, requirements: Vec<(usize, RequiredIf)>) -> JobEntry {
        let id = Arc::new(PackageId::new(name, "1", "installed").unwrap());
        JobEntry {
            job: Job::Uninstall {
                resolvent: Resolvent::for_id(&id, DestinationType::InstallToSlash),
                ids: vec![id],
            },
            requirements: requirements
                .into_iter()
                .map(|(job, required_if)| JobRequirement { job, required_if })
                .collect(),
        }
    }

    /// 0 fails; 1 needs it satisfied; 2 needs it attempted; 3 is unrelated
    fn jobs() -> JobList {
        serde_json::from_value(serde_json::to_value(vec![
            uninstall("cat/a", vec![]),
            uninstall("cat/b", vec![(0, RequiredIf::SATISFIED | RequiredIf::INDEPENDENT)]),
            uninstall("cat/c", vec![(0, RequiredIf::INDEPENDENT)]),
            uninstall("cat/d", vec![]),
        ]).unwrap())
        .unwrap()
    }

    fn fail_first(mode: ContinueOnFailure) -> (JobList, JobSchedule) {
        let jobs = jobs();
        let mut schedule = JobSchedule::new(&jobs, mode);
        assert_eq!(schedule.ready(&jobs, 8), vec![0, 3]);
        schedule.start(0).unwrap();
        schedule.fail(&jobs, 0).unwrap();
        (jobs, schedule)
    }

    #[test]
    fn test_if_satisfied_skips_only_satisfied_requirements() {
        let (jobs, schedule) = fail_first(ContinueOnFailure::IfSatisfied);
        assert_eq!(schedule.state(1), Some(JobState::Skipped));
        assert_eq!(schedule.ready(&jobs, 8), vec![2, 3]);
    }

    #[test]
    fn test_if_independent_skips_independent_requirements() {
        let (jobs, schedule) = fail_first(ContinueOnFailure::IfIndependent);
        assert_eq!(schedule.state(1), Some(JobState::Skipped));
        assert_eq!(schedule.state(2), Some(JobState::Skipped));
        assert_eq!(schedule.ready(&jobs, 8), vec![3]);
    }

    #[test]
    fn test_never_stops_everything() {
        let (jobs, schedule) = fail_first(ContinueOnFailure::Never);
        assert!(schedule.ready(&jobs, 8).is_empty());
        assert!(schedule.is_finished());
        assert_eq!(schedule.count(JobState::Skipped), 3);
    }

    #[test]
    fn test_bounded_parallelism() {
        let jobs = jobs();
        let mut schedule = JobSchedule::new(&jobs, ContinueOnFailure::default());
        assert_eq!(schedule.ready(&jobs, 1), vec![0]);
        schedule.start(0).unwrap();
        assert!(schedule.ready(&jobs, 1).is_empty());
        schedule.succeed(0).unwrap();
        assert_eq!(schedule.ready(&jobs, 2), vec![1, 2]);
        assert!(schedule.succeed(1).is_err());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(
            ContinueOnFailure::from_str("if-independent").unwrap(),
            ContinueOnFailure::IfIndependent
        );
        assert_eq!(ContinueOnFailure::default().to_string(), "if-satisfied");
    }
}
