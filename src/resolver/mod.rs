// src/resolver/mod.rs

//! Dependency resolution
//!
//! Targets are turned into constraints on resolvents (a package name, a
//! slot and where it is going). Each resolvent gets one decision: keep what
//! is installed, install something, remove, break, do nothing, or report
//! that nothing fits. Decided changes are then ordered and turned into a
//! list of jobs with requirements between them.
//!
//! Policy lives behind [`ResolverFunctions`]; [`StandardFunctions`]
//! implements it from a [`ResolverConfig`](crate::config::ResolverConfig).

mod constraint;
mod decider;
mod decision;
mod depped_upon;
mod engine;
mod functions;
mod helpers;
mod job;
mod job_state;
mod lineariser;
mod nag;
mod plan;
mod reason;
mod resolution;
mod resolvent;
mod standard;
mod target;

pub use constraint::{Constraint, Constraints, UseExisting};
pub use decider::{Decider, Exploration, SuggestRestart};
pub use decision::{
    BreakDecision, ChangeType, ChangesToMakeDecision, Decision, DecisionKind, Destination,
    ExistingNoChangeDecision, NothingNoChangeDecision, RemoveDecision, RequiredConfirmation,
    UnableToMakeDecision, UnsuitableCandidate,
};
pub use depped_upon::{accumulate_depped_upon, dependent_upon, depped_upon_by};
pub use engine::Resolver;
pub use functions::{ResolverContext, ResolverFunctions, SpecInterest};
pub use job::{Job, JobEntry, JobList, JobRequirement, RequiredIf};
pub use job_state::{ContinueOnFailure, JobSchedule, JobState};
pub use lineariser::{Linearised, OrderedDecision, linearise};
pub use nag::{EdgeProperties, Nag};
pub use plan::Resolved;
pub use reason::{ChangeByResolvent, Reason};
pub use resolution::{Resolution, ResolutionsByResolvent};
pub use resolvent::{DestinationType, Resolvent, ResolventSlot};
pub use standard::StandardFunctions;
pub use target::Target;
