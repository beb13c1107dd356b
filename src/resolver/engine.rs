// src/resolver/engine.rs

//! Resolver driver
//!
//! Runs the decision engine over a set of targets, retrying from scratch
//! with extra preset constraints whenever the engine asks for a restart,
//! then orders the result and builds the job list.

use super::constraint::Constraints;
use super::decider::{Decider, Exploration};
use super::functions::{ResolverContext, ResolverFunctions};
use super::job::JobList;
use super::lineariser::linearise;
use super::nag::Nag;
use super::plan::Resolved;
use super::resolution::ResolutionsByResolvent;
use super::resolvent::Resolvent;
use super::standard::StandardFunctions;
use super::target::Target;
use crate::config::{DEFAULT_MAX_RESTARTS, ResolverConfig};
use crate::dependencies::LabelsClassifier;
use crate::environment::Environment;
use crate::error::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, info};

/// Resolves targets against an environment under a policy
pub struct Resolver<'a> {
    env: &'a dyn Environment,
    functions: Box<dyn ResolverFunctions + 'a>,
    classifier: LabelsClassifier,
    max_restarts: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(env: &'a dyn Environment, functions: Box<dyn ResolverFunctions + 'a>) -> Self {
        Self {
            env,
            functions,
            classifier: LabelsClassifier::new(),
            max_restarts: DEFAULT_MAX_RESTARTS,
        }
    }

    /// Create a resolver using the standard policy for `config`
    pub fn from_config(env: &'a dyn Environment, config: &ResolverConfig) -> Result<Self> {
        let functions = StandardFunctions::from_config(config)?;
        Ok(Self::new(env, Box::new(functions)).with_max_restarts(config.engine.max_restarts))
    }

    pub fn with_max_restarts(mut self, max_restarts: usize) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    /// Parse and resolve command-line style targets
    pub fn resolve<S: AsRef<str>>(&self, targets: &[S]) -> Result<Resolved> {
        let targets = Target::parse_all(self.env, targets)?;
        self.resolve_targets(&targets)
    }

    pub fn resolve_targets(&self, targets: &[Target]) -> Result<Resolved> {
        info!("Resolving {} targets", targets.len());
        let mut presets: HashMap<Resolvent, Constraints> = HashMap::new();
        let mut restarts = 0;

        loop {
            let restart = {
                let mut decider =
                    Decider::new(self.env, self.functions.as_ref(), &self.classifier, &presets);
                match self.attempt(&mut decider, targets)? {
                    Exploration::Continue => {
                        return self.finish(decider.into_resolutions(), restarts);
                    }
                    Exploration::Restart(restart) => restart,
                }
            };

            restarts += 1;
            let preset = presets
                .entry(restart.resolvent.clone())
                .or_insert_with(Constraints::new);
            if restarts > self.max_restarts || preset.contains(&restart.suggested_preset) {
                return Err(Error::TooManyRestarts {
                    restarts,
                    resolvent: restart.resolvent.to_string(),
                });
            }
            info!(
                "Restart {} for {}: {} would become {}",
                restarts,
                restart.resolvent,
                restart.previous_decision.kind(),
                restart.new_decision.kind()
            );
            preset.add(restart.suggested_preset);
        }
    }

    fn attempt(&self, decider: &mut Decider<'_>, targets: &[Target]) -> Result<Exploration> {
        for target in targets {
            if let Exploration::Restart(restart) =
                decider.add_target(&target.spec, target.reason.clone())?
            {
                return Ok(Exploration::Restart(restart));
            }
        }
        decider.resolve()
    }

    fn finish(&self, resolutions: ResolutionsByResolvent, restarts: usize) -> Result<Resolved> {
        let ctx = ResolverContext {
            env: self.env,
            classifier: &self.classifier,
            resolutions: &resolutions,
        };
        let nag = Nag::build(&resolutions, &self.classifier)?;
        let linearised = linearise(ctx, self.functions.as_ref(), &nag)?;
        let ordered: Vec<usize> = linearised.ordered.iter().map(|(i, _)| *i).collect();
        let job_list = JobList::build(&resolutions, &nag, &ordered)?;
        debug!(
            "{} resolutions, {} jobs after {} restarts",
            resolutions.len(),
            job_list.len(),
            restarts
        );
        Resolved::new(resolutions, &linearised, job_list, restarts)
    }
}
