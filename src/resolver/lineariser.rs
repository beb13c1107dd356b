// src/resolver/lineariser.rs

//! Ordering decisions for execution
//!
//! Components of the ordering graph are emitted in dependency order,
//! preferring components the policy wants early. Cycles made only of
//! run-time edges are broken freely; other cycles are retried once
//! without edges that installed packages already satisfy, and are
//! reported as unorderable if that does not help.

use super::decision::Decision;
use super::functions::{ResolverContext, ResolverFunctions};
use super::nag::{EdgeProperties, Nag};
use super::resolution::ResolutionsByResolvent;
use super::resolvent::Resolvent;
use crate::error::{Error, Result};
use crate::tribool::Tribool;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// A scheduled decision, identified by its resolvent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedDecision {
    pub resolvent: Resolvent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Linearised output, by resolution index
#[derive(Debug, Clone, Default)]
pub struct Linearised {
    pub ordered: Vec<(usize, Vec<String>)>,
    pub unorderable: Vec<(usize, Vec<String>)>,
}

impl Linearised {
    pub fn to_ordered_decisions(
        list: &[(usize, Vec<String>)],
        resolutions: &ResolutionsByResolvent,
    ) -> Result<Vec<OrderedDecision>> {
        list.iter()
            .map(|(i, notes)| {
                let resolution = resolutions
                    .by_index(*i)
                    .ok_or_else(|| Error::internal(format!("ordered unknown resolution {}", i)))?;
                Ok(OrderedDecision {
                    resolvent: resolution.resolvent.clone(),
                    notes: notes.clone(),
                })
            })
            .collect()
    }
}

struct Lineariser<'a> {
    ctx: ResolverContext<'a>,
    fns: &'a dyn ResolverFunctions,
    nag: &'a Nag,
    out: Linearised,
}

pub fn linearise(ctx: ResolverContext<'_>, fns: &dyn ResolverFunctions, nag: &Nag) -> Result<Linearised> {
    let mut lineariser = Lineariser {
        ctx,
        fns,
        nag,
        out: Linearised::default(),
    };
    let all: BTreeSet<usize> = nag.nodes().collect();
    lineariser.order(&all, &|_| true, true)?;
    debug!(
        "Ordered {} decisions, {} unorderable",
        lineariser.out.ordered.len(),
        lineariser.out.unorderable.len()
    );
    Ok(lineariser.out)
}

impl Lineariser<'_> {
    fn has_job(&self, i: usize) -> bool {
        self.ctx
            .resolutions
            .by_index(i)
            .and_then(|r| r.decision.as_ref())
            .is_some_and(Decision::is_change_or_remove)
    }

    /// 0 for early, 1 for no opinion, 2 for late
    fn rank(&self, component: &[usize]) -> u8 {
        component
            .iter()
            .filter(|i| self.has_job(**i))
            .filter_map(|i| self.ctx.resolutions.by_index(*i))
            .map(|r| match self.fns.order_early(&self.ctx, r) {
                Tribool::True => 0,
                Tribool::Indeterminate => 1,
                Tribool::False => 2,
            })
            .min()
            .unwrap_or(1)
    }

    fn emit(&mut self, i: usize, note: Option<&str>) {
        if self.has_job(i) {
            self.out
                .ordered
                .push((i, note.map(str::to_string).into_iter().collect()));
        }
    }

    fn order(
        &mut self,
        nodes: &BTreeSet<usize>,
        keep: &dyn Fn(&EdgeProperties) -> bool,
        may_drop_met: bool,
    ) -> Result<()> {
        let components = self.nag.strongly_connected_components(nodes, keep);
        let mut component_of: BTreeMap<usize, usize> = BTreeMap::new();
        for (c, members) in components.iter().enumerate() {
            for &member in members {
                component_of.insert(member, c);
            }
        }

        // needs[c]: components c must wait for; waiting[c]: components waiting on c
        let mut needs: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
        let mut waiting: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
        for (c, members) in components.iter().enumerate() {
            for &member in members {
                for (to, properties) in self.nag.edges_from(member) {
                    if !keep(properties) {
                        continue;
                    }
                    let Some(&d) = component_of.get(&to) else {
                        continue;
                    };
                    if d != c {
                        needs[c].insert(d);
                        waiting[d].insert(c);
                    }
                }
            }
        }

        let ranks: Vec<u8> = components.iter().map(|m| self.rank(m)).collect();
        let mut ready: BTreeSet<(u8, usize, usize)> = BTreeSet::new();
        for (c, members) in components.iter().enumerate() {
            if needs[c].is_empty() {
                ready.insert((ranks[c], members[0], c));
            }
        }

        let mut done = 0;
        while let Some(next) = ready.pop_first() {
            let c = next.2;
            self.emit_component(&components[c], keep, may_drop_met)?;
            done += 1;
            for &w in &waiting[c] {
                needs[w].remove(&c);
                if needs[w].is_empty() {
                    ready.insert((ranks[w], components[w][0], w));
                }
            }
        }

        if done != components.len() {
            return Err(Error::internal("component graph of the ordering graph is cyclic"));
        }
        Ok(())
    }

    fn emit_component(
        &mut self,
        members: &[usize],
        keep: &dyn Fn(&EdgeProperties) -> bool,
        may_drop_met: bool,
    ) -> Result<()> {
        if let [only] = members {
            self.emit(*only, None);
            return Ok(());
        }

        let with_jobs: BTreeSet<usize> = members.iter().copied().filter(|i| self.has_job(*i)).collect();
        if with_jobs.len() <= 1 {
            for &i in &with_jobs {
                self.emit(i, Some("in a dependency cycle with unchanged packages"));
            }
            return Ok(());
        }

        let run_only = with_jobs.iter().all(|&from| {
            self.nag
                .edges_from(from)
                .filter(|(to, p)| with_jobs.contains(to) && keep(p))
                .all(|(_, p)| p.is_run_only())
        });
        if run_only {
            for &i in &with_jobs {
                self.emit(i, Some("run dependency cycle broken arbitrarily"));
            }
            return Ok(());
        }

        if may_drop_met {
            debug!("Retrying a cycle of {} decisions without met dependencies", with_jobs.len());
            let before = self.out.ordered.len();
            self.order(&with_jobs, &|p| keep(p) && !p.all_met(), false)?;
            for entry in &mut self.out.ordered[before..] {
                entry.1.push("cycle broken by ignoring already met dependencies".to_string());
            }
            return Ok(());
        }

        warn!("Cannot order a cycle of {} decisions", with_jobs.len());
        for &i in &with_jobs {
            self.out
                .unorderable
                .push((i, vec!["unorderable dependency cycle".to_string()]));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::dependencies::LabelsClassifier;
    use crate::environment::PackageDatabase;
    use crate::package::PackageId;
    use crate::resolver::decision::{ChangeType, ChangesToMakeDecision};
    use crate::resolver::resolvent::DestinationType;
    use crate::resolver::standard::StandardFunctions;
    use std::sync::Arc;

    fn changing(names: &[&str]) -> ResolutionsByResolvent {
        let mut resolutions = ResolutionsByResolvent::new();
        for name in names {
            let id = Arc::new(PackageId::new(name, "1", "repo").unwrap());
            let resolvent = Resolvent::for_id(&id, DestinationType::InstallToSlash);
            let i = resolutions.insert_new(resolvent.clone());
            resolutions.by_index_mut(i).unwrap().decision =
                Some(Decision::ChangesToMake(ChangesToMakeDecision {
                    resolvent,
                    origin_id: id,
                    best: true,
                    change_type: ChangeType::New,
                    destination: None,
                    if_via_new_binary_in: None,
                    taken: true,
                    required_confirmations: Vec::new(),
                }));
        }
        resolutions
    }

    fn run(resolutions: &ResolutionsByResolvent, nag: &Nag) -> Linearised {
        let env = PackageDatabase::new();
        let classifier = LabelsClassifier::new();
        let fns = StandardFunctions::from_config(&ResolverConfig::default()).unwrap();
        let ctx = ResolverContext {
            env: &env,
            classifier: &classifier,
            resolutions,
        };
        linearise(ctx, &fns, nag).unwrap()
    }

    fn order_of(out: &Linearised) -> Vec<usize> {
        out.ordered.iter().map(|(i, _)| *i).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let resolutions = changing(&["cat/app", "cat/lib", "cat/base"]);
        let mut nag = Nag::new();
        (0..3).for_each(|n| nag.add_node(n));
        let build = EdgeProperties::dependency(true, false, false, false);
        nag.add_edge(0, 1, build);
        nag.add_edge(1, 2, build);

        let out = run(&resolutions, &nag);
        assert_eq!(order_of(&out), vec![2, 1, 0]);
        assert!(out.unorderable.is_empty());
    }

    #[test]
    fn test_run_cycle_is_broken() {
        let resolutions = changing(&["cat/a", "cat/b"]);
        let mut nag = Nag::new();
        (0..2).for_each(|n| nag.add_node(n));
        let run_dep = EdgeProperties::dependency(false, true, false, false);
        nag.add_edge(0, 1, run_dep);
        nag.add_edge(1, 0, run_dep);

        let out = run(&resolutions, &nag);
        assert_eq!(order_of(&out), vec![0, 1]);
        assert!(out.ordered[0].1[0].contains("run dependency cycle"));
    }

    #[test]
    fn test_met_build_cycle_is_retried() {
        let resolutions = changing(&["cat/a", "cat/b"]);
        let mut nag = Nag::new();
        (0..2).for_each(|n| nag.add_node(n));
        nag.add_edge(0, 1, EdgeProperties::dependency(true, false, false, false));
        nag.add_edge(1, 0, EdgeProperties::dependency(true, false, false, true));

        let out = run(&resolutions, &nag);
        assert_eq!(order_of(&out), vec![1, 0]);
        assert!(out.unorderable.is_empty());
    }

    #[test]
    fn test_unmet_build_cycle_is_unorderable() {
        let resolutions = changing(&["cat/a", "cat/b"]);
        let mut nag = Nag::new();
        (0..2).for_each(|n| nag.add_node(n));
        let build = EdgeProperties::dependency(true, false, false, false);
        nag.add_edge(0, 1, build);
        nag.add_edge(1, 0, build);

        let out = run(&resolutions, &nag);
        assert!(out.ordered.is_empty());
        assert_eq!(out.unorderable.len(), 2);
    }
}
