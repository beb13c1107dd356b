// src/resolver/nag.rs

//! The ordering graph over decisions
//!
//! Nodes are resolutions whose taken decision keeps, installs or removes
//! something. An edge `a -> b` means `a` wants `b` dealt with first; the
//! properties say why, and whether the need is already met by what is
//! installed (in which case the edge can be dropped to break a cycle).

use super::decision::Decision;
use super::reason::Reason;
use super::resolution::ResolutionsByResolvent;
use crate::dependencies::LabelsClassifier;
use crate::error::Result;
use crate::spec::{BlockStrength, DepSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Why one node should come before another
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeProperties {
    pub build: bool,
    pub build_all_met: bool,
    pub run: bool,
    pub run_all_met: bool,
    pub fetch: bool,
    pub fetch_all_met: bool,
    pub removal: bool,
    pub strong_block: bool,
    pub weak_block: bool,
    pub via_binary: bool,
}

fn merge_met(has: &mut bool, all_met: &mut bool, other_has: bool, other_met: bool) {
    if other_has {
        *all_met = if *has { *all_met && other_met } else { other_met };
        *has = true;
    }
}

impl EdgeProperties {
    pub fn dependency(build: bool, run: bool, fetch: bool, already_met: bool) -> Self {
        Self {
            build,
            build_all_met: build && already_met,
            run,
            run_all_met: run && already_met,
            fetch,
            fetch_all_met: fetch && already_met,
            ..Self::default()
        }
    }

    pub fn removal() -> Self {
        Self {
            removal: true,
            ..Self::default()
        }
    }

    pub fn block(strength: BlockStrength) -> Self {
        Self {
            strong_block: strength == BlockStrength::Strong,
            weak_block: strength == BlockStrength::Weak,
            ..Self::default()
        }
    }

    pub fn via_binary() -> Self {
        Self {
            via_binary: true,
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: EdgeProperties) {
        merge_met(&mut self.build, &mut self.build_all_met, other.build, other.build_all_met);
        merge_met(&mut self.run, &mut self.run_all_met, other.run, other.run_all_met);
        merge_met(&mut self.fetch, &mut self.fetch_all_met, other.fetch, other.fetch_all_met);
        self.removal |= other.removal;
        self.strong_block |= other.strong_block;
        self.weak_block |= other.weak_block;
        self.via_binary |= other.via_binary;
    }

    pub fn is_empty(&self) -> bool {
        !(self.build
            || self.run
            || self.fetch
            || self.removal
            || self.strong_block
            || self.weak_block
            || self.via_binary)
    }

    /// Only run-time ordering, which may be broken freely
    pub fn is_run_only(&self) -> bool {
        self.run
            && !(self.build
                || self.fetch
                || self.removal
                || self.strong_block
                || self.weak_block
                || self.via_binary)
    }

    /// Every reason for this edge is already satisfied on the live system
    pub fn all_met(&self) -> bool {
        (!self.build || self.build_all_met)
            && (!self.run || self.run_all_met)
            && (!self.fetch || self.fetch_all_met)
            && !self.removal
            && !self.strong_block
            && !self.weak_block
            && !self.via_binary
    }
}

/// Nodes keyed by resolution index, in discovery order
#[derive(Debug, Clone, Default)]
pub struct Nag {
    nodes: BTreeSet<usize>,
    edges: BTreeMap<usize, BTreeMap<usize, EdgeProperties>>,
}

impl Nag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every taken existing, change or remove decision
    pub fn build(resolutions: &ResolutionsByResolvent, classifier: &LabelsClassifier) -> Result<Self> {
        let mut nag = Self::new();

        for (i, resolution) in resolutions.iter().enumerate() {
            if let Some(
                Decision::ExistingNoChange(_) | Decision::ChangesToMake(_) | Decision::Remove(_),
            ) = resolution.decision
                && resolution.is_taken()
            {
                nag.add_node(i);
            }
        }

        for (i, resolution) in resolutions.iter().enumerate() {
            if !nag.has_node(i) {
                continue;
            }
            let is_remove = matches!(resolution.decision, Some(Decision::Remove(_)));

            for constraint in resolution.constraints.iter().filter(|c| !c.untaken) {
                match constraint.reason {
                    Reason::Dependency {
                        ref from_resolvent,
                        ref dependency,
                        already_met,
                        ..
                    } => {
                        let Some(from) = resolutions.index_of(from_resolvent) else {
                            continue;
                        };
                        let properties = match dependency.spec {
                            DepSpec::Block(ref block) => EdgeProperties::block(block.strength),
                            DepSpec::Package(_) => {
                                let c = classifier.classification(dependency)?;
                                EdgeProperties::dependency(
                                    c.includes_buildish,
                                    c.includes_non_post_runish,
                                    c.includes_fetch,
                                    already_met,
                                )
                            }
                        };
                        nag.add_edge(from, i, properties);
                    }
                    Reason::Dependent {
                        ref dependent_upon, ..
                    } if is_remove => {
                        for change in dependent_upon {
                            if let Some(j) = resolutions.index_of(&change.resolvent) {
                                nag.add_edge(j, i, EdgeProperties::removal());
                            }
                        }
                    }
                    Reason::WasUsedBy { ref ids } => {
                        for change in ids {
                            if let Some(j) = resolutions.index_of(&change.resolvent) {
                                nag.add_edge(i, j, EdgeProperties::removal());
                            }
                        }
                    }
                    Reason::ViaBinary {
                        ref other_resolvent,
                    } => {
                        if let Some(j) = resolutions.index_of(other_resolvent) {
                            nag.add_edge(j, i, EdgeProperties::via_binary());
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(nag)
    }

    pub fn add_node(&mut self, node: usize) {
        self.nodes.insert(node);
    }

    pub fn has_node(&self, node: usize) -> bool {
        self.nodes.contains(&node)
    }

    /// Add or merge an edge; self edges, empty edges and edges to
    /// unknown nodes are dropped
    pub fn add_edge(&mut self, from: usize, to: usize, properties: EdgeProperties) {
        if from == to || properties.is_empty() || !self.has_node(from) || !self.has_node(to) {
            return;
        }
        self.edges
            .entry(from)
            .or_default()
            .entry(to)
            .and_modify(|p| p.merge(properties))
            .or_insert(properties);
    }

    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().copied()
    }

    pub fn edges_from(&self, node: usize) -> impl Iterator<Item = (usize, &EdgeProperties)> + '_ {
        self.edges
            .get(&node)
            .into_iter()
            .flat_map(|targets| targets.iter().map(|(to, p)| (*to, p)))
    }

    pub fn edge(&self, from: usize, to: usize) -> Option<&EdgeProperties> {
        self.edges.get(&from).and_then(|targets| targets.get(&to))
    }

    /// Strongly connected components of the subgraph on `nodes`, using
    /// only edges `keep` accepts (Tarjan)
    pub fn strongly_connected_components(
        &self,
        nodes: &BTreeSet<usize>,
        keep: &dyn Fn(&EdgeProperties) -> bool,
    ) -> Vec<Vec<usize>> {
        let mut tarjan = Tarjan {
            nag: self,
            nodes,
            keep,
            index: 0,
            indices: BTreeMap::new(),
            lowlinks: BTreeMap::new(),
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            components: Vec::new(),
        };
        for &node in nodes {
            if !tarjan.indices.contains_key(&node) {
                tarjan.visit(node);
            }
        }
        tarjan.components
    }
}

struct Tarjan<'a> {
    nag: &'a Nag,
    nodes: &'a BTreeSet<usize>,
    keep: &'a dyn Fn(&EdgeProperties) -> bool,
    index: usize,
    indices: BTreeMap<usize, usize>,
    lowlinks: BTreeMap<usize, usize>,
    stack: Vec<usize>,
    on_stack: BTreeSet<usize>,
    components: Vec<Vec<usize>>,
}

impl Tarjan<'_> {
    fn visit(&mut self, node: usize) {
        self.indices.insert(node, self.index);
        self.lowlinks.insert(node, self.index);
        self.index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let successors: Vec<usize> = self
            .nag
            .edges_from(node)
            .filter(|(to, p)| self.nodes.contains(to) && (self.keep)(*p))
            .map(|(to, _)| to)
            .collect();

        for to in successors {
            if !self.indices.contains_key(&to) {
                self.visit(to);
                let low = self.lowlinks[&node].min(self.lowlinks[&to]);
                self.lowlinks.insert(node, low);
            } else if self.on_stack.contains(&to) {
                let low = self.lowlinks[&node].min(self.indices[&to]);
                self.lowlinks.insert(node, low);
            }
        }

        if self.lowlinks[&node] == self.indices[&node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(&member);
                component.push(member);
                if member == node {
                    break;
                }
            }
            component.sort_unstable();
            self.components.push(component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(nag: &Nag) -> BTreeSet<usize> {
        nag.nodes().collect()
    }

    #[test]
    fn test_merge_ands_met_flags() {
        let mut p = EdgeProperties::dependency(true, false, false, true);
        p.merge(EdgeProperties::dependency(true, true, false, false));
        assert!(p.build && !p.build_all_met);
        assert!(p.run && !p.run_all_met);
        assert!(!p.all_met());

        let mut met = EdgeProperties::dependency(true, true, false, true);
        met.merge(EdgeProperties::dependency(false, true, false, true));
        assert!(met.all_met());
        assert!(!EdgeProperties::removal().all_met());
    }

    #[test]
    fn test_run_only() {
        assert!(EdgeProperties::dependency(false, true, false, false).is_run_only());
        assert!(!EdgeProperties::dependency(true, true, false, false).is_run_only());
        assert!(EdgeProperties::dependency(false, false, false, false).is_empty());
    }

    #[test]
    fn test_components() {
        let mut nag = Nag::new();
        for n in 0..4 {
            nag.add_node(n);
        }
        let run = EdgeProperties::dependency(false, true, false, false);
        nag.add_edge(0, 1, run);
        nag.add_edge(1, 0, run);
        nag.add_edge(1, 2, EdgeProperties::removal());
        nag.add_edge(3, 3, run);

        let mut sccs = nag.strongly_connected_components(&all(&nag), &|_| true);
        sccs.sort();
        assert_eq!(sccs, vec![vec![0, 1], vec![2], vec![3]]);

        let split = nag.strongly_connected_components(&all(&nag), &|p| !p.run);
        assert_eq!(split.len(), 4);
    }
}
