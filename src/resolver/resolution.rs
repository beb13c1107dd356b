// src/resolver/resolution.rs

//! Resolutions and the resolvent-indexed arena holding them

use super::constraint::Constraints;
use super::decision::Decision;
use super::resolvent::Resolvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A resolvent, its constraints so far, and its current decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolvent: Resolvent,
    pub constraints: Constraints,
    pub decision: Option<Decision>,
}

impl Resolution {
    pub fn new(resolvent: Resolvent) -> Self {
        Self {
            resolvent,
            constraints: Constraints::new(),
            decision: None,
        }
    }

    pub fn is_taken(&self) -> bool {
        self.decision.as_ref().is_some_and(Decision::taken)
    }
}

/// Every resolution of a run, in discovery order
///
/// Resolutions are never removed. The position of a resolution is its
/// discovery index and is used for tie-breaking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Resolution>", into = "Vec<Resolution>")]
pub struct ResolutionsByResolvent {
    resolutions: Vec<Resolution>,
    index: HashMap<Resolvent, usize>,
}

impl ResolutionsByResolvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh resolution, returning its index
    ///
    /// Returns the existing index if the resolvent is already known.
    pub fn insert_new(&mut self, resolvent: Resolvent) -> usize {
        if let Some(&i) = self.index.get(&resolvent) {
            return i;
        }
        let i = self.resolutions.len();
        self.index.insert(resolvent.clone(), i);
        self.resolutions.push(Resolution::new(resolvent));
        i
    }

    pub fn index_of(&self, resolvent: &Resolvent) -> Option<usize> {
        self.index.get(resolvent).copied()
    }

    pub fn get(&self, resolvent: &Resolvent) -> Option<&Resolution> {
        self.index_of(resolvent).map(|i| &self.resolutions[i])
    }

    pub fn get_mut(&mut self, resolvent: &Resolvent) -> Option<&mut Resolution> {
        let i = self.index_of(resolvent)?;
        self.resolutions.get_mut(i)
    }

    pub fn by_index(&self, i: usize) -> Option<&Resolution> {
        self.resolutions.get(i)
    }

    pub fn by_index_mut(&mut self, i: usize) -> Option<&mut Resolution> {
        self.resolutions.get_mut(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resolution> {
        self.resolutions.iter()
    }

    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }

    /// The decision for a resolvent, if it has one
    pub fn decision(&self, resolvent: &Resolvent) -> Option<&Decision> {
        self.get(resolvent).and_then(|r| r.decision.as_ref())
    }
}

impl From<Vec<Resolution>> for ResolutionsByResolvent {
    fn from(resolutions: Vec<Resolution>) -> Self {
        let index = resolutions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.resolvent.clone(), i))
            .collect();
        Self { resolutions, index }
    }
}

impl From<ResolutionsByResolvent> for Vec<Resolution> {
    fn from(value: ResolutionsByResolvent) -> Self {
        value.resolutions
    }
}

impl<'a> IntoIterator for &'a ResolutionsByResolvent {
    type Item = &'a Resolution;
    type IntoIter = std::slice::Iter<'a, Resolution>;

    fn into_iter(self) -> Self::IntoIter {
        self.resolutions.iter()
    }
}
