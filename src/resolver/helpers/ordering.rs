// src/resolver/helpers/ordering.rs

use super::SpecList;
use crate::config::{OrderingConfig, PreferenceConfig};
use crate::error::Result;
use crate::name::PackageName;
use crate::resolver::decision::Decision;
use crate::resolver::resolution::Resolution;
use crate::resolver::resolvent::DestinationType;
use crate::tribool::Tribool;

#[derive(Debug, Clone)]
pub struct OrderingPolicy {
    early: SpecList,
    late: SpecList,
}

impl OrderingPolicy {
    pub fn from_config(config: &OrderingConfig) -> Result<Self> {
        Ok(Self {
            early: SpecList::parse(&config.early)?,
            late: SpecList::parse(&config.late)?,
        })
    }

    /// Purges go last, binaries first, then whatever is configured
    pub fn order_early(&self, resolution: &Resolution) -> Tribool {
        let Some(decision) = resolution.decision.as_ref() else {
            return Tribool::Indeterminate;
        };

        if let Decision::Remove(ref remove) = *decision {
            if resolution.constraints.iter().any(|c| c.reason.is_was_used_by()) {
                return Tribool::False;
            }
            if self.early.matches_any(&remove.ids) {
                return Tribool::True;
            }
            if self.late.matches_any(&remove.ids) {
                return Tribool::False;
            }
            return Tribool::Indeterminate;
        }

        if resolution.resolvent.destination_type == DestinationType::CreateBinary
            && decision.is_change_or_remove()
        {
            return Tribool::True;
        }

        match decision.chosen_id() {
            Some(id) if self.early.matches(id) => Tribool::True,
            Some(id) if self.late.matches(id) => Tribool::False,
            _ => Tribool::Indeterminate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreferencePolicy {
    prefer: SpecList,
    avoid: SpecList,
}

impl PreferencePolicy {
    pub fn from_config(config: &PreferenceConfig) -> Result<Self> {
        Ok(Self {
            prefer: SpecList::parse(&config.prefer)?,
            avoid: SpecList::parse(&config.avoid)?,
        })
    }

    pub fn prefer_or_avoid(&self, name: &PackageName) -> Tribool {
        if self.prefer.matches_name(name) {
            Tribool::True
        } else if self.avoid.matches_name(name) {
            Tribool::False
        } else {
            Tribool::Indeterminate
        }
    }
}
