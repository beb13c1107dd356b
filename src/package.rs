// src/package.rs

//! Package ids and repository descriptors
//!
//! A `PackageId` is one concrete version of a package in one repository,
//! together with the metadata the resolver needs: slot, choices, and
//! dependency trees. Identity is name + version + slot + repository.

use crate::dependencies::{DependencyKey, DependencyTree};
use crate::error::Result;
use crate::name::{PackageName, RepositoryName, SlotName};
use crate::spec::PackageDepSpec;
use crate::version::{Version, VersionConstraint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use strum_macros::{Display, EnumString};

/// One version of one package in one repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageId {
    pub name: PackageName,
    pub version: Version,
    #[serde(default)]
    pub slot: Option<SlotName>,
    pub repository: RepositoryName,
    /// Choice (use flag) states; absent flags are disabled
    #[serde(default)]
    pub choices: BTreeMap<String, bool>,
    #[serde(default)]
    pub dependencies: BTreeMap<DependencyKey, DependencyTree>,
    /// Installed as a transient package (may be replaced freely)
    #[serde(default)]
    pub transient: bool,
    #[serde(default)]
    pub masked: bool,
    /// Can be turned into a binary package
    #[serde(default)]
    pub binary_capable: bool,
    #[serde(default)]
    pub installed_time: Option<DateTime<Utc>>,
}

impl PackageId {
    pub fn new(name: &str, version: &str, repository: &str) -> Result<Self> {
        Ok(Self {
            name: PackageName::new(name)?,
            version: Version::parse(version)?,
            slot: None,
            repository: RepositoryName::new(repository),
            choices: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            transient: false,
            masked: false,
            binary_capable: false,
            installed_time: None,
        })
    }

    pub fn with_slot(mut self, slot: &str) -> Self {
        self.slot = Some(SlotName::new(slot));
        self
    }

    pub fn with_choice(mut self, flag: &str, enabled: bool) -> Self {
        self.choices.insert(flag.to_string(), enabled);
        self
    }

    /// Attach a dependency tree parsed from its text form
    pub fn with_dependencies(mut self, key: DependencyKey, text: &str) -> Result<Self> {
        self.dependencies.insert(key, DependencyTree::parse(text)?);
        Ok(self)
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn binary_capable(mut self) -> Self {
        self.binary_capable = true;
        self
    }

    pub fn installed_at(mut self, time: DateTime<Utc>) -> Self {
        self.installed_time = Some(time);
        self
    }

    pub fn choice_enabled(&self, flag: &str) -> bool {
        self.choices.get(flag).copied().unwrap_or(false)
    }

    /// A spec matching exactly this id
    pub fn uniquely_identifying_spec(&self) -> PackageDepSpec {
        PackageDepSpec::for_name(self.name.clone())
            .with_version(VersionConstraint::Exact(self.version.clone()))
            .with_slot(self.slot.clone())
            .in_repository(self.repository.clone())
    }

    /// Whether enabled choices match, for flags both ids know about
    pub fn same_choices_as(&self, other: &PackageId) -> bool {
        self.choices
            .iter()
            .filter_map(|(flag, enabled)| other.choices.get(flag).map(|o| o == enabled))
            .all(|same| same)
    }

    fn identity(&self) -> (&PackageName, &Version, &Option<SlotName>, &RepositoryName) {
        (&self.name, &self.version, &self.slot, &self.repository)
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)?;
        if let Some(ref slot) = self.slot {
            write!(f, ":{}", slot)?;
        }
        write!(f, "::{}", self.repository)
    }
}

/// What a repository holds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RepositoryKind {
    /// Installable packages built from source
    #[default]
    Source,
    /// Prebuilt packages; also the destination for binary creation
    Binary,
    /// Packages installed on the live system
    Installed,
}

/// A repository known to the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: RepositoryName,
    #[serde(default)]
    pub kind: RepositoryKind,
    /// Higher is preferred when versions tie
    #[serde(default)]
    pub importance: i32,
}

impl Repository {
    pub fn new(name: &str, kind: RepositoryKind) -> Self {
        Self {
            name: RepositoryName::new(name),
            kind,
            importance: 0,
        }
    }

    pub fn with_importance(mut self, importance: i32) -> Self {
        self.importance = importance;
        self
    }

    pub fn is_installed(&self) -> bool {
        self.kind == RepositoryKind::Installed
    }

    /// Whether an id from a repository of `origin` kind can be merged here
    pub fn is_suitable_destination_for(&self, origin: RepositoryKind) -> bool {
        match self.kind {
            RepositoryKind::Installed => origin != RepositoryKind::Installed,
            RepositoryKind::Binary => origin == RepositoryKind::Source,
            RepositoryKind::Source => false,
        }
    }
}
