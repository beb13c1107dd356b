// src/spec.rs

//! Package and blocker specifications
//!
//! Text grammar for a package spec:
//!
//! ```text
//! [op]category/package[-version][:slot][::repository][[choice,-choice,choice?,choice=]]
//! ```
//!
//! `op` is one of `=`, `~`, `>`, `>=`, `<`, `<=`, `!=`; `=cat/pkg-1.2*` is a
//! prefix match. A leading `!` makes a weak blocker and `!!` a strong one.

use crate::error::{Error, Result};
use crate::name::{PackageName, RepositoryName, SlotName};
use crate::package::PackageId;
use crate::version::{Version, VersionConstraint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Annotation key naming the suggestion group a dependency belongs to
pub const GROUP_ANNOTATION: &str = "group";

/// A requirement on one of a package's choices (use flags)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "flag")]
pub enum ChoiceRequirement {
    /// `[flag]`
    Enabled(String),
    /// `[-flag]`
    Disabled(String),
    /// `[flag?]`: enabled if enabled on the package doing the depending
    EnabledIfDependent(String),
    /// `[flag=]`: same state as on the package doing the depending
    SameAsDependent(String),
}

impl ChoiceRequirement {
    fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        if let Some(flag) = token.strip_prefix('-') {
            return Some(Self::Disabled(flag.to_string()));
        }
        if let Some(flag) = token.strip_suffix('?') {
            return Some(Self::EnabledIfDependent(flag.to_string()));
        }
        if let Some(flag) = token.strip_suffix('=') {
            return Some(Self::SameAsDependent(flag.to_string()));
        }
        Some(Self::Enabled(token.to_string()))
    }

    fn is_met(&self, id: &PackageId, from_id: Option<&PackageId>) -> bool {
        match self {
            Self::Enabled(flag) => id.choice_enabled(flag),
            Self::Disabled(flag) => !id.choice_enabled(flag),
            Self::EnabledIfDependent(flag) => match from_id {
                Some(from) if from.choice_enabled(flag) => id.choice_enabled(flag),
                _ => true,
            },
            Self::SameAsDependent(flag) => match from_id {
                Some(from) => from.choice_enabled(flag) == id.choice_enabled(flag),
                None => true,
            },
        }
    }
}

impl fmt::Display for ChoiceRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled(flag) => write!(f, "{}", flag),
            Self::Disabled(flag) => write!(f, "-{}", flag),
            Self::EnabledIfDependent(flag) => write!(f, "{}?", flag),
            Self::SameAsDependent(flag) => write!(f, "{}=", flag),
        }
    }
}

/// A specification matching zero or more package ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDepSpec {
    pub name: PackageName,
    #[serde(default = "any_version")]
    pub version: VersionConstraint,
    #[serde(default)]
    pub slot: Option<SlotName>,
    #[serde(default)]
    pub in_repository: Option<RepositoryName>,
    #[serde(default)]
    pub choices: Vec<ChoiceRequirement>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

fn any_version() -> VersionConstraint {
    VersionConstraint::Any
}

impl PackageDepSpec {
    /// A spec matching every version of a package
    pub fn for_name(name: PackageName) -> Self {
        Self {
            name,
            version: VersionConstraint::Any,
            slot: None,
            in_repository: None,
            choices: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: VersionConstraint) -> Self {
        self.version = version;
        self
    }

    pub fn with_slot(mut self, slot: Option<SlotName>) -> Self {
        self.slot = slot;
        self
    }

    pub fn in_repository(mut self, repository: RepositoryName) -> Self {
        self.in_repository = Some(repository);
        self
    }

    pub fn with_choice(mut self, choice: ChoiceRequirement) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// The same spec with choice requirements and annotations dropped
    pub fn without_additional_requirements(&self) -> Self {
        Self {
            choices: Vec::new(),
            annotations: BTreeMap::new(),
            ..self.clone()
        }
    }

    pub fn has_additional_requirements(&self) -> bool {
        !self.choices.is_empty()
    }

    /// The suggestion group annotation, if any
    pub fn suggestion_group(&self) -> Option<&str> {
        self.annotations.get(GROUP_ANNOTATION).map(String::as_str)
    }

    /// Parse a package spec from its text form
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidSpec {
            spec: text.to_string(),
            reason: reason.to_string(),
        };

        let mut rest = text.trim();
        if rest.is_empty() {
            return Err(invalid("empty spec"));
        }
        if rest.starts_with('!') {
            return Err(invalid("blockers are not package specs"));
        }

        let mut choices = Vec::new();
        if rest.ends_with(']') {
            let open = rest.rfind('[').ok_or_else(|| invalid("unbalanced '['"))?;
            for token in rest[open + 1..rest.len() - 1].split(',') {
                let choice =
                    ChoiceRequirement::parse(token).ok_or_else(|| invalid("empty choice"))?;
                choices.push(choice);
            }
            rest = &rest[..open];
        }

        let mut in_repository = None;
        if let Some((before, repo)) = rest.rsplit_once("::") {
            if repo.is_empty() {
                return Err(invalid("empty repository name"));
            }
            in_repository = Some(RepositoryName::new(repo));
            rest = before;
        }

        let mut slot = None;
        if let Some((before, slot_name)) = rest.rsplit_once(':') {
            if slot_name.is_empty() {
                return Err(invalid("empty slot name"));
            }
            slot = Some(SlotName::new(slot_name));
            rest = before;
        }

        let mut op = None;
        for candidate in [">=", "<=", "!=", "~", ">", "<", "="] {
            if let Some(stripped) = rest.strip_prefix(candidate) {
                op = Some(candidate);
                rest = stripped;
                break;
            }
        }

        let (name_text, version) = match op {
            None => (rest, VersionConstraint::Any),
            Some(op) => {
                let (name_text, version_text) =
                    split_name_version(rest).ok_or_else(|| invalid("operator without a version"))?;
                let (op, version_text) = match version_text.strip_suffix('*') {
                    Some(prefix) if op == "=" => ("=*", prefix),
                    Some(_) => return Err(invalid("'*' is only valid with '='")),
                    None => (op, version_text),
                };
                let version = Version::parse(version_text)?;
                (name_text, VersionConstraint::from_operator(op, version)?)
            }
        };

        let name = PackageName::new(name_text).map_err(|_| invalid("bad package name"))?;

        Ok(Self {
            name,
            version,
            slot,
            in_repository,
            choices,
            annotations: BTreeMap::new(),
        })
    }

    /// Whether an id matches this spec, including choice requirements
    pub fn matches(&self, id: &PackageId, from_id: Option<&PackageId>) -> bool {
        self.matches_ignoring_choices(id)
            && self.choices.iter().all(|c| c.is_met(id, from_id))
    }

    /// Whether an id matches this spec, disregarding choice requirements
    pub fn matches_ignoring_choices(&self, id: &PackageId) -> bool {
        if id.name != self.name {
            return false;
        }
        if !self.version.satisfies(&id.version) {
            return false;
        }
        if let Some(ref slot) = self.slot
            && id.slot.as_ref() != Some(slot)
        {
            return false;
        }
        if let Some(ref repo) = self.in_repository
            && &id.repository != repo
        {
            return false;
        }
        true
    }
}

/// Split `package-1.0-r1` into name and version at the first `-` that
/// starts a parsable version
fn split_name_version(text: &str) -> Option<(&str, &str)> {
    let slash = text.find('/')?;
    let bytes = text.as_bytes();
    for (pos, _) in text.match_indices('-').filter(|(pos, _)| *pos > slash) {
        let version = &text[pos + 1..];
        let starts_version = bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)
            || version.starts_with("scm");
        if starts_version && Version::parse(version.trim_end_matches('*')).is_ok() {
            return Some((&text[..pos], version));
        }
    }
    None
}

impl fmt::Display for PackageDepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version.atom_prefix() {
            Some((op, version)) if op == "=*" => write!(f, "={}-{}*", self.name, version)?,
            Some((op, version)) => write!(f, "{}{}-{}", op, self.name, version)?,
            None => write!(f, "{}", self.name)?,
        }
        if let Some(ref slot) = self.slot {
            write!(f, ":{}", slot)?;
        }
        if let Some(ref repo) = self.in_repository {
            write!(f, "::{}", repo)?;
        }
        if !self.choices.is_empty() {
            let choices: Vec<String> = self.choices.iter().map(|c| c.to_string()).collect();
            write!(f, "[{}]", choices.join(","))?;
        }
        if let VersionConstraint::And(_, _) = self.version {
            write!(f, " ({})", self.version)?;
        }
        Ok(())
    }
}

/// How hard a blocker pushes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStrength {
    /// `!spec`: may be resolved by replacing or uninstalling afterwards
    Weak,
    /// `!!spec`: the blocked package must be gone first
    Strong,
}

/// A blocker: nothing matching `blocking` may be installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDepSpec {
    pub blocking: PackageDepSpec,
    pub strength: BlockStrength,
}

impl BlockDepSpec {
    pub fn new(blocking: PackageDepSpec, strength: BlockStrength) -> Self {
        Self { blocking, strength }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if let Some(rest) = trimmed.strip_prefix("!!") {
            Ok(Self::new(PackageDepSpec::parse(rest)?, BlockStrength::Strong))
        } else if let Some(rest) = trimmed.strip_prefix('!') {
            Ok(Self::new(PackageDepSpec::parse(rest)?, BlockStrength::Weak))
        } else {
            Err(Error::InvalidSpec {
                spec: text.to_string(),
                reason: "blockers start with '!'".to_string(),
            })
        }
    }
}

impl fmt::Display for BlockDepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strength {
            BlockStrength::Weak => write!(f, "!{}", self.blocking),
            BlockStrength::Strong => write!(f, "!!{}", self.blocking),
        }
    }
}

/// Either a package spec or a blocker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepSpec {
    Package(PackageDepSpec),
    Block(BlockDepSpec),
}

impl DepSpec {
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim_start().starts_with('!') {
            Ok(DepSpec::Block(BlockDepSpec::parse(text)?))
        } else {
            Ok(DepSpec::Package(PackageDepSpec::parse(text)?))
        }
    }

    pub fn as_package(&self) -> Option<&PackageDepSpec> {
        match self {
            DepSpec::Package(spec) => Some(spec),
            DepSpec::Block(_) => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockDepSpec> {
        match self {
            DepSpec::Package(_) => None,
            DepSpec::Block(block) => Some(block),
        }
    }

    /// The package spec being required or blocked
    pub fn package_spec(&self) -> &PackageDepSpec {
        match self {
            DepSpec::Package(spec) => spec,
            DepSpec::Block(block) => &block.blocking,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, DepSpec::Block(_))
    }
}

impl fmt::Display for DepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepSpec::Package(spec) => write!(f, "{}", spec),
            DepSpec::Block(block) => write!(f, "{}", block),
        }
    }
}

/// Parse a list of spec strings, as found in configuration
pub fn parse_specs<S: AsRef<str>>(texts: &[S]) -> Result<Vec<PackageDepSpec>> {
    texts.iter().map(|t| PackageDepSpec::parse(t.as_ref())).collect()
}
