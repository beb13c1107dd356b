// src/dependencies/tree.rs

//! Dependency trees and their text form
//!
//! ```text
//! build: cat/compiler run: cat/lib
//! ssl? ( dev-libs/openssl ) !static? ( run: cat/dynamic-loader )
//! || ( cat/a cat/b )
//! suggestion: cat/extra [[group=docs]]
//! ```
//!
//! A `labels:` token switches the active labels for the rest of the group it
//! appears in. `[[key=value]]` annotates the spec just before it.

use super::labels::{DependencyLabel, LabelKind, labels_to_string};
use crate::error::{Error, Result};
use crate::spec::DepSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Peekable;
use strum_macros::{Display, EnumString};

/// A node in a dependency tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DependencyTree {
    /// Every child applies
    All(Vec<DependencyTree>),
    /// Any one child group suffices
    Any(Vec<DependencyTree>),
    /// Children apply only if `flag` is enabled (disabled when `inverse`)
    Conditional {
        flag: String,
        inverse: bool,
        children: Vec<DependencyTree>,
    },
    /// Switch the active labels for the following siblings
    Labels(Vec<DependencyLabel>),
    Spec(DepSpec),
}

impl Default for DependencyTree {
    fn default() -> Self {
        DependencyTree::All(Vec::new())
    }
}

impl DependencyTree {
    /// Parse a whole dependency string; the result is always an `All` node
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace().peekable();
        let children = parse_group(&mut tokens, false)?;
        Ok(DependencyTree::All(children))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DependencyTree::All(children)
            | DependencyTree::Any(children)
            | DependencyTree::Conditional { children, .. } => children.is_empty(),
            DependencyTree::Labels(_) | DependencyTree::Spec(_) => false,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, top: bool) -> fmt::Result {
        match self {
            DependencyTree::All(children) if top => write_children(f, children),
            DependencyTree::All(children) => {
                write!(f, "( ")?;
                write_children(f, children)?;
                write!(f, " )")
            }
            DependencyTree::Any(children) => {
                write!(f, "|| ( ")?;
                write_children(f, children)?;
                write!(f, " )")
            }
            DependencyTree::Conditional {
                flag,
                inverse,
                children,
            } => {
                let bang = if *inverse { "!" } else { "" };
                write!(f, "{}{}? ( ", bang, flag)?;
                write_children(f, children)?;
                write!(f, " )")
            }
            DependencyTree::Labels(labels) => write!(f, "{}:", labels_to_string(labels)),
            DependencyTree::Spec(spec) => {
                write!(f, "{}", spec)?;
                for (key, value) in &spec.package_spec().annotations {
                    write!(f, " [[{}={}]]", key, value)?;
                }
                Ok(())
            }
        }
    }
}

fn write_children(f: &mut fmt::Formatter<'_>, children: &[DependencyTree]) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        child.write(f, false)?;
    }
    Ok(())
}

impl fmt::Display for DependencyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, true)
    }
}

impl TryFrom<String> for DependencyTree {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DependencyTree> for String {
    fn from(value: DependencyTree) -> Self {
        value.to_string()
    }
}

fn parse_group<'a, I>(tokens: &mut Peekable<I>, nested: bool) -> Result<Vec<DependencyTree>>
where
    I: Iterator<Item = &'a str>,
{
    let mut children = Vec::new();

    while let Some(token) = tokens.next() {
        match token {
            ")" if nested => return Ok(children),
            ")" => {
                return Err(Error::InvalidDependencies(
                    "unexpected ')'".to_string(),
                ));
            }
            "(" => children.push(DependencyTree::All(parse_group(tokens, true)?)),
            "||" => {
                expect_open(tokens, "||")?;
                children.push(DependencyTree::Any(parse_group(tokens, true)?));
            }
            _ if token.starts_with("[[") => {
                let (key, value) = parse_annotation(token)?;
                match children.last_mut() {
                    Some(DependencyTree::Spec(DepSpec::Package(spec))) => {
                        spec.annotations.insert(key, value);
                    }
                    Some(DependencyTree::Spec(DepSpec::Block(block))) => {
                        block.blocking.annotations.insert(key, value);
                    }
                    _ => {
                        return Err(Error::InvalidDependencies(format!(
                            "annotation '{}' does not follow a spec",
                            token
                        )));
                    }
                }
            }
            _ if token.ends_with('?') => {
                let flag = &token[..token.len() - 1];
                let (flag, inverse) = match flag.strip_prefix('!') {
                    Some(flag) => (flag, true),
                    None => (flag, false),
                };
                if flag.is_empty() {
                    return Err(Error::InvalidDependencies(format!(
                        "conditional '{}' names no flag",
                        token
                    )));
                }
                expect_open(tokens, token)?;
                children.push(DependencyTree::Conditional {
                    flag: flag.to_string(),
                    inverse,
                    children: parse_group(tokens, true)?,
                });
            }
            _ if token.ends_with(':') && !token.contains('/') => {
                let labels = DependencyLabel::parse_list(&token[..token.len() - 1])?;
                children.push(DependencyTree::Labels(labels));
            }
            _ => children.push(DependencyTree::Spec(DepSpec::parse(token)?)),
        }
    }

    if nested {
        return Err(Error::InvalidDependencies(
            "unterminated '(' group".to_string(),
        ));
    }
    Ok(children)
}

fn expect_open<'a, I>(tokens: &mut Peekable<I>, after: &str) -> Result<()>
where
    I: Iterator<Item = &'a str>,
{
    match tokens.next() {
        Some("(") => Ok(()),
        other => Err(Error::InvalidDependencies(format!(
            "expected '(' after '{}', found '{}'",
            after,
            other.unwrap_or("end of input")
        ))),
    }
}

fn parse_annotation(token: &str) -> Result<(String, String)> {
    token
        .strip_prefix("[[")
        .and_then(|t| t.strip_suffix("]]"))
        .and_then(|t| t.split_once('='))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| Error::InvalidDependencies(format!("malformed annotation '{}'", token)))
}

/// Which metadata key a dependency tree was read from
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DependencyKey {
    /// Labelled dependencies; starts as `build+run:`
    Dependencies,
    BuildDependencies,
    RunDependencies,
    PostDependencies,
    SuggestedDependencies,
}

impl DependencyKey {
    /// Labels active at the top of a tree read from this key
    pub fn initial_labels(&self) -> Vec<DependencyLabel> {
        let kinds: &[LabelKind] = match self {
            DependencyKey::Dependencies => &[LabelKind::Build, LabelKind::Run],
            DependencyKey::BuildDependencies => &[LabelKind::Build],
            DependencyKey::RunDependencies => &[LabelKind::Run],
            DependencyKey::PostDependencies => &[LabelKind::Post],
            DependencyKey::SuggestedDependencies => &[LabelKind::Suggestion],
        };
        kinds.iter().copied().map(DependencyLabel::new).collect()
    }

    /// The traditional metadata variable name
    pub fn raw_name(&self) -> &'static str {
        match self {
            DependencyKey::Dependencies => "DEPENDENCIES",
            DependencyKey::BuildDependencies => "DEPEND",
            DependencyKey::RunDependencies => "RDEPEND",
            DependencyKey::PostDependencies => "PDEPEND",
            DependencyKey::SuggestedDependencies => "SDEPEND",
        }
    }
}
