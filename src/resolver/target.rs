// src/resolver/target.rs

//! Turning command-line targets into constraints
//!
//! A target is a package spec, a blocker (`!spec` or `!!spec`, meaning
//! uninstall) or a named set (`@name`). Package names may leave out the
//! category when only one category has a package of that name.

use super::reason::Reason;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::spec::{BlockDepSpec, BlockStrength, DepSpec, PackageDepSpec};
use std::collections::BTreeSet;
use tracing::debug;

const OPERATORS: [&str; 7] = [">=", "<=", "!=", "~", ">", "<", "="];

/// One target expanded into the specs it stands for
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub spec: DepSpec,
    pub reason: Reason,
}

impl Target {
    pub fn parse(env: &dyn Environment, text: &str) -> Result<Vec<Target>> {
        let text = text.trim();

        if let Some(set_name) = text.strip_prefix('@') {
            let specs = env
                .set(set_name)
                .ok_or_else(|| Error::NoSuchTarget(text.to_string()))?;
            debug!("Set {} has {} members", set_name, specs.len());
            return Ok(specs
                .into_iter()
                .map(|spec| Target {
                    spec,
                    reason: Reason::Set {
                        set_name: set_name.to_string(),
                        reason_for_set: Box::new(Reason::Target),
                    },
                })
                .collect());
        }

        let (strength, body) = if let Some(body) = text.strip_prefix("!!") {
            (Some(BlockStrength::Strong), body)
        } else if let Some(body) = text.strip_prefix('!') {
            (Some(BlockStrength::Weak), body)
        } else {
            (None, text)
        };

        let package = qualify(env, body)?;
        let spec = match strength {
            Some(strength) => DepSpec::Block(BlockDepSpec::new(package, strength)),
            None => DepSpec::Package(package),
        };
        Ok(vec![Target {
            spec,
            reason: Reason::Target,
        }])
    }

    pub fn parse_all<S: AsRef<str>>(env: &dyn Environment, texts: &[S]) -> Result<Vec<Target>> {
        let mut targets = Vec::new();
        for text in texts {
            targets.extend(Self::parse(env, text.as_ref())?);
        }
        Ok(targets)
    }
}

/// Parse a package spec, filling in a missing category from the environment
fn qualify(env: &dyn Environment, text: &str) -> Result<PackageDepSpec> {
    let op = OPERATORS
        .iter()
        .find(|op| text.starts_with(**op))
        .copied()
        .unwrap_or("");
    let body = &text[op.len()..];
    let name_end = body.find([':', '[']).unwrap_or(body.len());
    if body[..name_end].contains('/') {
        return PackageDepSpec::parse(text);
    }

    let names = env.package_names();
    let categories: BTreeSet<&str> = names.iter().map(|n| n.category()).collect();
    let mut found: Vec<PackageDepSpec> = Vec::new();
    for category in categories {
        let Ok(spec) = PackageDepSpec::parse(&format!("{}{}/{}", op, category, body)) else {
            continue;
        };
        if names.contains(&spec.name) && !found.iter().any(|f| f.name == spec.name) {
            found.push(spec);
        }
    }

    match found.len() {
        0 => Err(Error::NoSuchTarget(text.to_string())),
        1 => Ok(found.remove(0)),
        _ => Err(Error::AmbiguousTarget {
            spec: text.to_string(),
            candidates: found.iter().map(|s| s.name.to_string()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::PackageDatabase;
    use crate::package::{PackageId, Repository, RepositoryKind};

    fn database() -> PackageDatabase {
        let mut db = PackageDatabase::new()
            .with_repository(Repository::new("repo", RepositoryKind::Source));
        for name in ["app-misc/foo", "dev-libs/foo", "dev-libs/bar-baz"] {
            db = db.with_id(PackageId::new(name, "1.0", "repo").unwrap()).unwrap();
        }
        db.add_set("world", vec![DepSpec::parse("dev-libs/foo").unwrap()]);
        db
    }

    #[test]
    fn test_qualified_and_blocker() {
        let env = database();
        let targets = Target::parse(&env, ">=dev-libs/foo-1:0").unwrap();
        assert_eq!(targets[0].spec.package_spec().name.as_str(), "dev-libs/foo");
        assert_eq!(targets[0].reason, Reason::Target);

        let targets = Target::parse(&env, "!!dev-libs/foo").unwrap();
        let block = targets[0].spec.as_block().unwrap();
        assert_eq!(block.strength, BlockStrength::Strong);
    }

    #[test]
    fn test_unqualified_names() {
        let env = database();
        let targets = Target::parse(&env, "=bar-baz-1.0").unwrap();
        assert_eq!(targets[0].spec.package_spec().name.as_str(), "dev-libs/bar-baz");

        match Target::parse(&env, "foo") {
            Err(Error::AmbiguousTarget { candidates, .. }) => {
                assert_eq!(candidates, vec!["app-misc/foo", "dev-libs/foo"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
        assert!(matches!(
            Target::parse(&env, "nothing"),
            Err(Error::NoSuchTarget(_))
        ));
    }

    #[test]
    fn test_sets() {
        let env = database();
        let targets = Target::parse(&env, "@world").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].reason.set_name(), Some("world"));
        assert!(matches!(
            Target::parse(&env, "@missing"),
            Err(Error::NoSuchTarget(_))
        ));
    }
}
