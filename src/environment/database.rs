// src/environment/database.rs

//! In-memory package database
//!
//! Built programmatically or loaded from TOML:
//!
//! ```toml
//! [[repository]]
//! name = "installed"
//! kind = "installed"
//!
//! [[repository]]
//! name = "main"
//! importance = 10
//!
//! [[package]]
//! name = "app-misc/app"
//! version = "1.0"
//! slot = "0"
//! repository = "main"
//! choices = { ssl = true }
//! dependencies = "build+run: dev-libs/libfoo"
//!
//! [sets]
//! world = ["app-misc/app"]
//! ```

use super::Environment;
use crate::dependencies::DependencyKey;
use crate::error::{Error, Result};
use crate::name::PackageName;
use crate::package::{PackageId, Repository};
use crate::spec::{DepSpec, PackageDepSpec};
use crate::tribool::Tribool;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// An [`Environment`] held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct PackageDatabase {
    repositories: Vec<Repository>,
    ids: BTreeMap<PackageName, Vec<Arc<PackageId>>>,
    sets: BTreeMap<String, Vec<DepSpec>>,
    suggestion_interest: Vec<(PackageDepSpec, Tribool)>,
}

impl PackageDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.add_repository(repository);
        self
    }

    pub fn add_repository(&mut self, repository: Repository) {
        self.repositories.retain(|r| r.name != repository.name);
        self.repositories.push(repository);
    }

    /// Add an id; its repository must already be known
    pub fn add_id(&mut self, id: PackageId) -> Result<Arc<PackageId>> {
        if self.repository(&id.repository).is_none() {
            return Err(Error::InvalidConfig(format!(
                "package {} refers to unknown repository '{}'",
                id, id.repository
            )));
        }
        let id = Arc::new(id);
        let ids = self.ids.entry(id.name.clone()).or_default();
        ids.retain(|existing| existing != &id);
        ids.push(Arc::clone(&id));
        ids.sort();
        Ok(id)
    }

    pub fn with_id(mut self, id: PackageId) -> Result<Self> {
        self.add_id(id)?;
        Ok(self)
    }

    pub fn add_set(&mut self, name: &str, specs: Vec<DepSpec>) {
        self.sets.insert(name.to_string(), specs);
    }

    /// Record a site-wide take/ignore answer for suggestions matching `spec`
    pub fn add_suggestion_interest(&mut self, spec: PackageDepSpec, interest: Tribool) {
        self.suggestion_interest.push((spec, interest));
    }

    pub fn len(&self) -> usize {
        self.ids.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Load a database from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load a database from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: DatabaseFile = toml::from_str(content)?;
        let mut db = Self::new();

        for repository in raw.repository {
            db.add_repository(repository);
        }
        for entry in raw.package {
            db.add_id(entry.into_package_id()?)?;
        }
        for (name, texts) in raw.sets {
            let specs = texts
                .iter()
                .map(|t| DepSpec::parse(t))
                .collect::<Result<Vec<_>>>()?;
            db.add_set(&name, specs);
        }
        for entry in raw.suggestion_interest {
            db.add_suggestion_interest(PackageDepSpec::parse(&entry.spec)?, entry.interest);
        }

        debug!(
            "Loaded package database: {} repositories, {} ids, {} sets",
            db.repositories.len(),
            db.len(),
            db.sets.len()
        );
        Ok(db)
    }
}

impl Environment for PackageDatabase {
    fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    fn package_ids(&self, name: &PackageName) -> Vec<Arc<PackageId>> {
        self.ids.get(name).cloned().unwrap_or_default()
    }

    fn package_names(&self) -> Vec<PackageName> {
        self.ids.keys().cloned().collect()
    }

    fn set(&self, name: &str) -> Option<Vec<DepSpec>> {
        self.sets.get(name).cloned()
    }

    fn interest_in_suggestion(&self, _from: &PackageId, spec: &PackageDepSpec) -> Tribool {
        self.suggestion_interest
            .iter()
            .find(|(pattern, _)| {
                pattern.name == spec.name
                    && pattern
                        .slot
                        .as_ref()
                        .is_none_or(|slot| spec.slot.as_ref() == Some(slot))
            })
            .map(|(_, interest)| *interest)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DatabaseFile {
    #[serde(default)]
    repository: Vec<Repository>,
    #[serde(default)]
    package: Vec<PackageEntry>,
    #[serde(default)]
    sets: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    suggestion_interest: Vec<SuggestionInterestEntry>,
}

#[derive(Debug, Deserialize)]
struct SuggestionInterestEntry {
    spec: String,
    interest: Tribool,
}

/// A package as written in a database file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PackageEntry {
    name: String,
    version: String,
    #[serde(default)]
    slot: Option<String>,
    repository: String,
    #[serde(default)]
    choices: BTreeMap<String, bool>,
    #[serde(default)]
    dependencies: Option<String>,
    #[serde(default)]
    build_dependencies: Option<String>,
    #[serde(default)]
    run_dependencies: Option<String>,
    #[serde(default)]
    post_dependencies: Option<String>,
    #[serde(default)]
    suggested_dependencies: Option<String>,
    #[serde(default)]
    transient: bool,
    #[serde(default)]
    masked: bool,
    #[serde(default)]
    binary_capable: bool,
    #[serde(default)]
    installed_time: Option<DateTime<Utc>>,
}

impl PackageEntry {
    fn into_package_id(self) -> Result<PackageId> {
        let mut id = PackageId::new(&self.name, &self.version, &self.repository)?;
        if let Some(ref slot) = self.slot {
            id = id.with_slot(slot);
        }
        id.choices = self.choices;
        id.transient = self.transient;
        id.masked = self.masked;
        id.binary_capable = self.binary_capable;
        id.installed_time = self.installed_time;

        let keyed = [
            (DependencyKey::Dependencies, self.dependencies),
            (DependencyKey::BuildDependencies, self.build_dependencies),
            (DependencyKey::RunDependencies, self.run_dependencies),
            (DependencyKey::PostDependencies, self.post_dependencies),
            (DependencyKey::SuggestedDependencies, self.suggested_dependencies),
        ];
        for (key, text) in keyed {
            if let Some(text) = text {
                id = id.with_dependencies(key, &text)?;
            }
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::RepositoryKind;
    use std::io::Write;

    const SAMPLE: &str = r#"
[[repository]]
name = "installed"
kind = "installed"

[[repository]]
name = "main"
importance = 10

[[repository]]
name = "overlay"
importance = 20

[[package]]
name = "dev-libs/libfoo"
version = "1.0"
slot = "0"
repository = "installed"

[[package]]
name = "dev-libs/libfoo"
version = "1.0"
slot = "0"
repository = "main"

[[package]]
name = "dev-libs/libfoo"
version = "1.0"
slot = "0"
repository = "overlay"

[[package]]
name = "app-misc/app"
version = "2.0"
slot = "0"
repository = "main"
choices = { ssl = true }
dependencies = "build+run: dev-libs/libfoo ssl? ( dev-libs/openssl )"

[[suggestion-interest]]
spec = "app-doc/manual"
interest = "false"

[sets]
world = ["app-misc/app", "!dev-libs/old"]
"#;

    #[test]
    fn test_load_from_toml() {
        let db = PackageDatabase::from_toml_str(SAMPLE).unwrap();
        assert_eq!(db.repositories().len(), 3);
        assert_eq!(db.len(), 4);

        let app_name = PackageName::new("app-misc/app").unwrap();
        let app = &db.package_ids(&app_name)[0];
        assert!(app.choice_enabled("ssl"));
        assert!(app.dependencies.contains_key(&DependencyKey::Dependencies));

        let world = db.set("world").unwrap();
        assert_eq!(world.len(), 2);
        assert!(world[1].is_block());
    }

    #[test]
    fn test_installed_and_installable_queries() {
        let db = PackageDatabase::from_toml_str(SAMPLE).unwrap();
        let libfoo = PackageName::new("dev-libs/libfoo").unwrap();

        let installed = db.installed_ids();
        assert_eq!(installed.len(), 1);
        assert!(db.is_installed(&installed[0]));

        let installable = db.installable_ids(&libfoo);
        assert_eq!(installable.len(), 2);
        assert_eq!(installable.last().unwrap().repository.as_str(), "overlay");

        let spec = PackageDepSpec::parse("dev-libs/libfoo:0").unwrap();
        assert_eq!(db.installed_matching(&spec, None).len(), 1);
        assert_eq!(db.ids_in(&libfoo, RepositoryKind::Source).len(), 2);
    }

    #[test]
    fn test_unknown_repository_rejected() {
        let mut db = PackageDatabase::new();
        let id = PackageId::new("cat/pkg", "1", "nowhere").unwrap();
        assert!(matches!(db.add_id(id), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_suggestion_interest() {
        let db = PackageDatabase::from_toml_str(SAMPLE).unwrap();
        let from = PackageId::new("app-misc/app", "2.0", "main").unwrap();
        let manual = PackageDepSpec::parse("app-doc/manual").unwrap();
        let other = PackageDepSpec::parse("app-doc/other").unwrap();
        assert_eq!(db.interest_in_suggestion(&from, &manual), Tribool::False);
        assert_eq!(db.interest_in_suggestion(&from, &other), Tribool::Indeterminate);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let db = PackageDatabase::load(file.path()).unwrap();
        assert_eq!(db.package_names().len(), 2);
    }

    #[test]
    fn test_bad_dependency_string_is_an_error() {
        let text = r#"
[[repository]]
name = "main"

[[package]]
name = "cat/pkg"
version = "1"
repository = "main"
dependencies = "( cat/unterminated"
"#;
        assert!(matches!(
            PackageDatabase::from_toml_str(text),
            Err(Error::InvalidDependencies(_))
        ));
    }
}
