// tests/config.rs

//! Resolving from a package database and policy loaded from disk.

use pkgplan::resolver::DecisionKind;
use pkgplan::{ContinueOnFailure, PackageDatabase, Resolved, Resolver, ResolverConfig};
use std::fs;
use tempfile::TempDir;

const DATABASE: &str = r#"
[[repository]]
name = "installed"
kind = "installed"

[[repository]]
name = "main"
importance = 10

[[package]]
name = "app-misc/editor"
version = "2.1"
repository = "main"
dependencies = "build+run: dev-libs/libterm suggestion: app-misc/spell"

[[package]]
name = "dev-libs/libterm"
version = "6.2"
repository = "main"

[[package]]
name = "dev-libs/libterm"
version = "6.1"
repository = "installed"

[[package]]
name = "app-misc/spell"
version = "1.0"
repository = "main"

[sets]
world = ["app-misc/editor"]
"#;

const POLICY: &str = r#"
[interest]
take-suggestions = "true"

[use-existing]
dependencies = "if-same"

[engine]
continue-on-failure = "always"
"#;

fn load(dir: &TempDir) -> (PackageDatabase, ResolverConfig) {
    let database = dir.path().join("packages.toml");
    let policy = dir.path().join("policy.toml");
    fs::write(&database, DATABASE).unwrap();
    fs::write(&policy, POLICY).unwrap();
    (
        PackageDatabase::load(&database).unwrap(),
        ResolverConfig::load(&policy).unwrap(),
    )
}

#[test]
fn test_resolve_from_files() {
    let dir = TempDir::new().unwrap();
    let (env, config) = load(&dir);
    assert_eq!(config.engine.continue_on_failure, ContinueOnFailure::Always);

    let resolved = Resolver::from_config(&env, &config)
        .unwrap()
        .resolve(&["@world"])
        .unwrap();

    assert!(resolved.is_successful());
    let kinds: Vec<DecisionKind> = ["app-misc/editor", "dev-libs/libterm", "app-misc/spell"]
        .iter()
        .map(|name| resolved.decisions_for(name)[0].kind())
        .collect();
    assert_eq!(kinds, vec![DecisionKind::ChangesToMake; 3]);
    assert_eq!(resolved.job_list.len(), 6);
}

#[test]
fn test_resolved_survives_json() {
    let dir = TempDir::new().unwrap();
    let (env, config) = load(&dir);
    let resolved = Resolver::from_config(&env, &config)
        .unwrap()
        .resolve(&["app-misc/editor"])
        .unwrap();

    let json = serde_json::to_string(&resolved).unwrap();
    let back: Resolved = serde_json::from_str(&json).unwrap();

    assert_eq!(back, resolved);
}

#[test]
fn test_short_target_name_is_qualified() {
    let dir = TempDir::new().unwrap();
    let (env, config) = load(&dir);

    let resolved = Resolver::from_config(&env, &config)
        .unwrap()
        .resolve(&["editor"])
        .unwrap();

    assert_eq!(
        resolved.decisions_for("app-misc/editor")[0].kind(),
        DecisionKind::ChangesToMake
    );
}

#[test]
fn test_missing_database_file() {
    let dir = TempDir::new().unwrap();
    assert!(PackageDatabase::load(&dir.path().join("absent.toml")).is_err());
}
