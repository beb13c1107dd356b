// tests/restarts.rs

//! Decisions that have to be revisited, and initial constraints that
//! change the first decision made.

mod common;

use chrono::{Duration, TimeZone, Utc};
use common::*;
use pkgplan::dependencies::DependencyKey;
use pkgplan::resolver::{ChangeType, DecisionKind};
use pkgplan::{Decision, Error, PackageId, Resolver, ResolverConfig, StandardFunctions};

/// `app` takes any `lib`, which keeps the installed 1.0; `mid`, found
/// later through `other`, needs 2.0.
fn late_conflict() -> pkgplan::PackageDatabase {
    Universe::new()
        .available("cat/app", "1.0", "build+run: cat/lib")
        .available("cat/other", "1.0", "build+run: cat/mid")
        .available("cat/mid", "1.0", "build+run: >=cat/lib-2")
        .available("cat/lib", "1.0", "")
        .available("cat/lib", "2.0", "")
        .installed("cat/lib", "1.0", "")
        .build()
}

#[test]
fn test_late_constraint_restarts_resolution() {
    let env = late_conflict();

    let resolved = resolve_default(&env, &["cat/app", "cat/other"]);

    assert_eq!(resolved.restarts, 1);
    assert!(resolved.is_successful());
    let Decision::ChangesToMake(lib) = decision(&resolved, "cat/lib") else {
        panic!("lib should be upgraded");
    };
    assert_eq!(lib.change_type, ChangeType::Upgrade);
    assert_eq!(lib.origin_id.version.to_string(), "2.0");

    let order = ordered_names(&resolved);
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(position("cat/lib") < position("cat/app"));
    assert!(position("cat/lib") < position("cat/mid"));
    assert!(position("cat/mid") < position("cat/other"));
    assert_eq!(resolved.job_list.len(), 8);
}

#[test]
fn test_restarts_disabled_leaves_resolvent_unable() {
    let env = late_conflict();
    let mut config = ResolverConfig::default();
    config.engine.max_restarts = 0;

    let resolved = resolve(&env, &config, &["cat/app", "cat/other"]);

    assert_eq!(resolved.restarts, 0);
    assert_eq!(kind(&resolved, "cat/lib"), DecisionKind::UnableToMake);
    assert!(!resolved.is_successful());
}

#[test]
fn test_restart_bound_is_an_error() {
    let env = late_conflict();
    let functions = StandardFunctions::from_config(&ResolverConfig::default()).unwrap();
    let resolver = Resolver::new(&env, Box::new(functions)).with_max_restarts(0);

    match resolver.resolve(&["cat/app", "cat/other"]) {
        Err(Error::TooManyRestarts { restarts, resolvent }) => {
            assert_eq!(restarts, 1);
            assert!(resolvent.contains("cat/lib"));
        }
        other => panic!("expected too many restarts, got {:?}", other.map(|r| r.restarts)),
    }
}

#[test]
fn test_preset_avoids_restart() {
    let env = late_conflict();
    let mut config = ResolverConfig::default();
    config.initial.preset = vec![">=cat/lib-2".to_string()];

    let resolved = resolve(&env, &config, &["cat/app", "cat/other"]);

    assert_eq!(resolved.restarts, 0);
    assert_eq!(kind(&resolved, "cat/lib"), DecisionKind::ChangesToMake);
}

#[test]
fn test_old_scm_package_is_reinstalled() {
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
    let live = PackageId::new("cat/live", "scm", "installed")
        .unwrap()
        .installed_at(now - Duration::days(40));
    let env = Universe::new()
        .available("cat/live", "scm", "")
        .with_id(
            PackageId::new("cat/app", "1.0", "repo")
                .unwrap()
                .with_dependencies(DependencyKey::Dependencies, "build+run: cat/live")
                .unwrap(),
        )
        .with_id(live)
        .build();

    let resolved = resolve_default(&env, &["cat/app"]);
    assert_eq!(kind(&resolved, "cat/live"), DecisionKind::ExistingNoChange);

    let mut config = ResolverConfig::default();
    config.initial.reinstall_scm_days = Some(30);
    let functions = StandardFunctions::from_config(&config).unwrap().with_now(now);
    let resolved = Resolver::new(&env, Box::new(functions))
        .resolve(&["cat/app"])
        .unwrap();
    let Decision::ChangesToMake(live) = decision(&resolved, "cat/live") else {
        panic!("live package should be reinstalled");
    };
    assert_eq!(live.change_type, ChangeType::Reinstall);
}
