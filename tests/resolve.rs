// tests/resolve.rs

//! End-to-end resolution scenarios: plain installs, optional dependencies,
//! purges, dependents and blockers.

mod common;

use common::*;
use pkgplan::resolver::{ChangeType, DecisionKind, RequiredConfirmation, RequiredIf, UseExisting};
use pkgplan::{Decision, Error, PackageId, Resolver, ResolverConfig, Tribool};

#[test]
fn test_installed_dependency_is_kept() {
    let env = Universe::new()
        .available("cat/app", "1.0", "build+run: cat/libfoo")
        .available("cat/libfoo", "1.0", "")
        .installed("cat/libfoo", "1.0", "")
        .build();

    let resolved = resolve_default(&env, &["cat/app"]);

    assert!(resolved.is_successful());
    assert_eq!(kind(&resolved, "cat/libfoo"), DecisionKind::ExistingNoChange);
    let Decision::ChangesToMake(app) = decision(&resolved, "cat/app") else {
        panic!("app should be installed");
    };
    assert_eq!(app.change_type, ChangeType::New);
    assert!(app.best);
    assert_eq!(
        app.destination.as_ref().map(|d| d.repository.as_str()),
        Some("installed")
    );

    assert_eq!(job_names(&resolved), vec!["fetch cat/app", "install cat/app"]);
    let install = resolved.job_list.get(1).unwrap();
    assert_eq!(install.requirements.len(), 1);
    assert_eq!(install.requirements[0].job, 0);
}

#[test]
fn test_new_dependency_is_installed_first() {
    let env = Universe::new()
        .available("cat/app", "1.0", "build+run: cat/libfoo")
        .available("cat/libfoo", "1.0", "")
        .available("cat/libfoo", "2.0", "")
        .build();

    let resolved = resolve_default(&env, &["cat/app"]);

    assert_eq!(ordered_names(&resolved), vec!["cat/libfoo", "cat/app"]);
    let Decision::ChangesToMake(lib) = decision(&resolved, "cat/libfoo") else {
        panic!("libfoo should be installed");
    };
    assert_eq!(lib.origin_id.version.to_string(), "2.0");

    let lib_install = resolved
        .job_list
        .main_job_for(&resolvent(&resolved, "cat/libfoo"))
        .unwrap();
    let app_install = resolved
        .job_list
        .main_job_for(&resolvent(&resolved, "cat/app"))
        .unwrap();
    let requirement = resolved
        .job_list
        .get(app_install)
        .unwrap()
        .requirements
        .iter()
        .find(|r| r.job == lib_install)
        .unwrap();
    assert!(requirement.required_if.contains(RequiredIf::SATISFIED | RequiredIf::INDEPENDENT));
}

#[test]
fn test_suggestion_is_left_untaken() {
    let env = Universe::new()
        .available("cat/app", "1.0", "suggestion: cat/extra")
        .available("cat/extra", "1.0", "")
        .build();

    let resolved = resolve_default(&env, &["cat/app"]);

    assert!(resolved.is_successful());
    assert!(!decision(&resolved, "cat/extra").taken());
    assert_eq!(
        resolved.untaken_change_or_remove_decisions,
        vec![resolvent(&resolved, "cat/extra")]
    );
    assert_eq!(job_names(&resolved), vec!["fetch cat/app", "install cat/app"]);
}

#[test]
fn test_suggestion_taken_when_configured() {
    let env = Universe::new()
        .available("cat/app", "1.0", "suggestion: cat/extra")
        .available("cat/extra", "1.0", "")
        .build();
    let mut config = ResolverConfig::default();
    config.interest.take_suggestions = Tribool::True;

    let resolved = resolve(&env, &config, &["cat/app"]);

    assert!(decision(&resolved, "cat/extra").taken());
    assert!(resolved.untaken_change_or_remove_decisions.is_empty());
    assert_eq!(job_names(&resolved).len(), 4);
}

#[test]
fn test_unused_package_is_purged_after_its_user() {
    let env = Universe::new()
        .installed("cat/target", "1.0", "run: cat/going")
        .installed("cat/going", "1.0", "")
        .available("cat/target", "2.0", "")
        .build();
    let mut config = ResolverConfig::default();
    config.removal.purge = vec!["cat/going".to_string()];

    let resolved = resolve(&env, &config, &["cat/target"]);

    assert!(resolved.is_successful());
    assert_eq!(kind(&resolved, "cat/going"), DecisionKind::Remove);
    assert!(decision(&resolved, "cat/going").taken());
    assert_eq!(
        job_names(&resolved),
        vec!["fetch cat/target", "install cat/target", "uninstall cat/going"]
    );
    let uninstall = resolved.job_list.get(2).unwrap();
    assert_eq!(uninstall.requirements.len(), 1);
    assert_eq!(uninstall.requirements[0].job, 1);
    assert!(uninstall.requirements[0].required_if.satisfied);
}

#[test]
fn test_unused_package_is_only_reported_without_purge() {
    let env = Universe::new()
        .installed("cat/target", "1.0", "run: cat/going")
        .installed("cat/going", "1.0", "")
        .available("cat/target", "2.0", "")
        .build();

    let resolved = resolve_default(&env, &["cat/target"]);

    assert_eq!(kind(&resolved, "cat/going"), DecisionKind::Remove);
    assert!(!decision(&resolved, "cat/going").taken());
    assert_eq!(
        resolved.untaken_change_or_remove_decisions,
        vec![resolvent(&resolved, "cat/going")]
    );
    assert_eq!(job_names(&resolved).len(), 2);
}

fn dependent_universe() -> pkgplan::PackageDatabase {
    Universe::new()
        .installed("cat/app", "1.0", "run: cat/lib")
        .installed("cat/lib", "1.0", "")
        .build()
}

#[test]
fn test_dependent_blocks_uninstall_by_default() {
    let env = dependent_universe();

    let resolved = resolve_default(&env, &["!cat/lib"]);

    assert_eq!(kind(&resolved, "cat/lib"), DecisionKind::Remove);
    assert_eq!(kind(&resolved, "cat/app"), DecisionKind::UnableToMake);
    assert_eq!(
        resolved.taken_unable_to_make_decisions,
        vec![resolvent(&resolved, "cat/app")]
    );
    assert!(!resolved.is_successful());
}

#[test]
fn test_dependent_removed_first_when_allowed() {
    let env = dependent_universe();
    let mut config = ResolverConfig::default();
    config.removal.remove_if_dependent = vec!["cat/app".to_string()];

    let resolved = resolve(&env, &config, &["!cat/lib"]);

    assert_eq!(kind(&resolved, "cat/app"), DecisionKind::Remove);
    assert_eq!(job_names(&resolved), vec!["uninstall cat/app", "uninstall cat/lib"]);
    assert_eq!(
        resolved.taken_unconfirmed_decisions,
        vec![resolvent(&resolved, "cat/app")]
    );
    assert_eq!(
        decision(&resolved, "cat/app").required_confirmations(),
        &[RequiredConfirmation::Uninstall]
    );

    config.confirm.permit_uninstall = vec!["cat/app".to_string()];
    let resolved = resolve(&env, &config, &["!cat/lib"]);
    assert!(resolved.is_successful());
}

#[test]
fn test_dependent_broken_when_permitted() {
    let env = dependent_universe();
    let mut config = ResolverConfig::default();
    config.removal.permit_any_break = true;

    let resolved = resolve(&env, &config, &["!cat/lib"]);

    assert_eq!(kind(&resolved, "cat/app"), DecisionKind::Break);
    assert_eq!(job_names(&resolved), vec!["uninstall cat/lib"]);
    assert!(resolved.is_successful());
}

#[test]
fn test_blocked_package_uninstalled_before_install() {
    let env = Universe::new()
        .available("cat/app", "1.0", "build+run: !!cat/old")
        .installed("cat/old", "1.0", "")
        .build();
    let mut config = ResolverConfig::default();
    config.removal.allowed_to_remove = vec!["cat/old".to_string()];
    config.confirm.permit_uninstall = vec!["cat/old".to_string()];

    let resolved = resolve(&env, &config, &["cat/app"]);

    assert!(resolved.is_successful());
    assert_eq!(
        job_names(&resolved),
        vec!["uninstall cat/old", "fetch cat/app", "install cat/app"]
    );
    let install = resolved.job_list.get(2).unwrap();
    let on_uninstall = install.requirements.iter().find(|r| r.job == 0).unwrap();
    assert_eq!(on_uninstall.required_if, RequiredIf::ALL);
}

#[test]
fn test_blocker_without_permission_is_unable() {
    let env = Universe::new()
        .available("cat/app", "1.0", "build+run: !cat/old")
        .installed("cat/old", "1.0", "")
        .build();

    let resolved = resolve_default(&env, &["cat/app"]);

    assert_eq!(kind(&resolved, "cat/old"), DecisionKind::UnableToMake);
    assert!(!resolved.is_successful());
    assert_eq!(job_names(&resolved), vec!["fetch cat/app", "install cat/app"]);
}

#[test]
fn test_unknown_target_is_reported() {
    let env = Universe::new().available("cat/app", "1.0", "").build();

    let resolved = resolve_default(&env, &["cat/app", "cat/missing"]);

    assert_eq!(kind(&resolved, "cat/missing"), DecisionKind::UnableToMake);
    assert_eq!(job_names(&resolved), vec!["fetch cat/app", "install cat/app"]);

    let resolver = Resolver::from_config(&env, &ResolverConfig::default()).unwrap();
    assert!(matches!(resolver.resolve(&["missing"]), Err(Error::NoSuchTarget(_))));
}

#[test]
fn test_set_target() {
    let mut env = Universe::new()
        .available("cat/a", "1.0", "")
        .available("cat/b", "1.0", "")
        .build();
    env.add_set(
        "world",
        vec![
            pkgplan::DepSpec::parse("cat/a").unwrap(),
            pkgplan::DepSpec::parse("cat/b").unwrap(),
        ],
    );

    let resolved = resolve_default(&env, &["@world"]);

    assert_eq!(ordered_names(&resolved), vec!["cat/a", "cat/b"]);
}

#[test]
fn test_installed_only_target_needs_transient_unless_if_possible() {
    let world = |env: &mut pkgplan::PackageDatabase| {
        env.add_set("world", vec![pkgplan::DepSpec::parse("cat/orphan").unwrap()]);
    };

    let mut env = Universe::new().installed("cat/orphan", "1.0", "").build();
    world(&mut env);
    let resolved = resolve_default(&env, &["@world"]);
    assert_eq!(kind(&resolved, "cat/orphan"), DecisionKind::UnableToMake);

    let mut config = ResolverConfig::default();
    config.use_existing.targets = UseExisting::IfSameVersion;
    let resolved = resolve(&env, &config, &["cat/orphan"]);
    assert_eq!(kind(&resolved, "cat/orphan"), DecisionKind::UnableToMake);

    config.use_existing.targets = UseExisting::IfPossible;
    let resolved = resolve(&env, &config, &["cat/orphan"]);
    assert_eq!(kind(&resolved, "cat/orphan"), DecisionKind::ExistingNoChange);

    let mut env = Universe::new()
        .with_id(
            PackageId::new("cat/orphan", "1.0", "installed")
                .unwrap()
                .transient(),
        )
        .build();
    world(&mut env);
    let resolved = resolve_default(&env, &["@world"]);
    assert_eq!(kind(&resolved, "cat/orphan"), DecisionKind::ExistingNoChange);
}

#[test]
fn test_untaken_suggestion_still_restricts_version() {
    let env = Universe::new()
        .available("cat/app", "1.0", "run: cat/lib suggestion: >=cat/lib-3")
        .available("cat/lib", "2.0", "")
        .available("cat/lib", "3.0", "")
        .installed("cat/lib", "2.0", "")
        .build();

    let resolved = resolve_default(&env, &["cat/app"]);

    assert!(resolved.is_successful());
    let Decision::ChangesToMake(lib) = decision(&resolved, "cat/lib") else {
        panic!("lib should move to a version the suggestion accepts");
    };
    assert_eq!(lib.origin_id.version.to_string(), "3.0");
    assert_eq!(lib.change_type, ChangeType::Upgrade);
}
