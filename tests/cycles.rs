// tests/cycles.rs

//! Ordering of decisions that depend on each other.

mod common;

use common::*;
use pkgplan::resolver::DecisionKind;

#[test]
fn test_run_dependency_cycle_is_ordered() {
    let env = Universe::new()
        .available("cat/a", "1.0", "run: cat/b")
        .available("cat/b", "1.0", "run: cat/a")
        .build();

    let resolved = resolve_default(&env, &["cat/a"]);

    assert!(resolved.is_successful());
    let mut names = ordered_names(&resolved);
    names.sort();
    assert_eq!(names, vec!["cat/a", "cat/b"]);
    for ordered in &resolved.taken_change_or_remove_decisions {
        assert_eq!(ordered.notes, vec!["run dependency cycle broken arbitrarily"]);
    }
    assert_eq!(resolved.job_list.len(), 4);
}

#[test]
fn test_build_dependency_cycle_is_unorderable() {
    let env = Universe::new()
        .available("cat/a", "1.0", "build: cat/b")
        .available("cat/b", "1.0", "build: cat/a")
        .build();

    let resolved = resolve_default(&env, &["cat/a"]);

    assert_eq!(kind(&resolved, "cat/a"), DecisionKind::ChangesToMake);
    assert_eq!(kind(&resolved, "cat/b"), DecisionKind::ChangesToMake);
    assert!(resolved.taken_change_or_remove_decisions.is_empty());
    assert_eq!(resolved.taken_unorderable_decisions.len(), 2);
    assert!(resolved.job_list.is_empty());
    assert!(!resolved.is_successful());
}

#[test]
fn test_cycle_met_by_installed_packages_is_ordered() {
    let env = Universe::new()
        .installed("cat/a", "1.0", "")
        .installed("cat/b", "1.0", "")
        .available("cat/a", "2.0", "build: cat/b")
        .available("cat/b", "2.0", "build: cat/a")
        .build();

    let resolved = resolve_default(&env, &["cat/a", "cat/b"]);

    assert!(resolved.is_successful());
    assert_eq!(resolved.taken_change_or_remove_decisions.len(), 2);
    for ordered in &resolved.taken_change_or_remove_decisions {
        assert_eq!(
            ordered.notes,
            vec!["cycle broken by ignoring already met dependencies"]
        );
    }
    assert_eq!(resolved.job_list.len(), 4);
}

#[test]
fn test_unchanged_package_in_cycle_is_skipped() {
    let env = Universe::new()
        .installed("cat/b", "1.0", "run: cat/a")
        .available("cat/b", "1.0", "run: cat/a")
        .available("cat/a", "1.0", "build+run: cat/b")
        .build();

    let resolved = resolve_default(&env, &["cat/a"]);

    assert!(resolved.is_successful());
    assert_eq!(kind(&resolved, "cat/b"), DecisionKind::ExistingNoChange);
    assert_eq!(ordered_names(&resolved), vec!["cat/a"]);
}
