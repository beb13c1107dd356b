// tests/determinism.rs

//! Resolving the same input twice gives the same plan.

mod common;

use common::*;
use pkgplan::ResolverConfig;

/// A late constraint forces a restart on `lib`, and `going` is purged once
/// `target` no longer needs it.
fn universe() -> pkgplan::PackageDatabase {
    Universe::new()
        .available("cat/app", "1.0", "build+run: cat/lib")
        .available("cat/other", "1.0", "build+run: cat/mid suggestion: cat/extra")
        .available("cat/mid", "1.0", "build+run: >=cat/lib-2")
        .available("cat/lib", "1.0", "")
        .available("cat/lib", "2.0", "")
        .available("cat/extra", "1.0", "")
        .available("cat/target", "2.0", "")
        .installed("cat/lib", "1.0", "")
        .installed("cat/target", "1.0", "run: cat/going")
        .installed("cat/going", "1.0", "")
        .build()
}

#[test]
fn test_repeated_resolution_is_identical() {
    let mut config = ResolverConfig::default();
    config.removal.purge = vec!["cat/going".to_string()];
    let targets = ["cat/app", "cat/other", "cat/target"];

    let first = resolve(&universe(), &config, &targets);
    let second = resolve(&universe(), &config, &targets);

    assert_eq!(first.restarts, 1);
    assert_eq!(kind(&first, "cat/going"), pkgplan::resolver::DecisionKind::Remove);
    assert_eq!(
        serde_json::to_string(&first.resolutions).unwrap(),
        serde_json::to_string(&second.resolutions).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first.job_list).unwrap(),
        serde_json::to_string(&second.job_list).unwrap()
    );
    assert_eq!(job_names(&first), job_names(&second));
    assert_eq!(first, second);
}
