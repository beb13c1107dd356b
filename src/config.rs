// src/config.rs

//! Resolver policy configuration
//!
//! Every knob the standard policy functions consult, loadable from TOML.
//! All sections are optional; an empty file gives the default policy.
//!
//! ```toml
//! cannot-use = ["dev-lang/broken"]
//!
//! [interest]
//! take-suggestions = "true"
//! ignore-groups = ["docs"]
//!
//! [removal]
//! purge = ["dev-libs/leftover"]
//!
//! [engine]
//! max-restarts = 10
//! continue-on-failure = "if-independent"
//! ```

use crate::error::{Error, Result};
use crate::resolver::{ContinueOnFailure, DestinationType, UseExisting};
use crate::spec::parse_specs;
use crate::tribool::Tribool;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum_macros::{Display, EnumString};
use tracing::debug;

/// Default bound on resolution restarts
pub const DEFAULT_MAX_RESTARTS: usize = 20;

/// Complete resolver policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResolverConfig {
    /// Packages that must never be chosen as install candidates
    pub cannot_use: Vec<String>,
    pub interest: InterestConfig,
    pub use_existing: UseExistingConfig,
    pub slots: SlotsConfig,
    pub destinations: DestinationsConfig,
    pub removal: RemovalConfig,
    pub confirm: ConfirmConfig,
    pub ordering: OrderingConfig,
    pub preference: PreferenceConfig,
    pub initial: InitialConfig,
    pub engine: EngineConfig,
}

/// Which optional dependencies to take, and which dependencies to follow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct InterestConfig {
    /// Optional dependencies on these packages are taken
    pub take: Vec<String>,
    /// Optional dependencies of these packages are taken
    pub take_from: Vec<String>,
    /// Suggestion groups whose members are taken
    pub take_groups: Vec<String>,
    pub ignore: Vec<String>,
    pub ignore_from: Vec<String>,
    pub ignore_groups: Vec<String>,
    /// Blockers of these packages are not considered
    pub no_blockers_from: Vec<String>,
    /// Dependencies of these packages are not considered
    pub no_dependencies_from: Vec<String>,
    pub follow_installed_build_dependencies: bool,
    pub follow_installed_dependencies: bool,
    pub take_suggestions: Tribool,
    pub take_recommendations: Tribool,
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            take: Vec::new(),
            take_from: Vec::new(),
            take_groups: Vec::new(),
            ignore: Vec::new(),
            ignore_from: Vec::new(),
            ignore_groups: Vec::new(),
            no_blockers_from: Vec::new(),
            no_dependencies_from: Vec::new(),
            follow_installed_build_dependencies: false,
            follow_installed_dependencies: true,
            take_suggestions: Tribool::Indeterminate,
            take_recommendations: Tribool::True,
        }
    }
}

/// When an installed package may satisfy a constraint instead of a new one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UseExistingConfig {
    pub targets: UseExisting,
    pub set_targets: UseExisting,
    pub dependencies: UseExisting,
}

impl Default for UseExistingConfig {
    fn default() -> Self {
        Self {
            targets: UseExisting::Never,
            set_targets: UseExisting::IfSame,
            dependencies: UseExisting::IfPossible,
        }
    }
}

/// How to pick slots for a spec that does not name one
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SlotSelection {
    /// The slot of the best installable candidate
    Best,
    /// The slots of matching installed packages
    Installed,
    /// Best if anything is installable, else installed
    BestOrInstalled,
    /// Installed if anything is installed, else best
    InstalledOrBest,
    /// Best and every installed slot
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SlotsConfig {
    pub targets: SlotSelection,
    pub dependencies: SlotSelection,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            targets: SlotSelection::BestOrInstalled,
            dependencies: SlotSelection::InstalledOrBest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DestinationsConfig {
    /// Where targets go
    pub targets: DestinationType,
    /// Send every dependency to the live system, even for binary builds
    pub dependencies_to_slash: bool,
    /// Live installs of these packages go via a newly built binary
    pub make_binaries: Vec<String>,
}

impl Default for DestinationsConfig {
    fn default() -> Self {
        Self {
            targets: DestinationType::InstallToSlash,
            dependencies_to_slash: true,
            make_binaries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RemovalConfig {
    /// Unused packages matching these are removed
    pub purge: Vec<String>,
    /// Dependents matching these are removed rather than rebuilt
    pub remove_if_dependent: Vec<String>,
    /// Packages that may be uninstalled to satisfy a blocker
    pub allowed_to_remove: Vec<String>,
    /// Installed packages that may be left with broken dependencies
    pub allowed_to_break: Vec<String>,
    pub permit_any_break: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConfirmConfig {
    pub permit_downgrade: Vec<String>,
    pub permit_old_version: Vec<String>,
    pub permit_uninstall: Vec<String>,
    pub permit_new_slot: bool,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            permit_downgrade: Vec::new(),
            permit_old_version: Vec::new(),
            permit_uninstall: Vec::new(),
            permit_new_slot: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OrderingConfig {
    pub early: Vec<String>,
    pub late: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PreferenceConfig {
    pub prefer: Vec<String>,
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct InitialConfig {
    /// Constraints applied to matching resolvents from the start
    pub preset: Vec<String>,
    /// Nothing matching these may be installed
    pub without: Vec<String>,
    /// Reinstall installed scm packages older than this many days
    pub reinstall_scm_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    pub max_restarts: usize,
    pub continue_on_failure: ContinueOnFailure,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_restarts: DEFAULT_MAX_RESTARTS,
            continue_on_failure: ContinueOnFailure::default(),
        }
    }
}

impl ResolverConfig {
    /// Load and validate a policy file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a policy from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ResolverConfig = toml::from_str(content)?;
        config.validate()?;
        debug!("Loaded resolver policy");
        Ok(config)
    }

    /// Check that every spec list parses and the engine bounds are sane
    pub fn validate(&self) -> Result<()> {
        let lists: [(&str, &[String]); 20] = [
            ("cannot-use", &self.cannot_use),
            ("interest.take", &self.interest.take),
            ("interest.take-from", &self.interest.take_from),
            ("interest.ignore", &self.interest.ignore),
            ("interest.ignore-from", &self.interest.ignore_from),
            ("interest.no-blockers-from", &self.interest.no_blockers_from),
            ("interest.no-dependencies-from", &self.interest.no_dependencies_from),
            ("destinations.make-binaries", &self.destinations.make_binaries),
            ("removal.purge", &self.removal.purge),
            ("removal.remove-if-dependent", &self.removal.remove_if_dependent),
            ("removal.allowed-to-remove", &self.removal.allowed_to_remove),
            ("removal.allowed-to-break", &self.removal.allowed_to_break),
            ("confirm.permit-downgrade", &self.confirm.permit_downgrade),
            ("confirm.permit-old-version", &self.confirm.permit_old_version),
            ("confirm.permit-uninstall", &self.confirm.permit_uninstall),
            ("ordering.early", &self.ordering.early),
            ("ordering.late", &self.ordering.late),
            ("preference.prefer", &self.preference.prefer),
            ("preference.avoid", &self.preference.avoid),
            ("initial.without", &self.initial.without),
        ];
        for (section, specs) in lists {
            parse_specs(specs)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", section, e)))?;
        }
        for preset in &self.initial.preset {
            crate::spec::DepSpec::parse(preset)
                .map_err(|e| Error::InvalidConfig(format!("initial.preset: {}", e)))?;
        }

        if let Some(days) = self.initial.reinstall_scm_days
            && days < 0
        {
            return Err(Error::InvalidConfig(format!(
                "initial.reinstall-scm-days must not be negative (got {})",
                days
            )));
        }
        Ok(())
    }
}
