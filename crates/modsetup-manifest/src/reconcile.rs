//! Cross-validation of extension module metadata against the distribution
//!
//! Metadata drifting out of sync with CPython has historically produced
//! subtle, hard to diagnose build bugs. Every check runs on every derivation
//! and all violations are reported together.

use crate::errors::{ManifestError, Result};
use crate::rules::ModuleSet;
use crate::setup_file::SetupInventory;
use crate::target::BuildContext;
use std::collections::BTreeSet;
use std::fmt;
use tracing::info;

// =============================================================================
// PARTITION
// =============================================================================

/// How the metadata applies to one (version, target) pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModulePartition {
    /// Outside the module's Python version range; excluded from everything
    pub ignored: BTreeSet<String>,
    /// Applicable to the version but disabled for the target triple
    pub disabled: BTreeSet<String>,
    pub setup_enabled_wanted: BTreeSet<String>,
    pub config_c_only_wanted: BTreeSet<String>,
}

impl ModulePartition {
    pub fn is_excluded(&self, name: &str) -> bool {
        self.ignored.contains(name) || self.disabled.contains(name)
    }
}

/// Classify every module against the build context.
///
/// Fails only when a module is both required and disabled for the target.
pub fn partition_modules(modules: &ModuleSet, ctx: &BuildContext) -> Result<ModulePartition> {
    let mut partition = ModulePartition::default();

    for module in modules.iter() {
        if !module.applies_to_version(ctx) {
            info!(
                "ignoring extension module {} because Python version incompatible",
                module.name
            );
            partition.ignored.insert(module.name.clone());
            continue;
        }

        if module.is_disabled_for(ctx) {
            if module.is_required_for(ctx) {
                return Err(ManifestError::InvalidMetadata(format!(
                    "{} is both required and disabled for {}",
                    module.name, ctx.target_triple
                )));
            }
            info!(
                "disabling extension module {} because disabled for this target triple",
                module.name
            );
            partition.disabled.insert(module.name.clone());
        }

        if module.setup_enabled {
            partition.setup_enabled_wanted.insert(module.name.clone());
        }

        if module.config_c_only {
            partition.config_c_only_wanted.insert(module.name.clone());
        }
    }

    Ok(partition)
}

// =============================================================================
// REPORT
// =============================================================================

/// Disagreements between metadata and the distribution. Any non-empty set is fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Known to the distribution but absent from the metadata
    pub missing_from_metadata: BTreeSet<String>,
    /// Enabled in Setup but lacking `setup-enabled`
    pub setup_enabled_missing: BTreeSet<String>,
    /// Marked `setup-enabled` but not enabled in Setup
    pub setup_enabled_extra: BTreeSet<String>,
    /// In config.c.in but lacking `config-c-only`
    pub config_c_only_missing: BTreeSet<String>,
    /// Marked `config-c-only` but absent from config.c.in
    pub config_c_only_extra: BTreeSet<String>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.sections().iter().all(|(_, names)| names.is_empty())
    }

    /// Every offending name across all checks, sorted and deduplicated
    pub fn offending_names(&self) -> BTreeSet<&str> {
        self.sections()
            .iter()
            .flat_map(|(_, names)| names.iter().map(String::as_str))
            .collect()
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(ManifestError::Reconciliation(self))
        }
    }

    fn sections(&self) -> [(&'static str, &BTreeSet<String>); 5] {
        [
            (
                "missing extension modules from metadata",
                &self.missing_from_metadata,
            ),
            (
                "Setup enabled extensions missing setup-enabled annotation",
                &self.setup_enabled_missing,
            ),
            (
                "setup-enabled extensions not present in Setup",
                &self.setup_enabled_extra,
            ),
            (
                "config.c.in extensions missing config-c-only annotation",
                &self.config_c_only_missing,
            ),
            (
                "config-c-only extensions not present in config.c.in",
                &self.config_c_only_extra,
            ),
        ]
    }
}

impl fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (label, names) in self.sections() {
            if names.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            let joined: Vec<&str> = names.iter().map(String::as_str).collect();
            write!(f, "  - {}: {}", label, joined.join(", "))?;
        }
        Ok(())
    }
}

/// Run all four consistency checks
pub fn reconcile(
    modules: &ModuleSet,
    partition: &ModulePartition,
    setup: &SetupInventory,
    config_c_extensions: &BTreeSet<String>,
) -> ReconciliationReport {
    let dist_modules: BTreeSet<&String> = setup
        .dist_modules
        .iter()
        .chain(config_c_extensions.iter())
        .collect();

    ReconciliationReport {
        missing_from_metadata: dist_modules
            .into_iter()
            .filter(|name| !modules.contains(name))
            .cloned()
            .collect(),
        setup_enabled_missing: setup
            .enabled
            .difference(&partition.setup_enabled_wanted)
            .cloned()
            .collect(),
        setup_enabled_extra: partition
            .setup_enabled_wanted
            .difference(&setup.enabled)
            .cloned()
            .collect(),
        config_c_only_missing: config_c_extensions
            .difference(&partition.config_c_only_wanted)
            .cloned()
            .collect(),
        config_c_only_extra: partition
            .config_c_only_wanted
            .difference(config_c_extensions)
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::parse_extension_modules;
    use crate::reconcile::*;
    use crate::setup_file::scan_setup_file;
    use crate::version::PythonVersion;

    const METADATA: &str = r"
_abc:
  sources: [_abc.c]
  setup-enabled: true
_lzma:
  sources: [_lzmamodule.c]
  links: [lzma]
_imp:
  config-c-only: true
_tkinter:
  sources: [_tkinter.c]
  maximum-python-version: '3.10'
_scproxy:
  sources: [_scproxy.c]
  disabled-targets: ['.*-unknown-linux-.*']
";

    const SETUP: &str = "_abc _abc.c\n#_lzma _lzmamodule.c -llzma\n#_scproxy _scproxy.c\n";

    fn context() -> BuildContext {
        BuildContext::new(PythonVersion::new(3, 11), "x86_64-unknown-linux-gnu")
    }

    fn run(metadata: &str, setup: &str, config_c: &[&str]) -> Result<ReconciliationReport> {
        let modules = ModuleSet::compile(&parse_extension_modules(metadata)?)?;
        let partition = partition_modules(&modules, &context())?;
        let config_c: BTreeSet<String> = config_c.iter().map(|s| (*s).to_string()).collect();
        Ok(reconcile(
            &modules,
            &partition,
            &scan_setup_file(setup),
            &config_c,
        ))
    }

    #[test]
    fn test_partition() -> Result<()> {
        let modules = ModuleSet::compile(&parse_extension_modules(METADATA)?)?;
        let partition = partition_modules(&modules, &context())?;
        assert!(partition.ignored.contains("_tkinter"));
        assert!(partition.disabled.contains("_scproxy"));
        assert!(partition.is_excluded("_scproxy"));
        assert!(!partition.is_excluded("_abc"));
        assert!(partition.setup_enabled_wanted.contains("_abc"));
        assert!(partition.config_c_only_wanted.contains("_imp"));
        Ok(())
    }

    #[test]
    fn test_agreeing_inputs_are_clean() -> Result<()> {
        let report = run(METADATA, SETUP, &["_imp"])?;
        assert!(report.is_clean(), "unexpected violations: {report}");
        assert!(report.into_result().is_ok());
        Ok(())
    }

    #[test]
    fn test_undeclared_distribution_module() -> Result<()> {
        let setup = format!("{SETUP}#_curses _cursesmodule.c -lncurses\n");
        let report = run(METADATA, &setup, &["_imp"])?;
        assert_eq!(report.offending_names(), BTreeSet::from(["_curses"]));
        assert!(report.missing_from_metadata.contains("_curses"));
        Ok(())
    }

    #[test]
    fn test_undeclared_config_c_module_reported_twice_over() -> Result<()> {
        let report = run(METADATA, SETUP, &["_imp", "marshal"])?;
        assert!(report.missing_from_metadata.contains("marshal"));
        assert!(report.config_c_only_missing.contains("marshal"));
        assert_eq!(report.offending_names(), BTreeSet::from(["marshal"]));
        Ok(())
    }

    #[test]
    fn test_setup_enabled_missing_annotation() -> Result<()> {
        let setup = SETUP.replace("#_lzma", "_lzma");
        let report = run(METADATA, &setup, &["_imp"])?;
        assert_eq!(report.setup_enabled_missing, BTreeSet::from(["_lzma".to_string()]));
        assert_eq!(report.offending_names(), BTreeSet::from(["_lzma"]));
        Ok(())
    }

    #[test]
    fn test_setup_enabled_not_in_setup() -> Result<()> {
        let setup = SETUP.replace("_abc _abc.c", "#_abc _abc.c");
        let report = run(METADATA, &setup, &["_imp"])?;
        assert_eq!(report.setup_enabled_extra, BTreeSet::from(["_abc".to_string()]));
        assert_eq!(report.offending_names(), BTreeSet::from(["_abc"]));
        Ok(())
    }

    #[test]
    fn test_config_c_only_mismatch_both_directions() -> Result<()> {
        let report = run(METADATA, SETUP, &[])?;
        assert_eq!(report.config_c_only_extra, BTreeSet::from(["_imp".to_string()]));
        assert_eq!(report.offending_names(), BTreeSet::from(["_imp"]));

        let metadata = format!("{METADATA}_warnings:\n  sources: []\n");
        let report = run(&metadata, SETUP, &["_imp", "_warnings"])?;
        assert_eq!(report.config_c_only_missing, BTreeSet::from(["_warnings".to_string()]));
        assert_eq!(report.offending_names(), BTreeSet::from(["_warnings"]));
        Ok(())
    }

    #[test]
    fn test_all_violations_reported_together() -> Result<()> {
        let setup = "_lzma _lzmamodule.c\n#_curses _cursesmodule.c\n";
        let report = run(METADATA, setup, &[])?;
        assert!(report.missing_from_metadata.contains("_curses"));
        assert!(report.setup_enabled_missing.contains("_lzma"));
        assert!(report.setup_enabled_extra.contains("_abc"));
        assert!(report.config_c_only_extra.contains("_imp"));

        let Err(err) = report.into_result() else {
            unreachable!("violations must fail");
        };
        let message = err.to_string();
        assert!(message.contains("missing extension modules from metadata: _curses"));
        assert!(message.contains("setup-enabled extensions not present in Setup: _abc"));
        assert!(message.contains("config-c-only extensions not present in config.c.in: _imp"));
        Ok(())
    }

    #[test]
    fn test_ignored_module_still_counts_as_declared() -> Result<()> {
        let setup = format!("{SETUP}#_tkinter _tkinter.c\n");
        let report = run(METADATA, &setup, &["_imp"])?;
        assert!(report.is_clean());
        Ok(())
    }

    #[test]
    fn test_required_and_disabled_is_config_error() -> Result<()> {
        let metadata = "_foo:\n  sources: [foo.c]\n  disabled-targets: ['x86_64-.*']\n  required-targets: ['.*-linux-.*']\n";
        let modules = ModuleSet::compile(&parse_extension_modules(metadata)?)?;
        assert!(matches!(
            partition_modules(&modules, &context()),
            Err(ManifestError::InvalidMetadata(ref msg)) if msg.contains("_foo")
        ));
        Ok(())
    }
}
