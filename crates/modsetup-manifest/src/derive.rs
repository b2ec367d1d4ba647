//! End-to-end derivation of `Setup.local` for one (version, target) pair

use crate::archive::{read_dist_manifests, DistManifests};
use crate::config_c::parse_config_c;
use crate::errors::Result;
use crate::hoist::{hoist_defines, CflagsOverrides};
use crate::reconcile::{partition_modules, reconcile, ModulePartition, ReconciliationReport};
use crate::rules::ModuleSet;
use crate::setup_file::scan_setup_file;
use crate::synthesize::{synthesize_line, verify_line, SynthesisSettings};
use crate::target::BuildContext;
use crate::types::ExtensionModules;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

const STATIC_MARKER: &str = "*static*";
const DISABLED_MARKER: &str = "*disabled*";

/// Everything produced by a successful derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedSetup {
    /// Built-in module name -> init function from config.c.in
    pub config_c_extensions: BTreeMap<String, String>,
    /// The distribution's Setup file, line endings normalized
    pub setup_dist: String,
    pub setup_local: String,
    /// Makefile rules carrying hoisted defines
    pub make_data: String,
    pub partition: ModulePartition,
    pub report: ReconciliationReport,
}

/// Result of the consistency checks alone
#[derive(Debug, Clone)]
pub struct ConsistencyCheck {
    pub modules: ModuleSet,
    pub context: BuildContext,
    pub partition: ModulePartition,
    pub report: ReconciliationReport,
    pub config_c_extensions: BTreeMap<String, String>,
}

/// Compile metadata and cross-check it against the distribution.
///
/// Violations are returned in the report rather than as an error so callers
/// can present them however they like.
pub fn check_consistency(
    dist: &DistManifests,
    python_version: &str,
    target_triple: &str,
    extension_modules: &ExtensionModules,
) -> Result<ConsistencyCheck> {
    let context = BuildContext::parse(python_version, target_triple)?;
    let modules = ModuleSet::compile(extension_modules)?;
    debug!(
        "Compiled {} extension modules for {} {}",
        modules.len(),
        context.version,
        context.target_triple
    );

    let partition = partition_modules(&modules, &context)?;
    let inventory = scan_setup_file(&dist.setup);
    let config_c_extensions = parse_config_c(&dist.config_c_in);
    let config_c_names: BTreeSet<String> = config_c_extensions.keys().cloned().collect();

    let report = reconcile(&modules, &partition, &inventory, &config_c_names);

    Ok(ConsistencyCheck {
        modules,
        context,
        partition,
        report,
        config_c_extensions,
    })
}

/// Derive `Setup.local` and its Makefile supplement
pub fn derive_setup_local(
    dist: &DistManifests,
    python_version: &str,
    target_triple: &str,
    extension_modules: &ExtensionModules,
    settings: &SynthesisSettings,
) -> Result<DerivedSetup> {
    let check = check_consistency(dist, python_version, target_triple, extension_modules)?;
    check.report.clone().into_result()?;

    let ctx = &check.context;
    let mut setup_local = format!("{}\n", STATIC_MARKER);
    let mut overrides = CflagsOverrides::default();

    for module in check.modules.iter() {
        if check.partition.is_excluded(&module.name) {
            continue;
        }

        let Some(line) = synthesize_line(module, ctx, settings) else {
            continue;
        };

        let parsed = verify_line(&line, ctx)?;
        let hoisted = hoist_defines(&line)?;
        overrides.record(&parsed, &hoisted.defines);

        setup_local.push_str(&hoisted.line.render());
        setup_local.push('\n');
    }

    setup_local.push_str(&format!("\n{}\n\n", DISABLED_MARKER));
    for name in &check.partition.disabled {
        setup_local.push_str(name);
        setup_local.push('\n');
    }

    info!(
        "Derived Setup.local for {} ({} disabled, {} ignored)",
        ctx.target_triple,
        check.partition.disabled.len(),
        check.partition.ignored.len()
    );

    Ok(DerivedSetup {
        config_c_extensions: check.config_c_extensions,
        setup_dist: dist.setup.lines().collect::<Vec<_>>().join("\n"),
        setup_local,
        make_data: overrides.render(&settings.cflags_variable),
        partition: check.partition,
        report: check.report,
    })
}

/// Read the manifests from a tarball or source tree, then derive
pub fn derive_from_source(
    source: &Path,
    python_version: &str,
    target_triple: &str,
    extension_modules: &ExtensionModules,
    settings: &SynthesisSettings,
) -> Result<DerivedSetup> {
    let dist = read_dist_manifests(source, python_version)?;
    derive_setup_local(
        &dist,
        python_version,
        target_triple,
        extension_modules,
        settings,
    )
}

#[cfg(test)]
mod tests {
    use crate::derive::*;
    use crate::errors::ManifestError;
    use crate::metadata::parse_extension_modules;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    const SETUP: &str = "\
# Example Setup
PYTHONPATH=$(COREPYTHONPATH)

_abc _abc.c
#_lzma _lzmamodule.c -llzma
#_scproxy _scproxy.c
#_decimal _decimal/_decimal.c
";

    const CONFIG_C_IN: &str = r#"
struct _inittab _PyImport_Inittab[] = {
    {"marshal", PyMarshal_Init},
    {"_imp", PyInit__imp},
    /* Sentinel */
    {0, 0}
};
"#;

    const METADATA: &str = r"
_abc:
  sources: [_abc.c]
  setup-enabled: true
_decimal:
  sources:
    - _decimal/_decimal.c
    - _decimal/libmpdec/io.c
  defines:
    - CONFIG_64=1
    - ANSI
  includes:
    - _decimal/libmpdec
_imp:
  config-c-only: true
_lzma:
  sources: [_lzmamodule.c]
  includes-deps: [include]
  links: [lzma]
_scproxy:
  sources: [_scproxy.c]
  frameworks: [SystemConfiguration]
  disabled-targets: ['.*-unknown-linux-.*']
_tkinter:
  sources: [_tkinter.c]
  minimum-python-version: '3.14'
marshal:
  config-c-only: true
";

    fn dist() -> DistManifests {
        DistManifests {
            setup: SETUP.to_string(),
            config_c_in: CONFIG_C_IN.to_string(),
        }
    }

    fn derive(target: &str) -> Result<DerivedSetup> {
        derive_setup_local(
            &dist(),
            "3.11.4",
            target,
            &parse_extension_modules(METADATA)?,
            &SynthesisSettings::default(),
        )
    }

    #[test]
    fn test_linux_setup_local() -> Result<()> {
        let derived = derive("x86_64-unknown-linux-gnu")?;
        assert_eq!(
            derived.setup_local,
            "*static*\n\
             _abc _abc.c\n\
             _decimal _decimal/_decimal.c _decimal/libmpdec/io.c -DANSI -I_decimal/libmpdec\n\
             _lzma _lzmamodule.c -I/tools/deps/include -llzma\n\
             \n*disabled*\n\n\
             _scproxy\n"
        );
        assert_eq!(
            derived.make_data,
            "Modules/_decimal/_decimal.o: PY_STDMODULE_CFLAGS += -DCONFIG_64=1\n\
             Modules/_decimal/libmpdec/io.o: PY_STDMODULE_CFLAGS += -DCONFIG_64=1"
        );
        assert_eq!(
            derived.config_c_extensions.keys().collect::<Vec<_>>(),
            vec!["_imp", "marshal"]
        );
        assert!(derived.partition.ignored.contains("_tkinter"));
        assert!(derived.report.is_clean());
        Ok(())
    }

    #[test]
    fn test_apple_setup_local() -> Result<()> {
        let derived = derive("aarch64-apple-darwin")?;
        assert!(derived
            .setup_local
            .contains("_lzma _lzmamodule.c -Xlinker -hidden-llzma\n"));
        assert!(derived
            .setup_local
            .contains("_scproxy _scproxy.c -framework SystemConfiguration\n"));
        assert!(derived.setup_local.ends_with("\n*disabled*\n\n"));
        Ok(())
    }

    #[test]
    fn test_no_equals_in_setup_local() -> Result<()> {
        for target in ["x86_64-unknown-linux-gnu", "aarch64-apple-darwin"] {
            let derived = derive(target)?;
            let body = derived
                .setup_local
                .lines()
                .skip(1)
                .take_while(|l| !l.is_empty());
            for line in body {
                assert!(!line.contains('='), "{line}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_derivation_is_deterministic() -> Result<()> {
        let first = derive("x86_64-unknown-linux-gnu")?;
        let second = derive("x86_64-unknown-linux-gnu")?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_setup_dist_is_preserved() -> Result<()> {
        let derived = derive("x86_64-unknown-linux-gnu")?;
        assert_eq!(derived.setup_dist, SETUP.trim_end_matches('\n'));
        Ok(())
    }

    #[test]
    fn test_reconciliation_failure_aborts() -> Result<()> {
        let metadata = METADATA.replace("marshal:\n  config-c-only: true\n", "");
        let result = derive_setup_local(
            &dist(),
            "3.11",
            "x86_64-unknown-linux-gnu",
            &parse_extension_modules(&metadata)?,
            &SynthesisSettings::default(),
        );
        let Err(ManifestError::Reconciliation(report)) = result else {
            unreachable!("undeclared marshal must fail reconciliation");
        };
        assert_eq!(report.offending_names().into_iter().collect::<Vec<_>>(), vec!["marshal"]);
        Ok(())
    }

    #[test]
    fn test_invalid_version_is_rejected() -> Result<()> {
        let result = derive_setup_local(
            &dist(),
            "three",
            "x86_64-unknown-linux-gnu",
            &parse_extension_modules(METADATA)?,
            &SynthesisSettings::default(),
        );
        assert!(matches!(result, Err(ManifestError::InvalidVersion(_))));
        Ok(())
    }

    #[test]
    fn test_check_consistency_reports_without_failing() -> Result<()> {
        let setup = SETUP.replace("_abc _abc.c", "#_abc _abc.c");
        let dist = DistManifests {
            setup,
            config_c_in: CONFIG_C_IN.to_string(),
        };
        let check = check_consistency(
            &dist,
            "3.11",
            "x86_64-unknown-linux-gnu",
            &parse_extension_modules(METADATA)?,
        )?;
        assert!(check.report.setup_enabled_extra.contains("_abc"));
        assert!(check.partition.disabled.contains("_scproxy"));
        Ok(())
    }

    #[test]
    fn test_custom_cflags_variable() -> Result<()> {
        let settings = SynthesisSettings {
            cflags_variable: "MODULE_CFLAGS".to_string(),
            ..Default::default()
        };
        let derived = derive_setup_local(
            &dist(),
            "3.11",
            "x86_64-unknown-linux-gnu",
            &parse_extension_modules(METADATA)?,
            &settings,
        )?;
        assert!(derived
            .make_data
            .lines()
            .all(|l| l.contains(": MODULE_CFLAGS += -DCONFIG_64=1")));
        Ok(())
    }

    fn write_tarball(dir: &TempDir) -> std::io::Result<std::path::PathBuf> {
        let mut builder = tar::Builder::new(Vec::new());
        for (member, content) in [
            ("Python-3.11.4/Modules/Setup", SETUP),
            ("Python-3.11.4/Modules/config.c.in", CONFIG_C_IN),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, member, content.as_bytes())?;
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&builder.into_inner()?)?;

        let path = dir.path().join("Python-3.11.4.tgz");
        fs::write(&path, encoder.finish()?)?;
        Ok(path)
    }

    #[test]
    fn test_derive_from_tarball_matches_in_memory() -> Result<()> {
        let dir = TempDir::new()?;
        let archive = write_tarball(&dir)?;

        let from_archive = derive_from_source(
            &archive,
            "3.11.4",
            "x86_64-unknown-linux-gnu",
            &parse_extension_modules(METADATA)?,
            &SynthesisSettings::default(),
        )?;
        assert_eq!(from_archive, derive("x86_64-unknown-linux-gnu")?);
        assert!(from_archive.setup_local.starts_with("*static*\n_abc _abc.c\n"));
        Ok(())
    }

    #[test]
    fn test_derive_from_tarball_reports_violations() -> Result<()> {
        let dir = TempDir::new()?;
        let archive = write_tarball(&dir)?;
        let metadata = METADATA.replace("_imp:\n  config-c-only: true\n", "");

        let result = derive_from_source(
            &archive,
            "3.11.4",
            "x86_64-unknown-linux-gnu",
            &parse_extension_modules(&metadata)?,
            &SynthesisSettings::default(),
        );
        let Err(ManifestError::Reconciliation(report)) = result else {
            unreachable!("undeclared _imp must fail reconciliation");
        };
        assert!(report.missing_from_metadata.contains("_imp"));
        assert!(report.config_c_only_missing.contains("_imp"));
        Ok(())
    }

    #[test]
    fn test_derive_from_missing_member() -> Result<()> {
        let dir = TempDir::new()?;
        let archive = write_tarball(&dir)?;
        let result = derive_from_source(
            &archive,
            "3.12.0",
            "x86_64-unknown-linux-gnu",
            &parse_extension_modules(METADATA)?,
            &SynthesisSettings::default(),
        );
        assert!(matches!(
            result,
            Err(ManifestError::MissingDistFile { ref path }) if path == "Python-3.12.0/Modules/Setup"
        ));
        Ok(())
    }

    const ABC_CONDITIONAL: &str = "\
_abc:
  sources: [_abc.c]
  setup-enabled: true
  defines-conditional:
    - define: OLD=1
      maximum-python-version: '3.10'
  includes-conditional:
    - path: inc
";

    fn derive_abc(abc: &str, python_version: &str) -> Result<DerivedSetup> {
        let metadata = METADATA.replace("_abc:\n  sources: [_abc.c]\n  setup-enabled: true\n", abc);
        derive_setup_local(
            &dist(),
            python_version,
            "x86_64-unknown-linux-gnu",
            &parse_extension_modules(&metadata)?,
            &SynthesisSettings::default(),
        )
    }

    #[test]
    fn test_conditional_define_honors_maximum_version() -> Result<()> {
        let old = derive_abc(ABC_CONDITIONAL, "3.10")?;
        assert!(old.setup_local.contains("\n_abc _abc.c -Iinc\n"));
        assert!(old
            .make_data
            .starts_with("Modules/_abc.o: PY_STDMODULE_CFLAGS += -DOLD=1\n"));

        let current = derive_abc(ABC_CONDITIONAL, "3.11")?;
        assert!(current.setup_local.contains("\n_abc _abc.c -Iinc\n"));
        assert!(!current.make_data.contains("_abc.o"));
        assert!(!current.make_data.contains("OLD"));
        Ok(())
    }

    #[test]
    fn test_empty_define_value_is_fatal() -> Result<()> {
        let abc = "_abc:\n  sources: [_abc.c]\n  setup-enabled: true\n  defines: ['FOO=']\n";
        let result = derive_abc(abc, "3.11");
        assert!(matches!(
            result,
            Err(ManifestError::InternalConsistency(ref msg)) if msg.contains("_abc _abc.c -DFOO=")
        ));
        Ok(())
    }
}
