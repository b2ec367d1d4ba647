//! Loading of the extension module metadata file

use crate::errors::Result;
use crate::types::ExtensionModules;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse extension module metadata from YAML text
pub fn parse_extension_modules(content: &str) -> Result<ExtensionModules> {
    if content.trim().is_empty() {
        return Ok(ExtensionModules::new());
    }
    let modules: ExtensionModules = serde_yaml::from_str(content)?;
    Ok(modules)
}

/// Read and parse the metadata file at `path`
pub fn load_extension_modules(path: &Path) -> Result<ExtensionModules> {
    debug!("Reading extension module metadata from {:?}", path);
    let content = fs::read_to_string(path)?;
    let modules = parse_extension_modules(&content)?;
    debug!("Loaded metadata for {} extension modules", modules.len());
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use crate::errors::ManifestError;
    use crate::metadata::*;

    const SAMPLE: &str = r"
_bz2:
  sources:
    - _bz2module.c
  includes-deps:
    - include
  links:
    - bz2

_decimal:
  sources:
    - _decimal/_decimal.c
  defines-conditional:
    - define: CONFIG_64=1
      targets:
        - x86_64-.*
    - define: ANSI=1
      minimum-python-version: '3.12'
  setup-enabled: true

_scproxy:
  sources:
    - _scproxy.c
  frameworks:
    - CoreFoundation
  disabled-targets:
    - .*-unknown-linux-.*

_imp:
  config-c-only: true
";

    #[test]
    fn test_parse_sample_metadata() -> Result<()> {
        let modules = parse_extension_modules(SAMPLE)?;
        let names: Vec<&str> = modules.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["_bz2", "_decimal", "_imp", "_scproxy"]);

        let decimal = &modules["_decimal"];
        assert!(decimal.setup_enabled);
        assert_eq!(decimal.defines_conditional.len(), 2);
        assert_eq!(decimal.defines_conditional[0].targets, vec!["x86_64-.*"]);
        assert_eq!(
            decimal.defines_conditional[1].minimum_python_version.as_deref(),
            Some("3.12")
        );

        assert!(modules["_imp"].config_c_only);
        assert!(modules["_imp"].sources.is_empty());
        assert_eq!(modules["_bz2"].includes_deps, vec!["include"]);
        Ok(())
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = parse_extension_modules("_foo:\n  source: [foo.c]\n");
        assert!(matches!(result, Err(ManifestError::Yaml(_))));

        let result = parse_extension_modules(
            "_foo:\n  sources-conditional:\n    - source: a.c\n      target: [x]\n",
        );
        assert!(matches!(result, Err(ManifestError::Yaml(_))));
    }

    #[test]
    fn test_clause_requires_its_value() {
        let result = parse_extension_modules("_foo:\n  defines-conditional:\n    - targets: [x]\n");
        assert!(matches!(result, Err(ManifestError::Yaml(_))));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_extension_modules("\n").is_ok_and(|m| m.is_empty()));
    }
}
