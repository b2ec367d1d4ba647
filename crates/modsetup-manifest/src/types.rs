//! Declarative extension module metadata
//!
//! These types mirror the `extension-modules.yml` document one-to-one. Field
//! names are kebab-case in YAML and every record rejects unknown fields, so a
//! typo in the metadata fails at load time rather than silently changing the
//! generated `Setup.local`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Module name to metadata, iterated in name order
pub type ExtensionModules = BTreeMap<String, ModuleSpec>;

// =============================================================================
// MODULE SPEC
// =============================================================================

/// Build recipe for a single extension module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ModuleSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_conditional: Vec<SourceClause>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines_conditional: Vec<DefineClause>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes_conditional: Vec<IncludeClause>,
    /// Include directories of bundled dependencies, relative to the deps prefix
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes_deps: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links_conditional: Vec<LinkClause>,
    /// Apple frameworks; ignored on other targets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frameworks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linker_args: Vec<LinkerArgsClause>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_targets: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_python_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_python_version: Option<String>,

    /// Module appears uncommented in `Modules/Setup`
    #[serde(default)]
    pub setup_enabled: bool,
    /// Module appears only in `Modules/config.c.in`
    #[serde(default)]
    pub config_c_only: bool,
}

// =============================================================================
// CONDITIONAL CLAUSES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SourceClause {
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_python_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_python_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DefineClause {
    pub define: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_python_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_python_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct IncludeClause {
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LinkClause {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LinkerArgsClause {
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}
