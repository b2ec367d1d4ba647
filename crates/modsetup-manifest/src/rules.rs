//! Compiled form of the extension module metadata
//!
//! Every version string and target regex in the metadata is parsed exactly
//! once here. Synthesis and reconciliation then work only with these types and
//! never fail on malformed input.

use crate::errors::{ManifestError, Result};
use crate::target::{BuildContext, TargetMatcher};
use crate::types::{ExtensionModules, ModuleSpec};
use crate::version::VersionRange;
use std::collections::BTreeMap;

/// Applicability of a conditional clause
#[derive(Debug, Clone)]
pub enum Condition {
    Always,
    When {
        targets: TargetMatcher,
        versions: VersionRange,
    },
}

impl Condition {
    pub fn new(targets: &[String], versions: VersionRange) -> Result<Self> {
        if targets.is_empty() && versions.is_unbounded() {
            return Ok(Condition::Always);
        }
        Ok(Condition::When {
            targets: TargetMatcher::compile(targets)?,
            versions,
        })
    }

    pub fn targets_only(targets: &[String]) -> Result<Self> {
        Self::new(targets, VersionRange::ANY)
    }

    pub fn is_satisfied(&self, ctx: &BuildContext) -> bool {
        match self {
            Condition::Always => true,
            Condition::When { targets, versions } => {
                targets.matches(&ctx.target_triple) && versions.contains(ctx.version)
            }
        }
    }
}

/// A value gated by a condition
#[derive(Debug, Clone)]
pub struct Conditional<T> {
    pub value: T,
    pub condition: Condition,
}

impl<T> Conditional<T> {
    fn new(value: T, condition: Condition) -> Self {
        Conditional { value, condition }
    }
}

/// Iterate the values of `clauses` whose condition holds for `ctx`
pub fn active<'a, T>(
    clauses: &'a [Conditional<T>],
    ctx: &'a BuildContext,
) -> impl Iterator<Item = &'a T> + 'a {
    clauses
        .iter()
        .filter(move |c| c.condition.is_satisfied(ctx))
        .map(|c| &c.value)
}

/// Extension module with all conditions compiled
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub name: String,
    pub sources: Vec<String>,
    pub sources_conditional: Vec<Conditional<String>>,
    pub defines: Vec<String>,
    pub defines_conditional: Vec<Conditional<String>>,
    pub includes: Vec<String>,
    pub includes_conditional: Vec<Conditional<String>>,
    pub includes_deps: Vec<String>,
    pub links: Vec<String>,
    pub links_conditional: Vec<Conditional<String>>,
    pub frameworks: Vec<String>,
    pub linker_args: Vec<Conditional<Vec<String>>>,
    /// `None` when the module is never disabled
    pub disabled_targets: Option<TargetMatcher>,
    pub required_targets: Option<TargetMatcher>,
    pub versions: VersionRange,
    pub setup_enabled: bool,
    pub config_c_only: bool,
}

impl CompiledModule {
    pub fn compile(name: &str, spec: &ModuleSpec) -> Result<Self> {
        Self::compile_inner(name, spec).map_err(|err| match err {
            ManifestError::InvalidVersion(v) => ManifestError::InvalidMetadata(format!(
                "{}: invalid Python version '{}'",
                name, v
            )),
            other => other,
        })
    }

    fn compile_inner(name: &str, spec: &ModuleSpec) -> Result<Self> {
        Ok(CompiledModule {
            name: name.to_string(),
            sources: spec.sources.clone(),
            sources_conditional: compile_clauses(&spec.sources_conditional, |c| {
                let versions = VersionRange::parse(
                    c.minimum_python_version.as_deref(),
                    c.maximum_python_version.as_deref(),
                )?;
                Ok(Conditional::new(
                    c.source.clone(),
                    Condition::new(&c.targets, versions)?,
                ))
            })?,
            defines: spec.defines.clone(),
            defines_conditional: compile_clauses(&spec.defines_conditional, |c| {
                let versions = VersionRange::parse(
                    c.minimum_python_version.as_deref(),
                    c.maximum_python_version.as_deref(),
                )?;
                Ok(Conditional::new(
                    c.define.clone(),
                    Condition::new(&c.targets, versions)?,
                ))
            })?,
            includes: spec.includes.clone(),
            includes_conditional: compile_clauses(&spec.includes_conditional, |c| {
                Ok(Conditional::new(
                    c.path.clone(),
                    Condition::targets_only(&c.targets)?,
                ))
            })?,
            includes_deps: spec.includes_deps.clone(),
            links: spec.links.clone(),
            links_conditional: compile_clauses(&spec.links_conditional, |c| {
                Ok(Conditional::new(
                    c.name.clone(),
                    Condition::targets_only(&c.targets)?,
                ))
            })?,
            frameworks: spec.frameworks.clone(),
            linker_args: compile_clauses(&spec.linker_args, |c| {
                Ok(Conditional::new(
                    c.args.clone(),
                    Condition::targets_only(&c.targets)?,
                ))
            })?,
            disabled_targets: optional_matcher(&spec.disabled_targets)?,
            required_targets: optional_matcher(&spec.required_targets)?,
            versions: VersionRange::parse(
                spec.minimum_python_version.as_deref(),
                spec.maximum_python_version.as_deref(),
            )?,
            setup_enabled: spec.setup_enabled,
            config_c_only: spec.config_c_only,
        })
    }

    pub fn applies_to_version(&self, ctx: &BuildContext) -> bool {
        self.versions.contains(ctx.version)
    }

    pub fn is_disabled_for(&self, ctx: &BuildContext) -> bool {
        self.disabled_targets
            .as_ref()
            .is_some_and(|m| m.matches(&ctx.target_triple))
    }

    pub fn is_required_for(&self, ctx: &BuildContext) -> bool {
        self.required_targets
            .as_ref()
            .is_some_and(|m| m.matches(&ctx.target_triple))
    }
}

fn compile_clauses<C, T>(
    clauses: &[C],
    compile: impl Fn(&C) -> Result<Conditional<T>>,
) -> Result<Vec<Conditional<T>>> {
    clauses.iter().map(compile).collect()
}

fn optional_matcher(patterns: &[String]) -> Result<Option<TargetMatcher>> {
    if patterns.is_empty() {
        Ok(None)
    } else {
        TargetMatcher::compile(patterns).map(Some)
    }
}

/// All compiled modules, keyed and iterated by name
#[derive(Debug, Clone, Default)]
pub struct ModuleSet {
    modules: BTreeMap<String, CompiledModule>,
}

impl ModuleSet {
    pub fn compile(modules: &ExtensionModules) -> Result<Self> {
        let mut compiled = BTreeMap::new();
        for (name, spec) in modules {
            compiled.insert(name.clone(), CompiledModule::compile(name, spec)?);
        }
        Ok(ModuleSet { modules: compiled })
    }

    pub fn get(&self, name: &str) -> Option<&CompiledModule> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledModule> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
