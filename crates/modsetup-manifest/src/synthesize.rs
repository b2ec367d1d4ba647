//! Translation of compiled module metadata into Setup lines

use crate::errors::{ManifestError, Result};
use crate::rules::{active, CompiledModule};
use crate::setup_line::{parse_setup_line, ParsedSetupLine};
use crate::target::BuildContext;
use tracing::debug;

/// Default prefix for `includes-deps` directories
pub const DEFAULT_DEPS_PREFIX: &str = "/tools/deps";

/// Default Makefile variable receiving hoisted defines
pub const DEFAULT_CFLAGS_VARIABLE: &str = "PY_STDMODULE_CFLAGS";

/// Knobs for the generated output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisSettings {
    pub dependency_include_prefix: String,
    pub cflags_variable: String,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        SynthesisSettings {
            dependency_include_prefix: DEFAULT_DEPS_PREFIX.to_string(),
            cflags_variable: DEFAULT_CFLAGS_VARIABLE.to_string(),
        }
    }
}

/// One Setup line as whitespace-separated tokens, module name first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupLine {
    pub tokens: Vec<String>,
}

impl SetupLine {
    fn new(name: &str) -> Self {
        SetupLine {
            tokens: vec![name.to_string()],
        }
    }

    pub fn name(&self) -> &str {
        self.tokens.first().map_or("", String::as_str)
    }

    fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    pub fn render(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Build the Setup line for `module`, or `None` if it has no sources.
///
/// Callers are expected to have filtered out ignored and disabled modules.
pub fn synthesize_line(
    module: &CompiledModule,
    ctx: &BuildContext,
    settings: &SynthesisSettings,
) -> Option<SetupLine> {
    if module.sources.is_empty() {
        return None;
    }

    debug!("deriving Setup line for {}", module.name);
    let platform = ctx.platform;
    let mut line = SetupLine::new(&module.name);

    for source in module
        .sources
        .iter()
        .chain(active(&module.sources_conditional, ctx))
    {
        line.push(source.as_str());
    }

    for define in module
        .defines
        .iter()
        .chain(active(&module.defines_conditional, ctx))
    {
        line.push(format!("-D{}", define));
    }

    for path in module
        .includes
        .iter()
        .chain(active(&module.includes_conditional, ctx))
    {
        line.push(format!("-I{}", path));
    }

    if !platform.uses_global_dependency_includes() {
        for path in &module.includes_deps {
            line.push(format!(
                "-I{}/{}",
                settings.dependency_include_prefix.trim_end_matches('/'),
                path
            ));
        }
    }

    for lib in module
        .links
        .iter()
        .chain(active(&module.links_conditional, ctx))
    {
        for token in platform.link_flag(lib).split(' ') {
            line.push(token);
        }
    }

    if platform.supports_frameworks() {
        for framework in &module.frameworks {
            line.push("-framework");
            line.push(framework.as_str());
        }
    }

    for args in active(&module.linker_args, ctx) {
        for arg in args {
            line.push("-Xlinker");
            line.push(arg.as_str());
        }
    }

    Some(line)
}

/// Re-parse a synthesized line; it must round-trip to the same module name
pub fn verify_line(line: &SetupLine, ctx: &BuildContext) -> Result<ParsedSetupLine> {
    let rendered = line.render();
    match parse_setup_line(&rendered, ctx.version) {
        Some(parsed) if parsed.extension == line.name() => Ok(parsed),
        Some(parsed) => Err(ManifestError::InternalConsistency(format!(
            "Setup line for {} parsed back as {}: {}",
            line.name(),
            parsed.extension,
            rendered
        ))),
        None => Err(ManifestError::InternalConsistency(format!(
            "generated Setup line for {} does not parse: {}",
            line.name(),
            rendered
        ))),
    }
}
