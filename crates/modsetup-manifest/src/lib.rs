//! Extension module build recipe derivation
//!
//! Reconciles declarative extension module metadata with the `Modules/Setup`
//! and `Modules/config.c.in` files of a CPython source distribution, then
//! produces a `Setup.local` that builds every applicable module statically,
//! plus a Makefile supplement for defines makesetup cannot express.
//!
//! A derivation is a pure function of its inputs: the same metadata,
//! distribution, version and target always yield byte-identical output.

pub mod archive;
pub mod config_c;
pub mod derive;
pub mod errors;
pub mod hoist;
pub mod metadata;
pub mod reconcile;
pub mod rules;
pub mod setup_file;
pub mod setup_line;
pub mod synthesize;
pub mod target;
pub mod types;
pub mod version;

pub use errors::{ManifestError, Result};

pub use archive::{read_dist_manifests, DistManifests};
pub use derive::{
    check_consistency, derive_from_source, derive_setup_local, ConsistencyCheck, DerivedSetup,
};
pub use metadata::{load_extension_modules, parse_extension_modules};
pub use reconcile::{ModulePartition, ReconciliationReport};
pub use setup_line::{parse_setup_line, ParsedSetupLine};
pub use synthesize::{SynthesisSettings, DEFAULT_CFLAGS_VARIABLE, DEFAULT_DEPS_PREFIX};
pub use target::{BuildContext, Platform};
pub use types::{ExtensionModules, ModuleSpec};
pub use version::PythonVersion;
