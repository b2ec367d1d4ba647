//! modsetup library - expose command handlers for testing

pub mod commands;
pub mod common;

pub use common::GlobalOpts;
pub use modsetup_config as config_manager;
pub use modsetup_logger as logger;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Route engine `tracing` events to stderr. `RUST_LOG` overrides the
/// filter derived from the CLI verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| logger::verbosity_to_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
