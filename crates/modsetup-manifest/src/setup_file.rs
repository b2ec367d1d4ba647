//! Scanner for the distribution's `Modules/Setup` file
//!
//! Unlike [`crate::setup_line::parse_setup_line`] this looks at commented-out
//! lines too: CPython ships most optional modules as `#name source.c ...`
//! entries, and those still count as modules the distribution knows about.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

static RE_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_]+\s*=").unwrap_or_else(|_| unreachable!("static regex"))
});

static RE_EXTENSION_MODULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z_]+)\s.*[a-zA-Z/_-]+\.c\b").unwrap_or_else(|_| unreachable!("static regex"))
});

/// Modules declared by a Setup file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupInventory {
    /// Every module mentioned, enabled or commented out
    pub dist_modules: BTreeSet<String>,
    /// Modules whose entry appears before any `#` on its line
    pub enabled: BTreeSet<String>,
}

pub fn scan_setup_file(content: &str) -> SetupInventory {
    let mut inventory = SetupInventory::default();

    for line in content.lines() {
        let line = line.trim_end();

        if line.is_empty() || RE_VARIABLE.is_match(line) {
            continue;
        }

        // Look for extension syntax before and after comment.
        for (i, part) in line.split('#').enumerate() {
            if let Some(caps) = RE_EXTENSION_MODULE.captures(part) {
                let name = caps[1].to_string();
                if i == 0 {
                    inventory.enabled.insert(name.clone());
                }
                inventory.dist_modules.insert(name);
                break;
            }
        }
    }

    debug!(
        "Setup declares {} extension modules ({} enabled)",
        inventory.dist_modules.len(),
        inventory.enabled.len()
    );
    inventory
}
