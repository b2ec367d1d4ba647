//! Parser for `Modules/config.c.in`
//!
//! The file declares the `_inittab` table mapping built-in module names to
//! their init functions. Some entries sit inside `#ifdef` blocks; those
//! directives are not evaluated and every entry in the table counts.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

static RE_INITTAB_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{"([^"]+)", ([^}]+)\},"#).unwrap_or_else(|_| unreachable!("static regex"))
});

const INITTAB_START: &str = "struct _inittab";
const INITTAB_SENTINEL: &str = "/* Sentinel */";

/// Parse the contents of a config.c file into module name -> init symbol
pub fn parse_config_c(content: &str) -> BTreeMap<String, String> {
    let mut extensions = BTreeMap::new();
    let mut seen_inittab = false;

    for line in content.lines() {
        if line.starts_with(INITTAB_START) {
            seen_inittab = true;
        }

        if !seen_inittab {
            continue;
        }

        if line.contains(INITTAB_SENTINEL) {
            break;
        }

        if let Some(caps) = RE_INITTAB_ENTRY.captures(line) {
            extensions.insert(caps[1].to_string(), caps[2].to_string());
        }
    }

    debug!("config.c.in registers {} modules", extensions.len());
    extensions
}

#[cfg(test)]
mod tests {
    use crate::config_c::*;

    const CONFIG_C_IN: &str = r#"/* Module configuration */

#include "Python.h"

extern PyObject* PyInit__ignored(void);

/* {"_before", PyInit__before}, should not be picked up */

struct _inittab _PyImport_Inittab[] = {

    {"marshal", PyMarshal_Init},

    /* This module lives in sysmodule.c */
    {"_imp", PyInit__imp},

#ifdef MS_WINDOWS
    {"winreg", PyInit_winreg},
#endif

    /* Sentinel */
    {0, 0}
};

    {"_after", PyInit__after},
"#;

    #[test]
    fn test_parse_inittab_entries() {
        let extensions = parse_config_c(CONFIG_C_IN);
        let names: Vec<&str> = extensions.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["_imp", "marshal", "winreg"]);
        assert_eq!(extensions["_imp"], "PyInit__imp");
    }

    #[test]
    fn test_no_table() {
        assert!(parse_config_c("int main(void) { return 0; }\n").is_empty());
    }
}
