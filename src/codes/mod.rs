//! Code Description Store
//!
//! Descriptive text for G and M codes, used by completion and hover.

pub mod registry;
pub mod schema;

use std::sync::LazyLock;

use regex::Regex;

pub use registry::CodeDescriptions;
pub use schema::{CodeDescription, CodeFamily};

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]+)(\d*)(?:\.(\d*))?$").expect("valid code regex"));

/// Canonical spelling of a machine code: upper case, no leading zeros in the
/// number, no trailing zeros in the fraction. `g01` -> `G1`, `G54.10` -> `G54.1`.
pub fn normalize_code(code: &str) -> String {
    let upper = code.trim().to_ascii_uppercase();
    canonical_number(&upper).unwrap_or(upper)
}

fn canonical_number(code: &str) -> Option<String> {
    let caps = CODE_RE.captures(code)?;
    let letters = &caps[1];
    if caps[2].is_empty() && caps.get(3).is_none() {
        return None;
    }

    let integer = caps[2].trim_start_matches('0');
    let integer = if integer.is_empty() { "0" } else { integer };
    let fraction = caps.get(3).map_or("", |m| m.as_str().trim_end_matches('0'));

    Some(if fraction.is_empty() {
        format!("{letters}{integer}")
    } else {
        format!("{letters}{integer}.{fraction}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("G01"), "G1");
        assert_eq!(normalize_code("g00"), "G0");
        assert_eq!(normalize_code("G54.1"), "G54.1");
        assert_eq!(normalize_code("G54.10"), "G54.1");
        assert_eq!(normalize_code("M030"), "M30");
        assert_eq!(normalize_code("G28.0"), "G28");
        assert_eq!(normalize_code("FMAX"), "FMAX");
        assert_eq!(normalize_code("#100"), "#100");
    }
}
