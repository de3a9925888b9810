//! Description file types.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Description of one machine code (matches JSON)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CodeDescription {
    pub short: String,
    pub long: Option<String>,
}

impl CodeDescription {
    /// Long text when present, short otherwise.
    pub fn text(&self) -> &str {
        self.long.as_deref().unwrap_or(&self.short)
    }
}

/// Root of a `*_desc.json` file: code -> description.
pub type DescriptionFile = BTreeMap<String, CodeDescription>;

/// The two code families with descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeFamily {
    G,
    M,
}

impl CodeFamily {
    pub fn of(code: &str) -> Option<Self> {
        match code.trim_start().chars().next()?.to_ascii_uppercase() {
            'G' => Some(CodeFamily::G),
            'M' => Some(CodeFamily::M),
            _ => None,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            CodeFamily::G => "gcode_desc.json",
            CodeFamily::M => "mcode_desc.json",
        }
    }
}
