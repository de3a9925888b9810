//! Code description registry
//!
//! Embedded defaults, optionally overridden per dialect from `conf/<dialect>/`.

use std::collections::HashMap;
use std::path::Path;

use super::normalize_code;
use super::schema::{CodeDescription, CodeFamily, DescriptionFile};
use crate::settings::tables::read_json;
use crate::settings::Dialect;

#[derive(Debug, Clone)]
struct Entry {
    label: String,
    description: CodeDescription,
}

/// Lookup of G and M code descriptions keyed by normalized code.
#[derive(Debug, Clone, Default)]
pub struct CodeDescriptions {
    families: HashMap<CodeFamily, HashMap<String, Entry>>,
}

impl CodeDescriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptions compiled into the binary.
    pub fn embedded() -> Self {
        let mut codes = Self::new();
        codes.add_embedded(CodeFamily::G, include_str!("../../resources/codes/gcodes.json"));
        codes.add_embedded(CodeFamily::M, include_str!("../../resources/codes/mcodes.json"));
        codes
    }

    /// Embedded descriptions plus any `gcode_desc.json`/`mcode_desc.json`
    /// found in the dialect's `conf` directory.
    pub fn load(root: &Path, dialect: Dialect) -> Self {
        let mut codes = Self::embedded();
        let dir = root.join("conf").join(dialect.key());

        for family in [CodeFamily::G, CodeFamily::M] {
            let path = dir.join(family.file_name());
            if !path.exists() {
                continue;
            }
            match read_json::<DescriptionFile>(&path) {
                Ok(file) => {
                    log::debug!("loaded {} descriptions from {}", file.len(), path.display());
                    codes.extend(family, file);
                }
                Err(e) => log::warn!("ignoring code descriptions: {}", e),
            }
        }

        codes
    }

    fn add_embedded(&mut self, family: CodeFamily, content: &str) {
        match serde_json::from_str::<DescriptionFile>(content) {
            Ok(file) => self.extend(family, file),
            Err(e) => log::warn!("failed to parse embedded {:?} code descriptions: {}", family, e),
        }
    }

    pub fn extend(&mut self, family: CodeFamily, file: DescriptionFile) {
        let entries = self.families.entry(family).or_default();
        for (label, description) in file {
            entries.insert(normalize_code(&label), Entry { label, description });
        }
    }

    pub fn get(&self, code: &str) -> Option<&CodeDescription> {
        let family = CodeFamily::of(code)?;
        self.families
            .get(&family)?
            .get(&normalize_code(code))
            .map(|entry| &entry.description)
    }

    /// Hover text in markdown, titled with the code as it appears in the table.
    pub fn markdown(&self, code: &str) -> Option<String> {
        let family = CodeFamily::of(code)?;
        let entry = self.families.get(&family)?.get(&normalize_code(code))?;
        Some(format!("**{}**\n\n{}", entry.label, entry.description.text()))
    }

    pub fn len(&self) -> usize {
        self.families.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
